#![allow(dead_code)]

use chrono::NaiveDate;
use library_catalog::adapters::{
    memory::InMemoryCatalogStore, mock::FixedClock, sqlite::SqliteCatalogStore,
};
use library_catalog::application::catalog::{self, ServiceDependencies};
use library_catalog::domain::{book::Book, commands::*, member::Member};
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// テスト対象のストアと、日付を操作できる時計
pub struct Fixture {
    pub name: &'static str,
    pub deps: ServiceDependencies,
    pub clock: Arc<FixedClock>,
}

/// インメモリSQLiteを使ったテスト用の依存関係を作成
///
/// 本番と同じマイグレーションでスキーマを作成する。
pub async fn sqlite_fixture(today: NaiveDate) -> Fixture {
    let store = SqliteCatalogStore::in_memory()
        .await
        .expect("Failed to open in-memory catalog");
    let clock = Arc::new(FixedClock::new(today));

    Fixture {
        name: "sqlite",
        deps: ServiceDependencies {
            store: Arc::new(store),
            clock: clock.clone(),
        },
        clock,
    }
}

pub fn memory_fixture(today: NaiveDate) -> Fixture {
    let clock = Arc::new(FixedClock::new(today));

    Fixture {
        name: "memory",
        deps: ServiceDependencies {
            store: Arc::new(InMemoryCatalogStore::new()),
            clock: clock.clone(),
        },
        clock,
    }
}

/// 両方のストア実装で同じシナリオを検証するためのフィクスチャ一覧
pub async fn all_fixtures(today: NaiveDate) -> Vec<Fixture> {
    vec![sqlite_fixture(today).await, memory_fixture(today)]
}

pub async fn add_book(deps: &ServiceDependencies, title: &str, isbn: &str, quantity: i64) -> Book {
    catalog::add_book(
        deps,
        AddBook {
            title: title.to_string(),
            author: "Test Author".to_string(),
            isbn: isbn.to_string(),
            quantity,
        },
    )
    .await
    .expect("Failed to add book")
}

pub async fn add_member(deps: &ServiceDependencies, name: &str, email: &str) -> Member {
    catalog::add_member(
        deps,
        AddMember {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
        },
    )
    .await
    .expect("Failed to add member")
}
