use crate::domain::{
    book::Book,
    loan::{ActiveLoan, Loan, OverdueLoan, ReturnedLoan},
    member::Member,
    value_objects::{BookId, LoanId, MemberId},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, StoreError>;

/// ストアが保持するレコードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    Member,
    Loan,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Book => "book",
            Entity::Member => "member",
            Entity::Loan => "loan",
        };
        f.write_str(name)
    }
}

/// ストア操作のエラー
///
/// ビジネスルール違反（前提条件の不成立）とバックエンドの障害を区別する。
/// ルール違反はいずれも状態を一切変更しない。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },

    #[error("{field} '{value}' is already registered")]
    DuplicateKey { field: &'static str, value: String },

    #[error("{entity} {id} is referenced by {active_loans} active loan(s)")]
    Conflict {
        entity: Entity,
        id: Uuid,
        active_loans: usize,
    },

    #[error("book {0} has no copies available")]
    Unavailable(BookId),

    #[error("member {member_id} already has {active_loans} active loans")]
    LimitExceeded {
        member_id: MemberId,
        active_loans: usize,
    },

    #[error("loan {0} has already been returned")]
    AlreadyReturned(LoanId),

    /// 永続化された値が不変条件を満たさない
    #[error("stored data is inconsistent: {0}")]
    Corrupted(String),

    #[error("storage backend error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn not_found_book(id: BookId) -> Self {
        StoreError::NotFound {
            entity: Entity::Book,
            id: id.value(),
        }
    }

    pub fn not_found_member(id: MemberId) -> Self {
        StoreError::NotFound {
            entity: Entity::Member,
            id: id.value(),
        }
    }

    pub fn not_found_loan(id: LoanId) -> Self {
        StoreError::NotFound {
            entity: Entity::Loan,
            id: id.value(),
        }
    }
}

/// 貸出レコード（書籍タイトル・会員名つき）
///
/// 貸出一覧・貸出履歴の表示用。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoanRecord {
    pub loan: Loan,
    pub book_title: String,
    pub member_name: String,
}

/// 蔵書・会員・貸出を保持するストアのポート
///
/// 更新系の操作はすべて原子的に実行される。前提条件の確認と更新は
/// 同一のトランザクション（またはロック）内で行われ、失敗時は何も変更しない。
/// 一覧は作成順（挿入順）で返す。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// 書籍を追加する
    ///
    /// ISBNが登録済みの場合は`StoreError::DuplicateKey`。
    async fn insert_book(&self, book: &Book) -> Result<()>;

    /// 書籍を削除する
    ///
    /// 貸出中の貸出から参照されている場合は`StoreError::Conflict`。
    /// 返却済みの貸出は書籍とともに削除される。
    async fn delete_book(&self, book_id: BookId) -> Result<()>;

    /// 会員を追加する
    ///
    /// メールアドレスが登録済みの場合は`StoreError::DuplicateKey`。
    async fn insert_member(&self, member: &Member) -> Result<()>;

    /// 会員を削除する
    async fn delete_member(&self, member_id: MemberId) -> Result<()>;

    /// 貸出を作成し、書籍の貸出可能数を1減らす
    ///
    /// 確認順：書籍の存在と在庫（`Unavailable`）、会員の存在（`NotFound`）、
    /// 貸出上限（`LimitExceeded`）。
    async fn issue_loan(
        &self,
        book_id: BookId,
        member_id: MemberId,
        issued_on: NaiveDate,
    ) -> Result<ActiveLoan>;

    /// 貸出を返却済みにし、書籍の貸出可能数を1増やす
    async fn return_loan(&self, loan_id: LoanId, returned_on: NaiveDate) -> Result<ReturnedLoan>;

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>>;

    async fn get_member(&self, member_id: MemberId) -> Result<Option<Member>>;

    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    async fn list_books(&self) -> Result<Vec<Book>>;

    async fn list_members(&self) -> Result<Vec<Member>>;

    async fn list_active_loans(&self) -> Result<Vec<ActiveLoan>>;

    /// 延滞中の貸出を返却期限の昇順で返す
    ///
    /// due_date < as_of かつ未返却の貸出。延滞日数つき。
    async fn overdue_loans(&self, as_of: NaiveDate) -> Result<Vec<OverdueLoan>>;

    /// 貸出中の貸出（タイトル・氏名つき、作成順）
    async fn active_loan_records(&self) -> Result<Vec<LoanRecord>>;

    /// 全貸出の履歴（タイトル・氏名つき、貸出日の新しい順）
    async fn loan_history(&self) -> Result<Vec<LoanRecord>>;

    /// ストアを閉じ、保持しているリソースを解放する
    async fn close(&self);
}
