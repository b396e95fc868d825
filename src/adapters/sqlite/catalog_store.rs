use crate::domain::{
    book::{self, Book},
    errors::{IssueLoanError, ReleaseError},
    loan::{self, ActiveLoan, Loan, OverdueLoan, ReturnedLoan},
    member::Member,
    value_objects::{BookId, LoanId, MemberId},
};
use crate::ports::catalog_store::{
    CatalogStore as CatalogStoreTrait, Entity, LoanRecord, Result, StoreError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Transaction;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::rows::{
    map_row_to_active_loan, map_row_to_book, map_row_to_loan, map_row_to_loan_record,
    map_row_to_member,
};

/// CatalogStoreのSQLite実装
///
/// 1つのデータベースファイルに書籍・会員・貸出を保持する。
/// 更新系の操作はそれぞれ1つの書き込みトランザクション（BEGIN IMMEDIATE）で
/// 実行し、前提条件の確認から更新までを他の書き込みと直列化する。
/// UPDATE文には現在値の条件も付ける。
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl CatalogStore {
    /// データベースファイルを開く（存在しなければ作成する）
    ///
    /// スキーマは埋め込みのマイグレーションで作成・更新される。
    pub async fn connect<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let path = database_path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(Box::new(e)))?;
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_opts)
            .await?;

        let store = Self {
            pool,
            path: Some(path.to_path_buf()),
        };
        store.migrate().await?;

        tracing::debug!(path = %path.display(), "catalog database opened");
        Ok(store)
    }

    /// テスト用のインメモリデータベース
    ///
    /// 接続が閉じるとデータが失われるため、接続は1本に固定し破棄しない。
    pub async fn in_memory() -> Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;

        let store = Self { pool, path: None };
        store.migrate().await?;

        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))
    }

    /// 書き込み用のトランザクションを開始する
    ///
    /// BEGIN IMMEDIATEで最初に書き込みロックを取得する。競合する書き込みは
    /// busy_timeoutの間待機し、読み取り後のロック昇格で失敗することはない。
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// データベースファイルのパス（インメモリの場合はNone）
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

// ============================================================================
// 接続単位のヘルパー（トランザクション内外で共用）
// ============================================================================

async fn fetch_book(conn: &mut SqliteConnection, book_id: BookId) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, author, isbn, quantity, available
        FROM books
        WHERE id = ?
        "#,
    )
    .bind(book_id.value())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_row_to_book).transpose()
}

async fn fetch_member(conn: &mut SqliteConnection, member_id: MemberId) -> Result<Option<Member>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, email, phone, membership_date
        FROM members
        WHERE id = ?
        "#,
    )
    .bind(member_id.value())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_row_to_member).transpose()
}

async fn fetch_loan(conn: &mut SqliteConnection, loan_id: LoanId) -> Result<Option<Loan>> {
    let row = sqlx::query(
        r#"
        SELECT id, book_id, member_id, issue_date, due_date, return_date
        FROM loans
        WHERE id = ?
        "#,
    )
    .bind(loan_id.value())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_row_to_loan).transpose()
}

async fn count_active_loans_for_book(conn: &mut SqliteConnection, book_id: BookId) -> Result<usize> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE book_id = ? AND return_date IS NULL",
    )
    .bind(book_id.value())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count as usize)
}

async fn count_active_loans_for_member(
    conn: &mut SqliteConnection,
    member_id: MemberId,
) -> Result<usize> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE member_id = ? AND return_date IS NULL",
    )
    .bind(member_id.value())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count as usize)
}

/// 在庫数を更新する（読み取った値から変わっていない場合のみ）
async fn update_available(conn: &mut SqliteConnection, before: &Book, after: &Book) -> Result<bool> {
    let result = sqlx::query("UPDATE books SET available = ? WHERE id = ? AND available = ?")
        .bind(i64::from(after.available()))
        .bind(after.book_id.value())
        .bind(i64::from(before.available()))
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

fn conflict(entity: Entity, id: uuid::Uuid, err: ReleaseError) -> StoreError {
    match err {
        ReleaseError::ActiveLoans(active_loans) => StoreError::Conflict {
            entity,
            id,
            active_loans,
        },
    }
}

/// 一意制約違反をDuplicateKeyに、それ以外をBackendに変換する
fn map_insert_error(err: sqlx::Error, field: &'static str, value: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey {
            field,
            value: value.to_string(),
        },
        _ => err.into(),
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn insert_book(&self, book: &Book) -> Result<()> {
        let mut tx = self.begin_write().await?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM books WHERE isbn = ?")
            .bind(book.isbn.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(StoreError::DuplicateKey {
                field: "isbn",
                value: book.isbn.to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, isbn, quantity, available)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.isbn.as_str())
        .bind(i64::from(book.quantity.value()))
        .bind(i64::from(book.available()))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "isbn", book.isbn.as_str()))?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_book(&self, book_id: BookId) -> Result<()> {
        let mut tx = self.begin_write().await?;

        if fetch_book(&mut tx, book_id).await?.is_none() {
            return Err(StoreError::not_found_book(book_id));
        }

        let active_loans = count_active_loans_for_book(&mut tx, book_id).await?;
        loan::ensure_releasable(active_loans)
            .map_err(|e| conflict(Entity::Book, book_id.value(), e))?;

        // 返却済みの貸出はON DELETE CASCADEで削除される
        sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_member(&self, member: &Member) -> Result<()> {
        let mut tx = self.begin_write().await?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT 1 FROM members WHERE email = ?")
            .bind(member.email.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_some() {
            return Err(StoreError::DuplicateKey {
                field: "email",
                value: member.email.to_string(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO members (id, name, email, phone, membership_date)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(member.member_id.value())
        .bind(&member.name)
        .bind(member.email.as_str())
        .bind(member.phone.as_deref())
        .bind(member.membership_date)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "email", member.email.as_str()))?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_member(&self, member_id: MemberId) -> Result<()> {
        let mut tx = self.begin_write().await?;

        if fetch_member(&mut tx, member_id).await?.is_none() {
            return Err(StoreError::not_found_member(member_id));
        }

        let active_loans = count_active_loans_for_member(&mut tx, member_id).await?;
        loan::ensure_releasable(active_loans)
            .map_err(|e| conflict(Entity::Member, member_id.value(), e))?;

        sqlx::query("DELETE FROM members WHERE id = ?")
            .bind(member_id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn issue_loan(
        &self,
        book_id: BookId,
        member_id: MemberId,
        issued_on: NaiveDate,
    ) -> Result<ActiveLoan> {
        let mut tx = self.begin_write().await?;

        // 1. 書籍の存在と在庫
        let book = fetch_book(&mut tx, book_id)
            .await?
            .ok_or(StoreError::Unavailable(book_id))?;
        let checked_out = book::check_out(&book).map_err(|_| StoreError::Unavailable(book_id))?;

        // 2. 会員の存在
        if fetch_member(&mut tx, member_id).await?.is_none() {
            return Err(StoreError::not_found_member(member_id));
        }

        // 3. 貸出上限
        let active_loans = count_active_loans_for_member(&mut tx, member_id).await?;
        loan::ensure_within_limit(active_loans).map_err(|e| match e {
            IssueLoanError::LoanLimitExceeded { active_loans } => StoreError::LimitExceeded {
                member_id,
                active_loans,
            },
        })?;

        // 4. 在庫を減らして貸出を記録
        let active = loan::issue_loan(book_id, member_id, issued_on);

        if !update_available(&mut tx, &book, &checked_out).await? {
            return Err(StoreError::Unavailable(book_id));
        }

        sqlx::query(
            r#"
            INSERT INTO loans (id, book_id, member_id, issue_date, due_date, return_date)
            VALUES (?, ?, ?, ?, ?, NULL)
            "#,
        )
        .bind(active.loan_id.value())
        .bind(active.book_id.value())
        .bind(active.member_id.value())
        .bind(active.issue_date)
        .bind(active.due_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(active)
    }

    async fn return_loan(&self, loan_id: LoanId, returned_on: NaiveDate) -> Result<ReturnedLoan> {
        let mut tx = self.begin_write().await?;

        let current = fetch_loan(&mut tx, loan_id)
            .await?
            .ok_or_else(|| StoreError::not_found_loan(loan_id))?;
        let returned = loan::return_loan(current, returned_on)
            .map_err(|_| StoreError::AlreadyReturned(loan_id))?;

        let book = fetch_book(&mut tx, returned.book_id).await?.ok_or_else(|| {
            StoreError::Corrupted(format!(
                "loan {} references missing book {}",
                loan_id, returned.book_id
            ))
        })?;
        let checked_in = book::check_in(&book).map_err(|e| {
            StoreError::Corrupted(format!("book {} cannot take a return: {:?}", book.book_id, e))
        })?;

        let result = sqlx::query("UPDATE loans SET return_date = ? WHERE id = ? AND return_date IS NULL")
            .bind(returned.return_date)
            .bind(loan_id.value())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::AlreadyReturned(loan_id));
        }

        if !update_available(&mut tx, &book, &checked_in).await? {
            return Err(StoreError::Corrupted(format!(
                "available count of book {} changed during return",
                book.book_id
            )));
        }

        tx.commit().await?;
        Ok(returned)
    }

    async fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, book_id).await
    }

    async fn get_member(&self, member_id: MemberId) -> Result<Option<Member>> {
        let mut conn = self.pool.acquire().await?;
        fetch_member(&mut conn, member_id).await
    }

    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let mut conn = self.pool.acquire().await?;
        fetch_loan(&mut conn, loan_id).await
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, author, isbn, quantity, available
            FROM books
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, phone, membership_date
            FROM members
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_member).collect()
    }

    async fn list_active_loans(&self) -> Result<Vec<ActiveLoan>> {
        let rows = sqlx::query(
            r#"
            SELECT id, book_id, member_id, issue_date, due_date, return_date
            FROM loans
            WHERE return_date IS NULL
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_active_loan).collect()
    }

    async fn overdue_loans(&self, as_of: NaiveDate) -> Result<Vec<OverdueLoan>> {
        // 日付はYYYY-MM-DDのTEXTで保存しているため文字列比較で大小が決まる
        let rows = sqlx::query(
            r#"
            SELECT id, book_id, member_id, issue_date, due_date, return_date
            FROM loans
            WHERE return_date IS NULL AND due_date < ?
            ORDER BY due_date ASC, seq ASC
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .iter()
            .map(map_row_to_active_loan)
            .collect::<Result<Vec<_>>>()?;

        Ok(loan::select_overdue(candidates, as_of))
    }

    async fn active_loan_records(&self) -> Result<Vec<LoanRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                l.id AS id,
                l.book_id AS book_id,
                l.member_id AS member_id,
                l.issue_date AS issue_date,
                l.due_date AS due_date,
                l.return_date AS return_date,
                b.title AS book_title,
                m.name AS member_name
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN members m ON l.member_id = m.id
            WHERE l.return_date IS NULL
            ORDER BY l.seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan_record).collect()
    }

    async fn loan_history(&self) -> Result<Vec<LoanRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                l.id AS id,
                l.book_id AS book_id,
                l.member_id AS member_id,
                l.issue_date AS issue_date,
                l.due_date AS due_date,
                l.return_date AS return_date,
                b.title AS book_title,
                m.name AS member_name
            FROM loans l
            JOIN books b ON l.book_id = b.id
            JOIN members m ON l.member_id = m.id
            ORDER BY l.issue_date DESC, l.seq DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan_record).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::member;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_creation_order_survives_vacuum() {
        let store = CatalogStore::in_memory().await.unwrap();

        let mut ids = Vec::new();
        for i in 0..5 {
            let book = book::add_book(&format!("Book {i}"), "Author", &format!("isbn-{i}"), 1).unwrap();
            store.insert_book(&book).await.unwrap();
            ids.push(book.book_id);
        }
        let alice =
            member::register_member("Alice", "alice@example.com", None, date(2024, 3, 1)).unwrap();
        store.insert_member(&alice).await.unwrap();

        // 途中の行を消してから再構築する
        store.delete_book(ids.remove(1)).await.unwrap();
        store.delete_book(ids.remove(2)).await.unwrap();
        sqlx::query("VACUUM").execute(&store.pool).await.unwrap();

        let later = book::add_book("Later", "Author", "isbn-later", 1).unwrap();
        store.insert_book(&later).await.unwrap();
        ids.push(later.book_id);

        let listed: Vec<BookId> = store
            .list_books()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.book_id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_deleted_sequence_numbers_are_not_reused() {
        let store = CatalogStore::in_memory().await.unwrap();

        let first = book::add_book("First", "Author", "isbn-1", 1).unwrap();
        let last = book::add_book("Last", "Author", "isbn-2", 1).unwrap();
        store.insert_book(&first).await.unwrap();
        store.insert_book(&last).await.unwrap();
        store.delete_book(last.book_id).await.unwrap();

        let next = book::add_book("Next", "Author", "isbn-3", 1).unwrap();
        store.insert_book(&next).await.unwrap();

        let seqs: Vec<i64> = sqlx::query_scalar("SELECT seq FROM books ORDER BY seq")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(seqs, vec![1, 3]);
    }
}
