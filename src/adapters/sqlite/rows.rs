use crate::domain::{
    book::Book,
    loan::{ActiveLoan, Loan, LoanCore},
    member::Member,
    value_objects::{BookId, Email, Isbn, LoanId, MemberId, Quantity},
};
use crate::ports::catalog_store::{LoanRecord, Result, StoreError};
use chrono::NaiveDate;
use sqlx::{Row, sqlite::SqliteRow};
use uuid::Uuid;

/// SQLiteの行データをBookに変換する
///
/// 冊数・在庫数が不変条件を満たさない行は`StoreError::Corrupted`として扱う。
pub(super) fn map_row_to_book(row: &SqliteRow) -> Result<Book> {
    let id: Uuid = row.try_get("id")?;

    let quantity: i64 = row.try_get("quantity")?;
    let quantity = Quantity::try_from(quantity)
        .map_err(|e| StoreError::Corrupted(format!("book {}: {}", id, e)))?;

    let isbn: String = row.try_get("isbn")?;
    let isbn =
        Isbn::try_from(isbn).map_err(|e| StoreError::Corrupted(format!("book {}: {}", id, e)))?;

    Book::restore(
        BookId::from_uuid(id),
        row.try_get("title")?,
        row.try_get("author")?,
        isbn,
        quantity,
        row.try_get("available")?,
    )
    .map_err(|e| StoreError::Corrupted(format!("book {}: {:?}", id, e)))
}

/// SQLiteの行データをMemberに変換する
pub(super) fn map_row_to_member(row: &SqliteRow) -> Result<Member> {
    let id: Uuid = row.try_get("id")?;

    let email: String = row.try_get("email")?;
    let email =
        Email::try_from(email).map_err(|e| StoreError::Corrupted(format!("member {}: {}", id, e)))?;

    Ok(Member {
        member_id: MemberId::from_uuid(id),
        name: row.try_get("name")?,
        email,
        phone: row.try_get("phone")?,
        membership_date: row.try_get("membership_date")?,
    })
}

fn map_row_to_loan_core(row: &SqliteRow) -> Result<LoanCore> {
    Ok(LoanCore {
        loan_id: LoanId::from_uuid(row.try_get("id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
    })
}

/// SQLiteの行データをLoanに変換する（return_dateの有無で状態が決まる）
pub(super) fn map_row_to_loan(row: &SqliteRow) -> Result<Loan> {
    let return_date: Option<NaiveDate> = row.try_get("return_date")?;
    Ok(Loan::restore(map_row_to_loan_core(row)?, return_date))
}

/// 未返却の行のみを対象とするクエリ用
pub(super) fn map_row_to_active_loan(row: &SqliteRow) -> Result<ActiveLoan> {
    match map_row_to_loan(row)? {
        Loan::Active(active) => Ok(active),
        Loan::Returned(returned) => Err(StoreError::Corrupted(format!(
            "loan {} was selected as active but has a return date",
            returned.loan_id
        ))),
    }
}

pub(super) fn map_row_to_loan_record(row: &SqliteRow) -> Result<LoanRecord> {
    Ok(LoanRecord {
        loan: map_row_to_loan(row)?,
        book_title: row.try_get("book_title")?,
        member_name: row.try_get("member_name")?,
    })
}
