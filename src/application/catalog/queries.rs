use crate::domain::{
    book::Book,
    loan::{ActiveLoan, Loan, OverdueLoan},
    member::Member,
    value_objects::{BookId, LoanId, MemberId},
};
use crate::ports::{LoanRecord, StoreError};
use chrono::NaiveDate;

use super::catalog_service::{ServiceDependencies, log_failure};
use super::errors::Result;

/// 全書籍（登録順）
pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    deps.store
        .list_books()
        .await
        .map_err(|e| log_failure("list_books", e.into()))
}

/// 貸出可能な書籍（登録順）
pub async fn list_available_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    let books = list_books(deps).await?;
    Ok(books.into_iter().filter(Book::is_available).collect())
}

/// 全会員（登録順）
pub async fn list_members(deps: &ServiceDependencies) -> Result<Vec<Member>> {
    deps.store
        .list_members()
        .await
        .map_err(|e| log_failure("list_members", e.into()))
}

/// 貸出中の貸出（貸出順）
pub async fn list_active_loans(deps: &ServiceDependencies) -> Result<Vec<ActiveLoan>> {
    deps.store
        .list_active_loans()
        .await
        .map_err(|e| log_failure("list_active_loans", e.into()))
}

/// 貸出中の貸出（タイトル・氏名つき）
pub async fn list_active_loan_records(deps: &ServiceDependencies) -> Result<Vec<LoanRecord>> {
    deps.store
        .active_loan_records()
        .await
        .map_err(|e| log_failure("list_active_loan_records", e.into()))
}

/// 全貸出の履歴（貸出日の新しい順）
pub async fn loan_history(deps: &ServiceDependencies) -> Result<Vec<LoanRecord>> {
    deps.store
        .loan_history()
        .await
        .map_err(|e| log_failure("loan_history", e.into()))
}

/// 延滞中の貸出
///
/// as_of時点で返却期限を過ぎた未返却の貸出を、返却期限の昇順で返す。
/// 各要素の延滞日数は as_of - due_date（1以上）。
pub async fn overdue_loans(deps: &ServiceDependencies, as_of: NaiveDate) -> Result<Vec<OverdueLoan>> {
    let overdue = deps
        .store
        .overdue_loans(as_of)
        .await
        .map_err(|e| log_failure("overdue_loans", e.into()))?;

    tracing::debug!(%as_of, count = overdue.len(), "overdue loans detected");
    Ok(overdue)
}

/// 今日時点の延滞中の貸出
pub async fn overdue_loans_today(deps: &ServiceDependencies) -> Result<Vec<OverdueLoan>> {
    overdue_loans(deps, deps.clock.today()).await
}

pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.store
        .get_book(book_id)
        .await
        .and_then(|book| book.ok_or_else(|| StoreError::not_found_book(book_id)))
        .map_err(|e| log_failure("get_book", e.into()))
}

pub async fn get_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<Member> {
    deps.store
        .get_member(member_id)
        .await
        .and_then(|member| member.ok_or_else(|| StoreError::not_found_member(member_id)))
        .map_err(|e| log_failure("get_member", e.into()))
}

pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    deps.store
        .get_loan(loan_id)
        .await
        .and_then(|loan| loan.ok_or_else(|| StoreError::not_found_loan(loan_id)))
        .map_err(|e| log_failure("get_loan", e.into()))
}
