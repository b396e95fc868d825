use crate::domain::{
    self,
    book::Book,
    commands::*,
    loan::{ActiveLoan, ReturnedLoan},
    member::Member,
    value_objects::{BookId, MemberId},
};
use crate::ports::*;
use std::sync::Arc;

use super::errors::{CatalogApplicationError, ErrorKind, Result};

/// サービスの依存関係
///
/// 振る舞い（メソッド）は持たず、各操作の関数に明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub store: Arc<dyn CatalogStore>,
    pub clock: Arc<dyn Clock>,
}

/// 失敗をログに残してそのまま返す
///
/// ルール違反はwarn、ストアの障害はerror。
pub(super) fn log_failure(operation: &'static str, err: CatalogApplicationError) -> CatalogApplicationError {
    match err.kind() {
        ErrorKind::Store => {
            tracing::error!(operation, error = %err, "catalog store failure");
        }
        _ => {
            tracing::warn!(operation, error = %err, "catalog operation rejected");
        }
    }
    err
}

/// 書籍を登録する
///
/// ビジネスルール：
/// - タイトル・著者・ISBNは必須、冊数は1以上
/// - ISBNは重複不可
/// - 登録直後の貸出可能数は冊数と同じ
pub async fn add_book(deps: &ServiceDependencies, cmd: AddBook) -> Result<Book> {
    let book = domain::book::add_book(&cmd.title, &cmd.author, &cmd.isbn, cmd.quantity)
        .map_err(|e| log_failure("add_book", e.into()))?;

    deps.store
        .insert_book(&book)
        .await
        .map_err(|e| log_failure("add_book", e.into()))?;

    tracing::info!(book_id = %book.book_id, isbn = %book.isbn, quantity = book.quantity.value(), "book added");
    Ok(book)
}

/// 書籍を削除する
///
/// 貸出中の貸出から参照されている場合は削除できない。
pub async fn delete_book(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    deps.store
        .delete_book(book_id)
        .await
        .map_err(|e| log_failure("delete_book", e.into()))?;

    tracing::info!(%book_id, "book deleted");
    Ok(())
}

/// 会員を登録する
///
/// ビジネスルール：
/// - 氏名・メールアドレスは必須
/// - メールアドレスは重複不可
/// - 登録日は今日
pub async fn add_member(deps: &ServiceDependencies, cmd: AddMember) -> Result<Member> {
    let member = domain::member::register_member(
        &cmd.name,
        &cmd.email,
        cmd.phone.as_deref(),
        deps.clock.today(),
    )
    .map_err(|e| log_failure("add_member", e.into()))?;

    deps.store
        .insert_member(&member)
        .await
        .map_err(|e| log_failure("add_member", e.into()))?;

    tracing::info!(member_id = %member.member_id, email = %member.email, "member added");
    Ok(member)
}

/// 会員を削除する
///
/// 貸出中の貸出がある会員は削除できない。
pub async fn delete_member(deps: &ServiceDependencies, member_id: MemberId) -> Result<()> {
    deps.store
        .delete_member(member_id)
        .await
        .map_err(|e| log_failure("delete_member", e.into()))?;

    tracing::info!(%member_id, "member deleted");
    Ok(())
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 書籍が存在し、貸出可能な冊数が1以上であること
/// - 会員が存在すること
/// - 会員の貸出中の冊数が5冊未満であること
/// - 返却期限は今日 + 14日
///
/// 確認と更新はストアが原子的に行う。
pub async fn issue_loan(deps: &ServiceDependencies, cmd: IssueLoan) -> Result<ActiveLoan> {
    let today = deps.clock.today();

    let loan = deps
        .store
        .issue_loan(cmd.book_id, cmd.member_id, today)
        .await
        .map_err(|e| log_failure("issue_loan", e.into()))?;

    tracing::info!(
        loan_id = %loan.loan_id,
        book_id = %loan.book_id,
        member_id = %loan.member_id,
        due_date = %loan.due_date,
        "loan issued"
    );
    Ok(loan)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 返却済みでないこと（再返却は拒否する）
/// - 延滞していても返却は受け付ける
pub async fn return_loan(deps: &ServiceDependencies, cmd: ReturnLoan) -> Result<ReturnedLoan> {
    let today = deps.clock.today();

    let returned = deps
        .store
        .return_loan(cmd.loan_id, today)
        .await
        .map_err(|e| log_failure("return_loan", e.into()))?;

    if returned.return_date > returned.due_date {
        tracing::info!(
            loan_id = %returned.loan_id,
            days_late = (returned.return_date - returned.due_date).num_days(),
            "overdue loan returned"
        );
    } else {
        tracing::info!(loan_id = %returned.loan_id, "loan returned");
    }
    Ok(returned)
}
