use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{BookId, IssueLoanError, LoanId, MemberId, ReleaseError, ReturnLoanError};

/// 貸出期間（日数）
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// 会員1人あたりの最大貸出冊数
pub const MAX_ACTIVE_LOANS: usize = 5;

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// Loan集約の共通フィールド
///
/// 貸出中・返却済みの両状態で共有されるコアデータ。作成後は変更されない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCore {
    pub loan_id: LoanId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,
    pub member_id: MemberId,

    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// 貸出中状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub core: LoanCore,
}

impl std::ops::Deref for ActiveLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 返却済み状態
///
/// ビジネスルール：
/// - return_dateが必須（型で保証）
/// - 終端状態。以降の操作は受け付けない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
    pub return_date: NaiveDate,
}

impl std::ops::Deref for ReturnedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// Loan集約の統合型
///
/// Active -> Returned の一方向の遷移のみ存在する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Loan {
    Active(ActiveLoan),
    Returned(ReturnedLoan),
}

impl Loan {
    /// 永続化された値から復元する
    ///
    /// return_dateの有無で状態が決まる。
    pub fn restore(core: LoanCore, return_date: Option<NaiveDate>) -> Self {
        match return_date {
            None => Loan::Active(ActiveLoan { core }),
            Some(return_date) => Loan::Returned(ReturnedLoan { core, return_date }),
        }
    }

    pub fn core(&self) -> &LoanCore {
        match self {
            Loan::Active(active) => &active.core,
            Loan::Returned(returned) => &returned.core,
        }
    }

    pub fn loan_id(&self) -> LoanId {
        self.core().loan_id
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Loan::Active(_))
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        match self {
            Loan::Active(_) => None,
            Loan::Returned(returned) => Some(returned.return_date),
        }
    }
}

/// 延滞中の貸出と延滞日数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueLoan {
    pub loan: ActiveLoan,
    /// as_of - due_date（1以上）
    pub days_overdue: i64,
}

/// 純粋関数：貸出上限の確認
///
/// ビジネスルール：貸出中の冊数が5冊未満であること
pub fn ensure_within_limit(active_loans: usize) -> Result<(), IssueLoanError> {
    if active_loans >= MAX_ACTIVE_LOANS {
        return Err(IssueLoanError::LoanLimitExceeded { active_loans });
    }
    Ok(())
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 返却期限は貸出日 + 14日
/// - 状態はActive
///
/// 在庫と貸出上限の確認は呼び出し側が同一トランザクション内で行う。
pub fn issue_loan(book_id: BookId, member_id: MemberId, issued_on: NaiveDate) -> ActiveLoan {
    ActiveLoan {
        core: LoanCore {
            loan_id: LoanId::new(),
            book_id,
            member_id,
            issue_date: issued_on,
            due_date: issued_on + Duration::days(LOAN_PERIOD_DAYS),
        },
    }
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 延滞していても返却は受け付ける
/// - 返却済みの貸出は再返却できない
pub fn return_loan(loan: Loan, returned_on: NaiveDate) -> Result<ReturnedLoan, ReturnLoanError> {
    match loan {
        Loan::Active(active) => Ok(ReturnedLoan {
            core: active.core,
            return_date: returned_on,
        }),
        Loan::Returned(_) => Err(ReturnLoanError::AlreadyReturned),
    }
}

/// 純粋関数：延滞判定
pub fn is_overdue(loan: &ActiveLoan, as_of: NaiveDate) -> bool {
    loan.due_date < as_of
}

/// 純粋関数：延滞日数
///
/// 延滞していない場合はNone。
pub fn days_overdue(loan: &ActiveLoan, as_of: NaiveDate) -> Option<i64> {
    is_overdue(loan, as_of).then(|| (as_of - loan.due_date).num_days())
}

/// 純粋関数：延滞中の貸出を抽出する
///
/// 返却期限の昇順。同じ期限の貸出は入力順を保つ。
pub fn select_overdue<I>(loans: I, as_of: NaiveDate) -> Vec<OverdueLoan>
where
    I: IntoIterator<Item = ActiveLoan>,
{
    let mut overdue: Vec<OverdueLoan> = loans
        .into_iter()
        .filter_map(|loan| {
            days_overdue(&loan, as_of).map(|days_overdue| OverdueLoan { loan, days_overdue })
        })
        .collect();

    overdue.sort_by_key(|o| o.loan.due_date);
    overdue
}

/// 純粋関数：書籍・会員を削除できるか
///
/// 貸出中の貸出から参照されている間は削除不可。返却済みの貸出は妨げない。
pub fn ensure_releasable(active_loans: usize) -> Result<(), ReleaseError> {
    if active_loans > 0 {
        return Err(ReleaseError::ActiveLoans(active_loans));
    }
    Ok(())
}
