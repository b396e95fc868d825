use std::fmt;

/// 入力値の検証エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 必須項目が空
    EmptyField(&'static str),
    /// 冊数が1未満
    NonPositiveQuantity(i64),
    /// 冊数が上限を超える
    QuantityTooLarge(i64),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} must not be empty", field),
            ValidationError::NonPositiveQuantity(value) => {
                write!(f, "quantity must be a positive integer, got {}", value)
            }
            ValidationError::QuantityTooLarge(value) => {
                write!(f, "quantity must be at most {}, got {}", u32::MAX, value)
            }
        }
    }
}

/// 在庫数のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// 貸出可能な冊数が0
    NoCopiesAvailable,
    /// 全冊が書架にあるのに返却された
    AllCopiesOnShelf,
    /// 0 <= available <= quantity を満たさない
    InvalidCount { quantity: i64, available: i64 },
}

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueLoanError {
    /// 貸出上限（5冊）に達している
    LoanLimitExceeded { active_loans: usize },
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLoanError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 書籍・会員の削除エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    /// 貸出中の貸出から参照されている
    ActiveLoans(usize),
}
