use crate::domain::{BookId, LoanId, MemberId, ValidationError};
use crate::ports::catalog_store::{Entity, StoreError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// エラーの種別
///
/// 表示層が終了コードやメッセージを選ぶために使う。
/// `Store`以外はいずれも入力の修正が必要な前提条件の不成立で、再試行しても成功しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidInput,
    DuplicateKey,
    NotFound,
    Conflict,
    Unavailable,
    LimitExceeded,
    AlreadyReturned,
    Store,
}

/// 蔵書管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CatalogApplicationError {
    /// 必須項目の欠落、1未満の冊数
    #[error("Invalid input: {0}")]
    InvalidInput(ValidationError),

    /// ISBN・メールアドレスの重複
    #[error("Duplicate {field}: '{value}' is already registered")]
    DuplicateKey { field: &'static str, value: String },

    /// 指定したIDのレコードが存在しない
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: Uuid },

    /// 貸出中の貸出から参照されているため削除できない
    #[error("Cannot delete {entity} {id}: referenced by {active_loans} active loan(s)")]
    Conflict {
        entity: Entity,
        id: Uuid,
        active_loans: usize,
    },

    /// 貸出可能な冊数がない
    #[error("Book {0} is not available for loan")]
    Unavailable(BookId),

    /// 貸出上限（5冊）に達している
    #[error("Loan limit exceeded (max 5 books): member {member_id} has {active_loans} active loans")]
    LimitExceeded {
        member_id: MemberId,
        active_loans: usize,
    },

    /// 返却済みの貸出を再度返却しようとした
    #[error("Loan {0} has already been returned")]
    AlreadyReturned(LoanId),

    /// ストアの障害
    #[error("Catalog store error")]
    StoreError(#[source] StoreError),
}

impl CatalogApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogApplicationError::InvalidInput(_) => ErrorKind::InvalidInput,
            CatalogApplicationError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            CatalogApplicationError::NotFound { .. } => ErrorKind::NotFound,
            CatalogApplicationError::Conflict { .. } => ErrorKind::Conflict,
            CatalogApplicationError::Unavailable(_) => ErrorKind::Unavailable,
            CatalogApplicationError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            CatalogApplicationError::AlreadyReturned(_) => ErrorKind::AlreadyReturned,
            CatalogApplicationError::StoreError(_) => ErrorKind::Store,
        }
    }
}

impl From<ValidationError> for CatalogApplicationError {
    fn from(err: ValidationError) -> Self {
        CatalogApplicationError::InvalidInput(err)
    }
}

impl From<StoreError> for CatalogApplicationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CatalogApplicationError::NotFound { entity, id },
            StoreError::DuplicateKey { field, value } => {
                CatalogApplicationError::DuplicateKey { field, value }
            }
            StoreError::Conflict {
                entity,
                id,
                active_loans,
            } => CatalogApplicationError::Conflict {
                entity,
                id,
                active_loans,
            },
            StoreError::Unavailable(book_id) => CatalogApplicationError::Unavailable(book_id),
            StoreError::LimitExceeded {
                member_id,
                active_loans,
            } => CatalogApplicationError::LimitExceeded {
                member_id,
                active_loans,
            },
            StoreError::AlreadyReturned(loan_id) => CatalogApplicationError::AlreadyReturned(loan_id),
            err @ (StoreError::Corrupted(_) | StoreError::Backend(_)) => {
                CatalogApplicationError::StoreError(err)
            }
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CatalogApplicationError>;
