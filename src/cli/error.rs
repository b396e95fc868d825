use crate::application::catalog::{CatalogApplicationError, ErrorKind};
use thiserror::Error;

use super::types::ErrorResponse;

/// 入力が拒否された場合の終了コード
pub const EXIT_REJECTED: u8 = 2;

/// ストアの障害など、システム側の失敗の終了コード
pub const EXIT_FAILURE: u8 = 1;

/// CLI層のエラー型
///
/// アプリケーション層のエラーをラップし、終了コードと表示へのマッピングを提供する。
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Application(#[from] CatalogApplicationError),

    #[error("Failed to render output")]
    Render(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            // ビジネスルール違反・入力誤り
            CliError::Application(err) if err.kind() != ErrorKind::Store => EXIT_REJECTED,
            // システム障害
            CliError::Application(_) | CliError::Render(_) => EXIT_FAILURE,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            CliError::Application(err) => ErrorResponse::new(err.kind(), err.to_string()),
            CliError::Render(err) => ErrorResponse::new(ErrorKind::Store, err.to_string()),
        }
    }

    /// エラー出力用の文字列
    ///
    /// ストアの障害は原因まで含める。
    pub fn render(&self, json: bool) -> String {
        let response = self.to_response();
        if json {
            return serde_json::to_string(&response).unwrap_or_else(|_| response.error.clone());
        }

        let mut message = format!("error: {}", response.error);
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        message
    }
}
