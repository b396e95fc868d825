use std::path::PathBuf;

/// データベースファイルのパスを指定する環境変数
pub const DATABASE_PATH_ENV: &str = "LIBRARY_DB";

/// ログフィルタを指定する環境変数（RUST_LOGが優先）
pub const LOG_FILTER_ENV: &str = "LIBRARY_LOG";

pub const DEFAULT_DATABASE_PATH: &str = "library.db";

pub const DEFAULT_LOG_FILTER: &str = "library_catalog=info";

/// アプリケーション設定
///
/// 貸出期間（14日）と貸出上限（5冊）はドメインの定数で、設定では変更できない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub log_filter: String,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var(DATABASE_PATH_ENV).ok(),
            std::env::var(LOG_FILTER_ENV).ok(),
        )
    }

    /// 値が未設定（または空）の項目には既定値を使う
    pub fn resolve(database_path: Option<String>, log_filter: Option<String>) -> Self {
        let database_path = database_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let log_filter = log_filter
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            database_path: PathBuf::from(database_path),
            log_filter,
        }
    }

    /// コマンドラインで指定されたパスで上書きする
    pub fn with_database_path(mut self, database_path: Option<PathBuf>) -> Self {
        if let Some(path) = database_path {
            self.database_path = path;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::resolve(None, None)
    }
}
