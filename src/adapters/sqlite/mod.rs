pub mod catalog_store;
mod rows;

use crate::ports::catalog_store::StoreError;

// パブリックに型を再エクスポート
pub use catalog_store::CatalogStore as SqliteCatalogStore;

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(Box::new(err))
    }
}
