pub mod catalog_store;
pub mod clock;

pub use catalog_store::*;
pub use clock::*;
