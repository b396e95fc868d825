pub mod clock;
pub mod memory;
pub mod mock;
pub mod sqlite;

pub use clock::SystemClock;
