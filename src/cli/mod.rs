pub mod args;
pub mod error;
pub mod handlers;
pub mod types;

pub use args::Cli;
pub use error::CliError;
pub use handlers::execute;
