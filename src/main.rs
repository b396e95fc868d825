use clap::Parser;
use library_catalog::{
    adapters::{SystemClock, sqlite::SqliteCatalogStore},
    application::catalog::ServiceDependencies,
    cli::{self, Cli, CliError},
    config::AppConfig,
    ports::CatalogStore,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::from_env().with_database_path(cli.database.clone());

    // Initialize tracing (stdout carries command output, logs go to stderr)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(database = %config.database_path.display(), "opening catalog");

    let store = match SqliteCatalogStore::connect(&config.database_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, database = %config.database_path.display(), "failed to open catalog");
            eprintln!(
                "error: cannot open catalog at {}: {e}",
                config.database_path.display()
            );
            return ExitCode::from(cli::error::EXIT_FAILURE);
        }
    };

    let service_deps = ServiceDependencies {
        store: store.clone(),
        clock: Arc::new(SystemClock),
    };

    let result = cli::execute(&service_deps, cli.command).await;
    store.close().await;

    match result.and_then(|output| output.render(cli.json).map_err(CliError::from)) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.render(cli.json));
            ExitCode::from(err.exit_code())
        }
    }
}
