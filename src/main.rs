use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dataroom_diligence::{
    cli::{execute_command, Cli, Commands},
    config::{Config, LogFormat},
    index::SqliteIndex,
    langbase::LangbaseClient,
    server::{AppState, McpServer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?command,
        "Dataroom diligence starting..."
    );

    // Initialize retrieval index
    let index = match SqliteIndex::new(&config.database).await {
        Ok(i) => {
            info!(path = %config.database.path.display(), "Index database initialized");
            i
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize index database");
            return Err(e.into());
        }
    };

    // Initialize Langbase client
    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    // Ensure required pipes exist (create if needed)
    if command.needs_generation() {
        info!("Ensuring required Langbase pipes exist...");
        if let Err(e) = langbase.ensure_pipes(&config.pipes, &config.model).await {
            error!(error = %e, "Failed to ensure pipes exist");
            return Err(e.into());
        }
    }

    let state = Arc::new(AppState::new(config, index, Arc::new(langbase))?);

    if command != Commands::Serve {
        let result = execute_command(command, &state).await;
        if result.exit_code == 0 {
            print!("{}", result.message);
        } else {
            eprintln!("{}", result.message);
        }
        std::process::exit(result.exit_code);
    }

    let server = McpServer::new(state);

    info!("Server ready, waiting for requests on stdin...");

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
