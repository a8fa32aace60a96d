mod app;
mod auth;
mod cli;
mod config;
mod cors;
mod daemon;
mod error;
mod forwarder;
mod handlers;
mod resolver;

use clap::Parser;
use cli::{Cli, Command};
use config::{Config, EnvSource};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        return match command {
            Command::Stop { pid_file } => daemon::stop(&pid_file),
            Command::Status { pid_file } => daemon::status(&pid_file),
        };
    }

    // 必须在创建 tokio 运行时之前 fork
    if cli.daemon {
        daemon::detach(&cli.pid_file, &cli.log_file)?;
    } else {
        eprintln!("✓ Starting router in foreground mode");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env_with_path(cli.config)?;

    if cli.debug {
        config.debug = true;
    }
    if cli.verbose {
        config.verbose = true;
    }
    if cli.expose_errors {
        config.expose_error_details = true;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let log_level = if config.verbose {
        tracing::Level::TRACE
    } else if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("openai_router={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting OpenAI API Router v{}", env!("CARGO_PKG_VERSION"));
    match config.upstream_timeout_secs {
        Some(secs) => tracing::info!("Upstream timeout: {}s", secs),
        None => tracing::info!("Upstream timeout: none"),
    }
    if config.expose_error_details {
        tracing::warn!("Error details are exposed in 500 responses");
    }

    let client = app::upstream_client(&config)?;

    let addr = config.listen_addr();
    let app = app::build_router(Arc::new(config), client, Arc::new(EnvSource));

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("Router ready to accept requests");

    axum::serve(listener, app).await?;

    Ok(())
}
