//! Quill: edit the Markdown files in a directory from your browser.
//!
//! This is the main entry point for the `quill` binary. It parses arguments,
//! loads configuration, and runs the HTTP server until Ctrl-C.

use anyhow::{Context, Result};
use quill::cli::Cli;
use quill::config::Config;
use quill::{exit_codes, logging, server};
use std::process::ExitCode;
use tokio::net::TcpListener;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = logging::init_logging() {
        eprintln!("Warning: {}", err);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {:#}", err);
            return ExitCode::from(exit_codes::USER_ERROR as u8);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to start async runtime: {}", err);
            return ExitCode::from(exit_codes::SERVER_FAILURE as u8);
        }
    };

    match runtime.block_on(run(&cli, config)) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            tracing::error!(error = %format!("{:#}", err), "server stopped");
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_codes::SERVER_FAILURE as u8)
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.config_path();
    let config = if cli.config.is_some() {
        Config::load(&path)
    } else {
        Config::load_or_default(&path)
    }
    .with_context(|| format!("failed to load {}", path.display()))?;

    Ok(config.apply_overrides(cli.overrides())?)
}

async fn run(cli: &Cli, config: Config) -> Result<()> {
    let state = server::AppState::from_config(&cli.root, &config)
        .with_context(|| format!("failed to prepare {}", cli.root.display()))?;

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.addr))?;
    let local = listener.local_addr().context("failed to read listen address")?;
    tracing::info!("serving on http://{}", local);

    server::serve(listener, state).await.context("server error")?;
    Ok(())
}
