//! Replica CLI and HTTP/WebSocket server entry point.
//!
//! Binary name: `replica`
//!
//! Parses CLI arguments, loads configuration, initializes tracing, then
//! dispatches to the command handler or starts the server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;

use replica_infra::config::{load_config, resolve_api_key, resolve_config_path};
use replica_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::render::RenderOptions;
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; the API key may come from the real environment.
    let dotenv = dotenvy::dotenv();

    let config_path = resolve_config_path(cli.config.as_deref());
    let config = load_config(config_path.as_deref()).await;

    init_tracing(&TracingOptions {
        verbosity: cli.verbose,
        json: config.telemetry.json_logs,
        otel_stdout: config.telemetry.otel_stdout,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    if let Ok(path) = &dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    match &config_path {
        Some(path) => tracing::debug!(path = %path.display(), "using config file"),
        None => tracing::debug!("no config file, using defaults"),
    }

    let result = run(cli, config).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, config: replica_types::config::ReplicaConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Files { path } => {
            let store = state::artifact_store(&config);
            cli::files::show_files(&store, path.as_deref(), cli.json).await?;
        }

        Commands::Clone { url, tokens } => {
            let api_key = resolve_api_key(&config.llm);
            let state = AppState::init(config, api_key)?;
            let options = RenderOptions {
                json: cli.json,
                show_tokens: tokens,
            };
            cli::pipeline::clone_page(&state, &url, options).await?;
        }

        Commands::Modify { prompt, tokens } => {
            let api_key = resolve_api_key(&config.llm);
            let state = AppState::init(config, api_key)?;
            let options = RenderOptions {
                json: cli.json,
                show_tokens: tokens,
            };
            cli::pipeline::modify_page(&state, &prompt, options).await?;
        }

        Commands::Serve { port, host } => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }

            let api_key = resolve_api_key(&config.llm);
            let state = AppState::init(config, api_key)?;

            let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("cannot bind {addr}"))?;

            println!(
                "  {} Replica listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {} {}",
                console::style("Preview:").dim(),
                console::style(format!("http://{addr}{}/", state.config.output.preview_mount()))
                .cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
