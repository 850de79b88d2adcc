mod config;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{AppConfig, LoggingConfig};
use moodplay_catalog_client::HttpCatalog;
use moodplay_catalog_server::{AppState, CatalogServer};
use moodplay_core::SongCatalog;
use moodplay_persistence::{init_db, SongRepository};
use moodplay_player::{
    output_channel, OutputKind, PlaybackEngine, SessionCommand, SessionController, SessionHandle,
    SessionRuntime,
};
use repl::ReplAction;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser, Debug)]
#[command(name = "moodplay")]
#[command(about = "Mood-driven music sessions and their song catalog", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "MOODPLAY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the catalog server
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run an interactive listening session in the terminal
    Session {
        /// Catalog service base URL (overrides config)
        #[arg(long)]
        catalog_url: Option<String>,

        /// Play through the local audio device instead of the simulated output
        #[arg(long)]
        rodio: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(&config.logging)?;

    tracing::info!("Starting moodplay v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            run_server(config).await
        }
        Command::Session { catalog_url, rodio } => {
            if let Some(url) = catalog_url {
                config.catalog.base_url = url;
            }
            if rodio {
                config.session.output = OutputKind::Rodio;
            }
            run_session(config).await
        }
    }
}

/// Initialize logging: console always, rolling file when configured
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{},moodplay=debug", config.level).into())
    };

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;

            let appender = tracing_appender::rolling::daily(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let server_config = config.server;

    let addr: SocketAddr = server_config
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", server_config.bind))?;

    // Create parent directory if it doesn't exist
    if let Some(parent) = server_config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!("Database path: {}", server_config.database_path.display());
    let pool = init_db(&server_config.database_path).await?;

    let assets = server_config.assets.build()?;
    let mut state = AppState::new(SongRepository::new(pool), assets);
    state.served_assets = server_config.assets.served_directory();
    state.max_upload_bytes = server_config.max_upload_bytes();

    if let Some(dir) = &state.served_assets {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create asset directory {}", dir.display()))?;
    }

    let mut server = CatalogServer::new(addr, state);
    server.start().await?;

    shutdown_signal().await;
    server.stop().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn run_session(config: AppConfig) -> Result<()> {
    let catalog_client = Arc::new(HttpCatalog::from_config(&config.catalog)?);
    tracing::info!("Catalog service: {}", catalog_client.base_url());

    let starter = if config.session.preload_catalog {
        match catalog_client.all_songs().await {
            Ok(songs) => {
                tracing::info!("Preloaded {} songs", songs.len());
                songs
            }
            Err(e) => {
                tracing::warn!("Could not preload catalog, starting empty: {}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let output = config.session.build_output()?;
    let (events_tx, events_rx) = output_channel();
    let engine = PlaybackEngine::new(output, events_tx, config.session.initial_volume);

    let controller = SessionController::new(
        SongCatalog::new(starter),
        catalog_client,
        engine,
        &config.session,
    );

    let (runtime, handle) = SessionRuntime::new(controller, events_rx);
    let session_task = runtime.spawn();

    println!("{}", repl::HELP);

    tokio::select! {
        result = read_commands(&handle) => result?,
        _ = shutdown_signal() => {}
    }

    handle.shutdown().await.ok();
    session_task.await.context("Session task failed")?;

    tracing::info!("Session ended");
    Ok(())
}

/// Read commands from stdin until `quit` or end of input
async fn read_commands(handle: &SessionHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let action = match repl::parse_line(&line) {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match action {
            ReplAction::Detect(detection) => handle.detect(detection).await?,
            ReplAction::Command(command) => handle.send(command).await?,
            ReplAction::SelectPosition(position) => {
                let snapshot = handle.snapshot();
                match snapshot.queue.get(position - 1) {
                    Some(song) => {
                        handle
                            .send(SessionCommand::Select(song.id.clone()))
                            .await?
                    }
                    None => println!("No song at #{}", position),
                }
            }
            ReplAction::Status => println!("{}", repl::render_status(&handle.snapshot())),
            ReplAction::Queue => println!("{}", repl::render_queue(&handle.snapshot())),
            ReplAction::Help => println!("{}", repl::HELP),
            ReplAction::Quit => break,
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        },
    }
}
