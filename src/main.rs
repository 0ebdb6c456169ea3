// Hostswitch - Exclusive host service switcher with resource telemetry
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use hostswitch::api;
use hostswitch::config::Config;
use hostswitch::coordinator::ServiceCoordinator;
use hostswitch::registry::ServiceRegistry;
use hostswitch::systemd::{ConnectionManager, HostUnitController, ProxySites, ServiceController};
use hostswitch::telemetry::{HistoryStore, Monitor, SysinfoSampler};
use hostswitch::version::build_info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hostswitch")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the default configuration to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Show version information
    #[arg(short = 'V', long)]
    version: bool,

    /// Show detailed build information
    #[arg(long)]
    build_info: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", build_info().format_display());
        return Ok(());
    }

    if cli.build_info {
        println!("{}", build_info().format_display());
        println!("\n{}", build_info().format_build_info());
        return Ok(());
    }

    if cli.write_config {
        let path = match cli.config {
            Some(path) => path,
            None => Config::default_path()?,
        };
        Config::default().save(path.clone())?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    init_logging(cli.debug, cli.log_file.as_ref())?;
    tracing::info!("{} starting", build_info().format_detailed());

    let mut config = Config::load(cli.config)?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    serve(config).await
}

fn init_logging(debug: bool, log_file: Option<&PathBuf>) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let registry = Arc::new(ServiceRegistry::from_config(&config.services)?);
    tracing::info!("Registered {} services", registry.len());

    let systemd = ServiceController::connect(&ConnectionManager::default()).await?;
    let proxy = ProxySites::new(&config.proxy, config.command_timeout());
    let controller = Arc::new(HostUnitController::new(systemd, proxy, config.command_timeout()));
    let sampler = Arc::new(SysinfoSampler::default());
    let history = Arc::new(HistoryStore::new(config.history_size));

    let monitor = Monitor::new(
        registry.clone(),
        controller.clone(),
        sampler.clone(),
        history.clone(),
        config.monitor_interval(),
    )
    .spawn();

    let coordinator = Arc::new(ServiceCoordinator::new(registry, controller, sampler, history));
    let app = api::router(coordinator);

    let listener = tokio::net::TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    tracing::info!("Listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitor.abort();
    tracing::info!("Hostswitch stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
