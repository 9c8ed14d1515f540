use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankrot_core::{
    load_config, validate_config, ApiLotSource, Config, Dispatcher, DocumentRenderer,
    EmailDispatcher, FedresursLotSource, LotPoller, LotSource, PdfRenderer, PollStats, SeenStore,
    SourceBackend, TelegramDispatcher, TrackedEntity,
};
use bankrot_server::{create_router, AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cycles run by `--test` before shutting down.
const TEST_MODE_CYCLES: u32 = 2;

/// Watches the bankruptcy register for new auction lots of tracked trustees.
#[derive(Debug, Parser)]
#[command(name = "bankrot-watch", version)]
struct Cli {
    /// Configuration file (TOML). Defaults to ./config.toml when present.
    #[arg(long, env = "BANKROT_CONFIG")]
    config: Option<PathBuf>,

    /// Run two poll cycles, then shut down.
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // .env may carry RUST_LOG, so load it before logging starts
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!("Loaded environment from {:?}", path);
    }

    let cli = Cli::parse();
    info!("Starting bankrot-watch {}", VERSION);

    // Load configuration
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.test {
        info!("Test mode: running {} cycles", TEST_MODE_CYCLES);
        config.poller.max_cycles = Some(TEST_MODE_CYCLES);
    }

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    let entities: Vec<TrackedEntity> = config
        .tracking
        .trustees
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(TrackedEntity::new)
        .collect();
    info!("Tracking {} trustees", entities.len());

    let (stop_tx, stop_rx) = watch::channel(false);
    let (finished_tx, finished_rx) = watch::channel(false);

    // Create the poller if a lot source is configured
    let (stats, poll_handle) = match create_source(&config)? {
        Some(source) => {
            let poller = create_poller(&config, entities, source).await?;
            let stats = poller.stats();
            let handle = tokio::spawn(async move {
                poller.run(stop_rx).await;
                let _ = finished_tx.send(true);
            });
            (stats, Some(handle))
        }
        None => {
            warn!("Lot source disabled, serving status endpoints only");
            (Arc::new(PollStats::inactive(entities.len())), None)
        }
    };

    let state = Arc::new(AppState::new(config.clone(), stats, poll_handle.is_some()));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server until a signal arrives or the poll loop finishes on its own
    let polling = poll_handle.is_some();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => info!("Shutdown signal received"),
                _ = poll_finished(finished_rx, polling) => info!("Poll loop finished"),
            }
            let _ = stop_tx.send(true);
        })
        .await
        .context("Server error")?;

    if let Some(handle) = poll_handle {
        if let Err(e) = handle.await {
            error!("Poll loop task failed: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Build the configured lot source, or `None` for endpoint-only mode.
fn create_source(config: &Config) -> Result<Option<Arc<dyn LotSource>>> {
    let source_config = &config.source;
    if source_config.backend == SourceBackend::Disabled {
        return Ok(None);
    }
    let min_date = config.tracking.min_publish_date;

    let api = match &source_config.api {
        Some(api_config) if !api_config.token.is_empty() => Some(Arc::new(
            ApiLotSource::new(api_config.clone(), min_date)
                .context("Failed to create API client")?,
        )),
        _ => None,
    };

    let source: Arc<dyn LotSource> = match source_config.backend {
        SourceBackend::Api => {
            let api = api.context("API backend selected but no source.api token provided")?;
            info!("Using bankruptcy data API at {}", api_url(source_config));
            api
        }
        SourceBackend::Fedresurs => {
            let mut scraper =
                FedresursLotSource::new(source_config.fedresurs.clone(), min_date)
                    .context("Failed to create fedresurs client")?;
            info!(
                "Using fedresurs trade listing at {}",
                source_config.fedresurs.base_url
            );
            if let Some(api) = api {
                info!("Partial lots resolved via {}", api_url(source_config));
                scraper = scraper.with_detail_source(api);
            }
            Arc::new(scraper)
        }
        SourceBackend::Disabled => return Ok(None),
    };

    Ok(Some(source))
}

fn api_url(source_config: &bankrot_core::config::SourceConfig) -> &str {
    source_config
        .api
        .as_ref()
        .map(|api| api.url.as_str())
        .unwrap_or_default()
}

/// Build the poll loop with whichever delivery channels are configured.
async fn create_poller(
    config: &Config,
    entities: Vec<TrackedEntity>,
    source: Arc<dyn LotSource>,
) -> Result<LotPoller> {
    let renderer: Arc<dyn DocumentRenderer> = Arc::new(PdfRenderer::new(
        config.document.clone(),
        config.applicant.clone(),
    ));
    let store = SeenStore::new(&config.poller.seen_file);
    info!("Seen-set file: {:?}", store.path());

    let mut poller =
        LotPoller::new(config.poller.clone(), entities, source, renderer, store).await;

    match config.telegram.as_ref().filter(|t| t.is_configured()) {
        Some(telegram) => {
            let chat: Arc<dyn Dispatcher> = Arc::new(
                TelegramDispatcher::new(telegram.clone())
                    .context("Failed to create Telegram client")?,
            );
            info!("Telegram notifications enabled");
            poller = poller.with_chat(chat);
        }
        None => warn!("Telegram not configured, chat notifications disabled"),
    }

    match config.email.as_ref().filter(|e| e.is_configured()) {
        Some(email) => {
            let mail: Arc<dyn Dispatcher> = Arc::new(
                EmailDispatcher::new(email)
                    .context("Failed to create SMTP transport")?,
            );
            info!("Email delivery enabled via {}:{}", email.smtp_host, email.smtp_port);
            poller = poller.with_mail(mail);
        }
        None => warn!("Email not configured, applications will not be mailed"),
    }

    Ok(poller)
}

/// Resolves when the poll loop has finished; never when there is none.
async fn poll_finished(mut finished: watch::Receiver<bool>, polling: bool) {
    if !polling {
        return std::future::pending().await;
    }
    if finished.wait_for(|done| *done).await.is_err() {
        // The poll task ended without reporting, e.g. it panicked.
        warn!("Poll loop exited unexpectedly");
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
