use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use almanac::api::{create_router, AppState};
use almanac::chart::chart_provider_from_config;
use almanac::clock::{Clock, SystemClock};
use almanac::config::Config;
use almanac::db::{Database, DatabaseBackend, LibSqlBackend};
use almanac::interpretation::{InterpretationGenerator, LlmGenerator};
use almanac::llm::LlmProvider;

#[derive(Parser)]
#[command(name = "almanac")]
#[command(about = "Solar return calendar with cached event interpretations")]
struct Args {
    /// Remove expired interpretations once before serving
    #[arg(long)]
    sweep_on_start: bool,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "almanac=info,tower_http=debug".into());

    let fmt_layer = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt::layer().json().boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    if config.server.api_keys.is_empty() {
        tracing::warn!("ALMANAC_API_KEYS is not set; protected routes will answer 401");
    }

    tracing::info!("Initializing database...");
    let raw_db = Database::new(&config.database).await?;
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if let Some(llm_config) = &config.llm {
        tracing::info!(model = %llm_config.model, "Initializing LLM provider...");
    }
    let llm = LlmProvider::new(config.llm.as_ref(), clock.clone());
    if !llm.is_available() {
        tracing::warn!("LLM unavailable; every interpretation will use fallback content");
    }
    let generator: Arc<dyn InterpretationGenerator> = Arc::new(LlmGenerator::new(llm.clone()));

    let chart = chart_provider_from_config(&config.chart)?;

    let state = AppState::new(config.clone(), db, chart, generator, llm, clock);

    if args.sweep_on_start {
        let deleted = state.sweeper.run_once().await?;
        tracing::info!(deleted, "Startup sweep finished");
    }

    let cancel_token = CancellationToken::new();

    tracing::info!(
        interval_secs = state.sweeper.interval_secs(),
        "Starting interpretation sweeper..."
    );
    let sweeper = state.sweeper.clone();
    let token = cancel_token.child_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Interpretation sweeper shutting down...");
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(sweeper.interval_secs())) => {
                    if let Err(e) = sweeper.run_once().await {
                        tracing::error!(error = %e, "Interpretation sweep failed");
                    }
                }
            }
        }
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Almanac starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, cancelling background tasks...");
    cancel_token.cancel();
}
