use std::sync::Arc;

use anyhow::Context;
use chat_feedback_dash::api::dashboard_routes;
use chat_feedback_dash::cache::ResultCache;
use chat_feedback_dash::config::DashboardConfig;
use chat_feedback_dash::dashboard::Dashboard;
use chat_feedback_dash::store::{DocumentStore, LibSqlDocumentStore};
use tracing_subscriber::EnvFilter;

const LOG_FILE_PREFIX: &str = "feedback-dash.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = DashboardConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // Initialize tracing; the guard flushes the file writer on exit.
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _log_guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .init();
            None
        }
    };

    eprintln!("📊 Feedback Dashboard v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Store: {}", config.store.uri);
    eprintln!("   Database: {}", config.store.database);
    eprintln!("   API: http://0.0.0.0:{}/api/feedback", config.port);

    // ── Store ───────────────────────────────────────────────────────────
    let store = Arc::new(LibSqlDocumentStore::new(config.store.clone()));
    // An unreachable store is not fatal: every request retries the connection.
    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, "Store not reachable at startup");
        eprintln!("   Warning: store not reachable yet ({})", e);
    }

    // ── Server ──────────────────────────────────────────────────────────
    let dashboard = Dashboard::new(store, ResultCache::new());
    let app = dashboard_routes(dashboard);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind dashboard port {}", config.port))?;
    tracing::info!(port = config.port, "Dashboard server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("Dashboard server failed")?;

    Ok(())
}
