mod audit;
mod hub;
mod problem;
mod router;
mod state;
mod telemetry;
mod ui;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use favlens_browser::bookmarks::{BookmarkSource, ChromeBookmarkFile, SampleBookmarks};
use favlens_browser::sim::SimBrowser;
use favlens_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let browser = if config.environment.is_development() {
        SimBrowser::sample()
    } else {
        SimBrowser::new()
    };
    let bookmarks: Arc<dyn BookmarkSource> = match &config.bookmarks_file {
        Some(path) => Arc::new(ChromeBookmarkFile::new(path)),
        None => Arc::new(SampleBookmarks),
    };

    let hub = hub::AuditHub::new();
    let state = state::AppState::new(metrics, hub, browser, bookmarks, config.audit.clone());

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
