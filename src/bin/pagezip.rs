//! HTTP server binary for pagezip.
//!
//! A thin shim over the library crate: load settings, install logging,
//! bind pdfium once, serve until SIGINT/SIGTERM. Any startup or shutdown
//! failure exits with status 1.

use anyhow::{Context, Result};
use clap::Parser;
use pagezip::engine::{EngineRuntime, RasterEngine};
use pagezip::server::{self, AppState};
use pagezip::settings::{self, Cli};
use pagezip::telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Settings & logging ───────────────────────────────────────────────
    let settings = settings::load(&cli).context("Failed to load settings")?;
    telemetry::init(&settings).context("Failed to install tracing subscriber")?;
    info!("pagezip {} starting", pagezip::VERSION);

    // ── Engine runtime ───────────────────────────────────────────────────
    // Initialised once here, terminated when the last Arc drops at exit.
    let runtime = EngineRuntime::initialize(settings.pdfium_library.as_deref())
        .context("Failed to initialise rasterization engine")?;
    let engine: Arc<dyn RasterEngine> = Arc::new(runtime);

    // ── Serve ────────────────────────────────────────────────────────────
    let app = server::build_app(AppState::new(engine, settings.max_body_bytes));
    let listener = TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("Failed to bind {}", settings.listen))?;

    server::serve(
        listener,
        app,
        settings.shutdown_grace,
        server::shutdown_signal(),
    )
    .await
    .context("Server shutdown failed")?;

    info!("pagezip stopped");
    Ok(())
}
