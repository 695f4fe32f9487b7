//! # Pdfpress-Oxide service entry point
//!
//! Boots the HTML to PDF gateway: loads configuration from the environment,
//! wires the Chrome endpoint resolver and the rendering pipeline into the
//! HTTP server, and runs until a shutdown signal arrives.
//!
//! ## Environment variables
//! - `ADDR`: listen address (default: 0.0.0.0:8080)
//! - `CHROME_ENDPOINT`: Chrome DevTools HTTP endpoint (default: http://127.0.0.1:9222)
//! - `CHROME_WS`: explicit DevTools websocket URL, skips discovery (default: unset)
//! - `REQUEST_TIMEOUT`: per-request deadline (default: 30s)
//! - `MAX_BODY_BYTES`: HTML body size cap (default: 5 MiB)
//! - `PDF_WAIT`: settle delay before printing (default: 0)
//! - `RUST_LOG`: log level (default: info)

use pdfpress_oxide::chrome::ChromeResolver;
use pdfpress_oxide::config::Config;
use pdfpress_oxide::http::{self, AppState};
use pdfpress_oxide::pdf::ChromePdfRenderer;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Pdfpress-Oxide v{}", pdfpress_oxide::VERSION);

    let config = Config::from_env()?;
    info!(
        "configuration loaded: addr={}, chrome_endpoint={}, request_timeout={:?}",
        config.addr, config.chrome_endpoint, config.request_timeout
    );

    let resolver = Arc::new(ChromeResolver::new(&config));
    let renderer = Arc::new(ChromePdfRenderer);

    let addr = config.addr.clone();
    let state = AppState {
        config: Arc::new(config),
        resolver,
        renderer,
    };

    http::run(&addr, state).await?;

    Ok(())
}
