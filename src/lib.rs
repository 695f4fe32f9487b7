//! Pdfpress-Oxide: HTML to PDF rendering gateway
//!
//! This library exposes an HTTP service that converts an HTML document into a
//! PDF by driving a long-running headless Chromium over the Chrome DevTools
//! Protocol. The CDP channel rides on a handwritten RFC 6455 client-side
//! WebSocket transport established over plain TCP or TLS.

pub mod config;
pub mod deadline;
pub mod error;

pub mod cdp;
pub mod chrome;
pub mod http;
pub mod pdf;
pub mod ws;

// Re-exports
pub use error::{Error, Result};

/// Pdfpress-Oxide library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
