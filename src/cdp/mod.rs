//! CDP (Chrome DevTools Protocol) layer
//!
//! A request/response client over the WebSocket transport plus the target
//! session lifecycle helpers the rendering pipeline drives.

pub mod client;
pub mod session;
pub mod types;

pub use client::CdpClient;
pub use session::{close_target, is_page_endpoint, TargetSession, TARGET_CLOSE_TIMEOUT};
