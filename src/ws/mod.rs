//! Handwritten RFC 6455 client transport
//!
//! This module owns one TCP (or TLS-wrapped) connection and exchanges
//! complete text messages with a WebSocket server. It performs the HTTP
//! Upgrade handshake itself and handles control frames transparently. Only
//! text messages are supported; the DevTools protocol never sends binary
//! frames on this channel.

pub mod frame;
pub mod handshake;
pub mod stream;

pub use handshake::connect;
pub use stream::{MaybeTlsStream, WsConnection, WsStream};
