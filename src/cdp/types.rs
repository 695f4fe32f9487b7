//! CDP (Chrome DevTools Protocol) wire types

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID, unique per connection and never zero
    pub id: u64,
    /// Method name (e.g., "Page.printToPDF")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Session ID for flattened target sessions
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// CDP JSON-RPC response
///
/// Unsolicited events decode with `id == 0` and are discarded by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpResponse {
    /// Response ID (matches a prior request ID; zero for events)
    #[serde(default)]
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i64,
    /// Error message
    pub message: String,
}
