//! CDP client
//!
//! Layers an id-correlated request/response protocol over one WebSocket
//! connection. A single mutex serializes whole call exchanges, so at most one
//! request is in flight per connection and responses are unambiguous; each
//! rendering request opens its own client rather than sharing one.

use crate::cdp::types::{CdpRequest, CdpResponse};
use crate::deadline::Deadline;
use crate::ws::{self, MaybeTlsStream, WsStream};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A CDP client bound to one WebSocket connection
#[derive(Debug)]
pub struct CdpClient<S = MaybeTlsStream> {
    /// Serializes call exchanges; the holder owns the wire until its
    /// response arrives
    stream: Mutex<WsStream<S>>,
    /// Monotonic id counter; ids start at 1
    next_id: AtomicU64,
}

impl CdpClient {
    /// Open a WebSocket to `ws_url` and wrap it in a client.
    pub async fn connect(ws_url: &str, deadline: Deadline) -> Result<Self> {
        let stream = ws::connect(ws_url, deadline).await?;
        Ok(Self::from_stream(stream))
    }
}

impl<S> CdpClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an established WebSocket stream.
    pub fn from_stream(stream: WsStream<S>) -> Self {
        Self {
            stream: Mutex::new(stream),
            next_id: AtomicU64::new(0),
        }
    }

    /// Send one CDP command and block until its response arrives.
    ///
    /// Messages that are not the matching response (events decode with id 0,
    /// and any other id cannot belong to an in-flight call while the mutex is
    /// held) are discarded. A response carrying an `error` object becomes
    /// `Error::CdpProtocol`; a non-empty `result` is deserialized into `R`,
    /// and an absent one yields `R::default()`.
    pub async fn call<R>(
        &self,
        deadline: Deadline,
        session_id: Option<&str>,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<R>
    where
        R: DeserializeOwned + Default,
    {
        let mut stream = self.stream.lock().await;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(str::to_string),
        };
        let payload = serde_json::to_vec(&request)?;

        deadline.bound(stream.write_text_message(&payload)).await?;

        loop {
            let message = deadline.bound(stream.read_message()).await?;
            let response: CdpResponse = serde_json::from_slice(&message)?;

            if response.id != id {
                continue;
            }
            if let Some(error) = response.error {
                return Err(Error::cdp_protocol(method, error.code, error.message));
            }
            return match response.result {
                Some(result) if !result.is_null() => Ok(serde_json::from_value(result)?),
                _ => Ok(R::default()),
            };
        }
    }

    /// Send a best-effort close frame and give up the connection.
    pub async fn close(&self) {
        let mut stream = self.stream.lock().await;
        let _ = Deadline::after(CLOSE_TIMEOUT).bound(stream.close()).await;
    }
}
