//! Chrome DevTools endpoint resolution
//!
//! Produces a usable DevTools websocket URL. An explicit override always
//! wins; otherwise the URL is discovered via `GET <endpoint>/json/version`
//! and cached with a bounded TTL so each render does not re-probe Chrome.

use crate::cdp::CdpClient;
use crate::config::Config;
use crate::deadline::Deadline;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Client timeout for the `/json/version` probe.
pub const CHROME_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a discovered websocket URL stays usable without re-probing.
const WS_CACHE_TTL: Duration = Duration::from_secs(60);

/// Resolves the DevTools websocket URL for rendering and health checks.
#[async_trait]
pub trait WsResolver: Send + Sync {
    /// Return a usable DevTools websocket URL.
    async fn ws_url(&self, deadline: Deadline) -> Result<String>;

    /// Verify Chromium is reachable without relying on cached state.
    async fn check_chrome(&self, deadline: Deadline) -> Result<()> {
        self.ws_url(deadline).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl", default)]
    web_socket_debugger_url: String,
}

#[derive(Debug, Clone)]
struct CachedWs {
    url: String,
    fetched_at: Instant,
}

/// Discovery-backed resolver with an explicit-override fast path.
#[derive(Debug)]
pub struct ChromeResolver {
    endpoint: String,
    ws_override: Option<String>,
    http: reqwest::Client,
    cache: Mutex<Option<CachedWs>>,
    ttl: Duration,
}

impl ChromeResolver {
    pub fn new(config: &Config) -> Self {
        Self::with_ttl(config, WS_CACHE_TTL)
    }

    /// Resolver with a custom cache TTL; tests use a zero TTL to force
    /// rediscovery.
    pub fn with_ttl(config: &Config, ttl: Duration) -> Self {
        Self {
            endpoint: config.chrome_endpoint.clone(),
            ws_override: config.chrome_ws.clone(),
            http: reqwest::Client::new(),
            cache: Mutex::new(None),
            ttl,
        }
    }

    /// Discover the websocket URL via `/json/version`. Does not touch the
    /// cache; failures must leave existing cache contents intact.
    async fn discover(&self, deadline: Deadline) -> Result<String> {
        let url = format!("{}/json/version", self.endpoint);

        let response = deadline
            .bound(async {
                Ok(self
                    .http
                    .get(&url)
                    .timeout(CHROME_PROBE_TIMEOUT)
                    .send()
                    .await?)
            })
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::chrome(format!("unexpected chrome status: {status}")));
        }

        let payload: VersionInfo = deadline
            .bound(async { Ok(response.json().await?) })
            .await?;
        if payload.web_socket_debugger_url.is_empty() {
            return Err(Error::chrome("missing websocket debugger url"));
        }

        Ok(payload.web_socket_debugger_url)
    }

    /// Return the cached URL while strictly younger than the TTL.
    async fn cached_ws(&self) -> Option<String> {
        let cache = self.cache.lock().await;
        cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.url.clone())
    }

    async fn store_ws(&self, url: &str) {
        let mut cache = self.cache.lock().await;
        *cache = Some(CachedWs {
            url: url.to_string(),
            fetched_at: Instant::now(),
        });
    }
}

#[async_trait]
impl WsResolver for ChromeResolver {
    async fn ws_url(&self, deadline: Deadline) -> Result<String> {
        // Explicit override always wins.
        if let Some(ws) = &self.ws_override {
            return Ok(ws.clone());
        }

        if let Some(ws) = self.cached_ws().await {
            return Ok(ws);
        }

        let ws = self.discover(deadline).await?;
        self.store_ws(&ws).await;
        Ok(ws)
    }

    async fn check_chrome(&self, deadline: Deadline) -> Result<()> {
        if let Some(ws) = &self.ws_override {
            let client = CdpClient::connect(ws, deadline).await?;
            let result: Result<serde_json::Value> = client
                .call(deadline, None, "Browser.getVersion", None)
                .await;
            client.close().await;
            return result.map(|_| ());
        }

        let ws = self.discover(deadline).await?;
        self.store_ws(&ws).await;
        Ok(())
    }
}
