//! Configuration management for Pdfpress-Oxide

use crate::{Error, Result};
use std::env;
use std::time::Duration;

/// Macro for parsing environment variables with type safety and consistent error handling
macro_rules! parse_env_var {
    ($config:ident, $field:ident, $env_var:expr, $ty:ty) => {
        if let Ok(value) = env::var($env_var) {
            if !value.is_empty() {
                $config.$field = value
                    .parse::<$ty>()
                    .map_err(|_| Error::configuration(concat!("invalid ", $env_var)))?;
            }
        }
    };

    ($config:ident, $field:ident, $env_var:expr) => {
        if let Ok(value) = env::var($env_var) {
            if !value.is_empty() {
                $config.$field = value;
            }
        }
    };

    (opt $config:ident, $field:ident, $env_var:expr) => {
        if let Ok(value) = env::var($env_var) {
            if !value.is_empty() {
                $config.$field = Some(value);
            }
        }
    };

    (duration $config:ident, $field:ident, $env_var:expr) => {
        if let Ok(value) = env::var($env_var) {
            if !value.is_empty() {
                $config.$field = humantime::parse_duration(&value)
                    .map_err(|_| Error::configuration(concat!("invalid ", $env_var)))?;
            }
        }
    };
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to listen on
    pub addr: String,

    /// Chrome DevTools HTTP endpoint used for websocket discovery
    pub chrome_endpoint: String,

    /// Explicit Chrome DevTools websocket URL; bypasses discovery when set
    pub chrome_ws: Option<String>,

    /// Per-request timeout covering discovery and rendering
    pub request_timeout: Duration,

    /// Maximum accepted HTML body size in bytes
    pub max_body_bytes: usize,

    /// Settle delay between body readiness and PDF capture
    pub pdf_wait: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            chrome_endpoint: "http://127.0.0.1:9222".to_string(),
            chrome_ws: None,
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 5 * 1024 * 1024,
            pdf_wait: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        parse_env_var!(config, addr, "ADDR");
        parse_env_var!(config, chrome_endpoint, "CHROME_ENDPOINT");
        parse_env_var!(opt config, chrome_ws, "CHROME_WS");
        parse_env_var!(duration config, request_timeout, "REQUEST_TIMEOUT");
        parse_env_var!(config, max_body_bytes, "MAX_BODY_BYTES", usize);
        parse_env_var!(duration config, pdf_wait, "PDF_WAIT");

        Ok(config)
    }
}
