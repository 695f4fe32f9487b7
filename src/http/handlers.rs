//! HTTP handlers for the rendering and liveness endpoints

use crate::chrome::{WsResolver, CHROME_PROBE_TIMEOUT};
use crate::config::Config;
use crate::deadline::Deadline;
use crate::pdf::{PdfOptions, PdfRenderer, RenderedPdf};
use crate::{Error, Result};
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Shared state wired into the router
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<dyn WsResolver>,
    pub renderer: Arc<dyn PdfRenderer>,
}

/// Print duration attached to successful PDF responses for the access log.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PdfTiming(pub Duration);

/// `POST /api/v1/pdf`: body is raw HTML, query parameters carry render
/// options, the configured request timeout bounds discovery and rendering.
pub async fn render_pdf_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        return plain_error(StatusCode::BAD_REQUEST, "empty html");
    }

    let options = match parse_options(query.as_deref().unwrap_or("")) {
        Ok(options) => options,
        Err(err) => return plain_error(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    let deadline = Deadline::after(state.config.request_timeout);

    let ws_url = match state.resolver.ws_url(deadline).await {
        Ok(ws_url) => ws_url,
        Err(err) => {
            warn!(error = %err, "chrome ws error");
            return plain_error(StatusCode::SERVICE_UNAVAILABLE, "chrome unavailable");
        }
    };

    let html = String::from_utf8_lossy(&body);
    match state
        .renderer
        .render(deadline, &ws_url, &html, state.config.pdf_wait, &options)
        .await
    {
        Ok(rendered) => pdf_response(rendered),
        Err(err) => {
            error!(error = %err, "render error");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, "render failed")
        }
    }
}

/// `GET /healthz`: verify Chromium is reachable.
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let deadline = Deadline::after(CHROME_PROBE_TIMEOUT);
    match state.resolver.check_chrome(deadline).await {
        Ok(()) => (StatusCode::OK, "ok").into_response(),
        Err(err) => {
            warn!(error = %err, "chrome health check failed");
            plain_error(StatusCode::SERVICE_UNAVAILABLE, "chrome unavailable")
        }
    }
}

fn pdf_response(rendered: RenderedPdf) -> Response {
    let mut response = (
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"document.pdf\"",
            ),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        rendered.bytes,
    )
        .into_response();
    response
        .extensions_mut()
        .insert(PdfTiming(rendered.print_elapsed));
    response
}

fn plain_error(status: StatusCode, message: &str) -> Response {
    (status, message.to_string()).into_response()
}

/// Parse render options from the raw query string.
///
/// All-or-nothing: the first malformed field fails the whole parse with an
/// `invalid <field>` error. Empty values count as absent.
pub fn parse_options(query: &str) -> Result<PdfOptions> {
    let mut values: HashMap<String, String> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        values.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }

    let options = PdfOptions {
        landscape: parse_bool(&values, "landscape")?,
        scale: parse_float(&values, "scale")?,
        paper_width: parse_float(&values, "paper_width")?,
        paper_height: parse_float(&values, "paper_height")?,
        margin_top: parse_float(&values, "margin_top")?,
        margin_bottom: parse_float(&values, "margin_bottom")?,
        margin_left: parse_float(&values, "margin_left")?,
        margin_right: parse_float(&values, "margin_right")?,
        print_background: parse_bool(&values, "print_background")?,
        page_ranges: values
            .get("page_ranges")
            .filter(|value| !value.is_empty())
            .cloned(),
    };

    Ok(options)
}

fn parse_bool(values: &HashMap<String, String>, key: &str) -> Result<Option<bool>> {
    match values.get(key).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<bool>()
            .map(Some)
            .map_err(|_| Error::invalid_option(key)),
    }
}

fn parse_float(values: &HashMap<String, String>, key: &str) -> Result<Option<f64>> {
    match values.get(key).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::invalid_option(key)),
    }
}
