//! HTML to PDF rendering pipeline
//!
//! Drives one Chromium target through the printing sequence: navigate to a
//! blank page, inject the document, wait for the body to exist, optionally
//! let the page settle, then emit the PDF. Each render owns its own CDP
//! client; a created target is closed on every exit path with a detached
//! deadline so a slow print cannot leak tabs.

use crate::cdp::{close_target, is_page_endpoint, CdpClient, TargetSession, TARGET_CLOSE_TIMEOUT};
use crate::deadline::Deadline;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

const BODY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Render options accepted from the HTTP caller.
///
/// Unset fields are not transmitted to Chromium. Numeric values are forwarded
/// unclamped; Chromium rejects absurd ones as protocol errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfOptions {
    pub landscape: Option<bool>,
    pub scale: Option<f64>,
    pub paper_width: Option<f64>,
    pub paper_height: Option<f64>,
    pub margin_top: Option<f64>,
    pub margin_bottom: Option<f64>,
    pub margin_left: Option<f64>,
    pub margin_right: Option<f64>,
    pub print_background: Option<bool>,
    pub page_ranges: Option<String>,
}

/// Wire parameters for `Page.printToPDF`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrintToPdfParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    landscape: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paper_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    paper_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_top: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_bottom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    margin_right: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    print_background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_ranges: Option<String>,
}

fn print_params(options: &PdfOptions) -> PrintToPdfParams {
    let mut params = PrintToPdfParams {
        print_background: Some(true),
        ..Default::default()
    };
    if options.print_background.is_some() {
        params.print_background = options.print_background;
    }
    params.landscape = options.landscape;
    params.scale = options.scale;
    params.paper_width = options.paper_width;
    params.paper_height = options.paper_height;
    params.margin_top = options.margin_top;
    params.margin_bottom = options.margin_bottom;
    params.margin_left = options.margin_left;
    params.margin_right = options.margin_right;
    params.page_ranges = options.page_ranges.clone().filter(|ranges| !ranges.is_empty());
    params
}

/// A finished render: the PDF bytes plus how long `Page.printToPDF` took.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub print_elapsed: Duration,
}

/// Renders HTML into a PDF through a resolved DevTools websocket URL.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(
        &self,
        deadline: Deadline,
        ws_url: &str,
        html: &str,
        settle: Duration,
        options: &PdfOptions,
    ) -> Result<RenderedPdf>;
}

/// The production renderer backed by a remote Chromium.
#[derive(Debug, Default)]
pub struct ChromePdfRenderer;

#[async_trait]
impl PdfRenderer for ChromePdfRenderer {
    async fn render(
        &self,
        deadline: Deadline,
        ws_url: &str,
        html: &str,
        settle: Duration,
        options: &PdfOptions,
    ) -> Result<RenderedPdf> {
        render_pdf(deadline, ws_url, html, settle, options).await
    }
}

/// Print `html` to PDF via the Chromium behind `ws_url`.
///
/// Browser-level endpoints get a dedicated target and flattened session;
/// page-level endpoints are addressed directly. The created target is closed
/// best-effort under [`TARGET_CLOSE_TIMEOUT`] even when the ambient deadline
/// is already exhausted, and the WebSocket is always released.
pub async fn render_pdf(
    deadline: Deadline,
    ws_url: &str,
    html: &str,
    settle: Duration,
    options: &PdfOptions,
) -> Result<RenderedPdf> {
    let client = CdpClient::connect(ws_url, deadline).await?;

    let session = if is_page_endpoint(ws_url) {
        TargetSession::page()
    } else {
        match TargetSession::open(&client, deadline).await {
            Ok(session) => session,
            Err(err) => {
                client.close().await;
                return Err(err);
            }
        }
    };

    let outcome = print_document(&client, deadline, &session, html, settle, options).await;

    if let Some(target_id) = session.target_id() {
        let cleanup = Deadline::after(TARGET_CLOSE_TIMEOUT);
        if let Err(err) = close_target(&client, cleanup, target_id).await {
            warn!(error = %err, "chrome close target error");
        }
    }
    client.close().await;

    outcome
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameTreeResult {
    #[serde(default)]
    frame_tree: FrameTree,
}

#[derive(Debug, Default, Deserialize)]
struct FrameTree {
    #[serde(default)]
    frame: Frame,
}

#[derive(Debug, Default, Deserialize)]
struct Frame {
    #[serde(default)]
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct PrintToPdfResult {
    #[serde(default)]
    data: String,
}

async fn print_document<S>(
    client: &CdpClient<S>,
    deadline: Deadline,
    session: &TargetSession,
    html: &str,
    settle: Duration,
    options: &PdfOptions,
) -> Result<RenderedPdf>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let session_id = session.session_id();

    let _: serde_json::Value = client
        .call(
            deadline,
            session_id,
            "Page.navigate",
            Some(json!({ "url": "about:blank" })),
        )
        .await?;

    let tree: FrameTreeResult = client
        .call(deadline, session_id, "Page.getFrameTree", None)
        .await?;
    let frame_id = tree.frame_tree.frame.id;
    if frame_id.is_empty() {
        return Err(Error::protocol("missing frame id"));
    }

    let _: serde_json::Value = client
        .call(
            deadline,
            session_id,
            "Page.setDocumentContent",
            Some(json!({ "frameId": frame_id, "html": html })),
        )
        .await?;

    wait_for_body(client, deadline, session_id).await?;
    deadline.sleep(settle).await?;

    let params = print_params(options);
    let start = Instant::now();
    let printed: Result<PrintToPdfResult> = client
        .call(
            deadline,
            session_id,
            "Page.printToPDF",
            Some(serde_json::to_value(&params)?),
        )
        .await;
    let print_elapsed = start.elapsed();
    let printed = printed?;

    if printed.data.is_empty() {
        return Err(Error::protocol("missing pdf data"));
    }
    let bytes = BASE64
        .decode(printed.data.as_bytes())
        .map_err(|err| Error::protocol(format!("invalid pdf payload: {err}")))?;

    debug!(pdf_bytes = bytes.len(), ?print_elapsed, "pdf rendered");

    Ok(RenderedPdf {
        bytes,
        print_elapsed,
    })
}

/// Poll until the document has a `<body>` element, every 50 ms, until the
/// deadline cancels.
async fn wait_for_body<S>(
    client: &CdpClient<S>,
    deadline: Deadline,
    session_id: Option<&str>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    loop {
        if has_body(client, deadline, session_id).await? {
            return Ok(());
        }
        deadline.sleep(BODY_POLL_INTERVAL).await?;
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetDocumentResult {
    #[serde(default)]
    root: DocumentNode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentNode {
    #[serde(default)]
    node_id: i64,
}

async fn has_body<S>(
    client: &CdpClient<S>,
    deadline: Deadline,
    session_id: Option<&str>,
) -> Result<bool>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let document: GetDocumentResult = client
        .call(
            deadline,
            session_id,
            "DOM.getDocument",
            Some(json!({ "depth": 1 })),
        )
        .await?;
    if document.root.node_id == 0 {
        return Ok(false);
    }

    let query: DocumentNode = client
        .call(
            deadline,
            session_id,
            "DOM.querySelector",
            Some(json!({ "nodeId": document.root.node_id, "selector": "body" })),
        )
        .await?;
    Ok(query.node_id != 0)
}
