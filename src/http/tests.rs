//! Facade tests: status mapping, headers, and option plumbing end to end
//! against mock resolver/renderer implementations.

use super::handlers::{parse_options, AppState};
use super::server::router;
use crate::chrome::WsResolver;
use crate::config::Config;
use crate::deadline::Deadline;
use crate::pdf::{PdfOptions, PdfRenderer, RenderedPdf};
use crate::{Error, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::ServiceExt;

struct MockResolver {
    ws: std::result::Result<String, String>,
}

impl MockResolver {
    fn ok(ws: &str) -> Arc<Self> {
        Arc::new(Self {
            ws: Ok(ws.to_string()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            ws: Err(message.to_string()),
        })
    }
}

#[async_trait]
impl WsResolver for MockResolver {
    async fn ws_url(&self, _deadline: Deadline) -> Result<String> {
        self.ws.clone().map_err(Error::chrome)
    }
}

#[derive(Debug, Clone)]
struct RenderCall {
    ws_url: String,
    html: String,
    settle: Duration,
    options: PdfOptions,
}

#[derive(Default)]
struct MockRenderer {
    fail: bool,
    bytes: Vec<u8>,
    seen: Mutex<Vec<RenderCall>>,
}

impl MockRenderer {
    fn returning(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            bytes: bytes.to_vec(),
            ..Default::default()
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl PdfRenderer for MockRenderer {
    async fn render(
        &self,
        _deadline: Deadline,
        ws_url: &str,
        html: &str,
        settle: Duration,
        options: &PdfOptions,
    ) -> Result<RenderedPdf> {
        self.seen.lock().await.push(RenderCall {
            ws_url: ws_url.to_string(),
            html: html.to_string(),
            settle,
            options: options.clone(),
        });
        if self.fail {
            return Err(Error::protocol("render failed"));
        }
        Ok(RenderedPdf {
            bytes: self.bytes.clone(),
            print_elapsed: Duration::from_millis(12),
        })
    }
}

fn test_state(
    resolver: Arc<dyn WsResolver>,
    renderer: Arc<dyn PdfRenderer>,
    config: Config,
) -> AppState {
    AppState {
        config: Arc::new(config),
        resolver,
        renderer,
    }
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_render_success_returns_pdf_with_headers() {
    let renderer = MockRenderer::returning(b"%PDF-1.7");
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        renderer.clone(),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pdf")
                .body(Body::from("<html></html>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers()["content-disposition"].to_str().unwrap(),
        "inline; filename=\"document.pdf\""
    );
    assert_eq!(
        response.headers()["x-content-type-options"].to_str().unwrap(),
        "nosniff"
    );
    assert_eq!(
        response.headers()["cache-control"].to_str().unwrap(),
        "no-store"
    );
    assert_eq!(body_bytes(response).await, b"%PDF-1.7");

    let seen = renderer.seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].ws_url, "ws://example");
    assert_eq!(seen[0].html, "<html></html>");
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        MockRenderer::returning(b"%PDF-1.7"),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_empty_body_is_bad_request() {
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        MockRenderer::returning(b"%PDF-1.7"),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"empty html");
}

#[tokio::test]
async fn test_invalid_option_is_bad_request() {
    let renderer = MockRenderer::returning(b"%PDF-1.7");
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        renderer.clone(),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pdf?scale=oops")
                .body(Body::from("<html></html>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_bytes(response).await, b"invalid scale");
    assert!(renderer.seen.lock().await.is_empty());
}

#[tokio::test]
async fn test_resolver_failure_is_service_unavailable() {
    let app = router(test_state(
        MockResolver::failing("no chrome"),
        MockRenderer::returning(b"%PDF-1.7"),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pdf")
                .body(Body::from("<html></html>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_bytes(response).await, b"chrome unavailable");
}

#[tokio::test]
async fn test_renderer_failure_is_internal_error() {
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        MockRenderer::failing(),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pdf")
                .body(Body::from("<html></html>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, b"render failed");
}

#[tokio::test]
async fn test_options_reach_renderer_verbatim() {
    let renderer = MockRenderer::returning(b"%PDF-1.7");
    let config = Config {
        pdf_wait: Duration::from_millis(150),
        ..Config::default()
    };
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        renderer.clone(),
        config,
    ));

    let uri = "/api/v1/pdf?landscape=true&scale=0.9&paper_width=8.27&paper_height=11.69\
               &margin_top=0.4&margin_bottom=0.5&margin_left=0.6&margin_right=0.7\
               &print_background=false&page_ranges=1-2,4";
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::from("<html></html>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let seen = renderer.seen.lock().await;
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].settle, Duration::from_millis(150));
    assert_eq!(
        seen[0].options,
        PdfOptions {
            landscape: Some(true),
            scale: Some(0.9),
            paper_width: Some(8.27),
            paper_height: Some(11.69),
            margin_top: Some(0.4),
            margin_bottom: Some(0.5),
            margin_left: Some(0.6),
            margin_right: Some(0.7),
            print_background: Some(false),
            page_ranges: Some("1-2,4".to_string()),
        }
    );
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let config = Config {
        max_body_bytes: 16,
        ..Config::default()
    };
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        MockRenderer::returning(b"%PDF-1.7"),
        config,
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/pdf")
                .body(Body::from("<html>".repeat(100)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_healthz_ok() {
    let app = router(test_state(
        MockResolver::ok("ws://example"),
        MockRenderer::returning(b"%PDF-1.7"),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn test_healthz_unavailable() {
    let app = router(test_state(
        MockResolver::failing("connection refused"),
        MockRenderer::returning(b"%PDF-1.7"),
        Config::default(),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_bytes(response).await, b"chrome unavailable");
}

#[test]
fn test_parse_options_empty_query() {
    let options = parse_options("").unwrap();
    assert_eq!(options, PdfOptions::default());
}

#[test]
fn test_parse_options_full_population() {
    let options = parse_options(
        "landscape=true&scale=0.9&paper_width=8.27&paper_height=11.69&margin_top=0.4\
         &margin_bottom=0.5&margin_left=0.6&margin_right=0.7&print_background=false\
         &page_ranges=1-2,4",
    )
    .unwrap();

    assert_eq!(options.landscape, Some(true));
    assert_eq!(options.scale, Some(0.9));
    assert_eq!(options.paper_width, Some(8.27));
    assert_eq!(options.paper_height, Some(11.69));
    assert_eq!(options.margin_top, Some(0.4));
    assert_eq!(options.margin_bottom, Some(0.5));
    assert_eq!(options.margin_left, Some(0.6));
    assert_eq!(options.margin_right, Some(0.7));
    assert_eq!(options.print_background, Some(false));
    assert_eq!(options.page_ranges, Some("1-2,4".to_string()));
}

#[test]
fn test_parse_options_empty_values_are_absent() {
    let options = parse_options("landscape=&scale=&page_ranges=").unwrap();
    assert_eq!(options, PdfOptions::default());
}

#[test]
fn test_parse_options_invalid_fields() {
    for (query, field) in [
        ("landscape=sideways", "landscape"),
        ("scale=big", "scale"),
        ("paper_width=wide", "paper_width"),
        ("paper_height=tall", "paper_height"),
        ("margin_top=x", "margin_top"),
        ("margin_bottom=x", "margin_bottom"),
        ("margin_left=x", "margin_left"),
        ("margin_right=x", "margin_right"),
        ("print_background=maybe", "print_background"),
    ] {
        let err = parse_options(query).unwrap_err();
        assert_eq!(err.to_string(), format!("invalid {field}"));
    }
}

#[test]
fn test_parse_options_is_all_or_nothing() {
    let err = parse_options("landscape=true&scale=oops").unwrap_err();
    assert_eq!(err.to_string(), "invalid scale");
}
