//! Mock Chrome DevTools Protocol server
//!
//! A WebSocket server that answers the CDP methods the rendering pipeline
//! drives, so integration tests run without a real Chrome instance. It also
//! interleaves unsolicited events before every response to exercise the
//! client's event discard path.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub const MOCK_TARGET_ID: &str = "MOCK-TARGET-1";
pub const MOCK_SESSION_ID: &str = "MOCK-SESSION-1";
pub const MOCK_FRAME_ID: &str = "MOCK-FRAME-1";
pub const MOCK_PDF_BYTES: &[u8] = b"%PDF-1.7\n%mock document";

/// Everything the mock observed, for post-run assertions.
#[derive(Default)]
pub struct MockChromeState {
    /// Every CDP request received, in arrival order
    pub requests: Mutex<Vec<Value>>,
    /// Target ids passed to Target.closeTarget
    pub closed_targets: Mutex<Vec<String>>,
}

impl MockChromeState {
    pub async fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|request| request["method"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub async fn request_for(&self, method: &str) -> Option<Value> {
        self.requests
            .lock()
            .await
            .iter()
            .find(|request| request["method"] == method)
            .cloned()
    }
}

/// Mock Chrome server
pub struct MockChromeServer {
    addr: String,
    pub state: Arc<MockChromeState>,
}

impl MockChromeServer {
    /// Start a server that answers every method successfully.
    pub async fn start() -> Self {
        Self::start_failing(None).await
    }

    /// Start a server that answers `fail_method` with a CDP error object.
    pub async fn start_failing(fail_method: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(MockChromeState::default());
        let fail_method = fail_method.map(str::to_string);

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                let fail_method = fail_method.clone();
                tokio::spawn(handle_connection(stream, state, fail_method));
            }
        });

        Self { addr, state }
    }

    /// A browser-level endpoint URL for this server.
    pub fn browser_ws_url(&self) -> String {
        format!("ws://{}/devtools/browser/mock", self.addr)
    }

    /// A page-level endpoint URL for this server.
    pub fn page_ws_url(&self) -> String {
        format!("ws://{}/devtools/page/mock", self.addr)
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<MockChromeState>,
    fail_method: Option<String>,
) {
    let Ok(ws_stream) = accept_async(stream).await else {
        return;
    };
    let (mut sender, mut receiver) = ws_stream.split();

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let response = cdp_response(&request, &state, fail_method.as_deref()).await;
                state.requests.lock().await.push(request);

                // Chrome interleaves unsolicited events with responses.
                let event = json!({ "method": "Mock.event", "params": {} });
                if sender.send(Message::Text(event.to_string())).await.is_err() {
                    break;
                }
                if sender.send(Message::Text(response.to_string())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
}

async fn cdp_response(
    request: &Value,
    state: &MockChromeState,
    fail_method: Option<&str>,
) -> Value {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default();

    if Some(method) == fail_method {
        return json!({
            "id": id,
            "error": { "code": -32000, "message": "mock failure" }
        });
    }

    let result = match method {
        "Target.createTarget" => json!({ "targetId": MOCK_TARGET_ID }),
        "Target.attachToTarget" => json!({ "sessionId": MOCK_SESSION_ID }),
        "Target.closeTarget" => {
            let target_id = request["params"]["targetId"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            state.closed_targets.lock().await.push(target_id);
            json!({})
        }
        "Page.navigate" => json!({ "frameId": MOCK_FRAME_ID, "loaderId": "MOCK-LOADER-1" }),
        "Page.getFrameTree" => json!({
            "frameTree": { "frame": { "id": MOCK_FRAME_ID }, "childFrames": [] }
        }),
        "DOM.getDocument" => json!({ "root": { "nodeId": 1 } }),
        "DOM.querySelector" => json!({ "nodeId": 7 }),
        "Page.printToPDF" => json!({ "data": BASE64.encode(MOCK_PDF_BYTES) }),
        "Browser.getVersion" => json!({
            "protocolVersion": "1.3",
            "product": "HeadlessChrome/120.0.0.0"
        }),
        _ => json!({}),
    };

    json!({ "id": id, "result": result })
}
