//! Target session lifecycle
//!
//! A browser-level DevTools endpoint needs an explicit target and session
//! before page commands work; a page-level endpoint addresses its page
//! implicitly. Created targets must be closed on every exit path so tabs do
//! not accumulate in the shared Chromium.

use crate::cdp::client::CdpClient;
use crate::deadline::Deadline;
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::warn;

/// Detached deadline for target cleanup, independent of the (possibly
/// exhausted) request deadline.
pub const TARGET_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether the URL addresses a single page rather than the browser process.
pub fn is_page_endpoint(ws_url: &str) -> bool {
    ws_url.contains("/devtools/page/")
}

/// The target/session pair backing one rendering request.
///
/// Both ids are absent on page-level endpoints.
#[derive(Debug, Default)]
pub struct TargetSession {
    target_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTargetResult {
    #[serde(default)]
    target_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachToTargetResult {
    #[serde(default)]
    session_id: String,
}

impl TargetSession {
    /// The implicit session of a page-level endpoint.
    pub fn page() -> Self {
        Self::default()
    }

    /// Create a blank target and attach to it with a flattened session.
    ///
    /// Missing ids in either response are fatal protocol errors. If the
    /// attach step fails after the target was created, the fresh target is
    /// closed best-effort so it does not linger.
    pub async fn open<S>(client: &CdpClient<S>, deadline: Deadline) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let created: CreateTargetResult = client
            .call(
                deadline,
                None,
                "Target.createTarget",
                Some(json!({ "url": "about:blank" })),
            )
            .await?;
        if created.target_id.is_empty() {
            return Err(Error::protocol("cdp target id missing"));
        }

        let attached = client
            .call::<AttachToTargetResult>(
                deadline,
                None,
                "Target.attachToTarget",
                Some(json!({ "targetId": created.target_id, "flatten": true })),
            )
            .await
            .and_then(|attached| {
                if attached.session_id.is_empty() {
                    Err(Error::protocol("cdp session id missing"))
                } else {
                    Ok(attached)
                }
            });

        let attached = match attached {
            Ok(attached) => attached,
            Err(err) => {
                let cleanup = Deadline::after(TARGET_CLOSE_TIMEOUT);
                if let Err(close_err) = close_target(client, cleanup, &created.target_id).await {
                    warn!(error = %close_err, "chrome close target error");
                }
                return Err(err);
            }
        };

        Ok(Self {
            target_id: Some(created.target_id),
            session_id: Some(attached.session_id),
        })
    }

    /// The target to close on cleanup, if one was created.
    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    /// The session id carried on page-level commands, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Close a created target. Callers never pass an empty id.
pub async fn close_target<S>(
    client: &CdpClient<S>,
    deadline: Deadline,
    target_id: &str,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let _: serde_json::Value = client
        .call(
            deadline,
            None,
            "Target.closeTarget",
            Some(json!({ "targetId": target_id })),
        )
        .await?;
    Ok(())
}
