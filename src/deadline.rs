//! Request deadline propagation
//!
//! Deadlines flow top-down: the HTTP facade derives one from the per-request
//! timeout and hands it to the resolver and the rendering pipeline, which
//! install it around every network read, write, and sleep.

use crate::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant};

/// An absolute point in time after which pending work must fail.
///
/// `Deadline::NONE` means unbounded; detached cleanup paths use a fresh
/// short deadline instead of the (possibly exhausted) ambient one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; bounded operations run to completion.
    pub const NONE: Deadline = Deadline(None);

    /// A deadline expiring `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Deadline(Some(Instant::now() + timeout))
    }

    /// Whether the deadline has already passed.
    pub fn is_expired(&self) -> bool {
        matches!(self.0, Some(at) if at <= Instant::now())
    }

    /// Run a fallible future, failing with `Error::Timeout` at expiry.
    pub async fn bound<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.0 {
            Some(at) => match tokio::time::timeout_at(at.into(), fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::timeout("deadline exceeded")),
            },
            None => fut.await,
        }
    }

    /// Sleep for `wait`, cancellable at deadline expiry. A zero wait is a no-op.
    pub async fn sleep(&self, wait: Duration) -> Result<()> {
        if wait.is_zero() {
            return Ok(());
        }
        self.bound(async {
            tokio::time::sleep(wait).await;
            Ok(())
        })
        .await
    }
}
