//! Bulk job status poller
//!
//! Repeatedly GETs a job's status URL until the job completes:
//!
//! 1. 4xx/5xx: tolerated up to `max_errors` consecutive times, waiting the
//!    default interval after each; one more fails the poll.
//! 2. `200 OK`: the decoded body is the completion manifest.
//! 3. `Retry-After` present: wait that many seconds (or until that date).
//! 4. `202 Accepted` otherwise: wait the previous interval again.
//! 5. Anything else: invalid response.
//!
//! Every wait is capped at the policy ceiling. Shutdown and the optional
//! deadline are checked before each request and interrupt both the
//! request and the wait.

use super::coordinator::BulkCoordinator;
use super::retry_after::retry_after_seconds;
use crate::adapters::fhir::client::decode_json;
use crate::config::BulkConfig;
use crate::domain::{JobHandle, PollError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::Instrument;

/// Interval used when neither configuration nor server says otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Consecutive status errors tolerated before polling fails
pub const DEFAULT_MAX_POLL_ERRORS: u32 = 3;

const X_PROGRESS: &str = "x-progress";

/// Timing and tolerance settings for the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait after a status error, and before the first `Retry-After`
    pub interval: Duration,
    /// Upper bound for any single wait
    pub ceiling: Duration,
    /// Consecutive status errors tolerated
    pub max_errors: u32,
    /// Overall time allowed for the whole job, from kick-off through download
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ceiling: DEFAULT_POLL_INTERVAL,
            max_errors: DEFAULT_MAX_POLL_ERRORS,
            deadline: None,
        }
    }
}

impl PollPolicy {
    /// Policy from the `[bulk]` configuration section
    ///
    /// The ceiling equals the configured polling interval.
    pub fn from_config(config: &BulkConfig) -> Self {
        let interval = Duration::from_secs(config.default_polling_seconds);
        Self {
            interval,
            ceiling: interval,
            max_errors: config.max_poll_errors,
            deadline: config.deadline_seconds.map(Duration::from_secs),
        }
    }

    /// Sets the default interval and the ceiling together
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self.ceiling = interval;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Duration) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_max_errors(mut self, max_errors: u32) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Waits between status polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl BulkCoordinator<'_> {
    /// Polls a job until it completes and returns the decoded manifest
    ///
    /// # Errors
    ///
    /// - [`PollError::RetriesExhausted`] after too many consecutive status errors
    /// - [`PollError::InvalidResponse`] for a status outside the protocol
    /// - [`crate::domain::FhirLinkError::Cancelled`] on shutdown or deadline
    /// - transport and authentication errors unchanged
    pub async fn poll(&self, handle: &JobHandle) -> Result<Value> {
        let span = tracing::info_span!(parent: self.client.span(), "bulk_poll", job = %handle);
        self.poll_until_complete(handle).instrument(span).await
    }

    async fn poll_until_complete(&self, handle: &JobHandle) -> Result<Value> {
        let policy = &self.policy;
        let mut guard = self.cancel_guard();
        let mut errors: u32 = 0;
        let mut wait = policy.interval;
        let mut attempt: u32 = 0;

        loop {
            guard.check()?;
            attempt += 1;

            let response = guard
                .run(
                    self.client
                        .send(Method::GET, handle.as_str(), &[], None, false),
                )
                .await??;
            let status = response.status();

            tracing::debug!(attempt = attempt, status = status.as_u16(), "Status poll answered");

            if status.is_client_error() || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                crate::log_http_failure!("GET", handle, status.as_u16(), body);

                if errors >= policy.max_errors {
                    return Err(PollError::RetriesExhausted {
                        attempts: errors + 1,
                        status: status.as_u16(),
                        body,
                    }
                    .into());
                }
                errors += 1;
                wait = policy.interval;
                tracing::warn!(
                    consecutive_errors = errors,
                    max_errors = policy.max_errors,
                    "Status poll failed, retrying"
                );
            } else {
                errors = 0;

                if status == StatusCode::OK {
                    tracing::info!(attempts = attempt, "Bulk job complete");
                    return decode_json(response).await;
                }

                if let Some(retry_after) = response.headers().get(RETRY_AFTER) {
                    if let Some(progress) = response.headers().get(X_PROGRESS) {
                        tracing::info!(progress = %String::from_utf8_lossy(progress.as_bytes()), "Bulk job progress");
                    }

                    let retry_after = String::from_utf8_lossy(retry_after.as_bytes()).into_owned();
                    tracing::info!(retry_after = %retry_after, "Server requested retry delay");

                    wait = match retry_after_seconds(&retry_after, Utc::now()) {
                        Some(seconds) => Duration::from_secs(seconds),
                        None => {
                            tracing::warn!(
                                retry_after = %retry_after,
                                "Unparseable Retry-After, using default interval"
                            );
                            policy.interval
                        }
                    };
                } else if status != StatusCode::ACCEPTED {
                    tracing::error!(status = status.as_u16(), "Invalid poll response");
                    return Err(PollError::InvalidResponse {
                        status: status.as_u16(),
                    }
                    .into());
                }
            }

            wait = wait.min(policy.ceiling);
            crate::log_poll_wait!(handle, wait);
            guard.run(self.sleeper.sleep(wait)).await?;
        }
    }
}
