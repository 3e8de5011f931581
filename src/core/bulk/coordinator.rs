//! Bulk workflow coordinator
//!
//! Ties together the pieces of one bulk job run against a [`FhirClient`]:
//! kick-off, status polling and output download. The coordinator borrows
//! the client, so a client drives one bulk job at a time.
//!
//! The policy deadline starts with the first request the coordinator makes
//! and covers every later phase, so kick-off, polling and download share
//! one time budget. Build a new coordinator for each job.

use super::poller::{PollPolicy, Sleeper, TokioSleeper};
use crate::adapters::fhir::FhirClient;
use crate::domain::{FhirLinkError, Result};
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio::time::Instant;

/// Bulk data coordinator
///
/// # Example
///
/// ```rust,no_run
/// use fhirlink::adapters::fhir::{ClientConfig, FhirClient};
/// use fhirlink::adapters::storage::DirectorySink;
/// use fhirlink::core::bulk::{BulkCoordinator, ExportRequest, PollPolicy};
/// use fhirlink::domain::JobManifest;
///
/// # async fn example() -> fhirlink::domain::Result<()> {
/// let client = FhirClient::new(ClientConfig::new("https://fhir.example.com/r4"))?;
/// let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
///
/// let coordinator = BulkCoordinator::new(&client, PollPolicy::default())
///     .with_shutdown(shutdown_rx);
///
/// let manifest = coordinator.export(&ExportRequest::patient()).await?;
/// let manifest = JobManifest::from_value(&manifest)?;
/// let files = coordinator
///     .materialize(&manifest, &DirectorySink::new("./export"))
///     .await?;
/// println!("{files:?}");
/// # Ok(())
/// # }
/// ```
pub struct BulkCoordinator<'a> {
    pub(crate) client: &'a FhirClient,
    pub(crate) policy: PollPolicy,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) shutdown: Option<watch::Receiver<bool>>,
    deadline_at: OnceLock<Instant>,
}

impl<'a> BulkCoordinator<'a> {
    /// Creates a coordinator that really sleeps between polls
    pub fn new(client: &'a FhirClient, policy: PollPolicy) -> Self {
        Self {
            client,
            policy,
            sleeper: Arc::new(TokioSleeper),
            shutdown: None,
            deadline_at: OnceLock::new(),
        }
    }

    /// Replaces the wait implementation used between polls
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Aborts polling once `true` is sent on the channel
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }
}

impl BulkCoordinator<'_> {
    /// Resolves a server-supplied URL, which may be relative, against the base URL
    pub(crate) fn resolve_url(&self, location: &str) -> Result<url::Url> {
        let base = url::Url::parse(&format!("{}/", self.client.base_url()))
            .map_err(|e| FhirLinkError::Configuration(format!("Invalid base URL: {e}")))?;
        base.join(location.trim())
            .map_err(|e| FhirLinkError::Validation(format!("Invalid URL '{location}': {e}")))
    }

    /// Cancellation state for the next phase of the job
    ///
    /// The first call fixes the deadline instant; later calls reuse it.
    pub(crate) fn cancel_guard(&self) -> CancelGuard {
        let deadline = self
            .policy
            .deadline
            .map(|budget| *self.deadline_at.get_or_init(|| Instant::now() + budget));
        CancelGuard::new(self.shutdown.clone(), deadline)
    }
}

/// Cancellation state for one bulk run
pub(crate) struct CancelGuard {
    shutdown: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl CancelGuard {
    pub(crate) fn new(shutdown: Option<watch::Receiver<bool>>, deadline: Option<Instant>) -> Self {
        Self { shutdown, deadline }
    }

    /// Fails if shutdown was requested or the deadline has passed
    pub(crate) fn check(&self) -> Result<()> {
        if self.shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Err(shutdown_requested());
        }
        if self.deadline.is_some_and(|at| Instant::now() >= at) {
            return Err(deadline_exceeded());
        }
        Ok(())
    }

    /// Runs `fut` unless shutdown or the deadline interrupts it first
    pub(crate) async fn run<F: Future>(&mut self, fut: F) -> Result<F::Output> {
        let deadline = self.deadline;
        let shutdown = self.shutdown.as_mut();

        tokio::select! {
            output = fut => Ok(output),
            _ = wait_for_shutdown(shutdown) => Err(shutdown_requested()),
            _ = wait_until(deadline) => Err(deadline_exceeded()),
        }
    }
}

async fn wait_for_shutdown(shutdown: Option<&mut watch::Receiver<bool>>) {
    let Some(rx) = shutdown else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without signalling
            return std::future::pending().await;
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn shutdown_requested() -> FhirLinkError {
    FhirLinkError::Cancelled("shutdown requested".to_string())
}

fn deadline_exceeded() -> FhirLinkError {
    FhirLinkError::Cancelled("bulk job deadline exceeded".to_string())
}
