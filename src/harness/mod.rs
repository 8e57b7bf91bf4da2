//! Qdrant conformance harness
//!
//! Runs a fixed battery of checks against a live Qdrant instance using one
//! throwaway collection:
//!
//! health → auth → create_collection → reject_invalid_config → insert_points
//! → reject_invalid_point → search → filtered_search → concurrent_insert
//! → error_format → cleanup
//!
//! Every step is timed and recorded. Data steps are skipped when the
//! collection could not be created; cleanup always runs unless disabled.
//! [`ConformanceHarness::run_with_timeout`] bounds the whole suite.

pub mod report;
mod steps;

pub use report::{HarnessReport, StepResult};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::retry::retry_with_backoff_if;
use crate::vector_store::{QdrantRestBackend, VectorStoreBackend, VectorStoreError};

/// Default number of parallel writers in `concurrent_insert`
pub const DEFAULT_CONCURRENT_WRITERS: usize = 8;

/// Exit code when the suite exceeds its time budget
pub const EXIT_TIMEOUT: i32 = 2;

/// Time allowed for the cleanup attempted after a timeout
pub const CLEANUP_AFTER_TIMEOUT: Duration = Duration::from_secs(10);

/// Knobs for one conformance run
#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_size: usize,
    pub skip_cleanup: bool,
    pub concurrent_writers: usize,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl HarnessOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            collection: default_collection_name(),
            vector_size: 4,
            skip_cleanup: false,
            concurrent_writers: DEFAULT_CONCURRENT_WRITERS,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(250),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// `conformance_` plus the first 8 hex digits of a fresh UUID
pub fn default_collection_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("conformance_{}", &id[..8])
}

/// Connection failures, 5xx and 429 are worth another attempt
pub fn is_transient(error: &VectorStoreError) -> bool {
    match error {
        VectorStoreError::Connection(_) => true,
        VectorStoreError::Http { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

/// How a bounded run ended
#[derive(Debug)]
pub enum RunOutcome {
    Completed(HarnessReport),
    TimedOut { after: Duration },
}

impl RunOutcome {
    /// 0 all passed, 1 a step failed, 2 timed out
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed(report) => report.exit_code(),
            Self::TimedOut { .. } => EXIT_TIMEOUT,
        }
    }
}

/// Drives the conformance steps against one Qdrant server
pub struct ConformanceHarness {
    options: HarnessOptions,
    backend: Arc<dyn VectorStoreBackend>,
    http: reqwest::Client,
}

impl ConformanceHarness {
    /// Harness speaking REST to `options.url`
    pub fn new(options: HarnessOptions) -> anyhow::Result<Self> {
        let backend = QdrantRestBackend::new(
            options.url.clone(),
            options.api_key.clone(),
            options.request_timeout,
        )?;
        Self::with_backend(options, Arc::new(backend))
    }

    /// Harness whose collection and point steps go through `backend`
    ///
    /// The auth and error-format checks still issue raw GETs to `options.url`.
    pub fn with_backend(
        options: HarnessOptions,
        backend: Arc<dyn VectorStoreBackend>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            options,
            backend,
            http,
        })
    }

    /// Run every step and collect the results
    pub async fn run(&self) -> HarnessReport {
        let started = Instant::now();
        let mut steps = Vec::new();

        tracing::info!(
            "Running conformance suite against {} (collection {})",
            self.options.url,
            self.options.collection
        );

        steps.push(timed("health", self.check_health()).await.0);

        if self.options.api_key.is_some() {
            steps.push(timed("auth", self.check_auth()).await.0);
        }

        let (created, _) = timed("create_collection", self.create_collection()).await;
        let collection_ready = created.passed;
        steps.push(created);

        steps.push(
            timed("reject_invalid_config", self.reject_invalid_config())
                .await
                .0,
        );

        if collection_ready {
            let (inserted, seeds) = timed("insert_points", self.insert_points()).await;
            steps.push(inserted);

            steps.push(
                timed("reject_invalid_point", self.reject_invalid_point())
                    .await
                    .0,
            );

            let seeds = seeds.unwrap_or_default();
            steps.push(timed("search", self.search(&seeds)).await.0);
            steps.push(timed("filtered_search", self.filtered_search(&seeds)).await.0);
            steps.push(
                timed("concurrent_insert", self.concurrent_insert(seeds.len() as u64))
                    .await
                    .0,
            );
        } else {
            tracing::warn!("Skipping data steps: collection was not created");
        }

        steps.push(timed("error_format", self.check_error_format()).await.0);

        if self.options.skip_cleanup {
            tracing::info!("Leaving collection {} in place", self.options.collection);
        } else {
            steps.push(timed("cleanup", self.cleanup()).await.0);
        }

        HarnessReport {
            url: self.options.url.clone(),
            collection: self.options.collection.clone(),
            steps,
            total_duration: started.elapsed(),
        }
    }

    /// Run the suite, giving up after `timeout`
    ///
    /// On timeout the test collection is still dropped (within
    /// [`CLEANUP_AFTER_TIMEOUT`]) unless cleanup is disabled.
    pub async fn run_with_timeout(&self, timeout: Duration) -> RunOutcome {
        match tokio::time::timeout(timeout, self.run()).await {
            Ok(report) => RunOutcome::Completed(report),
            Err(_) => {
                tracing::error!("Conformance suite did not finish within {:?}", timeout);

                if !self.options.skip_cleanup {
                    match tokio::time::timeout(CLEANUP_AFTER_TIMEOUT, self.cleanup()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => tracing::warn!("Cleanup after timeout failed: {:#}", e),
                        Err(_) => tracing::warn!("Cleanup after timeout also timed out"),
                    }
                }
                RunOutcome::TimedOut { after: timeout }
            }
        }
    }

    /// Backend call with retries on transient failures only
    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T, VectorStoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, VectorStoreError>>,
    {
        retry_with_backoff_if(
            operation,
            self.options.retry_attempts,
            self.options.retry_delay,
            is_transient,
        )
        .await
    }
}

/// Time a step, logging and recording its outcome
async fn timed<T, Fut>(name: &str, step: Fut) -> (StepResult, Option<T>)
where
    Fut: Future<Output = anyhow::Result<T>>,
{
    let started = Instant::now();
    let outcome = step.await;
    let duration = started.elapsed();

    match outcome {
        Ok(value) => {
            tracing::info!("✓ {} ({:?})", name, duration);
            (StepResult::pass(name, duration), Some(value))
        }
        Err(e) => {
            tracing::warn!("✗ {} ({:?}): {:#}", name, duration, e);
            (StepResult::fail(name, duration, format!("{:#}", e)), None)
        }
    }
}
