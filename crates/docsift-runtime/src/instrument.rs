//! Timing and resource observations around each unit of work.
//!
//! A pure side channel: sinks may fail or panic, the wrapped operation's
//! result is unaffected.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use docsift_core::{ItemOutcome, LengthCategory, ResourceSnapshot};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

/// CPU sampling window for the batch-start snapshot.
const SAMPLE_WINDOW: Duration = Duration::from_millis(50);

/// One record per processed item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub item_id: String,
    pub elapsed: Duration,
    /// Category on success, failure reason code otherwise.
    pub outcome: String,
    pub category: Option<LengthCategory>,
    /// Items in flight when this one finished, itself included.
    pub active_workers: usize,
    /// Utilization sampled when the item's batch started.
    pub resources: Option<ResourceSnapshot>,
}

/// Receives observations. Called from worker tasks.
pub trait ObservationSink: Send + Sync {
    fn record(&self, observation: &Observation);
}

/// Default sink: one structured log line per item.
#[derive(Debug, Default)]
pub struct LogSink;

impl ObservationSink for LogSink {
    fn record(&self, o: &Observation) {
        let cpu = o.resources.and_then(|r| r.cpu_percent);
        let mem = o.resources.and_then(|r| r.memory_percent);
        info!(
            item = %o.item_id,
            outcome = %o.outcome,
            elapsed_ms = o.elapsed.as_millis() as u64,
            active_workers = o.active_workers,
            cpu_percent = ?cpu,
            memory_percent = ?mem,
            "Item processed"
        );
    }
}

pub struct Instrumentation {
    active: AtomicUsize,
    sink: Arc<dyn ObservationSink>,
    sample_resources: bool,
    batch_snapshot: Mutex<Option<ResourceSnapshot>>,
}

/// Marks one item in flight until dropped.
pub struct ActiveGuard<'a> {
    active: &'a AtomicUsize,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Instrumentation {
    pub fn new(sink: Arc<dyn ObservationSink>, sample_resources: bool) -> Self {
        Self {
            active: AtomicUsize::new(0),
            sink,
            sample_resources,
            batch_snapshot: Mutex::new(None),
        }
    }

    pub fn active_workers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn enter(&self) -> ActiveGuard<'_> {
        self.active.fetch_add(1, Ordering::SeqCst);
        ActiveGuard {
            active: &self.active,
        }
    }

    /// Await `fut`, logging how long the stage took.
    pub async fn timed<F: Future>(&self, item: &str, stage: &'static str, fut: F) -> F::Output {
        let started = Instant::now();
        let out = fut.await;
        debug!(
            item,
            stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stage finished"
        );
        out
    }

    /// Emit the observation for a finished item. Never blocks on sampling;
    /// the batch-start snapshot is attached instead.
    pub fn observe(&self, item_id: &str, elapsed: Duration, outcome: &ItemOutcome) {
        let resources = *self.batch_snapshot.lock();
        let observation = Observation {
            item_id: item_id.to_string(),
            elapsed,
            outcome: match outcome {
                Ok(report) => report.category.to_string(),
                Err(failure) => failure.kind.to_string(),
            },
            category: outcome.as_ref().ok().map(|r| r.category),
            active_workers: self.active_workers(),
            resources,
        };

        let sink = &self.sink;
        if std::panic::catch_unwind(AssertUnwindSafe(|| sink.record(&observation))).is_err() {
            warn!(item = item_id, "Observation sink panicked; observation dropped");
        }
    }

    /// Log the batch size, pool size and current utilization, and keep
    /// the utilization sample for the batch's item observations.
    pub async fn batch_started(&self, batch_id: &str, items: usize, workers: usize) {
        let resources = if self.sample_resources {
            sample().await
        } else {
            None
        };
        *self.batch_snapshot.lock() = resources;
        info!(
            batch = batch_id,
            items,
            workers,
            cpu_percent = ?resources.and_then(|r| r.cpu_percent),
            memory_percent = ?resources.and_then(|r| r.memory_percent),
            "Batch started"
        );
    }
}

async fn sample() -> Option<ResourceSnapshot> {
    tokio::task::spawn_blocking(|| ResourceSnapshot::capture(SAMPLE_WINDOW))
        .await
        .ok()
}
