//! Single-owner tally of per-item outcomes.
//!
//! Only the scheduler task touches the aggregator; workers hand outcomes
//! over a channel.

use std::time::Instant;

use docsift_core::{BatchResult, ItemFailure, ItemOutcome};
use tracing::warn;

pub struct BatchAggregator {
    result: BatchResult,
    started: Instant,
}

impl BatchAggregator {
    pub fn new(batch_id: impl Into<String>) -> Self {
        Self {
            result: BatchResult {
                batch_id: batch_id.into(),
                ..Default::default()
            },
            started: Instant::now(),
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.result.batch_id
    }

    /// Record the outcome of a dispatched item.
    pub fn record(&mut self, id: String, outcome: ItemOutcome) {
        match outcome {
            Ok(report) => {
                self.result.success_count += 1;
                *self.result.categories.entry(report.category).or_default() += 1;
            }
            Err(failure) => self.fail(id, failure),
        }
    }

    /// Record an input rejected before dispatch.
    pub fn reject(&mut self, id: String, failure: ItemFailure) {
        self.fail(id, failure);
    }

    pub fn dispatched(&mut self, count: usize) {
        self.result.dispatched += count;
    }

    fn fail(&mut self, id: String, failure: ItemFailure) {
        warn!(
            batch = %self.result.batch_id,
            item = %id,
            kind = %failure.kind,
            "{}",
            failure.reason
        );
        self.result.failure_count += 1;
        self.result.errors.insert(id, failure);
    }

    pub fn finish(mut self) -> BatchResult {
        self.result.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.result
    }
}
