//! The ingestion pipeline: per-item stages and the bounded worker pool.
//!
//! Each item runs stage → extract → classify → enrich → commit on one
//! worker. Every failure is caught at the item boundary and becomes a
//! tagged outcome; the batch always runs to completion.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use docsift_core::{
    BatchResult, DocsiftConfig, ItemFailure, ItemOutcome, ItemReport, Result, SourceKind,
    WorkItem,
};
use docsift_ingest::remote::is_url;
use docsift_ingest::{
    Classifier, DocumentSource, Enricher, HeuristicEnricher, TesseractCli, TextSource,
};
use docsift_store::{CommitStatus, CommitUpdate, MetadataStore};
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::aggregate::BatchAggregator;
use crate::batch::{self, BatchRequest};
use crate::instrument::{Instrumentation, LogSink, ObservationSink};

/// Shared, cheaply cloned pipeline. Collaborators are fixed at construction.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<DocsiftConfig>,
    source: Arc<dyn TextSource>,
    classifier: Classifier,
    enricher: Arc<dyn Enricher>,
    store: Arc<dyn MetadataStore>,
    instrumentation: Arc<Instrumentation>,
}

impl Pipeline {
    pub fn new(
        config: DocsiftConfig,
        source: Arc<dyn TextSource>,
        enricher: Arc<dyn Enricher>,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        let instrumentation = Instrumentation::new(Arc::new(LogSink), config.sample_resources);
        Self {
            classifier: Classifier::new(config.thresholds),
            config: Arc::new(config),
            source,
            enricher,
            store,
            instrumentation: Arc::new(instrumentation),
        }
    }

    /// Filesystem/HTTP source with Tesseract OCR and heuristic enrichment.
    pub fn with_defaults(config: DocsiftConfig, store: Arc<dyn MetadataStore>) -> Result<Self> {
        let source = DocumentSource::new(
            config.data_paths().downloads,
            Arc::new(TesseractCli::default()),
            Duration::from_secs(config.http_timeout_secs),
        )?;
        let enricher = HeuristicEnricher::new(config.enrichment.clone());
        Ok(Self::new(config, Arc::new(source), Arc::new(enricher), store))
    }

    /// Replace the default log sink.
    pub fn with_sink(mut self, sink: Arc<dyn ObservationSink>) -> Self {
        self.instrumentation = Arc::new(Instrumentation::new(sink, self.config.sample_resources));
        self
    }

    pub fn config(&self) -> &DocsiftConfig {
        &self.config
    }

    /// Expand a request and process it. Only an unreadable folder or
    /// manifest fails the whole call.
    pub async fn run(&self, request: BatchRequest, concurrency: Option<usize>) -> Result<BatchResult> {
        let config = self.config.clone();
        let expansion = tokio::task::spawn_blocking(move || batch::expand(&request, &config))
            .await
            .map_err(|e| docsift_core::Error::Internal(format!("batch expansion failed: {}", e)))??;

        let mut agg = BatchAggregator::new(uuid::Uuid::new_v4().to_string());
        for (id, failure) in expansion.rejected {
            agg.reject(id, failure);
        }
        self.dispatch(expansion.items, concurrency, &mut agg).await;
        Ok(self.finish(agg))
    }

    /// Process already-built items on a pool of `concurrency` workers
    /// (default: configured or available parallelism).
    pub async fn process_batch(&self, items: Vec<WorkItem>, concurrency: Option<usize>) -> BatchResult {
        let mut agg = BatchAggregator::new(uuid::Uuid::new_v4().to_string());
        self.dispatch(items, concurrency, &mut agg).await;
        self.finish(agg)
    }

    fn finish(&self, agg: BatchAggregator) -> BatchResult {
        let result = agg.finish();
        info!(
            batch = %result.batch_id,
            success = result.success_count,
            failed = result.failure_count,
            elapsed_ms = result.elapsed_ms,
            "Batch complete"
        );
        result
    }

    async fn dispatch(&self, items: Vec<WorkItem>, concurrency: Option<usize>, agg: &mut BatchAggregator) {
        if items.is_empty() {
            return;
        }
        let workers = concurrency
            .unwrap_or_else(|| self.config.effective_concurrency())
            .clamp(1, items.len());
        agg.dispatched(items.len());
        self.instrumentation
            .batch_started(agg.batch_id(), items.len(), workers)
            .await;

        let (job_tx, job_rx) = mpsc::channel::<WorkItem>(items.len());
        for item in items {
            if job_tx.try_send(item).is_err() {
                error!("Job queue rejected an item");
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<(String, ItemOutcome)>(workers * 2);

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let pipeline = self.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some(item) = next else { break };
                    let outcome = pipeline.process_one(&item).await;
                    if results.send((item.id, outcome)).await.is_err() {
                        break;
                    }
                }
                debug!(worker, "Worker exiting");
            }));
        }
        drop(result_tx);

        while let Some((id, outcome)) = result_rx.recv().await {
            agg.record(id, outcome);
        }
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }
    }

    /// Run one item through every stage. Never panics, never returns early
    /// without an observation.
    pub async fn process_one(&self, item: &WorkItem) -> ItemOutcome {
        let started = Instant::now();
        let _active = self.instrumentation.enter();

        let outcome = match AssertUnwindSafe(self.run_stages(item, started))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(ItemFailure::new(
                docsift_core::FailureKind::Internal,
                format!("worker panicked: {}", panic_message(panic.as_ref())),
            )),
        };

        self.instrumentation
            .observe(&item.id, started.elapsed(), &outcome);
        outcome
    }

    async fn run_stages(&self, item: &WorkItem, started: Instant) -> ItemOutcome {
        validate(item)?;
        let inst = &self.instrumentation;

        let size = self.source.size_hint(item).await.unwrap_or(0);
        let store = self.store.clone();
        let staged = item.clone();
        let row = inst
            .timed(
                &item.id,
                "stage",
                tokio::task::spawn_blocking(move || store.stage_initial(&staged, size)),
            )
            .await
            .map_err(|e| ItemFailure::store(format!("stage task failed: {}", e)))?
            .map_err(|e| ItemFailure::store(e.to_string()))?;
        debug!(item = %item.id, row, "Staged");

        let extracted = inst
            .timed(&item.id, "extract", self.source.fetch(item))
            .await
            .map_err(|e| ItemFailure::extraction(e.to_string()))?;
        if extracted.text.trim().is_empty() {
            return Err(ItemFailure::extraction("no text could be extracted"));
        }

        let (category, paragraphs) = self.classifier.classify(&extracted.text);
        let paragraphs = paragraphs.len();

        let enricher = self.enricher.clone();
        let text = extracted.text;
        let max_tokens = self.config.enrichment.max_input_tokens;
        let top_n = self.config.enrichment.top_n;
        let (summary, keywords) = inst
            .timed(
                &item.id,
                "enrich",
                tokio::task::spawn_blocking(move || {
                    (
                        enricher.summarize(&text, max_tokens),
                        enricher.extract_keywords(&text, top_n),
                    )
                }),
            )
            .await
            .map_err(|e| ItemFailure::enrichment(format!("enrichment task failed: {}", e)))?;

        let mut degraded = false;
        let summary = summary.unwrap_or_else(|e| {
            warn!(item = %item.id, "Summary unavailable: {}", e);
            degraded = true;
            String::new()
        });
        let keywords = keywords.unwrap_or_else(|e| {
            warn!(item = %item.id, "Keywords unavailable: {}", e);
            degraded = true;
            Vec::new()
        });

        let update = CommitUpdate {
            summary,
            keywords,
            elapsed: started.elapsed(),
            length_category: Some(category),
            size: Some(extracted.byte_size),
        };
        let store = self.store.clone();
        let id = item.id.clone();
        let status = inst
            .timed(
                &item.id,
                "commit",
                tokio::task::spawn_blocking(move || store.commit_processed(&id, &update)),
            )
            .await
            .map_err(|e| ItemFailure::store(format!("commit task failed: {}", e)))?
            .map_err(|e| ItemFailure::store(e.to_string()))?;

        let commit_matched = status == CommitStatus::Updated;
        if !commit_matched {
            warn!(item = %item.id, "Commit matched no staged record");
        }

        Ok(ItemReport {
            category,
            paragraphs,
            byte_size: extracted.byte_size,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            degraded,
            commit_matched,
        })
    }
}

fn validate(item: &WorkItem) -> std::result::Result<(), ItemFailure> {
    match item.kind {
        SourceKind::File if item.id.trim().is_empty() => {
            Err(ItemFailure::invalid_input("empty file path"))
        }
        SourceKind::Url if !is_url(&item.id) => {
            Err(ItemFailure::invalid_input("not an http(s) URL"))
        }
        _ => Ok(()),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
