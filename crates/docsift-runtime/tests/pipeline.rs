//! End-to-end pipeline tests: real SQLite store and filesystem, plus
//! in-memory collaborators where a failure has to be forced.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docsift_core::{
    DocsiftConfig, Error, FailureKind, LengthCategory, Result, WorkItem,
};
use docsift_ingest::{
    DocumentSource, Enricher, ExtractedText, ExtractionMethod, HeuristicEnricher, NoOcr,
    TextSource,
};
use docsift_runtime::{BatchRequest, Observation, ObservationSink, Pipeline};
use docsift_store::{CommitStatus, CommitUpdate, MetadataStore, SqliteStore};
use parking_lot::Mutex;

fn config(data_dir: &Path) -> DocsiftConfig {
    DocsiftConfig {
        data_dir: data_dir.to_path_buf(),
        extensions: vec!["txt".to_string()],
        sample_resources: false,
        ..Default::default()
    }
}

fn document_source(data_dir: &Path) -> Arc<dyn TextSource> {
    Arc::new(
        DocumentSource::new(data_dir.join("downloads"), Arc::new(NoOcr), Duration::from_secs(5))
            .unwrap(),
    )
}

fn real_pipeline(data_dir: &Path) -> (Pipeline, Arc<SqliteStore>) {
    let config = config(data_dir);
    let store = Arc::new(SqliteStore::open(data_dir.join("db")).unwrap());
    let pipeline = Pipeline::new(
        config.clone(),
        document_source(data_dir),
        Arc::new(HeuristicEnricher::new(config.enrichment.clone())),
        store.clone(),
    );
    (pipeline, store)
}

#[derive(Default)]
struct CountingSink(Mutex<Vec<Observation>>);

impl ObservationSink for CountingSink {
    fn record(&self, o: &Observation) {
        self.0.lock().push(o.clone());
    }
}

/// In-memory source: known ids succeed, ids containing "boom" panic,
/// everything else fails extraction. Tracks peak concurrency.
#[derive(Default)]
struct MemorySource {
    texts: HashMap<String, String>,
    delay: Duration,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MemorySource {
    fn with(ids: &[&str], text: &str) -> Self {
        Self {
            texts: ids.iter().map(|id| (id.to_string(), text.to_string())).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TextSource for MemorySource {
    async fn size_hint(&self, item: &WorkItem) -> Option<u64> {
        self.texts.get(&item.id).map(|t| t.len() as u64)
    }

    async fn fetch(&self, item: &WorkItem) -> Result<ExtractedText> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if item.id.contains("boom") {
            panic!("backend crashed on {}", item.id);
        }
        match self.texts.get(&item.id) {
            Some(text) => Ok(ExtractedText {
                text: text.clone(),
                byte_size: text.len() as u64,
                method: ExtractionMethod::PlainText,
            }),
            None => Err(Error::Extraction(format!("unreadable file {}", item.id))),
        }
    }
}

/// Store double that records calls and can be told to fail.
#[derive(Default)]
struct MockStore {
    fail_stage: bool,
    no_match: bool,
    staged: Mutex<Vec<String>>,
    committed: Mutex<Vec<(String, CommitUpdate)>>,
}

impl MetadataStore for MockStore {
    fn stage_initial(&self, item: &WorkItem, _size: u64) -> Result<i64> {
        if self.fail_stage {
            return Err(Error::Database("connection refused".into()));
        }
        let mut staged = self.staged.lock();
        staged.push(item.id.clone());
        Ok(staged.len() as i64)
    }

    fn commit_processed(&self, id: &str, update: &CommitUpdate) -> Result<CommitStatus> {
        if self.no_match {
            return Ok(CommitStatus::NoMatch);
        }
        self.committed.lock().push((id.to_string(), update.clone()));
        Ok(CommitStatus::Updated)
    }
}

struct BrokenEnricher;

impl Enricher for BrokenEnricher {
    fn summarize(&self, _text: &str, _max: usize) -> Result<String> {
        Err(Error::Enrichment("model unavailable".into()))
    }

    fn extract_keywords(&self, _text: &str, _top_n: usize) -> Result<Vec<String>> {
        Err(Error::Enrichment("model unavailable".into()))
    }
}

fn mock_pipeline(source: Arc<MemorySource>, store: Arc<MockStore>, enricher: Arc<dyn Enricher>) -> Pipeline {
    let dir = std::env::temp_dir();
    Pipeline::new(config(&dir), source, enricher, store)
}

const BODY: &str = "Storage engines persist pages to disk.\n\n\
                    Compaction merges segments in the background.\n\n\
                    The key result shows significant write savings.";

/// Five local files where the third is not valid text: four succeed, the
/// third fails extraction, all five were staged.
#[tokio::test]
async fn test_folder_batch_with_one_unreadable_file() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    for i in 1..=5 {
        let path = docs.path().join(format!("file{}.txt", i));
        if i == 3 {
            std::fs::write(&path, [0xffu8, 0xfe, 0xfd, 0x00]).unwrap();
        } else {
            std::fs::write(&path, BODY).unwrap();
        }
    }
    let (pipeline, store) = real_pipeline(data.path());

    let result = pipeline
        .run(BatchRequest::Folder(docs.path().to_path_buf()), Some(2))
        .await
        .unwrap();

    assert_eq!(result.success_count, 4);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.dispatched, 5);
    assert_eq!(result.errors.len(), 1);
    let third = docs.path().join("file3.txt").to_string_lossy().to_string();
    assert_eq!(result.errors[&third].kind, FailureKind::ExtractionFailed);
    assert_eq!(result.categories[&LengthCategory::Short], 4);

    let stats = store.get_stats().unwrap();
    assert_eq!(stats.total_documents, 5);
    assert_eq!(stats.committed_documents, 4);
    let failed = store.latest_for_source(&third).unwrap().unwrap();
    assert!(!failed.is_committed());

    let ok = docs.path().join("file1.txt").to_string_lossy().to_string();
    let committed = store.latest_for_source(&ok).unwrap().unwrap();
    assert_eq!(committed.length_category, Some(LengthCategory::Short));
    assert!(!committed.summary.unwrap().is_empty());
    assert!(!committed.keywords.unwrap().is_empty());
}

/// Manifest with a served URL, a local path and a missing path: the
/// missing one is rejected without reaching a worker.
#[tokio::test]
async fn test_manifest_batch_mixed_entries() {
    use axum::{routing::get, Router};

    let app = Router::new().route(
        "/report.txt",
        get(|| async { "Remote paragraph one.\n\nRemote paragraph two." }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let data = tempfile::tempdir().unwrap();
    let local = data.path().join("local.txt");
    std::fs::write(&local, BODY).unwrap();
    let manifest = data.path().join("manifest.json");
    std::fs::write(
        &manifest,
        serde_json::json!({
            "remote": format!("http://{}/report.txt", addr),
            "local": local.to_string_lossy(),
            "missing": "/nope/missing.txt",
        })
        .to_string(),
    )
    .unwrap();

    let (pipeline, store) = real_pipeline(data.path());
    let sink = Arc::new(CountingSink::default());
    let pipeline = pipeline.with_sink(sink.clone());

    let result = pipeline.run(BatchRequest::Manifest(manifest), None).await.unwrap();

    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.dispatched, 2);
    assert_eq!(result.errors["/nope/missing.txt"].kind, FailureKind::InvalidInput);
    assert_eq!(sink.0.lock().len(), 2);

    let remote = store
        .latest_for_source(&format!("http://{}/report.txt", addr))
        .unwrap()
        .unwrap();
    assert!(remote.is_committed());
    assert_eq!(remote.size, 44);
}

/// A failed stage aborts the item before extraction.
#[tokio::test]
async fn test_stage_failure_aborts_item() {
    let source = Arc::new(MemorySource::with(&["a", "b"], BODY));
    let store = Arc::new(MockStore {
        fail_stage: true,
        ..Default::default()
    });
    let pipeline = mock_pipeline(source.clone(), store.clone(), Arc::new(HeuristicEnricher::default()));

    let result = pipeline
        .process_batch(vec![WorkItem::file("a"), WorkItem::file("b")], Some(2))
        .await;

    assert_eq!(result.failure_count, 2);
    assert!(result.errors.values().all(|f| f.kind == FailureKind::StoreFailed));
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    assert!(store.committed.lock().is_empty());
}

/// Zero matches on commit is reported but the item still succeeds.
#[tokio::test]
async fn test_commit_no_match_is_not_a_failure() {
    let source = Arc::new(MemorySource::with(&["a"], BODY));
    let store = Arc::new(MockStore {
        no_match: true,
        ..Default::default()
    });
    let pipeline = mock_pipeline(source, store, Arc::new(HeuristicEnricher::default()));

    let report = pipeline.process_one(&WorkItem::file("a")).await.unwrap();
    assert!(!report.commit_matched);
    assert_eq!(report.category, LengthCategory::Short);
    assert_eq!(report.paragraphs, 3);
}

/// Enrichment errors degrade to empty summary and keywords.
#[tokio::test]
async fn test_enrichment_failure_degrades() {
    let source = Arc::new(MemorySource::with(&["a"], BODY));
    let store = Arc::new(MockStore::default());
    let pipeline = mock_pipeline(source, store.clone(), Arc::new(BrokenEnricher));

    let report = pipeline.process_one(&WorkItem::file("a")).await.unwrap();
    assert!(report.degraded);

    let committed = store.committed.lock();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].1.summary, "");
    assert!(committed[0].1.keywords.is_empty());
    assert_eq!(committed[0].1.length_category, Some(LengthCategory::Short));
}

/// One stage and one commit per successful attempt, with the values the
/// enricher produced.
#[tokio::test]
async fn test_one_stage_one_commit_per_item() {
    let source = Arc::new(MemorySource::with(&["a"], BODY));
    let store = Arc::new(MockStore::default());
    let pipeline = mock_pipeline(source, store.clone(), Arc::new(HeuristicEnricher::default()));

    pipeline.process_one(&WorkItem::file("a")).await.unwrap();

    assert_eq!(*store.staged.lock(), vec!["a".to_string()]);
    let committed = store.committed.lock();
    assert_eq!(committed.len(), 1);
    let expected = HeuristicEnricher::default().extract_keywords(BODY, 10).unwrap();
    assert_eq!(committed[0].1.keywords, expected);
    assert_eq!(committed[0].1.size, Some(BODY.len() as u64));
}

/// A panicking backend fails only its own item.
#[tokio::test]
async fn test_panic_is_contained_to_item() {
    let source = Arc::new(MemorySource::with(&["a", "c"], BODY));
    let store = Arc::new(MockStore::default());
    let sink = Arc::new(CountingSink::default());
    let pipeline = mock_pipeline(source, store, Arc::new(HeuristicEnricher::default()))
        .with_sink(sink.clone());

    let items = vec![WorkItem::file("a"), WorkItem::file("boom"), WorkItem::file("c")];
    let result = pipeline.process_batch(items, Some(2)).await;

    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.errors["boom"].kind, FailureKind::Internal);
    assert_eq!(sink.0.lock().len(), 3);
}

/// Invalid items handed straight to `process_one` never touch the store.
#[tokio::test]
async fn test_invalid_item_rejected_before_stage() {
    let source = Arc::new(MemorySource::default());
    let store = Arc::new(MockStore::default());
    let pipeline = mock_pipeline(source, store.clone(), Arc::new(HeuristicEnricher::default()));

    let failure = pipeline
        .process_one(&WorkItem::url("ftp://x.org/a", false))
        .await
        .unwrap_err();
    assert_eq!(failure.kind, FailureKind::InvalidInput);
    assert!(store.staged.lock().is_empty());
}

/// Every item yields exactly one outcome, whatever mix of failures.
#[tokio::test]
async fn test_outcome_count_matches_items() {
    let good: Vec<String> = (0..12).map(|i| format!("doc{}", i)).collect();
    let refs: Vec<&str> = good.iter().map(String::as_str).collect();
    let source = Arc::new(MemorySource::with(&refs, BODY));
    let store = Arc::new(MockStore::default());
    let pipeline = mock_pipeline(source, store, Arc::new(HeuristicEnricher::default()));

    let mut items: Vec<WorkItem> = good.iter().map(WorkItem::file).collect();
    items.push(WorkItem::file("missing-1"));
    items.push(WorkItem::file("boom-1"));
    items.push(WorkItem::url("not a url", false));

    let result = pipeline.process_batch(items, Some(4)).await;
    assert_eq!(result.total(), 15);
    assert_eq!(result.success_count, 12);
    assert_eq!(result.dispatched, 15);
}

/// The pool never runs more items at once than its size.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_is_bounded() {
    let ids: Vec<String> = (0..12).map(|i| format!("doc{}", i)).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let mut source = MemorySource::with(&refs, BODY);
    source.delay = Duration::from_millis(30);
    let source = Arc::new(source);
    let store = Arc::new(MockStore::default());
    let pipeline = mock_pipeline(source.clone(), store, Arc::new(HeuristicEnricher::default()));

    let items = ids.iter().map(WorkItem::file).collect();
    let result = pipeline.process_batch(items, Some(3)).await;

    assert_eq!(result.success_count, 12);
    let peak = source.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {}", peak);
    assert!(peak >= 2, "peak concurrency {}", peak);
}

/// Re-ingesting a source adds a fresh record; the old one is kept.
#[tokio::test]
async fn test_reingestion_adds_record() {
    let data = tempfile::tempdir().unwrap();
    let path = data.path().join("again.txt");
    std::fs::write(&path, BODY).unwrap();
    let (pipeline, store) = real_pipeline(data.path());
    let item = WorkItem::file(path.to_string_lossy());

    pipeline.process_one(&item).await.unwrap();
    pipeline.process_one(&item).await.unwrap();

    let records = store.records_for_source(&item.id).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_committed()));
}

/// An empty folder produces an empty, clean result.
#[tokio::test]
async fn test_empty_folder() {
    let data = tempfile::tempdir().unwrap();
    let docs = tempfile::tempdir().unwrap();
    let (pipeline, _store) = real_pipeline(data.path());

    let result = pipeline
        .run(BatchRequest::Folder(docs.path().to_path_buf()), None)
        .await
        .unwrap();
    assert_eq!(result.total(), 0);
    assert!(result.is_clean());
}

/// Download-mode URLs sharing a file name each commit their own content.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_download_batch_keeps_items_apart() {
    use axum::{extract::Path as UrlPath, routing::get, Router};

    let app = Router::new().route(
        "/{n}/doc.txt",
        get(|UrlPath(n): UrlPath<u32>| async move { format!("uniq{}", n) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let data = tempfile::tempdir().unwrap();
    let (pipeline, store) = real_pipeline(data.path());
    let urls: Vec<String> = (0..32).map(|n| format!("http://{}/{}/doc.txt", addr, n)).collect();
    let items = urls.iter().map(|u| WorkItem::url(u.clone(), true)).collect();

    let result = pipeline.process_batch(items, Some(8)).await;
    assert_eq!(result.success_count, 32);

    for (n, url) in urls.iter().enumerate() {
        let record = store.latest_for_source(url).unwrap().unwrap();
        assert_eq!(record.keywords, Some(vec![format!("uniq{}", n)]), "{}", url);
        assert_eq!(record.size, format!("uniq{}", n).len() as u64);
    }
}
