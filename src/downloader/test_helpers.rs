//! Shared test helpers for building TranscriptDownloader instances in tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::{Semaphore, watch};

use crate::archive::DeliverySink;
use crate::client::{ContextSource, CurriculumSource, StaticContext};
use crate::config::Config;
use crate::error::{ArchiveError, RemoteError, Result};
use crate::store::StateStore;
use crate::types::{CourseId, ItemId, ItemKind, RunState, WorkItem};

use super::TranscriptDownloader;

pub(crate) const TEST_COURSE_ID: i64 = 101;
pub(crate) const TEST_COURSE_TITLE: &str = "Test Course";

pub(crate) fn chapter(id: i64, title: &str) -> WorkItem {
    WorkItem {
        kind: ItemKind::Chapter,
        id: ItemId(id),
        title: title.to_string(),
        ordinal: id,
        has_video_asset: false,
        completed: false,
        content: None,
    }
}

pub(crate) fn video_lecture(id: i64, title: &str) -> WorkItem {
    WorkItem {
        kind: ItemKind::Lecture,
        id: ItemId(id),
        title: title.to_string(),
        ordinal: id,
        has_video_asset: true,
        completed: false,
        content: None,
    }
}

pub(crate) fn article_lecture(id: i64, title: &str) -> WorkItem {
    WorkItem {
        has_video_asset: false,
        ..video_lecture(id, title)
    }
}

pub(crate) fn quiz(id: i64, title: &str) -> WorkItem {
    WorkItem {
        kind: ItemKind::Quiz,
        ..chapter(id, title)
    }
}

/// The curriculum from the archive layout example: two chapters, one
/// video lecture each.
pub(crate) fn sample_curriculum() -> Vec<WorkItem> {
    vec![
        chapter(1, "Intro"),
        video_lecture(2, "Welcome"),
        chapter(3, "Basics"),
        video_lecture(4, "Vars"),
    ]
}

/// Plain-text transcripts for [`sample_curriculum`] (plain text passes
/// through the normalizer unchanged).
pub(crate) fn sample_transcripts() -> HashMap<i64, String> {
    HashMap::from([
        (2, "Welcome text".to_string()),
        (4, "Vars text".to_string()),
    ])
}

/// Scripted in-memory curriculum source with call accounting
pub(crate) struct MockSource {
    items: Vec<WorkItem>,
    transcripts: HashMap<i64, String>,
    failures: HashSet<i64>,
    fail_curriculum: bool,
    /// Number of fetch_curriculum calls
    pub(crate) curriculum_calls: AtomicUsize,
    /// Every fetch_transcript call, in order
    pub(crate) transcript_calls: Mutex<Vec<ItemId>>,
    /// When set, every transcript fetch consumes one permit first,
    /// letting tests control exactly how far the loop advances
    gate: Option<Arc<Semaphore>>,
}

impl MockSource {
    pub(crate) fn new(items: Vec<WorkItem>, transcripts: HashMap<i64, String>) -> Self {
        Self {
            items,
            transcripts,
            failures: HashSet::new(),
            fail_curriculum: false,
            curriculum_calls: AtomicUsize::new(0),
            transcript_calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Make transcript fetches for the given item ids fail
    pub(crate) fn with_failures(mut self, ids: &[i64]) -> Self {
        self.failures = ids.iter().copied().collect();
        self
    }

    /// Make the curriculum fetch fail with a 503
    pub(crate) fn with_curriculum_failure(mut self) -> Self {
        self.fail_curriculum = true;
        self
    }

    /// Gate transcript fetches behind a semaphore
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// How many times the transcript for `id` was fetched
    pub(crate) fn transcript_call_count(&self, id: i64) -> usize {
        self.transcript_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| called.0 == id)
            .count()
    }
}

#[async_trait]
impl CurriculumSource for MockSource {
    async fn fetch_curriculum(&self, _course: CourseId) -> Result<Vec<WorkItem>> {
        self.curriculum_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_curriculum {
            return Err(RemoteError::CurriculumStatus { status: 503 }.into());
        }
        Ok(self.items.clone())
    }

    async fn fetch_transcript(&self, _course: CourseId, lecture: ItemId) -> Result<Option<String>> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.transcript_calls.lock().unwrap().push(lecture);
        if self.failures.contains(&lecture.0) {
            return Err(
                RemoteError::MalformedResponse(format!("injected failure for item {}", lecture))
                    .into(),
            );
        }
        Ok(self.transcripts.get(&lecture.0).cloned())
    }
}

/// Delivery sink that collects archives in memory
#[derive(Default)]
pub(crate) struct MemorySink {
    delivered: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub(crate) fn delivered_archives(&self) -> Vec<(String, Vec<u8>)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliverySink for MemorySink {
    async fn deliver(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.delivered.lock().unwrap().push((name.to_string(), bytes));
        Ok(())
    }
}

/// Delivery sink that always fails
pub(crate) struct FailingSink;

#[async_trait]
impl DeliverySink for FailingSink {
    async fn deliver(&self, name: &str, _bytes: Vec<u8>) -> Result<()> {
        Err(ArchiveError::Deliver {
            name: name.to_string(),
            reason: "sink rejected the archive".to_string(),
        }
        .into())
    }
}

/// Build a pipeline over a fresh temp store with an in-memory sink.
/// Returns the tempdir too; it must be kept alive for the test's duration.
pub(crate) async fn create_test_downloader(
    source: Arc<MockSource>,
) -> (TranscriptDownloader, Arc<MemorySink>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let sink = Arc::new(MemorySink::default());
    let downloader = downloader_at(
        &temp_dir.path().join("state.db"),
        &temp_dir.path().join("downloads"),
        source,
        sink.clone(),
    )
    .await;
    (downloader, sink, temp_dir)
}

/// Build a pipeline on an explicit database path (used by recovery
/// tests to reopen the same store after a simulated restart).
pub(crate) async fn downloader_at(
    db_path: &Path,
    output_dir: &Path,
    source: Arc<dyn CurriculumSource>,
    sink: Arc<dyn DeliverySink>,
) -> TranscriptDownloader {
    let mut config = Config::default();
    config.persistence.database_path = db_path.to_path_buf();
    config.archive.output_dir = output_dir.to_path_buf();

    let store = Arc::new(StateStore::open(db_path).await.unwrap());
    let context: Arc<dyn ContextSource> =
        Arc::new(StaticContext::new(TEST_COURSE_ID, TEST_COURSE_TITLE));

    TranscriptDownloader::with_components(config, store, source, context, sink)
}

/// Wait (bounded) until the subscribed run state satisfies a predicate
pub(crate) async fn wait_for<F>(rx: &mut watch::Receiver<RunState>, mut predicate: F) -> RunState
where
    F: FnMut(&RunState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            {
                let state = rx.borrow_and_update().clone();
                if predicate(&state) {
                    return state;
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("timed out waiting for run state")
}
