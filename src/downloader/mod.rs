//! Core pipeline implementation split into focused submodules.
//!
//! The `TranscriptDownloader` struct and its methods are organized by domain:
//! - [`control`] - Run lifecycle control (start/pause/resume, command channel)
//! - [`run`] - Initialization, sequential processing loop, finalization

mod control;
mod run;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use run::NO_TRANSCRIPT_MARKER;

use std::sync::Arc;

use crate::archive::{DeliverySink, DirectorySink};
use crate::client::{ContextSource, CurriculumSource, UdemyClient};
use crate::config::Config;
use crate::error::Result;
use crate::store::StateStore;
use crate::types::RunState;

/// Main pipeline instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the state machine that walks the curriculum: initialization,
/// the strictly sequential processing loop, pause/resume handling,
/// per-item error isolation, and archive finalization. All durable
/// state lives in the [`StateStore`]; the struct itself carries no
/// run data, which is what makes a restarted process able to resume.
#[derive(Clone)]
pub struct TranscriptDownloader {
    /// Persistent run state (shared with any control surface)
    pub(crate) store: Arc<StateStore>,
    /// Remote curriculum and transcript source
    pub(crate) source: Arc<dyn CurriculumSource>,
    /// Course identity provider consulted at initialization
    pub(crate) context: Arc<dyn ContextSource>,
    /// Receiver of the finished archive
    pub(crate) sink: Arc<dyn DeliverySink>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Held by the active processing loop; `try_lock` failure means a
    /// loop is already running and a second one must not start
    pub(crate) run_guard: Arc<tokio::sync::Mutex<()>>,
}

impl TranscriptDownloader {
    /// Create a new TranscriptDownloader instance
    ///
    /// This validates the configuration, opens (or creates) the state
    /// database, and wires up the HTTP client and the directory
    /// delivery sink. The course identity comes from the given
    /// [`ContextSource`], consulted on every START.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the state
    /// database cannot be opened.
    pub async fn new(config: Config, context: Arc<dyn ContextSource>) -> Result<Self> {
        config.validate()?;

        let store = StateStore::open(&config.persistence.database_path).await?;
        let source = UdemyClient::new(&config.remote)?;
        let sink = DirectorySink::new(config.archive.output_dir.clone());

        Ok(Self::with_components(
            config,
            Arc::new(store),
            Arc::new(source),
            context,
            Arc::new(sink),
        ))
    }

    /// Assemble a pipeline from explicit components
    ///
    /// This is the injection seam for embedders that bring their own
    /// transport or delivery: any [`CurriculumSource`] and
    /// [`DeliverySink`] implementation can be plugged in. The
    /// configuration is taken as-is (call [`Config::validate`] first
    /// if it came from untrusted input).
    pub fn with_components(
        config: Config,
        store: Arc<StateStore>,
        source: Arc<dyn CurriculumSource>,
        context: Arc<dyn ContextSource>,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        Self {
            store,
            source,
            context,
            sink,
            config: Arc::new(config),
            run_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Read the current run state
    pub async fn state(&self) -> Result<RunState> {
        self.store.get().await
    }

    /// Subscribe to run state changes
    ///
    /// The receiver yields the current state immediately and fires on
    /// every persistence write: status transitions, per-item
    /// checkpoints, task description updates. Multiple subscribers are
    /// supported.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use lecture_dl::*;
    /// # async fn example(downloader: TranscriptDownloader) {
    /// let mut states = downloader.subscribe();
    /// tokio::spawn(async move {
    ///     while states.changed().await.is_ok() {
    ///         let state = states.borrow().clone();
    ///         println!(
    ///             "{}% - {}",
    ///             progress_percent(state.completed_count, state.total_video_lectures),
    ///             state.current_task
    ///         );
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<RunState> {
        self.store.subscribe()
    }
}
