//! The run task: initialization, sequential processing loop, finalization.

use crate::archive;
use crate::error::{Error, Result};
use crate::transcript;
use crate::types::{ItemKind, RunState, RunStatus};

use super::TranscriptDownloader;

/// Content recorded for a lecture whose transcript legitimately does not exist
pub const NO_TRANSCRIPT_MARKER: &str = "> [No Transcript Available]";

impl TranscriptDownloader {
    /// Execute one run attempt (full initialization or continuation)
    ///
    /// At most one run task makes progress at a time: the task that
    /// fails to take the run guard exits immediately, leaving the
    /// already-active loop in charge. Any error escaping
    /// initialization or finalization lands the run in the `error`
    /// status with its data intact, so a later START retries cleanly.
    pub(crate) async fn run(&self, resume: bool) {
        let Ok(_active) = self.run_guard.try_lock() else {
            tracing::debug!("processing loop already active");
            return;
        };

        if let Err(e) = self.run_inner(resume).await {
            tracing::error!(error = %e, "run failed");
            let persisted = self
                .store
                .update(|state| {
                    state.status = RunStatus::Error;
                    state.current_task = format!("Error: {}", e);
                })
                .await;
            if let Err(store_err) = persisted {
                tracing::error!(error = %store_err, "failed to persist error status");
            }
        }
    }

    async fn run_inner(&self, resume: bool) -> Result<()> {
        let state = self.store.get().await?;
        let continuing =
            resume && matches!(state.status, RunStatus::Paused | RunStatus::Running);
        if resume && !continuing {
            // A concurrent resume already finished this run; there is
            // nothing left to continue.
            tracing::debug!(status = ?state.status, "stale resume; nothing to continue");
            return Ok(());
        }

        if continuing {
            tracing::info!(completed = state.completed_count, "resuming run");
            self.store
                .update(|state| {
                    state.status = RunStatus::Running;
                    state.current_task = "Resuming...".to_string();
                })
                .await?;
        } else {
            self.initialize().await?;
        }

        // The loop iterates a snapshot of the curriculum; the stored
        // order never changes after initialization, so positions in the
        // snapshot and in the store stay aligned.
        let snapshot = self.store.get().await?;
        let course_id = snapshot
            .course_id
            .ok_or_else(|| Error::Context("course id missing from run state".to_string()))?;

        for (index, item) in snapshot.items.iter().enumerate() {
            // Checkpoint: re-read the persisted status so a PAUSE
            // written by the control surface is observed here. The
            // re-check inside the write handles a RESUME landing
            // between the read and the write: this loop then simply
            // keeps going (the freshly spawned run task bows out on
            // the run guard).
            if self.store.get().await?.status == RunStatus::Paused {
                let observed = self
                    .store
                    .update(|state| {
                        if state.status == RunStatus::Paused {
                            state.current_task = "Paused by user.".to_string();
                        }
                    })
                    .await?;
                if observed.status == RunStatus::Paused {
                    tracing::info!(completed = observed.completed_count, "run paused");
                    return Ok(());
                }
            }

            if !item.needs_transcript() {
                continue;
            }

            self.store
                .update(|state| state.current_task = format!("Processing: {}", item.title))
                .await?;

            match self.source.fetch_transcript(course_id, item.id).await {
                Ok(raw) => {
                    let content = match raw.map(|vtt| transcript::vtt_to_text(&vtt)) {
                        Some(text) if !text.is_empty() => text,
                        _ => NO_TRANSCRIPT_MARKER.to_string(),
                    };

                    self.store
                        .update(|state| {
                            if let Some(stored) = state.items.get_mut(index) {
                                stored.completed = true;
                                stored.content = Some(content);
                            }
                            state.completed_count = completed_lectures(state);
                        })
                        .await?;
                    tracing::debug!(item_id = %item.id, title = %item.title, "item persisted");
                }
                Err(e) => {
                    // Error isolation: log and move on, the item stays
                    // incomplete and is only revisited by a fresh START.
                    tracing::warn!(item_id = %item.id, title = %item.title, error = %e, "item failed; continuing");
                    self.store
                        .update(|state| state.log.push(format!("Error on {}: {}", item.title, e)))
                        .await?;
                }
            }
        }

        self.finalize().await
    }

    /// Full (re-)initialization for a fresh START
    async fn initialize(&self) -> Result<()> {
        let context = self.context.course_context()?;
        tracing::info!(
            course_id = %context.course_id,
            course_title = %context.course_title,
            "initializing run"
        );

        self.store
            .update(|state| {
                *state = RunState {
                    status: RunStatus::Running,
                    course_id: Some(context.course_id),
                    course_title: context.course_title.clone(),
                    current_task: "Fetching curriculum...".to_string(),
                    ..RunState::default()
                };
            })
            .await?;

        let items = self.source.fetch_curriculum(context.course_id).await?;
        let total_video_lectures = items
            .iter()
            .filter(|item| item.kind == ItemKind::Lecture && item.has_video_asset)
            .count() as u32;

        self.store
            .update(|state| {
                state.items = items;
                state.total_video_lectures = total_video_lectures;
                state.completed_count = 0;
                state.current_task = "Starting download...".to_string();
                state.log.push("Curriculum loaded".to_string());
            })
            .await?;

        tracing::info!(total_video_lectures, "curriculum loaded");
        Ok(())
    }

    /// Assemble and deliver the archive, then mark the run completed
    async fn finalize(&self) -> Result<()> {
        self.store
            .update(|state| state.current_task = "Zipping files...".to_string())
            .await?;

        let state = self.store.get().await?;
        if let Err(e) = self.build_and_deliver(&state).await {
            self.store
                .update(|state| state.log.push(format!("Archive failed: {}", e)))
                .await?;
            return Err(e);
        }

        self.store
            .update(|state| {
                state.status = RunStatus::Completed;
                state.current_task = "Download finished".to_string();
            })
            .await?;
        tracing::info!("run completed");
        Ok(())
    }

    async fn build_and_deliver(&self, state: &RunState) -> Result<()> {
        let bytes = archive::build_archive(
            &state.items,
            &state.course_title,
            self.config.archive.compression_level,
        )?;
        let name = format!(
            "{}_Transcripts.zip",
            archive::sanitize_title(&state.course_title)
        );
        self.sink.deliver(&name, bytes).await
    }
}

/// Count of completed lecture items, the persisted `completed_count`
fn completed_lectures(state: &RunState) -> u32 {
    state
        .items
        .iter()
        .filter(|item| item.kind == ItemKind::Lecture && item.completed)
        .count() as u32
}
