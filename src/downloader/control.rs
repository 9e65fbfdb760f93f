//! Run lifecycle control: start, pause, resume, command channel.
//!
//! The transition table (current status x command):
//!
//! | status            | START    | PAUSE  | RESUME          |
//! |-------------------|----------|--------|-----------------|
//! | idle              | init     | no-op  | init            |
//! | running           | no-op    | pause  | no-op           |
//! | paused            | no-op    | no-op  | continue        |
//! | completed / error | init     | no-op  | init            |
//!
//! Pause is cooperative: it flips the persisted status, and the loop
//! observes it at its next per-item checkpoint. The persisted status is
//! the sole cancellation mechanism, so a pause survives a process
//! restart just like completed work does.

use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{Command, RunStatus};

use super::TranscriptDownloader;

impl TranscriptDownloader {
    /// Handle one control command
    ///
    /// Commands map onto [`start`](Self::start), [`pause`](Self::pause)
    /// and [`resume`](Self::resume); unexpected command/state pairs are
    /// no-ops, so at-least-once delivery is safe.
    pub async fn handle_command(&self, command: Command) -> Result<()> {
        tracing::debug!(?command, "handling command");
        match command {
            Command::Start => self.start().await,
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
        }
    }

    /// Drain an asynchronous command channel until it closes
    ///
    /// Commands are processed strictly in arrival order. Handler errors
    /// are logged and do not stop the loop.
    pub fn spawn_control_loop(
        &self,
        mut commands: mpsc::Receiver<Command>,
    ) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                if let Err(e) = downloader.handle_command(command).await {
                    tracing::error!(?command, error = %e, "command handling failed");
                }
            }
        })
    }

    /// Start a fresh run
    ///
    /// Re-initializes from the current course context: clears the log,
    /// refetches the curriculum, and processes every item from the top.
    /// Ignored while a run is active or paused (use
    /// [`resume`](Self::resume) to continue a paused run).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use lecture_dl::*;
    /// # async fn example(downloader: TranscriptDownloader) -> Result<()> {
    /// downloader.start().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start(&self) -> Result<()> {
        let status = self.store.get().await?.status;
        match status {
            RunStatus::Running | RunStatus::Paused => {
                tracing::debug!(?status, "START ignored; a run already exists, use RESUME");
                Ok(())
            }
            RunStatus::Idle | RunStatus::Completed | RunStatus::Error => {
                // Flip to running before spawning so a second START
                // arriving right behind this one reads `running` and
                // becomes a no-op instead of a duplicate run.
                self.store
                    .update(|state| {
                        state.status = RunStatus::Running;
                        state.current_task = "Starting...".to_string();
                    })
                    .await?;
                self.spawn_run(false);
                Ok(())
            }
        }
    }

    /// Request a pause of the active run
    ///
    /// Takes effect at the next loop checkpoint, not instantaneously:
    /// an in-flight item is allowed to finish and persist before the
    /// loop stops, so no partial item state ever exists. A no-op in
    /// any status other than `running`.
    pub async fn pause(&self) -> Result<()> {
        let status = self.store.get().await?.status;
        if status != RunStatus::Running {
            tracing::debug!(?status, "PAUSE ignored; no active run");
            return Ok(());
        }

        self.store
            .update(|state| {
                if state.status == RunStatus::Running {
                    state.status = RunStatus::Paused;
                }
            })
            .await?;

        tracing::info!("pause requested; loop stops at the next checkpoint");
        Ok(())
    }

    /// Resume a paused run, or start over when there is nothing to continue
    ///
    /// From `paused` this re-enters the processing loop at the first
    /// incomplete item without touching the curriculum. From `idle`,
    /// `completed` or `error` there is no meaningful partial state, so
    /// this is equivalent to [`start`](Self::start). A no-op while
    /// already `running`.
    pub async fn resume(&self) -> Result<()> {
        let status = self.store.get().await?.status;
        match status {
            RunStatus::Running => {
                tracing::debug!("RESUME ignored; run already active");
                Ok(())
            }
            RunStatus::Paused => {
                // Same read-then-flip discipline as START: a repeated
                // RESUME reads `running` and stays a no-op.
                self.store
                    .update(|state| {
                        if state.status == RunStatus::Paused {
                            state.status = RunStatus::Running;
                            state.current_task = "Resuming...".to_string();
                        }
                    })
                    .await?;
                self.spawn_run(true);
                Ok(())
            }
            RunStatus::Idle | RunStatus::Completed | RunStatus::Error => {
                tracing::debug!(?status, "RESUME with no partial run; re-initializing");
                self.store
                    .update(|state| {
                        state.status = RunStatus::Running;
                        state.current_task = "Starting...".to_string();
                    })
                    .await?;
                self.spawn_run(false);
                Ok(())
            }
        }
    }

    /// Spawn the run task in the background
    fn spawn_run(&self, resume: bool) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        tokio::spawn(async move { downloader.run(resume).await })
    }
}
