//! # lecture-dl
//!
//! Resumable course transcript download and archiving library.
//!
//! lecture-dl walks a course's curriculum in order, fetches the caption
//! track for every video lecture, normalizes it to readable text, and
//! packs the results into one ZIP archive (a file per lecture plus a
//! merged full-course document). Progress is checkpointed after every
//! item, so an interruption, crash, or explicit pause never loses
//! completed work.
//!
//! ## Design Philosophy
//!
//! lecture-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Crash-recoverable** - Every completed item is persisted before the loop advances
//! - **Cooperative** - Pause/resume is driven through the persisted run status,
//!   so it works across process restarts
//! - **Fault-isolated** - One failing lecture is logged and skipped, never aborting the run
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lecture_dl::{Config, StaticContext, TranscriptDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = Arc::new(StaticContext::new(12345, "Rust in Practice"));
//!     let downloader = TranscriptDownloader::new(Config::default(), context).await?;
//!
//!     // Watch progress
//!     let mut states = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while states.changed().await.is_ok() {
//!             let state = states.borrow().clone();
//!             println!("{:?}: {}", state.status, state.current_task);
//!         }
//!     });
//!
//!     downloader.start().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive assembly and delivery
pub mod archive;
/// Rate-limited remote client
pub mod client;
/// Configuration types
pub mod config;
/// Core pipeline implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Persistent state store
pub mod store;
/// Caption normalization
pub mod transcript;
/// Core types
pub mod types;

// Re-export commonly used types
pub use archive::{DeliverySink, DirectorySink, archive_layout, build_archive, sanitize_title};
pub use client::{ContextSource, CurriculumSource, StaticContext, UdemyClient};
pub use config::{ArchiveConfig, Config, PersistenceConfig, RemoteConfig};
pub use downloader::{NO_TRANSCRIPT_MARKER, TranscriptDownloader};
pub use error::{ArchiveError, Error, RemoteError, Result, StoreError};
pub use store::StateStore;
pub use types::{
    Command, CourseContext, CourseId, ItemId, ItemKind, RunState, RunStatus, WorkItem,
    progress_percent,
};

/// Helper function to run the pipeline with graceful signal handling.
///
/// Waits for a termination signal and then requests a pause, so an
/// active run lands on a durable checkpoint and the next session can
/// `RESUME` it instead of starting over.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use lecture_dl::{Config, StaticContext, TranscriptDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let context = Arc::new(StaticContext::new(12345, "Rust in Practice"));
///     let downloader = TranscriptDownloader::new(Config::default(), context).await?;
///     downloader.start().await?;
///
///     // Pause gracefully on SIGTERM/SIGINT
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: TranscriptDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.pause().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
