//! # story-dl
//!
//! Backend library that archives the stories a user currently has published,
//! writing every unique media item to disk exactly once.
//!
//! ## Design Philosophy
//!
//! story-dl is designed to be:
//! - **Idempotent** - Media is named after its entity tag, so re-runs skip what is already saved
//! - **Forgiving** - A bad username or item is logged and skipped, never fatal to the batch
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Progress, log lines and completion arrive on a channel
//!
//! ## Quick Start
//!
//! ```no_run
//! use story_dl::{Config, Event, StoryDownloader};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = StoryDownloader::new(Config::default()).await?;
//!
//!     let cancel = CancellationToken::new();
//!     let (handle, mut events) =
//!         downloader.spawn(vec!["alice".to_string(), "bob".to_string()], cancel.clone());
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             Event::Progress { percent } => println!("{}%", percent),
//!             Event::Log { line } => println!("{}", line),
//!             Event::Complete => break,
//!         }
//!     }
//!     handle.await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Batch orchestration
pub mod batch;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Story descriptor extraction
pub mod extractor;
/// Story page retrieval
pub mod fetcher;
/// Media download
pub mod media;
/// Bounded retry logic
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use batch::StoryDownloader;
pub use config::{Config, DirectoryLayout, RetryConfig};
pub use error::{Error, ExtractError, FetchError, MediaError, Result};
pub use retry::{Delay, TokioDelay};
pub use types::{DownloadOutcome, Event, FailureReason, MediaDescriptor, MediaIdentity, MediaKind};
pub use tokio_util::sync::CancellationToken;

/// Cancel `cancel` when the process receives a termination signal.
///
/// A running batch observes the token at its next checkpoint, emits its
/// cancellation notice and completes.
///
/// On Unix this listens for SIGTERM and SIGINT, elsewhere for Ctrl+C. A
/// signal that cannot be registered is never treated as received.
///
/// # Example
///
/// ```no_run
/// use story_dl::{CancellationToken, Config, StoryDownloader, cancel_on_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = StoryDownloader::new(Config::default()).await?;
///     let cancel = CancellationToken::new();
///     tokio::spawn(cancel_on_signal(cancel.clone()));
///
///     let (handle, mut events) = downloader.spawn(vec!["alice".to_string()], cancel);
///     while events.recv().await.is_some() {}
///     handle.await?;
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(cancel: CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => cancel.cancel(),
        _ = cancel.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::SignalKind;

    tokio::select! {
        _ = recv_signal(SignalKind::terminate(), "SIGTERM") => {}
        _ = recv_signal(SignalKind::interrupt(), "SIGINT") => {}
    }
}

/// Resolve on the first delivery of `kind`, or never if it cannot be registered
#[cfg(unix)]
async fn recv_signal(kind: tokio::signal::unix::SignalKind, name: &'static str) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
            tracing::info!(signal = name, "Received termination signal");
        }
        Err(e) => {
            // Registration fails in some sandboxes; the other signal may still work
            tracing::warn!(signal = name, error = %e, "Could not register signal handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
