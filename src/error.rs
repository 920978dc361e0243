//! Error types for story-dl
//!
//! This module provides the error taxonomy for the library:
//! - [`Error`] for failures while constructing a downloader (bad config, I/O, HTTP client)
//! - [`FetchError`] for a story page that could not be retrieved
//! - [`ExtractError`] for a page that carries no usable story data
//! - [`MediaError`] for a single failed media fetch attempt
//!
//! Inside a batch none of these are fatal: every failure is converted into a
//! log line and the affected username or descriptor is skipped.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for story-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for story-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error (HTTP client construction)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Story page could not be fetched
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Story page carried no stories
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Failure to retrieve a user's story page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The host could not be reached or answered with a non-success status
    #[error("story page for {username} unreachable: {reason}")]
    Unreachable {
        /// Username whose page was requested
        username: String,
        /// Transport error or HTTP status description
        reason: String,
    },
}

/// Failure to find story descriptors in a fetched page
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// No embedded data block, undecodable data, or an empty story list
    #[error("no stories found")]
    NoStories,
}

/// Failure of a single media fetch attempt
///
/// Only [`MediaError::Transport`] and [`MediaError::Stalled`] are transient; see [`crate::retry::IsRetryable`].
#[derive(Debug, Error)]
pub enum MediaError {
    /// Request or body stream failed at the transport level
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Connection produced no response or body data within the media timeout
    #[error("no data received for {}ms", .0.as_millis())]
    Stalled(Duration),

    /// Remote answered with a status other than 200
    #[error("unexpected HTTP status {0}")]
    BadStatus(u16),

    /// Response carried a supported media type but no entity tag
    #[error("response has no entity tag")]
    MissingEntityTag,

    /// Writing the media to disk failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
