//! Core types for story-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Event emitted while a batch runs
///
/// Every batch ends with exactly one [`Event::Complete`], including cancelled
/// and empty batches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Share of usernames processed so far (0 to 100)
    Progress {
        /// Progress percentage, rounded down
        percent: u8,
    },

    /// Human-readable log line
    Log {
        /// The message
        line: String,
    },

    /// The batch finished or was cancelled
    Complete,
}

/// Media kind declared by a response's content type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image, stored as `.jpeg`
    Image,
    /// Video, stored as `.mp4`
    Video,
}

impl MediaKind {
    /// Classify a `Content-Type` value; `None` for anything that is neither image nor video
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.contains("image") {
            Some(MediaKind::Image)
        } else if content_type.contains("video") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "jpeg",
            MediaKind::Video => "mp4",
        }
    }
}

/// Content-stable identity of a media item: its entity tag plus its kind
///
/// The same remote content yields the same identity on every run, which makes
/// it both the deduplication key and the file name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MediaIdentity {
    tag: String,
    kind: MediaKind,
}

impl MediaIdentity {
    /// Build an identity from a raw `ETag` header value
    ///
    /// Quote characters are stripped and path separators replaced with `_`.
    /// Returns `None` if nothing is left of the tag.
    pub fn from_entity_tag(etag: &str, kind: MediaKind) -> Option<Self> {
        let tag: String = etag
            .chars()
            .filter(|c| *c != '"')
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let tag = tag.trim();

        if tag.is_empty() || tag == "." || tag == ".." {
            return None;
        }

        Some(Self {
            tag: tag.to_string(),
            kind,
        })
    }

    /// The cleaned entity tag, used as the file stem
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The media kind
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// File name `<tag>.<ext>`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.tag, self.kind.extension())
    }
}

impl std::fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// One story item found on a page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaDescriptor {
    /// Position within the page's story list
    pub position: usize,
    /// Media location; may be empty when the host withholds it
    pub media_url: String,
}

/// Result of handling one descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Media written to `path`
    Saved {
        /// File name within the destination directory
        file_name: String,
        /// Full path of the written file
        path: PathBuf,
    },
    /// A file with the same identity already exists; nothing transferred
    Skipped {
        /// File name within the destination directory
        file_name: String,
        /// Full path of the existing file
        path: PathBuf,
    },
    /// Content type is neither image nor video
    Unsupported,
    /// The descriptor could not be downloaded
    Failed(FailureReason),
    /// Cancellation was observed; no further descriptors should be processed
    Cancelled,
}

/// Why a descriptor failed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// Descriptor has no media URL
    NoUrl,
    /// Remote answered with a non-200 status
    BadStatus(u16),
    /// Supported media without an entity tag, so no identity can be derived
    MissingEntityTag,
    /// Local file system error while saving
    Io(String),
    /// Every try failed at the transport level
    Exhausted {
        /// Number of tries made
        attempts: u32,
        /// Error from the final try
        last_error: String,
    },
}
