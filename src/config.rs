//! Configuration types for story-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Browser identification sent with story page requests
pub const DEFAULT_PAGE_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:94.0) Gecko/20100101 Firefox/103.0.2";

/// Identification sent with media requests
pub const DEFAULT_MEDIA_USER_AGENT: &str = "Mozilla/5.0";

/// Public story page prefix; the username is appended verbatim
pub const DEFAULT_STORY_BASE_URL: &str = "https://story.snapchat.com/@";

/// How downloaded files are grouped below the download directory
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryLayout {
    /// `<download_dir>/<username>/<YYYY-MM-DD>/` (default)
    ///
    /// Runs on the same day share a folder, so content is only deduplicated
    /// within one calendar day.
    #[default]
    UserAndDate,
    /// `<download_dir>/<username>/`
    ///
    /// Content already captured on any earlier day is recognized and skipped.
    UserOnly,
}

/// Main configuration for StoryDownloader
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Download directory (default: "Downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Folder layout below the download directory
    #[serde(default)]
    pub layout: DirectoryLayout,

    /// Story page prefix the username is appended to
    #[serde(default = "default_story_base_url")]
    pub story_base_url: String,

    /// User-Agent for story page requests
    #[serde(default = "default_page_user_agent")]
    pub page_user_agent: String,

    /// User-Agent for media requests
    #[serde(default = "default_media_user_agent")]
    pub media_user_agent: String,

    /// Longest wait for media response headers or for any single body chunk
    /// (default: 10 seconds)
    #[serde(default = "default_media_timeout", with = "duration_ms_serde")]
    pub media_timeout: Duration,

    /// Pause before transferring a media body (default: 300ms)
    #[serde(default = "default_transfer_delay", with = "duration_ms_serde")]
    pub transfer_delay: Duration,

    /// Retry policy for media fetches
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            layout: DirectoryLayout::default(),
            story_base_url: default_story_base_url(),
            page_user_agent: default_page_user_agent(),
            media_user_agent: default_media_user_agent(),
            media_timeout: default_media_timeout(),
            transfer_delay: default_transfer_delay(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Check the settings that would make every batch fail
    pub fn validate(&self) -> Result<()> {
        if self.download_dir.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "download_dir must not be empty".to_string(),
                key: Some("download_dir".to_string()),
            });
        }

        if let Err(e) = url::Url::parse(&self.story_base_url) {
            return Err(Error::Config {
                message: format!("story_base_url '{}' is not a URL: {}", self.story_base_url, e),
                key: Some("story_base_url".to_string()),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".to_string(),
                key: Some("retry.max_attempts".to_string()),
            });
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be >= 1.0".to_string(),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }

        Ok(())
    }
}

/// Retry configuration for media fetches
///
/// `max_attempts` counts every try, including the first one. The defaults
/// give a fixed one second pause between three tries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of tries per media item (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 1 second)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("Downloads")
}

fn default_story_base_url() -> String {
    DEFAULT_STORY_BASE_URL.to_string()
}

fn default_page_user_agent() -> String {
    DEFAULT_PAGE_USER_AGENT.to_string()
}

fn default_media_user_agent() -> String {
    DEFAULT_MEDIA_USER_AGENT.to_string()
}

fn default_media_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_transfer_delay() -> Duration {
    Duration::from_millis(300)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

// Durations are (de)serialized as whole milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
