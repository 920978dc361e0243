//! Batch orchestration over a sequence of usernames
//!
//! Usernames are processed strictly one after another, and so are the
//! descriptors of one username. Every per-username or per-descriptor failure
//! becomes a [`Event::Log`] line; only cancellation ends a batch early.

use crate::config::Config;
use crate::error::{Error, ExtractError, FetchError, Result};
use crate::extractor::extract_descriptors;
use crate::fetcher::StoryClient;
use crate::media::MediaDownloader;
use crate::retry::{Delay, TokioDelay};
use crate::types::{DownloadOutcome, Event, FailureReason, MediaDescriptor};
use crate::utils::{user_directory, validate_username};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Log line emitted once cancellation is observed
pub const CANCELLED_MESSAGE: &str = "Download cancelled by user.";

/// Main downloader instance (cloneable - all fields are cheap to clone)
#[derive(Clone)]
pub struct StoryDownloader {
    config: Arc<Config>,
    pages: StoryClient,
    media: MediaDownloader,
}

/// Transient state of one batch
struct RunState<'a> {
    events: &'a mpsc::UnboundedSender<Event>,
    run_date: NaiveDate,
    total: usize,
    completed: usize,
}

impl RunState<'_> {
    fn log(&self, line: impl Into<String>) {
        self.events.send(Event::Log { line: line.into() }).ok();
    }

    /// Count one more username as processed and report progress
    fn advance(&mut self) {
        self.completed += 1;
        let percent = (self.completed * 100 / self.total) as u8;
        self.events.send(Event::Progress { percent }).ok();
    }
}

/// How processing of one username ended
enum UserResult {
    Done,
    Cancelled,
}

impl StoryDownloader {
    /// Create a new StoryDownloader
    ///
    /// Validates the configuration, creates the download directory and
    /// builds the shared HTTP client. Pauses use the tokio timer.
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_delay(config, Arc::new(TokioDelay)).await
    }

    /// Create a StoryDownloader whose pauses go through `delay`
    pub async fn with_delay(config: Config, delay: Arc<dyn Delay>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let client = reqwest::Client::builder().build()?;
        let config = Arc::new(config);

        Ok(Self {
            pages: StoryClient::new(client.clone(), &config),
            media: MediaDownloader::new(client, config.clone(), delay),
            config,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a batch on a dedicated task
    ///
    /// Returns the task handle and the receiving end of the event channel.
    /// The channel yields progress and log events in processing order and
    /// ends with [`Event::Complete`].
    pub fn spawn(
        &self,
        usernames: Vec<String>,
        cancel: CancellationToken,
    ) -> (JoinHandle<()>, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let downloader = self.clone();
        let handle = tokio::spawn(async move {
            downloader.run(&usernames, &cancel, &tx).await;
        });
        (handle, rx)
    }

    /// Run a batch on the current task, dated today (local time)
    pub async fn run(
        &self,
        usernames: &[String],
        cancel: &CancellationToken,
        events: &mpsc::UnboundedSender<Event>,
    ) {
        let today = chrono::Local::now().date_naive();
        self.run_dated(usernames, today, cancel, events).await;
    }

    /// Run a batch with an explicit run date for the date folders
    ///
    /// Cancellation is checked before each username and before each
    /// descriptor; the token is never reset. [`Event::Complete`] is always
    /// sent last.
    pub async fn run_dated(
        &self,
        usernames: &[String],
        run_date: NaiveDate,
        cancel: &CancellationToken,
        events: &mpsc::UnboundedSender<Event>,
    ) {
        let mut state = RunState {
            events,
            run_date,
            total: usernames.len(),
            completed: 0,
        };

        tracing::info!(users = usernames.len(), date = %run_date, "Starting story batch");

        for username in usernames {
            if cancel.is_cancelled() {
                state.log(CANCELLED_MESSAGE);
                break;
            }

            match self.process_user(username, &state, cancel).await {
                UserResult::Done => state.advance(),
                UserResult::Cancelled => {
                    state.log(CANCELLED_MESSAGE);
                    break;
                }
            }
        }

        tracing::info!(
            processed = state.completed,
            total = state.total,
            cancelled = cancel.is_cancelled(),
            "Story batch finished"
        );
        events.send(Event::Complete).ok();
    }

    async fn process_user(
        &self,
        username: &str,
        state: &RunState<'_>,
        cancel: &CancellationToken,
    ) -> UserResult {
        let Some(name) = validate_username(username) else {
            tracing::warn!(username, "Rejecting invalid username");
            state.log(format!("Skipping invalid username '{}'", username));
            return UserResult::Done;
        };

        let dest_dir = user_directory(
            &self.config.download_dir,
            name,
            state.run_date,
            self.config.layout,
        );
        if let Err(e) = tokio::fs::create_dir_all(&dest_dir).await {
            tracing::warn!(username = name, path = %dest_dir.display(), error = %e, "Cannot create user directory");
            state.log(format!("Could not create directory for {}: {}", name, e));
            return UserResult::Done;
        }

        tracing::info!(username = name, "Fetching stories");
        let page = match self.pages.fetch_page(name).await {
            Ok(page) => page,
            Err(FetchError::Unreachable { reason, .. }) => {
                state.log(format!("Could not reach story page for {}: {}", name, reason));
                return UserResult::Done;
            }
        };

        let descriptors = match extract_descriptors(&page) {
            Ok(descriptors) => descriptors,
            Err(ExtractError::NoStories) => {
                tracing::info!(username = name, "No stories published");
                state.log(format!("No stories found for {} in the last 24h.", name));
                return UserResult::Done;
            }
        };

        tracing::debug!(username = name, count = descriptors.len(), "Found stories");

        for descriptor in &descriptors {
            if cancel.is_cancelled() {
                return UserResult::Cancelled;
            }

            let outcome = self.media.download(descriptor, &dest_dir, cancel).await;
            if outcome == DownloadOutcome::Cancelled {
                return UserResult::Cancelled;
            }
            if let Some(line) = describe_outcome(name, &outcome) {
                state.log(line);
            }
        }

        UserResult::Done
    }

    /// Fetch and parse the current story list of `username` without downloading
    pub async fn list_stories(&self, username: &str) -> Result<Vec<MediaDescriptor>> {
        let page = self.pages.fetch_page(username).await?;
        Ok(extract_descriptors(&page)?)
    }

    /// Destination directory `username` would use on `run_date`
    pub fn user_directory(&self, username: &str, run_date: NaiveDate) -> Option<PathBuf> {
        validate_username(username).map(|name| {
            user_directory(&self.config.download_dir, name, run_date, self.config.layout)
        })
    }
}

/// Log line for a descriptor outcome; `None` for outcomes that stay silent
fn describe_outcome(username: &str, outcome: &DownloadOutcome) -> Option<String> {
    match outcome {
        DownloadOutcome::Saved { file_name, .. } => Some(format!("Downloaded {}", file_name)),
        DownloadOutcome::Skipped { file_name, .. } => {
            Some(format!("File already exists: {}", file_name))
        }
        DownloadOutcome::Unsupported | DownloadOutcome::Cancelled => None,
        DownloadOutcome::Failed(reason) => Some(match reason {
            FailureReason::NoUrl => {
                format!("Story exists for {} but no URL was provided.", username)
            }
            FailureReason::BadStatus(status) => {
                format!("Cannot download media for {}: HTTP {}", username, status)
            }
            FailureReason::MissingEntityTag => {
                format!("Media for {} has no entity tag; skipping.", username)
            }
            FailureReason::Io(e) => format!("Could not save media for {}: {}", username, e),
            FailureReason::Exhausted {
                attempts,
                last_error,
            } => format!(
                "Failed to download after {} attempts: {}",
                attempts, last_error
            ),
        }),
    }
}
