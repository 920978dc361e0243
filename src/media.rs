//! Media download for a single story descriptor
//!
//! Each try opens a streamed GET, classifies the declared content type,
//! derives the [`MediaIdentity`] from the entity tag and checks the
//! destination before any body bytes are read. Only transport errors are
//! retried; everything else settles the descriptor on the first try.
//!
//! `media_timeout` bounds each wait for data, not the whole transfer: the
//! response headers and every body chunk must arrive within it.

use crate::config::Config;
use crate::error::MediaError;
use crate::retry::{Delay, RetryError, download_with_retry};
use crate::types::{DownloadOutcome, FailureReason, MediaDescriptor, MediaIdentity, MediaKind};
use crate::utils::{PartialFile, partial_path};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, ETAG, USER_AGENT};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Downloads story media into a destination directory
#[derive(Clone)]
pub struct MediaDownloader {
    client: reqwest::Client,
    config: Arc<Config>,
    delay: Arc<dyn Delay>,
}

impl MediaDownloader {
    /// Create a downloader sharing `client`, pausing through `delay`
    pub fn new(client: reqwest::Client, config: Arc<Config>, delay: Arc<dyn Delay>) -> Self {
        Self {
            client,
            config,
            delay,
        }
    }

    /// Download one descriptor into `dest_dir`
    ///
    /// Never fails: every problem is reported through the returned outcome.
    pub async fn download(
        &self,
        descriptor: &MediaDescriptor,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> DownloadOutcome {
        if descriptor.media_url.is_empty() {
            return DownloadOutcome::Failed(FailureReason::NoUrl);
        }

        let url = descriptor.media_url.as_str();
        let result = download_with_retry(&self.config.retry, self.delay.as_ref(), cancel, || {
            self.attempt(url, dest_dir, cancel)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(RetryError::Cancelled) => DownloadOutcome::Cancelled,
            Err(RetryError::Failed { error, attempts }) => {
                let reason = match error {
                    MediaError::Transport(_) | MediaError::Stalled(_) => {
                        FailureReason::Exhausted {
                            attempts,
                            last_error: error.to_string(),
                        }
                    }
                    MediaError::BadStatus(status) => FailureReason::BadStatus(status),
                    MediaError::MissingEntityTag => FailureReason::MissingEntityTag,
                    MediaError::Io(e) => FailureReason::Io(e.to_string()),
                };
                DownloadOutcome::Failed(reason)
            }
        }
    }

    /// One try: request, classify, dedup check, pause, transfer
    async fn attempt(
        &self,
        url: &str,
        dest_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, MediaError> {
        let request = self
            .client
            .get(url)
            .header(USER_AGENT, &self.config.media_user_agent)
            .send();
        let response = within(self.config.media_timeout, request).await??;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let Some(kind) = MediaKind::from_content_type(content_type) else {
            tracing::debug!(url, content_type, "Skipping unsupported media type");
            return Ok(DownloadOutcome::Unsupported);
        };

        let identity = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .and_then(|etag| MediaIdentity::from_entity_tag(etag, kind))
            .ok_or(MediaError::MissingEntityTag)?;

        let file_name = identity.file_name();
        let target = dest_dir.join(&file_name);

        if tokio::fs::try_exists(&target).await? {
            tracing::debug!(path = %target.display(), "Media already downloaded");
            return Ok(DownloadOutcome::Skipped {
                file_name,
                path: target,
            });
        }

        if cancel.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }
        self.delay.sleep(self.config.transfer_delay).await;
        if cancel.is_cancelled() {
            return Ok(DownloadOutcome::Cancelled);
        }

        let status = response.status();
        if status != StatusCode::OK {
            return Err(MediaError::BadStatus(status.as_u16()));
        }

        if !write_body(response, &target, self.config.media_timeout, cancel).await? {
            return Ok(DownloadOutcome::Cancelled);
        }

        tracing::info!(path = %target.display(), "Saved media");
        Ok(DownloadOutcome::Saved {
            file_name,
            path: target,
        })
    }
}

/// Await `future`, failing with [`MediaError::Stalled`] if it takes longer
/// than `idle`
///
/// Applied to the response headers and to every body chunk separately, so a
/// large transfer may take any amount of time as long as data keeps coming.
async fn within<F: Future>(idle: Duration, future: F) -> Result<F::Output, MediaError> {
    tokio::time::timeout(idle, future)
        .await
        .map_err(|_| MediaError::Stalled(idle))
}

/// Stream the response body into `target`
///
/// Bytes go to a `.part` file that is renamed once complete, so `target`
/// only ever appears fully written. Returns `Ok(false)` if cancellation was
/// observed between chunks; the partial file is removed in that case and on
/// every error.
async fn write_body(
    mut response: reqwest::Response,
    target: &Path,
    idle: Duration,
    cancel: &CancellationToken,
) -> Result<bool, MediaError> {
    let partial = PartialFile::new(partial_path(target));
    let mut file = tokio::fs::File::create(partial.path()).await?;

    let mut written: u64 = 0;
    while let Some(chunk) = within(idle, response.chunk()).await?? {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    partial.persist(target).await?;
    tracing::debug!(path = %target.display(), bytes = written, "Media body written");
    Ok(true)
}
