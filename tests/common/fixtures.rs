//! Mock story host and helpers shared by integration tests

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use story_dl::{CancellationToken, Config, Delay, Event, StoryDownloader};
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fixed run date so date folders are predictable
pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date")
}

/// Delay that returns immediately
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// Story page HTML embedding `media_urls` in the `__NEXT_DATA__` block
pub fn story_page(media_urls: &[String]) -> String {
    let snaps: Vec<serde_json::Value> = media_urls
        .iter()
        .map(|url| serde_json::json!({ "snapUrls": { "mediaUrl": url } }))
        .collect();
    let data = serde_json::json!({
        "props": { "pageProps": { "story": { "snapList": snaps } } }
    });
    format!(
        "<html><body><script id=\"__NEXT_DATA__\" type=\"application/json\">{}</script></body></html>",
        data
    )
}

/// Serve a story page for `username`
pub async fn mount_story(server: &MockServer, username: &str, media_paths: &[&str]) {
    let urls: Vec<String> = media_paths
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/@{}", username)))
        .respond_with(ResponseTemplate::new(200).set_body_string(story_page(&urls)))
        .mount(server)
        .await;
}

/// Serve a page with no embedded data for `username`
pub async fn mount_empty_page(server: &MockServer, username: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/@{}", username)))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(server)
        .await;
}

/// Serve media at `media_path`
pub async fn mount_media(server: &MockServer, media_path: &str, content_type: &str, etag: &str) {
    Mock::given(method("GET"))
        .and(path(media_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", content_type)
                .insert_header("ETag", format!("\"{}\"", etag))
                .set_body_bytes(format!("body of {}", etag).into_bytes()),
        )
        .mount(server)
        .await;
}

/// Downloader writing into `download_dir`, talking to the mock host
pub async fn downloader(server: &MockServer, download_dir: &Path) -> StoryDownloader {
    let config = Config {
        download_dir: download_dir.to_path_buf(),
        story_base_url: format!("{}/@", server.uri()),
        ..Default::default()
    };
    StoryDownloader::with_delay(config, Arc::new(NoDelay))
        .await
        .expect("downloader should build")
}

/// Run a batch to completion and collect every event
pub async fn run_batch(
    downloader: &StoryDownloader,
    usernames: &[&str],
    cancel: &CancellationToken,
) -> Vec<Event> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let usernames: Vec<String> = usernames.iter().map(|s| s.to_string()).collect();
    downloader.run_dated(&usernames, run_date(), cancel, &tx).await;
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// All regular files below `root`, relative to it
pub fn file_set(root: &Path) -> BTreeSet<PathBuf> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .expect("entry below root")
                .to_path_buf()
        })
        .collect()
}

/// Log lines in order
pub fn log_lines(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Log { line } => Some(line.clone()),
            _ => None,
        })
        .collect()
}

/// Progress percentages in order
pub fn progress_values(events: &[Event]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Progress { percent } => Some(*percent),
            _ => None,
        })
        .collect()
}
