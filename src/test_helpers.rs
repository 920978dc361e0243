//! Shared test helpers for unit tests.

use crate::config::Config;
use crate::retry::Delay;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// [`Delay`] that records requested pauses instead of sleeping
#[derive(Clone, Default)]
pub(crate) struct RecordingDelay {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub(crate) fn recorded(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.calls.lock().unwrap().push(duration);
    }
}

/// Config pointing at a mock story host and writing below `download_dir`
pub(crate) fn test_config(story_host: &str, download_dir: &Path) -> Config {
    Config {
        download_dir: download_dir.to_path_buf(),
        story_base_url: format!("{}/@", story_host),
        media_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// Story page embedding the given media URLs the way the story host does
pub(crate) fn story_page(media_urls: &[&str]) -> String {
    let snaps: Vec<serde_json::Value> = media_urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            serde_json::json!({
                "snapIndex": i,
                "snapUrls": { "mediaUrl": url }
            })
        })
        .collect();

    let data = serde_json::json!({
        "props": { "pageProps": { "story": { "snapList": snaps } } }
    });

    page_with_data(&data.to_string())
}

/// Page whose `__NEXT_DATA__` block contains `json` verbatim
pub(crate) fn page_with_data(json: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Story</title></head><body>\
         <div id=\"__next\"></div>\
         <script id=\"__NEXT_DATA__\" type=\"application/json\">\n  {}\n</script>\
         </body></html>",
        json
    )
}

/// Page without any embedded data block
pub(crate) fn page_without_data() -> String {
    "<!DOCTYPE html><html><body><h1>Page not found</h1></body></html>".to_string()
}

/// Base URI of a local port nothing listens on
pub(crate) fn refused_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// HTTP responder for wire timing wiremock cannot express
///
/// Every connection reads one request, writes `head` verbatim, then writes
/// each of `chunks` after waiting `gap`, and closes. Returns the base URI and
/// a counter of accepted connections.
pub(crate) async fn raw_server(
    head: &str,
    chunks: Vec<Vec<u8>>,
    gap: Duration,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let head = head.to_string();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let head = head.clone();
            let chunks = chunks.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                if stream.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in chunks {
                    tokio::time::sleep(gap).await;
                    if stream.write_all(&chunk).await.is_err() {
                        return;
                    }
                    stream.flush().await.ok();
                }
            });
        }
    });

    (uri, hits)
}
