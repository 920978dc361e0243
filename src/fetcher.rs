//! Story page retrieval
//!
//! A single-shot GET per username. There is no retry at this layer: a page
//! that cannot be fetched is logged and the username is skipped.

use crate::config::Config;
use crate::error::FetchError;
use reqwest::header::USER_AGENT;
use std::borrow::Cow;

/// Raw bytes of a fetched story page
#[derive(Clone, Debug)]
pub struct RawPage {
    body: Vec<u8>,
}

impl RawPage {
    /// Wrap a page body
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }

    /// Page body as bytes
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Page body as text, replacing invalid UTF-8
    pub fn html(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Client for public story pages
#[derive(Clone)]
pub struct StoryClient {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl StoryClient {
    /// Create a client using the page settings from `config`
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.story_base_url.clone(),
            user_agent: config.page_user_agent.clone(),
        }
    }

    /// Page URL for `username`: the base URL with the username appended as-is
    pub fn page_url(&self, username: &str) -> String {
        format!("{}{}", self.base_url, username)
    }

    /// Fetch the story page of `username`
    ///
    /// Any transport error or non-success status yields [`FetchError::Unreachable`].
    pub async fn fetch_page(&self, username: &str) -> Result<RawPage, FetchError> {
        let url = self.page_url(username);
        let to_unreachable = |reason: String| FetchError::Unreachable {
            username: username.to_string(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Story page request failed");
                to_unreachable(if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Story page returned error status");
            return Err(to_unreachable(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| to_unreachable(format!("failed to read page body: {}", e)))?;

        tracing::debug!(url = %url, bytes = body.len(), "Fetched story page");
        Ok(RawPage::new(body.to_vec()))
    }
}
