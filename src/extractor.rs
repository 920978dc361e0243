//! Story descriptor extraction
//!
//! Story pages embed their state as a JSON document inside
//! `<script id="__NEXT_DATA__">`. The story list lives at
//! `props.pageProps.story.snapList`; each entry carries its media location in
//! `snapUrls.mediaUrl`. A page without that path has no story published in
//! the lookback window (typically the last 24 hours).

use crate::error::ExtractError;
use crate::fetcher::RawPage;
use crate::types::MediaDescriptor;
use scraper::{Html, Selector};
use serde::Deserialize;

const DATA_BLOCK_SELECTOR: &str = "#__NEXT_DATA__";

#[derive(Deserialize)]
struct NextData {
    props: Props,
}

#[derive(Deserialize)]
struct Props {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Deserialize)]
struct PageProps {
    story: Option<Story>,
}

#[derive(Deserialize)]
struct Story {
    #[serde(rename = "snapList")]
    snap_list: Option<Vec<Snap>>,
}

#[derive(Deserialize)]
struct Snap {
    #[serde(rename = "snapUrls", default)]
    snap_urls: Option<SnapUrls>,
}

#[derive(Deserialize)]
struct SnapUrls {
    #[serde(rename = "mediaUrl", default)]
    media_url: Option<String>,
}

/// Extract the ordered story descriptors from a fetched page
///
/// Returns [`ExtractError::NoStories`] when the data block is missing or not
/// valid JSON, when the story path is absent, or when the story list is
/// empty. Entries without a media URL are kept with an empty `media_url`.
pub fn extract_descriptors(page: &RawPage) -> Result<Vec<MediaDescriptor>, ExtractError> {
    let json = embedded_data(&page.html()).ok_or(ExtractError::NoStories)?;

    let data: NextData = serde_json::from_str(&json).map_err(|e| {
        tracing::debug!(error = %e, "Embedded story data did not match the expected shape");
        ExtractError::NoStories
    })?;

    let snaps = data
        .props
        .page_props
        .story
        .and_then(|story| story.snap_list)
        .filter(|snaps| !snaps.is_empty())
        .ok_or(ExtractError::NoStories)?;

    Ok(snaps
        .into_iter()
        .enumerate()
        .map(|(position, snap)| MediaDescriptor {
            position,
            media_url: snap
                .snap_urls
                .and_then(|urls| urls.media_url)
                .unwrap_or_default(),
        })
        .collect())
}

/// Trimmed text of the `__NEXT_DATA__` element, if present
fn embedded_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(DATA_BLOCK_SELECTOR).ok()?;
    let element = document.select(&selector).next()?;
    let text: String = element.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
