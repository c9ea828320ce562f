use crate::config::{FeedConfig, SourceConfig};
use crate::feed::parser::iter_items;
use crate::storage::FeedItem;
use chrono::Utc;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching one feed.
///
/// These never leave [`fetch_feed`]; they are logged and the feed
/// contributes no items to the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// The configured endpoint is not a valid base URL
    #[error("Invalid search endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Builds the boolean search expression for a feed.
///
/// An explicit `query` is used verbatim; otherwise the keywords are quoted and
/// OR-ed inside parentheses. Each exclusion is appended negated (quoted when
/// it contains whitespace so the whole phrase is excluded), followed by the
/// recency filter.
///
/// ```
/// use newsdeck::config::FeedConfig;
/// use newsdeck::feed::build_query;
/// use newsdeck::storage::Category;
///
/// let feed = FeedConfig::new(Category::Edutech, "에듀테크", &["에듀테크", "AI 교과서"])
///     .with_exclusions(&["구글"]);
/// assert_eq!(build_query(&feed, "1d"), r#"("에듀테크" OR "AI 교과서") -구글 when:1d"#);
/// ```
pub fn build_query(feed: &FeedConfig, recency: &str) -> String {
    let mut query = match feed.query.as_deref().map(str::trim) {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => {
            let group: Vec<String> = feed
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .map(|k| format!("\"{}\"", k))
                .collect();
            format!("({})", group.join(" OR "))
        }
    };

    for term in feed.exclusions.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        if term.contains(char::is_whitespace) {
            query.push_str(&format!(" -\"{}\"", term));
        } else {
            query.push_str(&format!(" -{}", term));
        }
    }

    let recency = recency.trim();
    if !recency.is_empty() {
        query.push_str(" when:");
        query.push_str(recency);
    }

    query
}

/// Full request URL for a query, including the locale parameters.
pub fn build_search_url(source: &SourceConfig, query: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &source.endpoint,
        &[
            ("q", query),
            ("hl", source.language.as_str()),
            ("gl", source.region.as_str()),
            ("ceid", source.edition.as_str()),
        ],
    )
}

/// Fetches one feed and returns at most `cap` items tagged with its category.
///
/// Any failure (network, status, timeout, oversized body) is logged and
/// yields an empty list, so one broken feed never stops the run. There is
/// no retry.
pub async fn fetch_feed(
    client: &reqwest::Client,
    source: &SourceConfig,
    feed: &FeedConfig,
    cap: usize,
) -> Vec<FeedItem> {
    match try_fetch_feed(client, source, feed, cap).await {
        Ok(items) => {
            tracing::info!(
                category = %feed.category,
                label = %feed.label,
                items = items.len(),
                "Fetched feed"
            );
            items
        }
        Err(e) => {
            tracing::warn!(
                category = %feed.category,
                label = %feed.label,
                error = %e,
                "Feed fetch failed, continuing without it"
            );
            Vec::new()
        }
    }
}

async fn try_fetch_feed(
    client: &reqwest::Client,
    source: &SourceConfig,
    feed: &FeedConfig,
    cap: usize,
) -> Result<Vec<FeedItem>, FetchError> {
    let query = build_query(feed, &source.recency);
    let url = build_search_url(source, &query)?;
    tracing::debug!(category = %feed.category, query = %query, "Requesting feed");

    // One deadline covers the request and the whole body read
    let timeout = Duration::from_secs(source.timeout_secs.max(1));
    let bytes = tokio::time::timeout(timeout, download(client, url))
        .await
        .map_err(|_| FetchError::Timeout)??;

    // Decode once, after the whole body is in, so multibyte characters that
    // straddle chunk boundaries survive.
    let body = String::from_utf8_lossy(&bytes);
    let fetched_at = Utc::now();

    Ok(iter_items(&body, fetched_at)
        .take(cap)
        .map(|item| FeedItem {
            category: feed.category,
            item,
        })
        .collect())
}

async fn download(client: &reqwest::Client, url: Url) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
