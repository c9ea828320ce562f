use crate::config::EnrichConfig;
use crate::util::{clean_text, validate_url, validate_url_for_open, UrlValidationError};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why an enrichment attempt produced nothing. Only ever logged.
#[derive(Debug, Error)]
enum EnrichError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
}

/// Best-effort summary lookup from an article page's description meta tags.
///
/// Only a prefix of the page is read (metadata lives in `<head>`), and the
/// whole attempt is bounded by a timeout. Every failure collapses to `None`.
#[derive(Clone)]
pub struct MetaEnricher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
    allow_private_hosts: bool,
}

impl MetaEnricher {
    pub fn new(client: reqwest::Client, settings: &EnrichConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_bytes: settings.max_bytes,
            allow_private_hosts: settings.allow_private_hosts,
        }
    }

    /// Returns the cleaned page description for `url`, if one can be found.
    pub async fn enrich(&self, url: &str) -> Option<String> {
        match self.try_enrich(url).await {
            Ok(Some(text)) => {
                tracing::debug!(url = %url, chars = text.chars().count(), "Enriched from page metadata");
                Some(text)
            }
            Ok(None) => {
                tracing::debug!(url = %url, "No description metadata in page prefix");
                None
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Enrichment skipped");
                None
            }
        }
    }

    async fn try_enrich(&self, url: &str) -> Result<Option<String>, EnrichError> {
        // Links come from remote feeds; keep them off internal addresses
        let target = if self.allow_private_hosts {
            validate_url_for_open(url)?
        } else {
            validate_url(url)?
        };

        let html = tokio::time::timeout(self.timeout, self.fetch_prefix(target))
            .await
            .map_err(|_| EnrichError::Timeout(self.timeout))??;

        Ok(extract_description(&html))
    }

    async fn fetch_prefix(&self, url: Url) -> Result<String, EnrichError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(EnrichError::HttpStatus(response.status().as_u16()));
        }

        let mut bytes = Vec::with_capacity(self.max_bytes.min(64 * 1024));
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let room = self.max_bytes.saturating_sub(bytes.len());
            if chunk.len() >= room {
                bytes.extend_from_slice(&chunk[..room]);
                // Dropping the stream abandons the rest of the body
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Picks the page summary out of an HTML prefix.
///
/// `og:description` wins over `<meta name="description">`; either value is
/// run through [`clean_text`] and ignored if nothing is left.
pub fn extract_description(html: &str) -> Option<String> {
    [("property", "og:description"), ("name", "description")]
        .into_iter()
        .filter_map(|(attr, value)| find_meta_content(html, attr, value))
        .map(clean_text)
        .find(|text| !text.is_empty())
}

/// Scans `<meta>` tags for one carrying `attr_name="attr_value"` and returns
/// its `content` attribute.
///
/// Plain string scanning over an ASCII-lowercased copy; ASCII lowercasing
/// keeps byte offsets aligned with the original for slicing.
fn find_meta_content<'a>(html: &'a str, attr_name: &str, attr_value: &str) -> Option<&'a str> {
    let lower = html.to_ascii_lowercase();
    let mut search_from = 0;

    while let Some(offset) = lower[search_from..].find("<meta") {
        let start = search_from + offset;
        let Some(len) = lower[start..].find('>') else {
            break;
        };
        let end = start + len + 1;

        if contains_attr(&lower[start..end], attr_name, attr_value) {
            if let Some(content) = extract_attr_value(&html[start..end], "content") {
                return Some(content);
            }
        }

        search_from = end;
    }

    None
}

/// Checks if a lowercased tag contains an attribute with the given value.
fn contains_attr(tag: &str, attr_name: &str, attr_value: &str) -> bool {
    let double = format!("{attr_name}=\"{attr_value}\"");
    let single = format!("{attr_name}='{attr_value}'");
    tag.contains(&double) || tag.contains(&single)
}

/// Extracts a quoted attribute value from a tag (case-preserving).
///
/// The name must follow whitespace so `data-content=` is not mistaken for
/// `content=`.
fn extract_attr_value<'a>(tag: &'a str, attr_name: &str) -> Option<&'a str> {
    let tag_lower = tag.to_ascii_lowercase();
    let prefix = format!("{attr_name}=");

    let mut search_from = 0;
    while let Some(offset) = tag_lower[search_from..].find(&prefix) {
        let attr_start = search_from + offset;
        search_from = attr_start + prefix.len();

        let preceded_by_space = tag[..attr_start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        if !preceded_by_space {
            continue;
        }

        let rest = &tag[search_from..];
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let inner = &rest[1..];
        let close = inner.find(quote)?;
        return Some(&inner[..close]);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(timeout_ms: u64, max_bytes: usize) -> EnrichConfig {
        EnrichConfig {
            enabled: true,
            timeout_ms,
            max_bytes,
            allow_private_hosts: true,
        }
    }

    fn enricher(timeout_ms: u64, max_bytes: usize) -> MetaEnricher {
        MetaEnricher::new(reqwest::Client::new(), &settings(timeout_ms, max_bytes))
    }

    const PAGE: &str = r#"<!DOCTYPE html><html><head>
<meta charset="utf-8">
<meta name="description" content="일반 설명 문구입니다.">
<meta property="og:description" content="교육부가 &quot;AI 디지털 교과서&quot; 도입 일정을 발표했다.">
</head><body>본문</body></html>"#;

    #[test]
    fn test_og_description_preferred() {
        assert_eq!(
            extract_description(PAGE).as_deref(),
            Some("교육부가 \"AI 디지털 교과서\" 도입 일정을 발표했다.")
        );
    }

    #[test]
    fn test_falls_back_to_name_description() {
        let html = r#"<head><META NAME="Description" CONTENT='대학 학사 운영 변경 안내'></head>"#;
        assert_eq!(
            extract_description(html).as_deref(),
            Some("대학 학사 운영 변경 안내")
        );
    }

    #[test]
    fn test_attribute_order_does_not_matter() {
        let html = r#"<meta content="순서가 바뀐 태그" property="og:description"/>"#;
        assert_eq!(extract_description(html).as_deref(), Some("순서가 바뀐 태그"));
    }

    #[test]
    fn test_empty_og_description_falls_through() {
        let html = r#"<meta property="og:description" content="  "><meta name="description" content="대체 설명">"#;
        assert_eq!(extract_description(html).as_deref(), Some("대체 설명"));
    }

    #[test]
    fn test_data_content_attribute_ignored() {
        let html = r#"<meta name="description" data-content="wrong" content="right">"#;
        assert_eq!(extract_description(html).as_deref(), Some("right"));
    }

    #[test]
    fn test_no_meta_tags() {
        assert_eq!(extract_description("<html><head><title>t</title></head>"), None);
        assert_eq!(extract_description(""), None);
        assert_eq!(extract_description("<meta name=\"description\" content=\"cut"), None);
    }

    #[tokio::test]
    async fn test_enrich_from_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .insert_header("Content-Type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let text = enricher(3000, 16 * 1024)
            .enrich(&format!("{}/article/1", server.uri()))
            .await;
        assert_eq!(
            text.as_deref(),
            Some("교육부가 \"AI 디지털 교과서\" 도입 일정을 발표했다.")
        );
    }

    #[tokio::test]
    async fn test_enrich_reads_only_prefix() {
        let padding = "x".repeat(4096);
        let page = format!(
            "<html><head><!-- {padding} --><meta property=\"og:description\" content=\"너무 늦게 나오는 설명\"></head></html>"
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let url = format!("{}/late", server.uri());
        assert_eq!(enricher(3000, 1024).enrich(&url).await, None);
        assert!(enricher(3000, 16 * 1024).enrich(&url).await.is_some());
    }

    #[tokio::test]
    async fn test_enrich_timeout_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let text = enricher(200, 16 * 1024)
            .enrich(&format!("{}/slow", server.uri()))
            .await;
        assert_eq!(text, None);
    }

    #[tokio::test]
    async fn test_enrich_http_error_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(PAGE))
            .mount(&server)
            .await;

        let text = enricher(3000, 16 * 1024)
            .enrich(&format!("{}/gone", server.uri()))
            .await;
        assert_eq!(text, None);
    }

    #[tokio::test]
    async fn test_private_hosts_not_fetched_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let guarded = MetaEnricher::new(
            reqwest::Client::new(),
            &EnrichConfig {
                allow_private_hosts: false,
                ..EnrichConfig::default()
            },
        );
        assert_eq!(guarded.enrich(&format!("{}/internal", server.uri())).await, None);
        assert_eq!(guarded.enrich("not a url").await, None);
    }

    #[tokio::test]
    async fn test_ipv4_mapped_loopback_not_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let guarded = MetaEnricher::new(reqwest::Client::new(), &EnrichConfig::default());
        let port = server.address().port();
        let url = format!("http://[::ffff:127.0.0.1]:{port}/internal");
        assert_eq!(guarded.enrich(&url).await, None);
    }
}
