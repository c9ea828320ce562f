use crate::config::{EnrichConfig, SourceConfig};
use crate::util::validate_url;
use reqwest::redirect::Policy;
use std::time::Duration;

/// Feed links go through aggregator redirects before reaching the publisher.
const MAX_REDIRECTS: usize = 5;

/// Builds the client shared by the feed fetchers.
///
/// Per-request deadlines are applied by the callers; the client-wide
/// timeout is only a backstop for anything that slips past them.
pub fn build_client(source: &SourceConfig) -> reqwest::Result<reqwest::Client> {
    client_builder(source)
        .redirect(create_redirect_policy(false))
        .build()
}

/// Builds the client for article page lookups.
///
/// Article links come from remote feeds, so unless private hosts are allowed
/// every redirect hop is held to the same host rules as the first request.
pub fn build_enrich_client(
    source: &SourceConfig,
    enrich: &EnrichConfig,
) -> reqwest::Result<reqwest::Client> {
    client_builder(source)
        .redirect(create_redirect_policy(!enrich.allow_private_hosts))
        .build()
}

fn client_builder(source: &SourceConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(source.user_agent.as_str())
        .pool_idle_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(source.timeout_secs.max(1)))
}

fn create_redirect_policy(guard_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {MAX_REDIRECTS})"));
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        if guard_private_hosts {
            if let Err(e) = validate_url(url.as_str()) {
                tracing::debug!(to = %url, error = %e, "Refusing redirect");
                return attempt.error(format!("Redirect target rejected: {e}"));
            }
        }

        tracing::trace!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}
