use crate::config::{Config, FeedConfig, PipelineConfig, SourceConfig};
use crate::feed::enricher::MetaEnricher;
use crate::feed::fetcher::fetch_feed;
use crate::http;
use crate::remarks::{RemarkPicker, RemarkPool};
use crate::storage::{write_articles, Article, FeedItem, StoreError};
use crate::util::{truncate_chars, DATE_FORMAT};
use chrono::{FixedOffset, Offset, Utc};
use futures::stream::{self, StreamExt};
use std::path::Path;
use tokio::sync::Semaphore;

/// Content used when neither the feed nor the article page gave enough text
pub const FALLBACK_CONTENT: &str = "본문 요약 정보를 불러오는 중입니다. 자세한 내용은 상단의 [원문 보러가기]를 통해 확인해 주시기 바랍니다.";

/// One fetch → merge → enrich → format run over the configured feeds.
///
/// Individual feed and enrichment failures only shrink or degrade the
/// result; [`Pipeline::run_and_persist`] fails only when the output cannot
/// be written.
pub struct Pipeline {
    client: reqwest::Client,
    source: SourceConfig,
    settings: PipelineConfig,
    enricher: Option<MetaEnricher>,
    remarks: RemarkPool,
}

impl Pipeline {
    /// `enrich_client` fetches article pages; give it the redirect guard from
    /// [`crate::http::build_enrich_client`].
    pub fn new(client: reqwest::Client, enrich_client: reqwest::Client, config: &Config) -> Self {
        let enricher = config
            .enrich
            .enabled
            .then(|| MetaEnricher::new(enrich_client, &config.enrich));

        Self {
            client,
            source: config.source.clone(),
            settings: config.pipeline.clone(),
            enricher,
            remarks: config.remarks.clone(),
        }
    }

    /// Builds both HTTP clients from `config`.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = http::build_client(&config.source)?;
        let enrich_client = http::build_enrich_client(&config.source, &config.enrich)?;
        Ok(Self::new(client, enrich_client, config))
    }

    /// Fetches every feed concurrently; the outer list follows `feeds` order.
    pub async fn fetch_all(&self, feeds: &[FeedConfig]) -> Vec<Vec<FeedItem>> {
        stream::iter(feeds)
            .map(|feed| {
                let cap = feed.max_items.unwrap_or(self.settings.max_items_per_feed);
                fetch_feed(&self.client, &self.source, feed, cap)
            })
            // Every feed in flight at once
            .buffered(feeds.len().max(1))
            .collect()
            .await
    }

    pub async fn run(&self, feeds: &[FeedConfig]) -> Vec<Article> {
        let batches = self.fetch_all(feeds).await;
        let empty_feeds = batches.iter().filter(|b| b.is_empty()).count();
        let merged = merge_and_sort(batches);

        tracing::info!(
            feeds = feeds.len(),
            empty_feeds = empty_feeds,
            items = merged.len(),
            "Fetched all feeds"
        );

        let enriched = self.enrich_all(merged).await;
        let mut picker = RemarkPicker::new(self.remarks.clone(), self.settings.seed);
        format_articles(enriched, &self.settings, &mut picker)
    }

    /// Runs the pipeline and replaces the artifact at `output`.
    pub async fn run_and_persist(
        &self,
        feeds: &[FeedConfig],
        output: &Path,
    ) -> Result<Vec<Article>, StoreError> {
        let articles = self.run(feeds).await;
        write_articles(output, &articles)?;
        tracing::info!(
            path = %output.display(),
            articles = articles.len(),
            "Saved articles"
        );
        Ok(articles)
    }

    /// Swaps short descriptions for page metadata, at most
    /// `enrich_concurrency` requests at a time. Order is preserved.
    async fn enrich_all(&self, items: Vec<FeedItem>) -> Vec<FeedItem> {
        let Some(enricher) = &self.enricher else {
            return items;
        };

        let threshold = self.settings.enrich_threshold;
        let permits = Semaphore::new(self.settings.enrich_concurrency.max(1));
        let permits = &permits;

        let candidates = items
            .iter()
            .filter(|fi| fi.item.description.chars().count() < threshold)
            .count();
        if candidates == 0 {
            return items;
        }
        tracing::debug!(candidates, threshold, "Enriching short descriptions");

        let tasks = items.into_iter().map(|mut feed_item| async move {
            let current_len = feed_item.item.description.chars().count();
            if current_len >= threshold {
                return (feed_item, false);
            }

            let Ok(_permit) = permits.acquire().await else {
                return (feed_item, false);
            };

            match enricher.enrich(&feed_item.item.link).await {
                Some(text) if text.chars().count() > current_len => {
                    feed_item.item.description = text;
                    (feed_item, true)
                }
                _ => (feed_item, false),
            }
        });

        let results = futures::future::join_all(tasks).await;
        let replaced = results.iter().filter(|(_, replaced)| *replaced).count();
        tracing::info!(candidates, replaced, "Enrichment finished");

        results.into_iter().map(|(item, _)| item).collect()
    }
}

/// Flattens per-feed batches and orders them newest first.
///
/// The sort is stable: items with equal timestamps keep their feed order
/// and their order within the feed.
pub fn merge_and_sort(batches: Vec<Vec<FeedItem>>) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = batches.into_iter().flatten().collect();
    items.sort_by(|a, b| b.item.published.cmp(&a.item.published));
    items
}

/// Turns ordered items into the persisted records, ids `1..=N`.
pub fn format_articles(
    items: Vec<FeedItem>,
    settings: &PipelineConfig,
    picker: &mut RemarkPicker,
) -> Vec<Article> {
    let offset = FixedOffset::east_opt(settings.utc_offset_hours.saturating_mul(3600))
        .unwrap_or_else(|| Utc.fix());

    items
        .into_iter()
        .enumerate()
        .map(|(idx, FeedItem { category, item })| {
            let content = if item.description.chars().count() < settings.min_content_len {
                FALLBACK_CONTENT
            } else {
                item.description.as_str()
            };
            let content = truncate_chars(content, settings.content_cap).into_owned();
            let date = item
                .published
                .with_timezone(&offset)
                .format(DATE_FORMAT)
                .to_string();
            let (importance, insight) = picker.pick();

            Article {
                id: idx + 1,
                category,
                one_line: item.title.clone(),
                title: item.title,
                date,
                content,
                importance,
                insight,
                url: item.link,
            }
        })
        .collect()
}
