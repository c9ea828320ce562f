//! Configuration file parser for ~/.config/newsdeck/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`,
//! which carries the built-in feed set. Unknown keys are ignored by serde,
//! though we log a warning when the file contains potential typos.
use crate::paste::Classifier;
use crate::remarks::RemarkPool;
use crate::storage::Category;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Listing `[[feeds]]` replaces the built-in feeds entirely.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the article list is written. A `.js` path gets the browser
    /// data-script form.
    pub output: PathBuf,
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub enrich: EnrichConfig,
    pub remarks: RemarkPool,
    /// Keyword rules for the newsletter paste parser
    pub paste: Classifier,
    pub feeds: Vec<FeedConfig>,
}

/// The search RSS endpoint and how it is queried.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    /// `hl` parameter
    pub language: String,
    /// `gl` parameter
    pub region: String,
    /// `ceid` parameter
    pub edition: String,
    /// Appended as `when:<recency>`; empty disables the filter
    pub recency: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items kept per feed unless the feed sets `max_items`
    pub max_items_per_feed: usize,
    /// Maximum stored content length in characters, ellipsis included
    pub content_cap: usize,
    /// Descriptions shorter than this (characters) are sent to the enricher
    pub enrich_threshold: usize,
    /// Content shorter than this after enrichment is replaced by the fallback
    pub min_content_len: usize,
    /// Enrichment requests allowed in flight at once
    pub enrich_concurrency: usize,
    /// Offset used when formatting article dates
    pub utc_offset_hours: i32,
    /// Fixes the remark selection sequence when set
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
    /// Bytes of the page read before giving up on finding metadata
    pub max_bytes: usize,
    /// Permit loopback/private article hosts (local mirrors and tests)
    pub allow_private_hosts: bool,
}

/// One configured search feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    pub category: Category,
    pub label: String,
    /// OR-ed together when no explicit `query` is given
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Used verbatim instead of the keyword group
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub max_items: Option<usize>,
}

impl FeedConfig {
    pub fn new(category: Category, label: &str, keywords: &[&str]) -> Self {
        Self {
            category,
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            query: None,
            exclusions: Vec::new(),
            max_items: None,
        }
    }

    pub fn with_exclusions(mut self, exclusions: &[&str]) -> Self {
        self.exclusions = exclusions.iter().map(|e| e.to_string()).collect();
        self
    }

    fn has_terms(&self) -> bool {
        let has_query = self.query.as_deref().is_some_and(|q| !q.trim().is_empty());
        has_query || self.keywords.iter().any(|k| !k.trim().is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data.js"),
            source: SourceConfig::default(),
            pipeline: PipelineConfig::default(),
            enrich: EnrichConfig::default(),
            remarks: RemarkPool::default(),
            paste: Classifier::default(),
            feeds: default_feeds(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://news.google.com/rss/search".to_string(),
            language: "ko".to_string(),
            region: "KR".to_string(),
            edition: "KR:ko".to_string(),
            recency: "1d".to_string(),
            timeout_secs: 30,
            user_agent: concat!("newsdeck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_feed: 9,
            content_cap: 800,
            enrich_threshold: 50,
            min_content_len: 20,
            enrich_concurrency: 5,
            utc_offset_hours: 9,
            seed: None,
        }
    }
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 3000,
            max_bytes: 16 * 1024,
            allow_private_hosts: false,
        }
    }
}

/// The four feeds the dashboard ships with.
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new(
            Category::Policy,
            "국가 정책",
            &[
                "교육부", "평가원", "수능", "입법", "정신건강", "심리부검", "신학기 점검",
                "공교육 정책",
            ],
        )
        .with_exclusions(&["군청", "읍 사무소", "면 사무소", "이장", "마을", "농업", "축제"]),
        FeedConfig::new(
            Category::Local,
            "지역 교육 현황",
            &[
                "대학", "대학교", "대학 총장", "학사 운영", "캠퍼스", "고등교육", "LINC",
                "글로컬대학",
            ],
        )
        .with_exclusions(&["군", "참모총장", "국방부", "계엄", "내란", "의혹", "전투", "부대"]),
        FeedConfig::new(Category::Edutech, "에듀테크 기업", &["아이스크림미디어", "에듀테크"])
            .with_exclusions(&["구글", "애플", "아마존", "마이크로소프트", "MS", "제미나이", "GPT"]),
        FeedConfig::new(
            Category::Trend,
            "AI/글로벌",
            &[
                "AI", "로봇", "범용인공지능", "AGI", "할루시네이션", "환각", "인용 오류", "구글",
                "제미나이", "아마존", "애플", "래핑 전략", "수익화", "디지털 식민지화",
            ],
        ),
    ]
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "output", "source", "pipeline", "enrich", "remarks", "paste", "feeds",
    ];

    /// `~/.config/newsdeck/config.toml`, or `None` when HOME is unset.
    pub fn default_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("newsdeck")
                .join("config.toml"),
        )
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - A feed with neither keywords nor a query → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            output = %config.output.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(feed) = self.feeds.iter().find(|f| !f.has_terms()) {
            return Err(ConfigError::Invalid(format!(
                "feed '{}' ({}) needs keywords or a query",
                feed.label, feed.category
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
