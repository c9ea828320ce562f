//! Feed collection: from search queries to formatted articles.
//!
//! - [`fetcher`] - Query building and one HTTP request per configured feed
//! - [`parser`] - Tolerant RSS item scanning (no XML validation)
//! - [`enricher`] - Page metadata lookup for items with thin descriptions
//! - [`pipeline`] - Concurrent fetch, merge, enrichment and formatting
//!
//! # Example
//!
//! ```ignore
//! use newsdeck::feed::Pipeline;
//!
//! let pipeline = Pipeline::from_config(&config)?;
//! let articles = pipeline.run_and_persist(&config.feeds, &config.output).await?;
//! ```

mod enricher;
mod fetcher;
mod parser;
mod pipeline;

pub use enricher::{extract_description, MetaEnricher};
pub use fetcher::{build_query, build_search_url, fetch_feed, FetchError};
pub use parser::{iter_items, parse_items, MISSING_DESCRIPTION};
pub use pipeline::{format_articles, merge_and_sort, Pipeline, FALLBACK_CONTENT};
