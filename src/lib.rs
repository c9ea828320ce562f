//! Education and AI news collector.
//!
//! Searches a news RSS endpoint once per configured topic, merges the results
//! newest first, fills thin summaries from article page metadata and writes
//! the list as a data file for the card-feed view.

pub mod config;
pub mod feed;
pub mod http;
pub mod paste;
pub mod remarks;
pub mod storage;
pub mod util;
pub mod view;
