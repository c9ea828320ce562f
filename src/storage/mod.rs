mod output;
mod types;

pub use output::{encode_articles, read_articles, write_articles, StoreError};
pub use types::{Article, Category, FeedItem, RawItem};
