//! Tolerant RSS item extraction.
//!
//! Search feeds are scanned with patterns rather than parsed as XML: every
//! `<item>` block is located on its own and its fields are picked out by
//! first match. A document that is not well-formed still yields whatever
//! items can be recognised, and one that has no items yields none. Nothing
//! here returns an error.

use crate::storage::RawItem;
use crate::util::clean_text;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Description used when an item has none
pub const MISSING_DESCRIPTION: &str = "내용을 불러올 수 없습니다.";

/// Aggregators append " - Source Name" to titles
const TITLE_SOURCE_SEPARATOR: &str = " - ";

static ITEM_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<item(?:\s[^>]*)?>(.*?)</item>").unwrap());
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title(?:\s[^>]*)?>(.*?)</title>").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<link(?:\s[^>]*)?>(.*?)</link>").unwrap());
static PUB_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<pubDate(?:\s[^>]*)?>(.*?)</pubDate>").unwrap());
static DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<description(?:\s[^>]*)?>(.*?)</description>").unwrap());

/// Parses every recognisable item, timestamping undated ones with the
/// current time.
pub fn parse_items(xml: &str) -> Vec<RawItem> {
    iter_items(xml, Utc::now()).collect()
}

/// Lazily yields items in document order.
///
/// `fetched_at` stands in for a missing or unparseable `pubDate`.
pub fn iter_items(xml: &str, fetched_at: DateTime<Utc>) -> impl Iterator<Item = RawItem> + '_ {
    ITEM_BLOCK
        .captures_iter(xml)
        .filter_map(move |caps| caps.get(1).and_then(|m| parse_block(m.as_str(), fetched_at)))
}

fn parse_block(block: &str, fetched_at: DateTime<Utc>) -> Option<RawItem> {
    let title = first_match(&TITLE, block).map(|raw| clean_title(&unwrap_cdata(raw)));
    let link = first_match(&LINK, block).map(|raw| unwrap_cdata(raw).trim().to_string());

    let (title, link) = match (title, link) {
        (Some(t), Some(l)) if !t.is_empty() && !l.is_empty() => (t, l),
        _ => {
            tracing::trace!("Skipping item without title or link");
            return None;
        }
    };

    let published = first_match(&PUB_DATE, block)
        .and_then(parse_pub_date)
        .unwrap_or(fetched_at);

    let description = first_match(&DESCRIPTION, block)
        .map(|raw| clean_text(&unwrap_cdata(raw)))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| MISSING_DESCRIPTION.to_string());

    Some(RawItem {
        title,
        link,
        published,
        description,
    })
}

fn first_match<'a>(pattern: &Regex, block: &'a str) -> Option<&'a str> {
    pattern
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn unwrap_cdata(raw: &str) -> Cow<'_, str> {
    if raw.contains("<![CDATA[") {
        Cow::Owned(raw.replace("<![CDATA[", "").replace("]]>", ""))
    } else {
        Cow::Borrowed(raw)
    }
}

fn clean_title(raw: &str) -> String {
    let cleaned = clean_text(raw);
    cleaned
        .split(TITLE_SOURCE_SEPARATOR)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// RSS dates are RFC 2822; some feeds emit RFC 3339 instead.
pub(crate) fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
