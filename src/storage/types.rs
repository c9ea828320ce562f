use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Category
// ============================================================================

/// Classification tag used for filtering and badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Iscream,
    Policy,
    Local,
    Edutech,
    Trend,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Iscream,
        Category::Policy,
        Category::Local,
        Category::Edutech,
        Category::Trend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Iscream => "iscream",
            Category::Policy => "policy",
            Category::Local => "local",
            Category::Edutech => "edutech",
            Category::Trend => "trend",
        }
    }

    /// Badge text shown on cards and in the detail view
    pub fn label(self) -> &'static str {
        match self {
            Category::Iscream => "🍦 아이스크림미디어 소식",
            Category::Policy => "🏛️ 국가 정책",
            Category::Local => "🏫 지역 교육 현황",
            Category::Edutech => "🚀 에듀테크 기업",
            Category::Trend => "🌎 AI/글로벌",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown category '{}' (expected one of: iscream, policy, local, edutech, trend)",
                    s
                )
            })
    }
}

// ============================================================================
// Pipeline records
// ============================================================================

/// One `<item>` pulled out of a feed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published: DateTime<Utc>,
    /// Plain text; a placeholder when the feed had none
    pub description: String,
}

/// A [`RawItem`] tagged with the category of the feed that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub category: Category,
    pub item: RawItem,
}

/// The persisted record the view layer renders, one card per article.
///
/// Field names on disk follow the data file read by the browser view
/// (`oneLine` rather than `one_line`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// 1-based, contiguous in final order
    pub id: usize,
    pub category: Category,
    pub title: String,
    /// `YYYY.MM.DD`
    pub date: String,
    pub one_line: String,
    pub content: String,
    pub importance: String,
    pub insight: String,
    pub url: String,
}
