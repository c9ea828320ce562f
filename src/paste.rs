//! Newsletter paste parsing.
//!
//! Turns freeform text copied out of a newsletter or chat into article
//! records: every line holding a link becomes one article, titled by the line
//! right above it. These records are shown next to the feed but never
//! written back to the data file.

use crate::storage::{Article, Category};
use crate::util::DATE_FORMAT;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d.\-\s]+").unwrap());

pub const UNTITLED: &str = "제목 없음";
pub const PASTED_CONTENT: &str =
    "붙여넣은 뉴스레터에서 가져온 기사입니다. 자세한 내용은 [원문 보러가기]를 통해 확인해 주시기 바랍니다.";
pub const PASTED_IMPORTANCE: &str = "뉴스레터로 공유된 기사로, 담당 부서의 검토가 필요합니다.";
pub const PASTED_INSIGHT: &str = "원문을 확인한 뒤 관련 팀과 주요 내용을 공유하십시오.";

/// One classification rule: any keyword contained in the title selects
/// `category`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassificationRule {
    pub category: Category,
    pub keywords: Vec<String>,
}

impl ClassificationRule {
    fn new(category: Category, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && text.contains(k.as_str()))
    }
}

/// Ordered rule table. Rules are tried top to bottom and the first match
/// wins; `default` applies when none match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Classifier {
    pub rules: Vec<ClassificationRule>,
    pub default: Category,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: vec![
                ClassificationRule::new(Category::Iscream, &["아이스크림", "i-Scream"]),
                ClassificationRule::new(Category::Policy, &["교육부", "정책", "평가원", "수능"]),
                ClassificationRule::new(Category::Local, &["대학", "교육청", "캠퍼스"]),
                ClassificationRule::new(Category::Edutech, &["에듀테크", "디지털 교과서"]),
                ClassificationRule::new(Category::Trend, &["AI", "인공지능", "로봇"]),
            ],
            default: Category::Trend,
        }
    }
}

impl Classifier {
    pub fn classify(&self, text: &str) -> Category {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map(|rule| rule.category)
            .unwrap_or(self.default)
    }
}

/// Parses pasted text into articles, ids starting at 1.
///
/// An empty result means nothing looked like a link; callers report that
/// to the user rather than treating it as a failure.
pub fn parse_newsletter(text: &str, classifier: &Classifier, today: NaiveDate) -> Vec<Article> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let date = today.format(DATE_FORMAT).to_string();

    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let url = URL_PATTERN.find(line)?.as_str();
            let title = idx
                .checked_sub(1)
                .map(|prev| strip_list_marker(lines[prev]))
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTITLED);
            Some((title, url))
        })
        .enumerate()
        .map(|(n, (title, url))| Article {
            id: n + 1,
            category: classifier.classify(title),
            title: title.to_string(),
            date: date.clone(),
            one_line: title.to_string(),
            content: PASTED_CONTENT.to_string(),
            importance: PASTED_IMPORTANCE.to_string(),
            insight: PASTED_INSIGHT.to_string(),
            url: url.to_string(),
        })
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    match LIST_MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}
