//! Terminal rendition of the card feed and the detail view.
//!
//! The view works on an immutable [`Snapshot`] of the persisted articles.
//! Everything printed passes through [`strip_control_chars`] since titles and
//! content come straight from third-party feeds.

use crate::storage::{read_articles, Article, Category, StoreError};
use crate::util::{display_width, strip_control_chars, truncate_to_width};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use unicode_width::UnicodeWidthChar;

pub const EMPTY_CATEGORY: &str = "해당 카테고리의 기사가 없습니다.";
pub const DEFAULT_WIDTH: usize = 80;

const CARD_INDENT: &str = "     ";

/// Read-only article list shared by the renderers.
#[derive(Debug, Clone)]
pub struct Snapshot {
    articles: Arc<[Article]>,
}

impl Snapshot {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles: articles.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        read_articles(path).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Records in stored order; `None` selects everything.
    pub fn filter(&self, category: Option<Category>) -> Vec<&Article> {
        self.articles
            .iter()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .collect()
    }

    pub fn get(&self, id: usize) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }
}

/// Renders the whole card list. Each card is three lines: id, badge and
/// date; the title; a one-line content preview.
pub fn render_cards(articles: &[&Article], width: usize) -> String {
    if articles.is_empty() {
        return format!("{EMPTY_CATEGORY}\n");
    }

    let inner = width.saturating_sub(CARD_INDENT.len()).max(1);
    let mut out = String::new();
    for article in articles {
        let header = format!(
            "{:>3}. {} · {}",
            article.id,
            article.category.label(),
            sanitize(&article.date)
        );
        let title = sanitize(&article.title);
        let preview = sanitize(&article.content).replace('\n', " ");

        let _ = writeln!(out, "{}", truncate_to_width(&header, width));
        let _ = writeln!(out, "{CARD_INDENT}{}", truncate_to_width(&title, inner));
        let _ = writeln!(out, "{CARD_INDENT}{}", truncate_to_width(&preview, inner));
        out.push('\n');
    }
    out
}

/// Renders one article in full, wrapping long text to `width` columns.
pub fn render_detail(article: &Article, width: usize) -> String {
    let width = width.max(10);
    let rule = "─".repeat(width);
    let mut out = String::new();

    let _ = writeln!(out, "{}  {}", article.category.label(), sanitize(&article.date));
    for line in wrap(&sanitize(&article.title), width) {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "{rule}");

    section(&mut out, "한 줄 요약", &article.one_line, width);
    section(&mut out, "본문", &article.content, width);
    section(&mut out, "중요도", &article.importance, width);
    section(&mut out, "인사이트", &article.insight, width);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "원문 보러가기: {}", sanitize(&article.url));
    out
}

fn section(out: &mut String, heading: &str, body: &str, width: usize) {
    let _ = writeln!(out, "[{heading}]");
    for line in wrap(&sanitize(body), width) {
        let _ = writeln!(out, "{line}");
    }
    out.push('\n');
}

fn sanitize(s: &str) -> String {
    strip_control_chars(s).replace(['\t', '\r'], " ")
}

/// Greedy wrap by terminal columns. Breaks at the last space when there is
/// one on the line, mid-word otherwise (Korean text often has long runs).
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut used = 0;
        for c in paragraph.chars() {
            let w = UnicodeWidthChar::width(c).unwrap_or(0);
            if used + w > width {
                if c == ' ' {
                    lines.push(std::mem::take(&mut line));
                    used = 0;
                    continue;
                }
                match line.rfind(' ') {
                    Some(space) if space > 0 => {
                        let rest = line[space + 1..].to_string();
                        line.truncate(space);
                        lines.push(std::mem::take(&mut line));
                        used = display_width(&rest);
                        line = rest;
                    }
                    _ => {
                        lines.push(std::mem::take(&mut line));
                        used = 0;
                    }
                }
            }
            if line.is_empty() && c == ' ' {
                continue;
            }
            line.push(c);
            used += w;
        }
        lines.push(line);
    }
    lines
}
