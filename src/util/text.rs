use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static PARAGRAPH_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</p>").unwrap());
static LIST_ITEM_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</li>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Entities decoded by [`clean_text`], in decoding order.
const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

/// Ellipsis appended by the truncation helpers
pub const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Turns raw feed or page text into plain display text.
///
/// Block-level closers become line breaks, the common entities are decoded,
/// every remaining tag and absolute URL is removed, and the result is trimmed.
///
/// The passes are repeated until one of them changes nothing. Each effective
/// pass only ever shortens the text, so the loop terminates, and the result is
/// a fixed point: calling `clean_text` on its own output returns it unchanged,
/// including for doubly escaped input like `&amp;lt;b&amp;gt;`.
///
/// # Examples
///
/// ```
/// use newsdeck::util::clean_text;
///
/// assert_eq!(clean_text("&lt;p&gt;Hello&lt;/p&gt;"), "Hello");
/// assert_eq!(clean_text("a<br>b"), "a\nb");
/// assert_eq!(clean_text(""), "");
/// ```
pub fn clean_text(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(raw: &str) -> String {
    let text = BREAK_TAG.replace_all(raw, "\n");
    let text = PARAGRAPH_CLOSE.replace_all(&text, "\n\n");
    let text = LIST_ITEM_CLOSE.replace_all(&text, "\n");

    let mut decoded = text.into_owned();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }

    let stripped = ANY_TAG.replace_all(&decoded, "");
    let without_urls = ABSOLUTE_URL.replace_all(&stripped, "");
    without_urls.trim().to_string()
}

/// Truncates to at most `max_chars` characters, counting the ellipsis.
///
/// Returns the input borrowed when it already fits. Counting is per `char`,
/// never per byte, so Hangul and other multibyte text is never split.
pub fn truncate_chars(s: &str, max_chars: usize) -> Cow<'_, str> {
    let Some((cut, _)) = s.char_indices().nth(max_chars) else {
        return Cow::Borrowed(s);
    };

    if max_chars <= ELLIPSIS.len() {
        return Cow::Owned(s[..cut].to_string());
    }

    let keep = max_chars - ELLIPSIS.len();
    let end = s.char_indices().nth(keep).map(|(i, _)| i).unwrap_or(cut);
    Cow::Owned(format!("{}{}", s[..end].trim_end(), ELLIPSIS))
}

/// Display width of a string in terminal columns (CJK and emoji count double).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncates a string to fit `max_width` terminal columns, appending "..."
/// when anything was cut.
///
/// Widths of three columns or fewer get no ellipsis, only the characters
/// that fit.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..end].to_string())
    } else {
        Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
    }
}

/// Removes terminal control characters and ANSI escape sequences.
///
/// Feed text is attacker-controlled; anything printed to the terminal goes
/// through here first. Tab, newline and carriage return are kept.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_control =
        |b: u8| b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r');

    if !s.bytes().any(is_control) {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == 0x1b {
            match bytes.get(i + 1) {
                // CSI: parameters until a final byte in 0x40..=0x7e
                Some(b'[') => {
                    i += 2;
                    while i < bytes.len() {
                        let c = bytes[i];
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ST
                Some(b']') => {
                    i += 2;
                    while i < bytes.len() {
                        if bytes[i] == 0x07 {
                            i += 1;
                            break;
                        }
                        if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        } else if is_control(b) {
            i += 1;
        } else {
            let start = i;
            while i < bytes.len() && !is_control(bytes[i]) {
                i += 1;
            }
            // Only ASCII bytes end a run, so the slice stays on char boundaries.
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}
