//! The persisted article artifact.
//!
//! Every pipeline run replaces the whole file. A `.js` destination is written
//! as a data script (`const newsData = [...];`) the browser view can load with
//! a plain `<script>` tag; any other extension gets bare JSON.

use crate::storage::Article;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Variable name the browser view reads the list from
const JS_BINDING: &str = "const newsData";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode articles: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("'{0}' does not contain a news data list")]
    Malformed(PathBuf),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("js"))
}

/// Renders the list the way it is stored at `path`.
pub fn encode_articles(path: &Path, articles: &[Article]) -> Result<Vec<u8>, StoreError> {
    let mut json = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
    articles.serialize(&mut serializer)?;

    if !is_script(path) {
        json.push(b'\n');
        return Ok(json);
    }

    let mut out = Vec::with_capacity(json.len() + 32);
    out.extend_from_slice(JS_BINDING.as_bytes());
    out.extend_from_slice(b" = ");
    out.extend_from_slice(&json);
    out.extend_from_slice(b";\n");
    Ok(out)
}

/// Replaces the artifact at `path` with `articles`.
///
/// The content goes to a uniquely named sibling first, is synced, and is then
/// renamed over the destination, so readers see either the old list or the
/// new one and never a partial file.
pub fn write_articles(path: &Path, articles: &[Article]) -> Result<(), StoreError> {
    let content = encode_articles(path, articles)?;

    use std::time::{SystemTime, UNIX_EPOCH};
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", suffix));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| StoreError::io(&temp_path, e))?;

    let written = temp_file
        .write_all(&content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(StoreError::io(&temp_path, e));
    }

    // rename does not replace an existing file on Windows
    #[cfg(windows)]
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StoreError::io(path, e));
        }
    }

    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        StoreError::io(path, e)
    })?;

    tracing::debug!(path = %path.display(), articles = articles.len(), bytes = content.len(), "Wrote article data");
    Ok(())
}

/// Loads a list written by [`write_articles`], in either form.
pub fn read_articles(path: &Path) -> Result<Vec<Article>, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let trimmed = raw.trim();

    let json = match trimmed.strip_prefix(JS_BINDING) {
        Some(rest) => rest
            .trim_start()
            .strip_prefix('=')
            .map(|r| r.trim().trim_end_matches(';').trim_end())
            .ok_or_else(|| StoreError::Malformed(path.to_path_buf()))?,
        None => trimmed,
    };

    serde_json::from_str(json).map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "Article data did not decode");
        StoreError::Malformed(path.to_path_buf())
    })
}
