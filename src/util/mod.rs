//! Utility functions shared across the pipeline and the terminal view.
//!
//! - **Text processing**: HTML-to-text cleaning, character-count truncation for
//!   stored content, and column-aware truncation for terminal output
//! - **URL validation**: SSRF guard for enrichment fetches and a scheme check
//!   for links opened in the browser

mod text;
mod url_validator;

pub use text::{
    clean_text, display_width, strip_control_chars, truncate_chars, truncate_to_width, ELLIPSIS,
};
pub use url_validator::{validate_url, validate_url_for_open, UrlValidationError};

/// Format used for every article date, e.g. `2024.01.01`
pub const DATE_FORMAT: &str = "%Y.%m.%d";
