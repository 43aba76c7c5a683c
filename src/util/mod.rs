//! Small helpers shared by the UI and the data layers.
//!
//! - **Text**: terminal-width measurement and truncation, control-character
//!   stripping for network text, HTML-to-text for game descriptions
//! - **URL validation**: checks a website URL before it is opened in the
//!   system browser

mod text;
mod url_validator;

pub use text::{display_width, html_to_text, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_url_for_open, UrlValidationError};

/// Longest search query the search bar accepts.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 100;
