//! Signed-in user state backed by a hosted auth + row-store service.
//!
//! - [`session`] - Sign in/up/out, current user, profile updates
//! - [`rows`] - Comment and wishlist rows over the backend's REST interface
//! - [`library`] - Local comment/wishlist lists with optimistic changes that
//!   are committed or rolled back once the backend answers

mod backend;
mod library;
mod rows;
mod session;

use thiserror::Error;

pub use backend::Backend;
pub use library::{CommentThread, PendingChange, WishlistEntry, WishlistState};
pub use rows::{Comment, RowStore};
pub use session::{AuthClient, SignUpOutcome, User};

/// Errors from the auth and row-store services.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    /// The operation needs a signed-in user
    #[error("Sign in to do that")]
    NotSignedIn,
    #[error("Passwords do not match")]
    PasswordMismatch,
    /// Input rejected before any request was made
    #[error("{0}")]
    InvalidInput(String),
    /// The backend answered with an error status
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    Malformed(String),
    #[error("No backend configured (set backend_url and backend_anon_key)")]
    NotConfigured,
    #[error("Invalid backend URL")]
    InvalidBaseUrl,
    #[error("Insecure backend URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl From<reqwest::Error> for AccountError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return AccountError::Timeout;
        }
        AccountError::Network(e.without_url())
    }
}
