//! Catalog feed: the paginated, filterable, infinitely scrolling game list.
//!
//! - [`filter`] - Search text plus genre/platform selection, normalised so unset
//!   markers are never forwarded
//! - [`controller`] - The feed state machine (single-flight loads, stale-result
//!   rejection, empty/error conditions)
//! - [`sentinel`] - End-of-list detection for the TUI viewport
//!
//! # Example
//!
//! ```ignore
//! use gamedex::feed::{fetch_page, FeedController, FilterSelection};
//!
//! let mut feed = FeedController::new(12);
//! let request = feed.set_filter(FilterSelection::new("zelda", None, None));
//! let result = fetch_page(source.as_ref(), &request).await;
//! feed.apply(request.ticket, result);
//! ```

mod controller;
mod filter;
mod sentinel;

pub use controller::{
    fetch_page, ApplyOutcome, FeedCondition, FeedController, FeedStatus, PageRequest, Ticket,
    DEFAULT_PAGE_SIZE, LOAD_ERROR_MESSAGE,
};
pub use filter::FilterSelection;
pub use sentinel::ViewportSentinel;
