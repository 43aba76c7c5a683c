use crate::catalog::{CatalogError, CatalogPage, CatalogSource, Game};
use crate::feed::filter::FilterSelection;
use std::collections::HashSet;

pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Message shown for every load failure, whatever its cause.
pub const LOAD_ERROR_MESSAGE: &str = "Unable to load games. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Loading,
    Error(String),
}

/// What the presentation layer should show for the feed as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCondition {
    /// Nothing has arrived yet in this process; show placeholders.
    InitialLoading,
    /// Items are on screen and another page is being fetched (or page 1 of a new filter).
    Loading,
    Ready,
    /// A load completed with zero items.
    NoResults,
    Failed,
}

/// Identifies one issued request. Results are applied only when their
/// ticket matches the request currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    generation: u64,
    page: u32,
}

impl Ticket {
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// A page read the caller must perform and hand back through [`FeedController::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub ticket: Ticket,
    pub selection: FilterSelection,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The result belonged to a superseded filter or page and was dropped.
    Stale,
}

/// Paginated, filterable feed of catalog items.
///
/// The controller never performs I/O. Operations that start a load return a
/// [`PageRequest`]; the caller runs it (usually on a tokio task via
/// [`fetch_page`]) and reports the outcome with [`apply`](Self::apply).
/// At most one request is in flight at a time.
#[derive(Debug)]
pub struct FeedController {
    selection: FilterSelection,
    items: Vec<Game>,
    seen_ids: HashSet<u64>,
    page: u32,
    has_more: bool,
    status: FeedStatus,
    total: Option<u64>,
    page_size: u32,
    generation: u64,
    in_flight: Option<Ticket>,
    initial_load_done: bool,
}

impl FeedController {
    pub fn new(page_size: u32) -> Self {
        Self {
            selection: FilterSelection::default(),
            items: Vec::new(),
            seen_ids: HashSet::new(),
            page: 1,
            has_more: true,
            status: FeedStatus::Idle,
            total: None,
            page_size: page_size.max(1),
            generation: 0,
            in_flight: None,
            initial_load_done: false,
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Replaces the filter selection and starts loading page 1 under it.
    ///
    /// Any request still in flight becomes stale.
    pub fn set_filter(&mut self, selection: FilterSelection) -> PageRequest {
        self.generation = self.generation.wrapping_add(1);
        self.selection = selection;
        self.items.clear();
        self.seen_ids.clear();
        self.page = 1;
        self.has_more = true;
        self.status = FeedStatus::Idle;
        self.total = None;
        self.in_flight = None;

        tracing::debug!(
            generation = self.generation,
            search = ?self.selection.search_query(),
            genre = ?self.selection.genre(),
            platform = ?self.selection.platform(),
            "Feed filter changed"
        );

        self.issue(1)
    }

    /// Starts loading page `n`.
    ///
    /// Returns `None` while another request is in flight, for `n == 0`, and
    /// for any page after the first once the source reported no more pages.
    pub fn load_page(&mut self, n: u32) -> Option<PageRequest> {
        if n == 0 || self.status == FeedStatus::Loading {
            return None;
        }
        if n != 1 && !self.has_more {
            return None;
        }
        Some(self.issue(n))
    }

    /// Requests the next page when the end of the list scrolls into view.
    pub fn on_sentinel_visible(&mut self) -> Option<PageRequest> {
        if self.status == FeedStatus::Loading || !self.has_more {
            return None;
        }
        self.load_page(self.page.saturating_add(1))
    }

    /// Re-runs the current selection from a clean state.
    pub fn reload(&mut self) -> PageRequest {
        self.set_filter(self.selection.clone())
    }

    fn issue(&mut self, page: u32) -> PageRequest {
        let ticket = Ticket {
            generation: self.generation,
            page,
        };
        self.page = page;
        self.status = FeedStatus::Loading;
        self.in_flight = Some(ticket);
        PageRequest {
            ticket,
            selection: self.selection.clone(),
            page,
            page_size: self.page_size,
        }
    }

    /// Applies the outcome of a request issued by this controller.
    ///
    /// Failures are absorbed: the feed moves to [`FeedStatus::Error`] with a
    /// generic message, loses its items, and stops paginating.
    pub fn apply(
        &mut self,
        ticket: Ticket,
        result: Result<CatalogPage, CatalogError>,
    ) -> ApplyOutcome {
        if self.in_flight != Some(ticket) {
            tracing::debug!(
                ticket_generation = ticket.generation,
                ticket_page = ticket.page,
                generation = self.generation,
                "Discarding stale page result"
            );
            return ApplyOutcome::Stale;
        }
        self.in_flight = None;
        self.initial_load_done = true;

        match result {
            Ok(page) => {
                if ticket.page == 1 {
                    self.items.clear();
                    self.seen_ids.clear();
                }
                let before = self.items.len();
                for game in page.items {
                    if self.seen_ids.insert(game.id) {
                        self.items.push(game);
                    }
                }
                self.has_more = page.has_next;
                self.total = page.total.or(self.total);
                self.status = FeedStatus::Idle;
                tracing::debug!(
                    page = ticket.page,
                    added = self.items.len() - before,
                    total = self.items.len(),
                    has_more = self.has_more,
                    "Feed page applied"
                );
            }
            Err(e) => {
                tracing::warn!(
                    page = ticket.page,
                    kind = ?e.kind(),
                    error = %e,
                    "Feed page load failed"
                );
                self.items.clear();
                self.seen_ids.clear();
                self.has_more = false;
                self.status = FeedStatus::Error(LOAD_ERROR_MESSAGE.to_string());
            }
        }
        ApplyOutcome::Applied
    }

    /// Fails the request in flight when its task died without reporting.
    ///
    /// Returns `false` if nothing was in flight.
    pub fn fail_in_flight(&mut self) -> bool {
        let Some(ticket) = self.in_flight else {
            return false;
        };
        self.apply(
            ticket,
            Err(CatalogError::Source("page load task ended unexpectedly".into())),
        );
        true
    }

    // ========================================================================
    // Snapshot Accessors
    // ========================================================================

    pub fn items(&self) -> &[Game] {
        &self.items
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FeedStatus::Loading
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            FeedStatus::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Total matching items reported by the source, if known.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn condition(&self) -> FeedCondition {
        match &self.status {
            FeedStatus::Error(_) => FeedCondition::Failed,
            FeedStatus::Loading if !self.initial_load_done => FeedCondition::InitialLoading,
            FeedStatus::Loading => FeedCondition::Loading,
            FeedStatus::Idle if !self.items.is_empty() => FeedCondition::Ready,
            FeedStatus::Idle if self.initial_load_done => FeedCondition::NoResults,
            FeedStatus::Idle => FeedCondition::InitialLoading,
        }
    }
}

/// Executes a [`PageRequest`], routing to search or browse.
pub async fn fetch_page(
    source: &dyn CatalogSource,
    request: &PageRequest,
) -> Result<CatalogPage, CatalogError> {
    let filters = request.selection.to_filters();
    match request.selection.search_query() {
        Some(query) => {
            source
                .search_items(query, request.page, request.page_size, &filters)
                .await
        }
        None => {
            source
                .list_items(request.page, request.page_size, &filters)
                .await
        }
    }
}
