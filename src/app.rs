use crate::account::{
    AccountError, AuthClient, Comment, CommentThread, PendingChange, RowStore, SignUpOutcome,
    User, WishlistState,
};
use crate::catalog::{CatalogError, CatalogPage, CatalogSource, Game, GameDetails, NamedRef};
use crate::feed::{FeedController, FilterSelection, Ticket, ViewportSentinel};
use crate::keybindings::{Context, KeybindingRegistry};
use crate::preferences::PreferenceManager;
use crate::storage::Database;
use crate::theme::{StyleMap, Theme, ThemeVariant};
use lru::LruCache;
use ratatui::style::Style;
use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Detail pages kept in memory between visits.
const DETAIL_CACHE_CAPACITY: usize = 64;

/// How long a status bar message stays up.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Rows of lookahead before the end of the catalog list triggers the next page.
const SENTINEL_LOOKAHEAD: usize = 2;

// ============================================================================
// Views and Menus
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Catalog,
    Details,
    Wishlist,
    Profile,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKind {
    Genre,
    Platform,
}

impl MenuKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Genre => "Genre",
            Self::Platform => "Platform",
        }
    }
}

/// Genre/platform picker. At most one menu is open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Closed,
    /// `selected` indexes the menu rows, where row 0 is "All".
    Open { kind: MenuKind, selected: usize },
}

/// Something fetched in the background.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn ready_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: &'static str,
    pub value: String,
    /// Rendered as bullets.
    pub masked: bool,
}

impl FormField {
    fn text(label: &'static str, value: &str) -> Self {
        Self {
            label,
            value: value.to_string(),
            masked: false,
        }
    }

    fn secret(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            masked: true,
        }
    }
}

/// A small stack of text fields with one focused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub submitting: bool,
    pub error: Option<String>,
}

impl Form {
    fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            focus: 0,
            submitting: false,
            error: None,
        }
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or("")
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.push(c);
        }
        self.error = None;
    }

    pub fn backspace(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.focus = (self.focus + 1) % self.fields.len();
        }
    }

    /// Wipes every masked field.
    pub fn clear_secrets(&mut self) {
        for field in self.fields.iter_mut().filter(|f| f.masked) {
            field.value.clear();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    SignIn,
    SignUp,
}

/// Sign-in / registration form on the Login view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub mode: LoginMode,
    pub form: Form,
}

impl LoginForm {
    pub fn new(mode: LoginMode, email: &str) -> Self {
        let mut fields = vec![FormField::text("Email", email), FormField::secret("Password")];
        if mode == LoginMode::SignUp {
            fields.push(FormField::secret("Confirm password"));
        }
        let mut form = Form::new(fields);
        // Jump straight to the password when the email is remembered
        if !email.is_empty() {
            form.focus = 1;
        }
        Self { mode, form }
    }

    pub fn email(&self) -> &str {
        self.form.value(0)
    }

    pub fn password(&self) -> &str {
        self.form.value(1)
    }

    pub fn confirm(&self) -> &str {
        self.form.value(2)
    }

    /// Switches between sign in and register, keeping the email.
    pub fn toggle_mode(&mut self) {
        let mode = match self.mode {
            LoginMode::SignIn => LoginMode::SignUp,
            LoginMode::SignUp => LoginMode::SignIn,
        };
        *self = Self::new(mode, &self.email().to_string());
    }
}

/// Email/password change form on the Profile view.
pub fn account_form(current_email: &str) -> Form {
    Form::new(vec![
        FormField::text("Email", current_email),
        FormField::secret("New password"),
        FormField::secret("Confirm password"),
    ])
}

// ============================================================================
// Per-View State
// ============================================================================

/// The game page currently open.
#[derive(Debug)]
pub struct DetailsState {
    pub game_id: u64,
    /// Matches the generation carried by this page's background loads.
    pub generation: u64,
    /// The list entry the page was opened from, shown while details load.
    pub summary: Option<Game>,
    pub details: Loadable<Arc<GameDetails>>,
    pub comments: Loadable<CommentThread>,
    pub selected_comment: usize,
    pub scroll: u16,
    /// Comment being written, if the comment box is open.
    pub draft: Option<String>,
    /// Wishlist membership checked directly, used while the wishlist itself
    /// is not loaded.
    pub wishlisted: Option<bool>,
    /// Where Back returns to.
    pub return_to: View,
}

impl DetailsState {
    pub fn title(&self) -> Cow<'_, str> {
        match (&self.details, &self.summary) {
            (Loadable::Ready(details), _) => Cow::Borrowed(details.name.as_str()),
            (_, Some(game)) => Cow::Borrowed(&*game.name),
            _ => Cow::Owned(format!("Game #{}", self.game_id)),
        }
    }

    pub fn selected_comment(&self) -> Option<&Comment> {
        self.comments
            .ready()
            .and_then(|thread| thread.comments().get(self.selected_comment))
    }
}

#[derive(Debug)]
pub struct ProfileState {
    pub comments: Loadable<Vec<Comment>>,
    pub selected: usize,
    pub form: Option<Form>,
}

impl Default for ProfileState {
    fn default() -> Self {
        Self {
            comments: Loadable::Loading,
            selected: 0,
            form: None,
        }
    }
}

// ============================================================================
// Services
// ============================================================================

/// Remote collaborators. Accounts are optional: without a configured
/// backend, `auth` and `rows` are `None` and account actions explain why.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<dyn CatalogSource>,
    pub auth: Option<Arc<AuthClient>>,
    pub rows: Option<Arc<RowStore>>,
}

impl Services {
    pub fn new(catalog: Arc<dyn CatalogSource>, auth: Option<Arc<AuthClient>>) -> Self {
        let rows = auth.as_ref().map(|auth| Arc::new(RowStore::new(Arc::clone(auth))));
        Self {
            catalog,
            auth,
            rows,
        }
    }

    pub fn auth(&self) -> Result<&Arc<AuthClient>, AccountError> {
        self.auth.as_ref().ok_or(AccountError::NotConfigured)
    }

    pub fn rows(&self) -> Result<&Arc<RowStore>, AccountError> {
        self.rows.as_ref().ok_or(AccountError::NotConfigured)
    }
}

// ============================================================================
// Background Events
// ============================================================================

/// Where a comment deletion was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOrigin {
    Details { game_id: u64 },
    Profile,
}

/// Results sent back by background tasks.
pub enum AppEvent {
    PageLoaded {
        ticket: Ticket,
        result: Result<CatalogPage, CatalogError>,
    },
    GenresLoaded(Result<Vec<NamedRef>, CatalogError>),
    PlatformsLoaded(Result<Vec<NamedRef>, CatalogError>),
    /// `cached` is true when the page came from the SQLite cache.
    DetailsLoaded {
        game_id: u64,
        generation: u64,
        result: Result<Arc<GameDetails>, CatalogError>,
        cached: bool,
    },
    CommentsLoaded {
        game_id: u64,
        generation: u64,
        result: Result<Vec<Comment>, AccountError>,
    },
    CommentPosted {
        game_id: u64,
        change: PendingChange,
        result: Result<Comment, AccountError>,
    },
    CommentDeleted {
        origin: CommentOrigin,
        change: PendingChange,
        result: Result<(), AccountError>,
    },
    WishlistLoaded(Result<Vec<u64>, AccountError>),
    /// Details for a wishlist row that had only an id.
    WishlistGameLoaded(Game),
    WishlistSynced {
        change: PendingChange,
        result: Result<(), AccountError>,
    },
    MembershipChecked {
        game_id: u64,
        result: Result<bool, AccountError>,
    },
    SignedIn(Result<User, AccountError>),
    SignedUp(Result<SignUpOutcome, AccountError>),
    SignedOut(Result<(), AccountError>),
    AccountUpdated(Result<User, AccountError>),
    ProfileCommentsLoaded(Result<Vec<Comment>, AccountError>),
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state.
pub struct App {
    pub db: Database,
    pub services: Services,
    pub prefs: PreferenceManager,

    // Presentation context
    pub theme: Theme,
    pub styles: StyleMap,
    pub keybindings: KeybindingRegistry,

    // Catalog
    pub feed: FeedController,
    pub sentinel: ViewportSentinel,
    pub catalog_selected: usize,
    /// First visible catalog row. Maintained by the renderer.
    pub catalog_offset: usize,
    /// Rows the catalog list had on the last frame.
    pub catalog_viewport_rows: usize,
    pub feed_handle: Option<tokio::task::JoinHandle<()>>,
    pub genres: Vec<NamedRef>,
    pub platforms: Vec<NamedRef>,
    pub menu: MenuState,
    /// Search bar contents while it has focus.
    pub search_draft: Option<String>,

    // Game page
    pub view: View,
    pub details: Option<DetailsState>,
    pub details_generation: u64,
    pub details_handle: Option<tokio::task::JoinHandle<()>>,
    pub detail_cache: LruCache<u64, Arc<GameDetails>>,

    // Account
    pub user: Option<User>,
    pub wishlist: Option<WishlistState>,
    pub wishlist_selected: usize,
    pub profile: ProfileState,
    pub login: LoginForm,

    // Chrome
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub show_help: bool,
    pub help_scroll_offset: usize,
    pub spinner_frame: usize,
}

impl App {
    pub fn new(db: Database, services: Services, prefs: PreferenceManager, page_size: u32) -> Self {
        let theme = Theme::new(prefs.theme_variant());
        let styles = theme.style_map();

        let mut keybindings = KeybindingRegistry::new();
        for warning in keybindings.apply_overrides(&prefs.keybindings()) {
            tracing::warn!(warning = %warning, "Keybinding override skipped");
        }

        let login = LoginForm::new(LoginMode::SignIn, prefs.last_email().unwrap_or(""));
        let capacity = NonZeroUsize::new(DETAIL_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);

        Self {
            db,
            services,
            prefs,
            theme,
            styles,
            keybindings,
            feed: FeedController::new(page_size),
            sentinel: ViewportSentinel::new(SENTINEL_LOOKAHEAD),
            catalog_selected: 0,
            catalog_offset: 0,
            catalog_viewport_rows: 0,
            feed_handle: None,
            genres: Vec::new(),
            platforms: Vec::new(),
            menu: MenuState::Closed,
            search_draft: None,
            view: View::Catalog,
            details: None,
            details_generation: 0,
            details_handle: None,
            detail_cache: LruCache::new(capacity),
            user: None,
            wishlist: None,
            wishlist_selected: 0,
            profile: ProfileState::default(),
            login,
            status_message: None,
            needs_redraw: true,
            show_help: false,
            help_scroll_offset: 0,
            spinner_frame: 0,
        }
    }

    // ========================================================================
    // Theme and Status
    // ========================================================================

    /// `Style::default()` for unknown roles.
    pub fn style(&self, role: &str) -> Style {
        self.styles.resolve(role)
    }

    /// Flips Dark/Light. The caller persists the returned variant.
    pub fn toggle_theme(&mut self) -> ThemeVariant {
        let variant = self.theme.toggle();
        self.styles = self.theme.style_map();
        self.needs_redraw = true;
        variant
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        match &self.status_message {
            Some((_, at)) if at.elapsed() >= STATUS_TTL => {
                self.status_message = None;
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // Input Context
    // ========================================================================

    /// True when keystrokes should go into a text field.
    pub fn is_editing(&self) -> bool {
        match self.view {
            View::Login => true,
            View::Catalog => self.search_draft.is_some(),
            View::Details => self.details.as_ref().is_some_and(|d| d.draft.is_some()),
            View::Profile => self.profile.form.is_some(),
            View::Wishlist => false,
        }
    }

    /// The keybinding context for the current state.
    pub fn key_context(&self) -> Context {
        if matches!(self.menu, MenuState::Open { .. }) {
            return Context::Menu;
        }
        if self.is_editing() {
            return Context::TextInput;
        }
        match self.view {
            View::Catalog => Context::Catalog,
            View::Details => Context::Details,
            View::Wishlist => Context::Wishlist,
            View::Profile => Context::Profile,
            View::Login => Context::TextInput,
        }
    }

    // ========================================================================
    // Catalog Navigation
    // ========================================================================

    pub fn selected_game(&self) -> Option<&Game> {
        self.feed.items().get(self.catalog_selected)
    }

    pub fn catalog_move(&mut self, delta: isize) {
        let len = self.feed.items().len();
        self.catalog_selected = step(self.catalog_selected, delta, len);
        self.scroll_catalog_to_selection();
    }

    /// Keeps the selected row inside the viewport.
    pub fn scroll_catalog_to_selection(&mut self) {
        let rows = self.catalog_viewport_rows.max(1);
        if self.catalog_selected < self.catalog_offset {
            self.catalog_offset = self.catalog_selected;
        } else if self.catalog_selected >= self.catalog_offset + rows {
            self.catalog_offset = self.catalog_selected + 1 - rows;
        }
    }

    /// Resets list position after the feed was replaced.
    pub fn reset_catalog_position(&mut self) {
        self.catalog_selected = 0;
        self.catalog_offset = 0;
    }

    /// Clamps selection after items changed underneath it.
    pub fn clamp_catalog_selection(&mut self) {
        let len = self.feed.items().len();
        if self.catalog_selected >= len {
            self.catalog_selected = len.saturating_sub(1);
        }
        self.catalog_offset = self.catalog_offset.min(self.catalog_selected);
    }

    /// Whether the end of the catalog list is on screen.
    pub fn sentinel_visible(&self) -> bool {
        self.view == View::Catalog
            && self.sentinel.is_visible(
                self.catalog_offset,
                self.catalog_viewport_rows,
                self.feed.items().len(),
            )
    }

    // ========================================================================
    // Filter Menu
    // ========================================================================

    pub fn menu_options(&self, kind: MenuKind) -> &[NamedRef] {
        match kind {
            MenuKind::Genre => &self.genres,
            MenuKind::Platform => &self.platforms,
        }
    }

    /// Opens a picker with the current choice highlighted. Opening one menu
    /// closes the other.
    pub fn open_menu(&mut self, kind: MenuKind) {
        let current = match kind {
            MenuKind::Genre => self.feed.selection().genre(),
            MenuKind::Platform => self.feed.selection().platform(),
        };
        let selected = current
            .and_then(|id| {
                self.menu_options(kind)
                    .iter()
                    .position(|opt| opt.id.to_string() == id)
            })
            .map_or(0, |pos| pos + 1);
        self.menu = MenuState::Open { kind, selected };
    }

    pub fn close_menu(&mut self) {
        self.menu = MenuState::Closed;
    }

    pub fn menu_move(&mut self, delta: isize) {
        if let MenuState::Open { kind, selected } = self.menu {
            // +1 for the "All" row
            let len = self.menu_options(kind).len() + 1;
            self.menu = MenuState::Open {
                kind,
                selected: step(selected, delta, len),
            };
        }
    }

    /// Closes the menu and returns the selection it produces, or `None` when
    /// the choice did not change anything.
    pub fn menu_choose(&mut self) -> Option<FilterSelection> {
        let MenuState::Open { kind, selected } = self.menu else {
            return None;
        };
        self.menu = MenuState::Closed;

        let id = selected
            .checked_sub(1)
            .and_then(|i| self.menu_options(kind).get(i))
            .map(|opt| opt.id.to_string());
        let current = self.feed.selection();
        let next = match kind {
            MenuKind::Genre => current.with_genre(id.as_deref()),
            MenuKind::Platform => current.with_platform(id.as_deref()),
        };
        (next != *current).then_some(next)
    }

    /// Display name for a genre/platform id, falling back to the id.
    pub fn option_name<'a>(&'a self, kind: MenuKind, id: &'a str) -> &'a str {
        self.menu_options(kind)
            .iter()
            .find(|opt| opt.id.to_string() == id)
            .map_or(id, |opt| opt.name.as_str())
    }

    // ========================================================================
    // Game Page
    // ========================================================================

    /// Opens the game page and returns the generation its loads must carry.
    /// Any previous page load is aborted.
    pub fn begin_details(&mut self, game_id: u64, summary: Option<Game>) -> u64 {
        if let Some(handle) = self.details_handle.take() {
            handle.abort();
        }
        self.details_generation = self.details_generation.wrapping_add(1);
        let return_to = match self.view {
            View::Details => self
                .details
                .as_ref()
                .map_or(View::Catalog, |d| d.return_to),
            View::Login => View::Catalog,
            other => other,
        };
        self.details = Some(DetailsState {
            game_id,
            generation: self.details_generation,
            summary,
            details: Loadable::Loading,
            comments: Loadable::Loading,
            selected_comment: 0,
            scroll: 0,
            draft: None,
            wishlisted: None,
            return_to,
        });
        self.view = View::Details;
        self.details_generation
    }

    /// Leaves the game page for the view it was opened from.
    pub fn exit_details(&mut self) {
        if let Some(handle) = self.details_handle.take() {
            handle.abort();
        }
        let back = self.details.take().map_or(View::Catalog, |d| d.return_to);
        self.view = back;
    }

    /// The open page, if `game_id`/`generation` still identify it.
    pub fn current_details(&mut self, game_id: u64, generation: u64) -> Option<&mut DetailsState> {
        self.details
            .as_mut()
            .filter(|d| d.game_id == game_id && d.generation == generation)
    }

    /// Whether `game_id` is on the wishlist, as far as we know.
    pub fn is_wishlisted(&self, game_id: u64) -> Option<bool> {
        if let Some(wishlist) = &self.wishlist {
            return Some(wishlist.contains(game_id));
        }
        self.details
            .as_ref()
            .filter(|d| d.game_id == game_id)
            .and_then(|d| d.wishlisted)
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// Drops everything tied to the previous user.
    pub fn clear_account_state(&mut self) {
        self.user = None;
        self.wishlist = None;
        self.wishlist_selected = 0;
        self.profile = ProfileState::default();
        if let Some(details) = self.details.as_mut() {
            details.wishlisted = None;
            details.draft = None;
        }
        if matches!(self.view, View::Wishlist | View::Profile) {
            self.view = View::Catalog;
        }
    }

    /// Removes one of the user's comments from the profile list right away.
    pub fn remove_profile_comment(&mut self, comment_id: i64) -> Option<PendingChange> {
        let comments = self.profile.comments.ready_mut()?;
        let index = comments.iter().position(|c| c.id == comment_id)?;
        let comment = comments.remove(index);
        if self.profile.selected >= comments.len() {
            self.profile.selected = comments.len().saturating_sub(1);
        }
        Some(PendingChange::CommentDeleted { index, comment })
    }

    /// Puts a profile comment back after the backend refused to delete it.
    pub fn restore_profile_comment(&mut self, change: PendingChange) {
        let PendingChange::CommentDeleted { index, comment } = change else {
            return;
        };
        if let Some(comments) = self.profile.comments.ready_mut() {
            if !comments.iter().any(|c| c.id == comment.id) {
                let index = index.min(comments.len());
                comments.insert(index, comment);
            }
        }
    }

    pub fn selected_wishlist_game(&self) -> Option<(u64, Option<&Game>)> {
        let entry = self.wishlist.as_ref()?.entries().get(self.wishlist_selected)?;
        Some((entry.game_id, entry.game.as_ref()))
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    fn abort_tasks(&mut self) {
        if let Some(handle) = self.feed_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.details_handle.take() {
            handle.abort();
        }
    }
}

/// Moves an index by `delta` within `0..len`, clamping at both ends.
pub fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

impl Drop for App {
    fn drop(&mut self) {
        self.abort_tasks();
        tracing::debug!("Aborted in-flight tasks on App drop");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{CatalogFilters, CatalogPage};
    use crate::config::Config;
    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    /// Catalog that never answers; app tests only exercise local state.
    pub(crate) struct NullCatalog;

    #[async_trait]
    impl CatalogSource for NullCatalog {
        async fn list_items(
            &self,
            _page: u32,
            _page_size: u32,
            _filters: &CatalogFilters,
        ) -> Result<CatalogPage, CatalogError> {
            Err(CatalogError::Source("offline".into()))
        }

        async fn search_items(
            &self,
            _query: &str,
            _page: u32,
            _page_size: u32,
            _filters: &CatalogFilters,
        ) -> Result<CatalogPage, CatalogError> {
            Err(CatalogError::Source("offline".into()))
        }

        async fn get_item(&self, _id: u64) -> Result<GameDetails, CatalogError> {
            Err(CatalogError::Source("offline".into()))
        }

        async fn list_genres(&self) -> Result<Vec<NamedRef>, CatalogError> {
            Ok(Vec::new())
        }

        async fn list_platforms(&self) -> Result<Vec<NamedRef>, CatalogError> {
            Ok(Vec::new())
        }
    }

    pub(crate) async fn test_app() -> App {
        let db = Database::open(":memory:").await.unwrap();
        let prefs = PreferenceManager::from_config(&Config::default());
        App::new(db, Services::new(Arc::new(NullCatalog), None), prefs, 12)
    }

    pub(crate) fn game(id: u64) -> Game {
        Game {
            id,
            name: Arc::from(format!("Game {id}")),
            cover_image: None,
            rating: 4.0,
            released: Some("2020-01-01".into()),
            genres: Vec::new(),
            platforms: Vec::new(),
        }
    }

    fn named(id: u64, name: &str) -> NamedRef {
        NamedRef {
            id,
            name: name.into(),
        }
    }

    fn load_items(app: &mut App, ids: impl IntoIterator<Item = u64>) {
        let request = app.feed.reload();
        let page = CatalogPage {
            items: ids.into_iter().map(game).collect(),
            has_next: true,
            total: None,
            skipped: 0,
        };
        app.feed.apply(request.ticket, Ok(page));
    }

    #[test]
    fn test_step_clamps() {
        assert_eq!(step(0, -1, 5), 0);
        assert_eq!(step(4, 1, 5), 4);
        assert_eq!(step(2, 10, 5), 4);
        assert_eq!(step(3, 0, 0), 0);
    }

    #[tokio::test]
    async fn test_new_app_starts_on_catalog() {
        let app = test_app().await;
        assert_eq!(app.view, View::Catalog);
        assert_eq!(app.key_context(), Context::Catalog);
        assert!(app.selected_game().is_none());
        assert_eq!(app.theme.variant(), ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_toggle_theme_rebuilds_styles() {
        let mut app = test_app().await;
        let before = app.style("status_bar");
        assert_eq!(app.toggle_theme(), ThemeVariant::Light);
        assert_ne!(app.style("status_bar"), before);
    }

    #[tokio::test]
    async fn test_status_expires_after_three_seconds() {
        let mut app = test_app().await;
        // Pause only after SQLite is open so the pool acquire timeout can't fire
        tokio::time::pause();
        app.set_status("Saved");
        assert!(!app.clear_expired_status());
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_catalog_scrolls_with_selection() {
        let mut app = test_app().await;
        load_items(&mut app, 1..=30);
        app.catalog_viewport_rows = 10;

        app.catalog_move(12);
        assert_eq!(app.catalog_selected, 12);
        assert_eq!(app.catalog_offset, 3);
        assert!(!app.sentinel_visible());

        app.catalog_move(100);
        assert_eq!(app.catalog_selected, 29);
        assert_eq!(app.catalog_offset, 20);
        assert!(app.sentinel_visible());

        app.catalog_move(-29);
        assert_eq!(app.catalog_offset, 0);
    }

    #[tokio::test]
    async fn test_sentinel_only_on_catalog_view() {
        let mut app = test_app().await;
        load_items(&mut app, 1..=3);
        app.catalog_viewport_rows = 10;
        assert!(app.sentinel_visible());
        app.view = View::Wishlist;
        assert!(!app.sentinel_visible());
    }

    #[tokio::test]
    async fn test_menu_choose_builds_selection() {
        let mut app = test_app().await;
        app.genres = vec![named(4, "Action"), named(5, "RPG")];

        app.open_menu(MenuKind::Genre);
        assert_eq!(app.key_context(), Context::Menu);
        app.menu_move(2);
        let next = app.menu_choose().unwrap();
        assert_eq!(next.genre(), Some("5"));
        assert_eq!(app.menu, MenuState::Closed);
        assert_eq!(app.option_name(MenuKind::Genre, "5"), "RPG");
        assert_eq!(app.option_name(MenuKind::Genre, "99"), "99");
    }

    #[tokio::test]
    async fn test_menu_reopens_on_current_choice_and_all_clears() {
        let mut app = test_app().await;
        app.platforms = vec![named(1, "PC"), named(2, "PlayStation")];
        let request = app
            .feed
            .set_filter(FilterSelection::new("", None, Some("2")));
        app.feed.apply(
            request.ticket,
            Ok(CatalogPage {
                items: Vec::new(),
                has_next: false,
                total: None,
                skipped: 0,
            }),
        );

        app.open_menu(MenuKind::Platform);
        assert_eq!(
            app.menu,
            MenuState::Open {
                kind: MenuKind::Platform,
                selected: 2
            }
        );
        // Choosing the same entry changes nothing
        assert_eq!(app.menu_choose(), None);

        app.open_menu(MenuKind::Platform);
        app.menu_move(-5);
        let next = app.menu_choose().unwrap();
        assert_eq!(next.platform(), None);
    }

    #[tokio::test]
    async fn test_menu_takes_key_context_over_editing() {
        let mut app = test_app().await;
        app.search_draft = Some(String::new());
        assert_eq!(app.key_context(), Context::TextInput);
        app.open_menu(MenuKind::Genre);
        assert_eq!(app.key_context(), Context::Menu);
        app.close_menu();
        assert_eq!(app.key_context(), Context::TextInput);
    }

    #[tokio::test]
    async fn test_details_generation_and_return_view() {
        let mut app = test_app().await;
        app.view = View::Wishlist;
        let first = app.begin_details(7, Some(game(7)));
        assert_eq!(app.view, View::Details);
        assert_eq!(app.details.as_ref().unwrap().title(), "Game 7");

        // Opening another page from a page keeps the original return view
        let second = app.begin_details(8, None);
        assert_ne!(first, second);
        assert!(app.current_details(7, first).is_none());
        assert!(app.current_details(8, second).is_some());
        assert_eq!(app.details.as_ref().unwrap().title(), "Game #8");

        app.exit_details();
        assert_eq!(app.view, View::Wishlist);
        assert!(app.details.is_none());
    }

    #[tokio::test]
    async fn test_wishlist_membership_sources() {
        let mut app = test_app().await;
        app.begin_details(3, None);
        assert_eq!(app.is_wishlisted(3), None);

        app.details.as_mut().unwrap().wishlisted = Some(true);
        assert_eq!(app.is_wishlisted(3), Some(true));

        app.wishlist = Some(WishlistState::from_ids([9]));
        assert_eq!(app.is_wishlisted(3), Some(false));
        assert_eq!(app.is_wishlisted(9), Some(true));
    }

    #[tokio::test]
    async fn test_profile_comment_remove_and_restore() {
        let mut app = test_app().await;
        let comment = |id: i64| Comment {
            id,
            user_id: "u".into(),
            game_id: 1,
            content: format!("c{id}"),
            created_at: Utc::now(),
        };
        app.profile.comments = Loadable::Ready(vec![comment(1), comment(2)]);
        app.profile.selected = 1;

        let change = app.remove_profile_comment(2).unwrap();
        assert_eq!(app.profile.selected, 0);
        app.restore_profile_comment(change);
        let ids: Vec<i64> = app
            .profile
            .comments
            .ready()
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(app.remove_profile_comment(42).is_none());
    }

    #[tokio::test]
    async fn test_clear_account_state_leaves_private_views() {
        let mut app = test_app().await;
        app.user = Some(User {
            id: "u".into(),
            email: None,
        });
        app.wishlist = Some(WishlistState::from_ids([1]));
        app.view = View::Profile;

        app.clear_account_state();
        assert!(app.user.is_none());
        assert!(app.wishlist.is_none());
        assert_eq!(app.view, View::Catalog);
    }

    #[test]
    fn test_login_form_toggle_keeps_email() {
        let mut login = LoginForm::new(LoginMode::SignIn, "player@example.com");
        assert_eq!(login.form.focus, 1);
        login.form.push_char('x');
        assert_eq!(login.password(), "x");

        login.toggle_mode();
        assert_eq!(login.mode, LoginMode::SignUp);
        assert_eq!(login.email(), "player@example.com");
        assert_eq!(login.password(), "");
        assert_eq!(login.form.fields.len(), 3);
    }

    #[test]
    fn test_form_editing() {
        let mut form = account_form("a@b.co");
        form.next_field();
        form.push_char('p');
        form.push_char('w');
        form.backspace();
        assert_eq!(form.value(1), "p");
        form.next_field();
        form.next_field();
        assert_eq!(form.focus, 0);

        form.clear_secrets();
        assert_eq!(form.value(0), "a@b.co");
        assert_eq!(form.value(1), "");
        assert_eq!(form.value(7), "");
    }
}
