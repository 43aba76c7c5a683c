//! Keyboard input handling.
//!
//! Keys are resolved through the keybinding registry for the current
//! [`Context`](KbContext). Overlays (help, filter menu) capture input first,
//! then text fields, then the active view.

use crate::app::{account_form, App, AppEvent, CommentOrigin, MenuKind, MenuState, View};
use crate::feed::FilterSelection;
use crate::keybindings::{Action as KbAction, Context as KbContext};
use crate::preferences::KEY_THEME;
use crate::util::MAX_SEARCH_QUERY_LENGTH;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{
    delete_comment, open_details, open_website, persist_filters, sign_out, spawn_filter_options,
    spawn_page_load, spawn_profile_comments, spawn_wishlist_load, submit_account_update,
    submit_comment, submit_login, toggle_wishlist,
};
use super::Action;

/// Comment rows and description lines moved by PageDown/PageUp on the game page.
const DETAIL_PAGE_STEP: u16 = 10;

/// Main input dispatch function.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // Raw mode swallows SIGINT, so Ctrl+C is handled as a key
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(Action::Quit);
    }

    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    if let MenuState::Open { .. } = app.menu {
        if handle_menu_input(app, code, modifiers, event_tx).await {
            return Ok(Action::Continue);
        }
        // Outside interaction: the menu closes and the key is handled as usual
        app.close_menu();
    }

    if app.is_editing() {
        handle_text_input(app, code, modifiers, event_tx).await;
        return Ok(Action::Continue);
    }

    let Some(action) = app
        .keybindings
        .action_for_key(code, modifiers, app.key_context())
    else {
        return Ok(Action::Continue);
    };

    if let Some(flow) = handle_global(app, action, event_tx).await {
        return Ok(flow);
    }

    match app.view {
        View::Catalog => handle_catalog_input(app, action, event_tx).await,
        View::Details => handle_details_input(app, action, event_tx),
        View::Wishlist => handle_wishlist_input(app, action, event_tx),
        View::Profile => handle_profile_input(app, action, event_tx),
        // Login is always a text input
        View::Login => {}
    }
    Ok(Action::Continue)
}

/// Captures all keys while help is visible.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

/// Returns false when the key is not one the menu handles.
async fn handle_menu_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> bool {
    match app
        .keybindings
        .action_in_context(code, modifiers, KbContext::Menu)
    {
        Some(KbAction::NavDown) => app.menu_move(1),
        Some(KbAction::NavUp) => app.menu_move(-1),
        Some(KbAction::Select) => {
            if let Some(selection) = app.menu_choose() {
                apply_selection(app, selection, event_tx).await;
            }
        }
        Some(KbAction::Back) => app.close_menu(),
        _ => return false,
    }
    true
}

/// Actions that work the same in every view. `None` if not one of them.
async fn handle_global(
    app: &mut App,
    action: KbAction,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Option<Action> {
    match action {
        KbAction::Quit => return Some(Action::Quit),
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
        }
        KbAction::CycleTheme => {
            let variant = app.toggle_theme();
            if let Err(e) = app.prefs.set(&app.db, KEY_THEME, variant.key()).await {
                tracing::warn!(error = %e, "Failed to persist theme");
            }
            app.set_status(format!("Theme: {}", variant.name()));
        }
        KbAction::ShowWishlist => show_wishlist(app, event_tx),
        KbAction::ShowProfile => show_profile(app, event_tx),
        KbAction::SignIn => {
            if let Some(user) = &app.user {
                let who = user.email.clone().unwrap_or_else(|| user.id.clone());
                app.set_status(format!("Already signed in as {who}"));
            } else {
                open_login(app, None);
            }
        }
        _ => return None,
    }
    Some(Action::Continue)
}

// ============================================================================
// Text Fields
// ============================================================================

/// What the focused text field should do with a key.
enum Edit {
    Insert(char),
    Delete,
    Act(KbAction),
    Ignore,
}

fn classify_edit(app: &App, code: KeyCode, modifiers: KeyModifiers) -> Edit {
    if let Some(action) = app
        .keybindings
        .action_in_context(code, modifiers, KbContext::TextInput)
    {
        return Edit::Act(action);
    }
    match code {
        KeyCode::Backspace => Edit::Delete,
        KeyCode::Char(c)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                && !c.is_control() =>
        {
            Edit::Insert(c)
        }
        _ => Edit::Ignore,
    }
}

async fn handle_text_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let edit = classify_edit(app, code, modifiers);
    match app.view {
        View::Catalog => handle_search_edit(app, edit, event_tx).await,
        View::Details => handle_comment_edit(app, edit, event_tx),
        View::Profile => handle_account_edit(app, edit, event_tx),
        View::Login => handle_login_edit(app, edit, event_tx).await,
        View::Wishlist => {}
    }
}

async fn handle_search_edit(app: &mut App, edit: Edit, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(draft) = app.search_draft.as_mut() else {
        return;
    };
    match edit {
        Edit::Insert(c) => {
            if draft.chars().count() < MAX_SEARCH_QUERY_LENGTH {
                draft.push(c);
            } else {
                app.set_status(format!(
                    "Search query too long (max {MAX_SEARCH_QUERY_LENGTH} chars)"
                ));
            }
        }
        Edit::Delete => {
            draft.pop();
        }
        Edit::Act(KbAction::Submit) => {
            let query = app.search_draft.take().unwrap_or_default();
            let selection = app.feed.selection().with_search(&query);
            if selection != *app.feed.selection() {
                apply_selection(app, selection, event_tx).await;
            }
        }
        Edit::Act(KbAction::Cancel) => {
            app.search_draft = None;
            if app.feed.selection().is_search() {
                let selection = app.feed.selection().with_search("");
                apply_selection(app, selection, event_tx).await;
            }
        }
        Edit::Act(_) | Edit::Ignore => {}
    }
}

fn handle_comment_edit(app: &mut App, edit: Edit, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(draft) = app.details.as_mut().and_then(|page| page.draft.as_mut()) else {
        return;
    };
    match edit {
        Edit::Insert(c) => draft.push(c),
        Edit::Delete => {
            draft.pop();
        }
        Edit::Act(KbAction::Submit) => submit_comment(app, event_tx),
        Edit::Act(KbAction::Cancel) => {
            if let Some(page) = app.details.as_mut() {
                page.draft = None;
            }
        }
        Edit::Act(_) | Edit::Ignore => {}
    }
}

fn handle_account_edit(app: &mut App, edit: Edit, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(form) = app.profile.form.as_mut() else {
        return;
    };
    match edit {
        Edit::Insert(c) => form.push_char(c),
        Edit::Delete => form.backspace(),
        Edit::Act(KbAction::NextField) => form.next_field(),
        Edit::Act(KbAction::Submit) => submit_account_update(app, event_tx),
        Edit::Act(KbAction::Cancel) => app.profile.form = None,
        Edit::Act(_) | Edit::Ignore => {}
    }
}

async fn handle_login_edit(app: &mut App, edit: Edit, event_tx: &mpsc::Sender<AppEvent>) {
    let form = &mut app.login.form;
    match edit {
        Edit::Insert(c) => form.push_char(c),
        Edit::Delete => form.backspace(),
        Edit::Act(KbAction::NextField) => form.next_field(),
        Edit::Act(KbAction::ToggleSignUp) => {
            if !form.submitting {
                app.login.toggle_mode();
            }
        }
        Edit::Act(KbAction::Submit) => submit_login(app, event_tx).await,
        Edit::Act(KbAction::Cancel) => {
            app.login.form.clear_secrets();
            app.login.form.error = None;
            app.view = View::Catalog;
        }
        Edit::Act(_) | Edit::Ignore => {}
    }
}

// ============================================================================
// Views
// ============================================================================

async fn handle_catalog_input(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let page = app.catalog_viewport_rows.max(1) as isize;
    match action {
        KbAction::NavDown => app.catalog_move(1),
        KbAction::NavUp => app.catalog_move(-1),
        KbAction::PageDown => app.catalog_move(page),
        KbAction::PageUp => app.catalog_move(-page),
        KbAction::Select => {
            if let Some(game) = app.selected_game().cloned() {
                open_details(app, game.id, Some(game), event_tx);
            }
        }
        KbAction::Reload => {
            let request = app.feed.reload();
            app.reset_catalog_position();
            spawn_page_load(app, request, event_tx);
            if app.genres.is_empty() || app.platforms.is_empty() {
                spawn_filter_options(app, event_tx);
            }
        }
        KbAction::EnterSearch => {
            let current = app.feed.selection().search_query().unwrap_or("").to_string();
            app.search_draft = Some(current);
        }
        KbAction::ClearFilters => {
            if *app.feed.selection() != FilterSelection::default() {
                apply_selection(app, FilterSelection::default(), event_tx).await;
                app.set_status("Filters cleared");
            }
        }
        KbAction::OpenGenreMenu => open_filter_menu(app, MenuKind::Genre, event_tx),
        KbAction::OpenPlatformMenu => open_filter_menu(app, MenuKind::Platform, event_tx),
        KbAction::ToggleWishlist => {
            if let Some(game) = app.selected_game().cloned() {
                toggle_wishlist(app, game.id, Some(game), event_tx);
            }
        }
        KbAction::Back => {
            if app.feed.selection().is_search() {
                let selection = app.feed.selection().with_search("");
                apply_selection(app, selection, event_tx).await;
            }
        }
        _ => {}
    }
}

fn handle_details_input(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(page) = app.details.as_mut() else {
        app.view = View::Catalog;
        return;
    };
    let comment_count = page.comments.ready().map_or(0, |t| t.comments().len());
    match action {
        KbAction::NavDown => {
            page.selected_comment = crate::app::step(page.selected_comment, 1, comment_count);
        }
        KbAction::NavUp => {
            page.selected_comment = crate::app::step(page.selected_comment, -1, comment_count);
        }
        KbAction::ScrollDown => page.scroll = page.scroll.saturating_add(1),
        KbAction::ScrollUp => page.scroll = page.scroll.saturating_sub(1),
        KbAction::PageDown => page.scroll = page.scroll.saturating_add(DETAIL_PAGE_STEP),
        KbAction::PageUp => page.scroll = page.scroll.saturating_sub(DETAIL_PAGE_STEP),
        KbAction::Back => app.exit_details(),
        KbAction::Reload => {
            let game_id = page.game_id;
            let summary = page.summary.clone();
            open_details(app, game_id, summary, event_tx);
        }
        KbAction::ToggleWishlist => {
            let game_id = page.game_id;
            let game = page
                .details
                .ready()
                .map(|d| d.summary())
                .or_else(|| page.summary.clone());
            toggle_wishlist(app, game_id, game, event_tx);
        }
        KbAction::WriteComment => {
            if app.user.is_none() {
                app.set_status("Sign in to comment (press L)");
            } else if app.services.rows.is_none() {
                app.set_status("Comments need a configured backend");
            } else {
                page.draft = Some(String::new());
            }
        }
        KbAction::DeleteComment => {
            let origin = CommentOrigin::Details {
                game_id: page.game_id,
            };
            delete_comment(app, origin, event_tx);
        }
        KbAction::OpenWebsite => open_website(app),
        _ => {}
    }
}

fn handle_wishlist_input(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let len = app.wishlist.as_ref().map_or(0, |w| w.len());
    match action {
        KbAction::NavDown => {
            app.wishlist_selected = crate::app::step(app.wishlist_selected, 1, len);
        }
        KbAction::NavUp => {
            app.wishlist_selected = crate::app::step(app.wishlist_selected, -1, len);
        }
        KbAction::Select => {
            if let Some((game_id, game)) = app.selected_wishlist_game() {
                let game = game.cloned();
                open_details(app, game_id, game, event_tx);
            }
        }
        KbAction::ToggleWishlist | KbAction::DeleteComment => {
            if let Some((game_id, game)) = app.selected_wishlist_game() {
                let game = game.cloned();
                toggle_wishlist(app, game_id, game, event_tx);
            }
        }
        KbAction::Reload => spawn_wishlist_load(app, event_tx),
        KbAction::Back => app.view = View::Catalog,
        _ => {}
    }
}

fn handle_profile_input(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    let len = app.profile.comments.ready().map_or(0, Vec::len);
    match action {
        KbAction::NavDown => app.profile.selected = crate::app::step(app.profile.selected, 1, len),
        KbAction::NavUp => app.profile.selected = crate::app::step(app.profile.selected, -1, len),
        KbAction::Select => {
            let game_id = app
                .profile
                .comments
                .ready()
                .and_then(|comments| comments.get(app.profile.selected))
                .map(|c| c.game_id);
            if let Some(game_id) = game_id {
                open_details(app, game_id, None, event_tx);
            }
        }
        KbAction::DeleteComment => delete_comment(app, CommentOrigin::Profile, event_tx),
        KbAction::EditAccount => {
            let email = app
                .user
                .as_ref()
                .and_then(|u| u.email.as_deref())
                .unwrap_or("");
            app.profile.form = Some(account_form(email));
        }
        KbAction::SignOut => sign_out(app, event_tx),
        KbAction::Reload => spawn_profile_comments(app, event_tx),
        KbAction::Back => app.view = View::Catalog,
        _ => {}
    }
}

// ============================================================================
// Shared Transitions
// ============================================================================

/// Replaces the feed filter, starts page 1, and remembers genre/platform.
async fn apply_selection(
    app: &mut App,
    selection: FilterSelection,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    tracing::info!(
        search = selection.search_query().unwrap_or(""),
        genre = selection.genre().unwrap_or(""),
        platform = selection.platform().unwrap_or(""),
        "Applying filter selection"
    );
    let request = app.feed.set_filter(selection);
    app.reset_catalog_position();
    spawn_page_load(app, request, event_tx);
    persist_filters(app).await;
}

fn open_filter_menu(app: &mut App, kind: MenuKind, event_tx: &mpsc::Sender<AppEvent>) {
    if app.menu_options(kind).is_empty() {
        app.set_status(format!("{} list is still loading", kind.title()));
        spawn_filter_options(app, event_tx);
        return;
    }
    app.open_menu(kind);
}

fn open_login(app: &mut App, reason: Option<&'static str>) {
    app.login.form.error = None;
    app.view = View::Login;
    if let Some(reason) = reason {
        app.set_status(reason);
    }
}

fn show_wishlist(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    if app.user.is_none() {
        open_login(app, Some("Sign in to see your wishlist"));
        return;
    }
    app.view = View::Wishlist;
    if app.wishlist.is_none() {
        spawn_wishlist_load(app, event_tx);
    }
}

fn show_profile(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    if app.user.is_none() {
        open_login(app, Some("Sign in to see your profile"));
        return;
    }
    app.view = View::Profile;
    app.profile.form = None;
    spawn_profile_comments(app, event_tx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{game, test_app};
    use crate::app::{Loadable, LoginMode};
    use crate::catalog::{CatalogPage, NamedRef};
    use pretty_assertions::assert_eq;

    async fn press(app: &mut App, code: KeyCode) -> Action {
        let (tx, _rx) = mpsc::channel(32);
        handle_input(app, code, KeyModifiers::NONE, &tx).await.unwrap()
    }

    fn fill_feed(app: &mut App, count: u64) {
        let request = app.feed.reload();
        app.feed.apply(
            request.ticket,
            Ok(CatalogPage {
                items: (1..=count).map(game).collect(),
                has_next: true,
                total: None,
                skipped: 0,
            }),
        );
    }

    #[tokio::test]
    async fn test_quit_from_catalog() {
        let mut app = test_app().await;
        assert!(matches!(press(&mut app, KeyCode::Char('q')).await, Action::Quit));
    }

    #[tokio::test]
    async fn test_q_types_into_search_instead_of_quitting() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('/')).await;
        assert_eq!(app.search_draft.as_deref(), Some(""));

        assert!(matches!(press(&mut app, KeyCode::Char('q')).await, Action::Continue));
        press(&mut app, KeyCode::Char('u')).await;
        press(&mut app, KeyCode::Backspace).await;
        assert_eq!(app.search_draft.as_deref(), Some("q"));
    }

    #[tokio::test]
    async fn test_search_submit_sets_filter() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('/')).await;
        for c in "zelda".chars() {
            press(&mut app, KeyCode::Char(c)).await;
        }
        press(&mut app, KeyCode::Enter).await;

        assert_eq!(app.search_draft, None);
        assert_eq!(app.feed.selection().search_query(), Some("zelda"));
        assert!(app.feed.is_loading());
    }

    #[tokio::test]
    async fn test_escape_in_search_clears_active_query() {
        let mut app = test_app().await;
        let request = app.feed.set_filter(FilterSelection::new("doom", None, None));
        app.feed.apply(request.ticket, Ok(CatalogPage {
            items: Vec::new(),
            has_next: false,
            total: None,
            skipped: 0,
        }));

        press(&mut app, KeyCode::Char('/')).await;
        assert_eq!(app.search_draft.as_deref(), Some("doom"));
        press(&mut app, KeyCode::Esc).await;
        assert_eq!(app.search_draft, None);
        assert_eq!(app.feed.selection().search_query(), None);
    }

    #[tokio::test]
    async fn test_search_length_is_capped() {
        let mut app = test_app().await;
        app.search_draft = Some("x".repeat(MAX_SEARCH_QUERY_LENGTH));
        press(&mut app, KeyCode::Char('y')).await;
        assert_eq!(
            app.search_draft.as_ref().map(|d| d.len()),
            Some(MAX_SEARCH_QUERY_LENGTH)
        );
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_navigation_moves_selection() {
        let mut app = test_app().await;
        fill_feed(&mut app, 5);
        app.catalog_viewport_rows = 3;
        press(&mut app, KeyCode::Char('j')).await;
        press(&mut app, KeyCode::Down).await;
        assert_eq!(app.catalog_selected, 2);
        press(&mut app, KeyCode::Char('k')).await;
        assert_eq!(app.catalog_selected, 1);
    }

    #[tokio::test]
    async fn test_menu_outside_key_closes_and_is_handled() {
        let mut app = test_app().await;
        app.genres = vec![NamedRef {
            id: 4,
            name: "Action".into(),
        }];
        app.platforms = vec![NamedRef {
            id: 1,
            name: "PC".into(),
        }];
        press(&mut app, KeyCode::Char('g')).await;
        assert!(matches!(app.menu, MenuState::Open { kind: MenuKind::Genre, .. }));

        // 'p' is not a menu key: genre menu closes, platform menu opens
        press(&mut app, KeyCode::Char('p')).await;
        assert!(matches!(app.menu, MenuState::Open { kind: MenuKind::Platform, .. }));

        press(&mut app, KeyCode::Esc).await;
        assert_eq!(app.menu, MenuState::Closed);
    }

    #[tokio::test]
    async fn test_menu_select_applies_filter() {
        let mut app = test_app().await;
        app.genres = vec![NamedRef {
            id: 4,
            name: "Action".into(),
        }];
        press(&mut app, KeyCode::Char('g')).await;
        press(&mut app, KeyCode::Char('j')).await;
        press(&mut app, KeyCode::Enter).await;

        assert_eq!(app.menu, MenuState::Closed);
        assert_eq!(app.feed.selection().genre(), Some("4"));
        assert_eq!(app.prefs.saved_filters().genre(), Some("4"));
    }

    #[tokio::test]
    async fn test_menu_without_options_reports_loading() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('g')).await;
        assert_eq!(app.menu, MenuState::Closed);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_account_views_require_sign_in() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('W')).await;
        assert_eq!(app.view, View::Login);
        assert_eq!(app.key_context(), KbContext::TextInput);

        press(&mut app, KeyCode::Esc).await;
        assert_eq!(app.view, View::Catalog);
    }

    #[tokio::test]
    async fn test_login_form_typing_and_mode_toggle() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('L')).await;
        for c in "me@x.io".chars() {
            press(&mut app, KeyCode::Char(c)).await;
        }
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Char('q')).await;
        assert_eq!(app.login.email(), "me@x.io");
        assert_eq!(app.login.password(), "q");

        let (tx, _rx) = mpsc::channel(32);
        handle_input(&mut app, KeyCode::Char('r'), KeyModifiers::CONTROL, &tx)
            .await
            .unwrap();
        assert_eq!(app.login.mode, LoginMode::SignUp);
    }

    #[tokio::test]
    async fn test_login_submit_without_backend_shows_error() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('L')).await;
        press(&mut app, KeyCode::Enter).await;
        assert!(app.login.form.error.is_some());
        assert!(!app.login.form.submitting);
    }

    #[tokio::test]
    async fn test_comment_requires_sign_in() {
        let mut app = test_app().await;
        app.begin_details(3, Some(game(3)));
        press(&mut app, KeyCode::Char('c')).await;
        assert!(app.details.as_ref().unwrap().draft.is_none());
        assert!(app.status_message.is_some());

        press(&mut app, KeyCode::Esc).await;
        assert_eq!(app.view, View::Catalog);
    }

    #[tokio::test]
    async fn test_detail_scroll_and_comment_selection_bounds() {
        let mut app = test_app().await;
        app.begin_details(3, None);
        app.details.as_mut().unwrap().comments = Loadable::Failed("x".into());
        press(&mut app, KeyCode::Char('J')).await;
        press(&mut app, KeyCode::Char('J')).await;
        press(&mut app, KeyCode::Char('j')).await;
        let page = app.details.as_ref().unwrap();
        assert_eq!(page.scroll, 2);
        assert_eq!(page.selected_comment, 0);
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('?')).await;
        assert!(app.show_help);
        assert!(matches!(press(&mut app, KeyCode::Char('q')).await, Action::Continue));
        assert!(!app.show_help);
    }

    #[tokio::test]
    async fn test_theme_toggle_persists() {
        let mut app = test_app().await;
        press(&mut app, KeyCode::Char('T')).await;
        assert_eq!(
            app.db.get_preference(KEY_THEME).await.unwrap().as_deref(),
            Some("light")
        );
    }
}
