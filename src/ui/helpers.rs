//! Background task spawning shared by input and event handling.
//!
//! Every network call runs on its own tokio task and reports back through an
//! [`AppEvent`]. Tasks are wrapped in [`catch_task_panic`] so a panic shows
//! up in the status bar instead of silently killing the task.

use crate::account::{AccountError, CommentThread, PendingChange};
use crate::app::{App, AppEvent, CommentOrigin, Loadable, LoginMode};
use crate::catalog::{CatalogError, CatalogSource, Game, GameDetails};
use crate::feed::{fetch_page, PageRequest};
use crate::preferences::{KEY_EMAIL, KEY_GENRE, KEY_PLATFORM};
use crate::storage::Database;
use crate::util::validate_url_for_open;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Concurrent detail fetches when filling in wishlist rows.
const WISHLIST_FILL_CONCURRENCY: usize = 4;

/// Wraps a future to catch panics and convert them to errors.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Runs `work` on a task and sends the event it produces.
///
/// A panic is reported as [`AppEvent::TaskPanicked`] under `task`.
pub(super) fn spawn_task<F>(
    task: &'static str,
    tx: &mpsc::Sender<AppEvent>,
    work: F,
) -> JoinHandle<()>
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(task, error = %error, "Background task panicked");
                AppEvent::TaskPanicked { task, error }
            }
        };
        if tx.send(event).await.is_err() {
            tracing::warn!(task, "Channel send failed (receiver dropped)");
        }
    })
}

// ============================================================================
// Catalog
// ============================================================================

/// Runs a feed page request. A request already in flight is aborted; its
/// result would be stale anyway.
pub(super) fn spawn_page_load(app: &mut App, request: PageRequest, tx: &mpsc::Sender<AppEvent>) {
    if let Some(handle) = app.feed_handle.take() {
        handle.abort();
    }
    tracing::debug!(
        page = request.page,
        page_size = request.page_size,
        search = request.selection.is_search(),
        "Spawning page load"
    );
    let source = Arc::clone(&app.services.catalog);
    app.feed_handle = Some(spawn_task("page_load", tx, async move {
        let result = fetch_page(source.as_ref(), &request).await;
        AppEvent::PageLoaded {
            ticket: request.ticket,
            result,
        }
    }));
}

/// Loads the next page if the end of the list is on screen.
pub(super) fn check_sentinel(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if !app.sentinel_visible() {
        return;
    }
    if let Some(request) = app.feed.on_sentinel_visible() {
        tracing::debug!(page = request.page, "Sentinel visible, loading next page");
        spawn_page_load(app, request, tx);
        app.needs_redraw = true;
    }
}

/// Fetches genre and platform menus.
pub(super) fn spawn_filter_options(app: &App, tx: &mpsc::Sender<AppEvent>) {
    let source = Arc::clone(&app.services.catalog);
    spawn_task("genres_load", tx, async move {
        AppEvent::GenresLoaded(source.list_genres().await)
    });
    let source = Arc::clone(&app.services.catalog);
    spawn_task("platforms_load", tx, async move {
        AppEvent::PlatformsLoaded(source.list_platforms().await)
    });
}

/// Saves genre/platform so the next session starts with them.
pub(super) async fn persist_filters(app: &mut App) {
    let genre = app.feed.selection().genre().unwrap_or("").to_string();
    let platform = app.feed.selection().platform().unwrap_or("").to_string();
    for (key, value) in [(KEY_GENRE, genre), (KEY_PLATFORM, platform)] {
        let result = if value.is_empty() {
            app.prefs.clear(&app.db, key).await
        } else {
            app.prefs.set(&app.db, key, &value).await
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to persist filter preference");
        }
    }
}

// ============================================================================
// Game Page
// ============================================================================

/// Opens the game page for `game_id`.
///
/// Details come from memory, then the SQLite cache, then the network.
/// Comments are always read fresh.
pub(super) fn open_details(
    app: &mut App,
    game_id: u64,
    summary: Option<Game>,
    tx: &mpsc::Sender<AppEvent>,
) {
    let generation = app.begin_details(game_id, summary);
    tracing::debug!(game_id, generation, "Opening game page");

    if let Some(details) = app.detail_cache.get(&game_id).map(Arc::clone) {
        if let Some(page) = app.current_details(game_id, generation) {
            page.details = Loadable::Ready(details);
        }
    } else {
        let source = Arc::clone(&app.services.catalog);
        let db = app.db.clone();
        app.details_handle = Some(spawn_task("details_load", tx, async move {
            match db.get_cached_game(game_id).await {
                Ok(Some(details)) => {
                    return AppEvent::DetailsLoaded {
                        game_id,
                        generation,
                        result: Ok(Arc::new(details)),
                        cached: true,
                    };
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(game_id, error = %e, "Game cache read failed"),
            }

            let result = source.get_item(game_id).await;
            if let Ok(details) = &result {
                if let Err(e) = db.cache_game(details, None).await {
                    tracing::warn!(game_id, error = %e, "Failed to cache game details");
                }
            }
            AppEvent::DetailsLoaded {
                game_id,
                generation,
                result: result.map(Arc::new),
                cached: false,
            }
        }));
    }

    spawn_comments_load(app, game_id, generation, tx);

    if app.wishlist.is_none() && app.user.is_some() {
        if let Some(rows) = app.services.rows.as_ref().map(Arc::clone) {
            spawn_task("membership_check", tx, async move {
                AppEvent::MembershipChecked {
                    game_id,
                    result: rows.is_wishlisted(game_id).await,
                }
            });
        }
    }
}

pub(super) fn spawn_comments_load(
    app: &mut App,
    game_id: u64,
    generation: u64,
    tx: &mpsc::Sender<AppEvent>,
) {
    let Some(rows) = app.services.rows.as_ref().map(Arc::clone) else {
        if let Some(page) = app.current_details(game_id, generation) {
            page.comments = Loadable::Failed("Comments need a configured backend".into());
        }
        return;
    };
    spawn_task("comments_load", tx, async move {
        AppEvent::CommentsLoaded {
            game_id,
            generation,
            result: rows.comments_for_game(game_id).await,
        }
    });
}

/// Publishes the comment draft on the open page.
pub(super) fn submit_comment(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user.as_ref().map(|u| u.id.clone()) else {
        app.set_status("Sign in to comment");
        return;
    };
    let Some(rows) = app.services.rows.as_ref().map(Arc::clone) else {
        return;
    };
    let Some(page) = app.details.as_mut() else {
        return;
    };
    let Some(thread) = page.comments.ready_mut() else {
        app.set_status("Comments are still loading");
        return;
    };
    let draft = page.draft.take().unwrap_or_default();
    let change = match thread.insert(&user_id, &draft) {
        Ok(change) => change,
        Err(e) => {
            // Keep the draft open so the user can fix it
            page.draft = Some(draft);
            app.set_status(e.to_string());
            return;
        }
    };
    page.selected_comment = 0;
    let game_id = page.game_id;
    spawn_task("comment_post", tx, async move {
        let result = rows.insert_comment(game_id, &draft).await;
        AppEvent::CommentPosted {
            game_id,
            change,
            result,
        }
    });
}

/// Deletes the user's selected comment, from the game page or the profile.
pub(super) fn delete_comment(app: &mut App, origin: CommentOrigin, tx: &mpsc::Sender<AppEvent>) {
    let Some(user_id) = app.user.as_ref().map(|u| u.id.clone()) else {
        app.set_status("Sign in to do that");
        return;
    };
    let Some(rows) = app.services.rows.as_ref().map(Arc::clone) else {
        return;
    };

    let change = match origin {
        CommentOrigin::Details { .. } => {
            let Some(page) = app.details.as_mut() else {
                return;
            };
            let Some(comment) = page.selected_comment() else {
                return;
            };
            if comment.user_id != user_id {
                app.set_status("You can only delete your own comments");
                return;
            }
            if CommentThread::is_pending(comment) {
                app.set_status("Comment is still being posted");
                return;
            }
            let id = comment.id;
            let change = page.comments.ready_mut().and_then(|thread| thread.remove(id));
            if let Some(thread) = page.comments.ready() {
                page.selected_comment = page
                    .selected_comment
                    .min(thread.comments().len().saturating_sub(1));
            }
            change
        }
        CommentOrigin::Profile => {
            let id = app
                .profile
                .comments
                .ready()
                .and_then(|comments| comments.get(app.profile.selected))
                .map(|c| c.id);
            id.and_then(|id| app.remove_profile_comment(id))
        }
    };
    let Some(change) = change else {
        return;
    };
    let PendingChange::CommentDeleted { comment, .. } = &change else {
        return;
    };
    let comment_id = comment.id;
    spawn_task("comment_delete", tx, async move {
        let result = rows.delete_comment(comment_id).await;
        AppEvent::CommentDeleted {
            origin,
            change,
            result,
        }
    });
}

/// Opens the game's website in the system browser.
pub(super) fn open_website(app: &mut App) {
    let website = app
        .details
        .as_ref()
        .and_then(|page| page.details.ready())
        .and_then(|details| details.website.clone());
    let Some(website) = website.filter(|w| !w.trim().is_empty()) else {
        app.set_status("No website for this game");
        return;
    };
    match validate_url_for_open(&website) {
        Ok(url) => {
            if let Err(e) = open::that(url.as_str()) {
                tracing::warn!(error = %e, "Failed to open browser");
                app.set_status(format!("Failed to open browser: {e}"));
            } else {
                app.set_status("Opened in browser");
            }
        }
        Err(e) => app.set_status(format!("Refusing to open link: {e}")),
    }
}

// ============================================================================
// Wishlist
// ============================================================================

pub(super) fn spawn_wishlist_load(app: &App, tx: &mpsc::Sender<AppEvent>) {
    let Some(rows) = app.services.rows.as_ref().map(Arc::clone) else {
        return;
    };
    spawn_task("wishlist_load", tx, async move {
        AppEvent::WishlistLoaded(rows.wishlist_game_ids().await)
    });
}

/// Fetches details for wishlist rows that only have an id. Each finished
/// game is sent as it arrives.
pub(super) fn spawn_wishlist_fill(app: &App, tx: &mpsc::Sender<AppEvent>) {
    let Some(wishlist) = &app.wishlist else {
        return;
    };
    let missing: Vec<u64> = wishlist
        .entries()
        .iter()
        .filter(|e| e.game.is_none())
        .map(|e| e.game_id)
        .collect();
    if missing.is_empty() {
        return;
    }

    let known: Vec<Arc<GameDetails>> = missing
        .iter()
        .filter_map(|id| app.detail_cache.peek(id).map(Arc::clone))
        .collect();
    let source = Arc::clone(&app.services.catalog);
    let db = app.db.clone();
    let tx_games = tx.clone();
    tracing::debug!(count = missing.len(), "Filling wishlist rows");

    tokio::spawn(async move {
        let work = async move {
            for details in known {
                let _ = tx_games.send(AppEvent::WishlistGameLoaded(details.summary())).await;
            }
            futures::stream::iter(missing)
                .map(|game_id| {
                    let source = Arc::clone(&source);
                    let db = db.clone();
                    async move { load_summary(source.as_ref(), &db, game_id).await }
                })
                .buffer_unordered(WISHLIST_FILL_CONCURRENCY)
                .for_each(|result| {
                    let tx = tx_games.clone();
                    async move {
                        match result {
                            Ok(game) => {
                                let _ = tx.send(AppEvent::WishlistGameLoaded(game)).await;
                            }
                            Err(e) => tracing::warn!(error = %e, "Wishlist game load failed"),
                        }
                    }
                })
                .await;
        };
        if let Err(error) = catch_task_panic(work).await {
            tracing::error!(task = "wishlist_fill", error = %error, "Background task panicked");
        }
    });
}

/// Cache-first summary for one wishlist row.
async fn load_summary(
    source: &dyn CatalogSource,
    db: &Database,
    game_id: u64,
) -> Result<Game, CatalogError> {
    if let Ok(Some(details)) = db.get_cached_game(game_id).await {
        return Ok(details.summary());
    }
    let details = source.get_item(game_id).await?;
    if let Err(e) = db.cache_game(&details, None).await {
        tracing::warn!(game_id, error = %e, "Failed to cache game details");
    }
    Ok(details.summary())
}

/// Adds or removes `game_id`, updating the list before the backend answers.
pub(super) fn toggle_wishlist(
    app: &mut App,
    game_id: u64,
    game: Option<Game>,
    tx: &mpsc::Sender<AppEvent>,
) {
    if app.user.is_none() {
        app.set_status("Sign in to use the wishlist");
        return;
    }
    let Some(rows) = app.services.rows.as_ref().map(Arc::clone) else {
        return;
    };
    let Some(wishlist) = app.wishlist.as_mut() else {
        app.set_status("Wishlist is still loading");
        return;
    };
    let change = wishlist.toggle(game_id, game);
    let len = wishlist.len();
    if app.wishlist_selected >= len {
        app.wishlist_selected = len.saturating_sub(1);
    }
    let adding = matches!(change, PendingChange::WishlistAdded { .. });
    app.set_status(if adding {
        "Added to wishlist"
    } else {
        "Removed from wishlist"
    });

    spawn_task("wishlist_sync", tx, async move {
        let result = if adding {
            rows.add_to_wishlist(game_id).await
        } else {
            rows.remove_from_wishlist(game_id).await
        };
        AppEvent::WishlistSynced { change, result }
    });
}

// ============================================================================
// Account
// ============================================================================

/// Submits the login form in its current mode.
pub(super) async fn submit_login(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let auth = match app.services.auth() {
        Ok(auth) => Arc::clone(auth),
        Err(e) => {
            app.login.form.error = Some(e.to_string());
            return;
        }
    };
    if app.login.form.submitting {
        return;
    }
    let email = app.login.email().trim().to_string();
    let password = app.login.password().to_string();
    let confirm = app.login.confirm().to_string();
    app.login.form.submitting = true;
    app.login.form.error = None;

    if let Err(e) = app.prefs.set(&app.db, KEY_EMAIL, &email).await {
        tracing::warn!(error = %e, "Failed to remember email");
    }

    match app.login.mode {
        LoginMode::SignIn => {
            spawn_task("sign_in", tx, async move {
                AppEvent::SignedIn(auth.sign_in(&email, &password).await)
            });
        }
        LoginMode::SignUp => {
            spawn_task("sign_up", tx, async move {
                AppEvent::SignedUp(auth.sign_up(&email, &password, &confirm).await)
            });
        }
    }
    app.login.form.clear_secrets();
}

pub(super) fn sign_out(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Ok(auth) = app.services.auth().map(Arc::clone) else {
        return;
    };
    spawn_task("sign_out", tx, async move {
        AppEvent::SignedOut(auth.sign_out().await)
    });
}

/// Sends the profile form. Password confirmation is checked here since the
/// service only takes the new value.
pub(super) fn submit_account_update(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Ok(auth) = app.services.auth().map(Arc::clone) else {
        return;
    };
    let current_email = app
        .user
        .as_ref()
        .and_then(|u| u.email.clone())
        .unwrap_or_default();
    let Some(form) = app.profile.form.as_mut() else {
        return;
    };
    if form.submitting {
        return;
    }
    let email = form.value(0).trim().to_string();
    let password = form.value(1).to_string();
    if password != form.value(2) {
        form.error = Some(AccountError::PasswordMismatch.to_string());
        form.clear_secrets();
        return;
    }
    form.submitting = true;
    form.error = None;
    form.clear_secrets();

    let email = (email != current_email).then_some(email);
    spawn_task("account_update", tx, async move {
        let result = auth
            .update_user(email.as_deref(), Some(password.as_str()))
            .await;
        AppEvent::AccountUpdated(result)
    });
}

pub(super) fn spawn_profile_comments(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(rows) = app.services.rows.as_ref().map(Arc::clone) else {
        return;
    };
    app.profile.comments = Loadable::Loading;
    spawn_task("profile_comments", tx, async move {
        AppEvent::ProfileCommentsLoaded(rows.comments_for_user().await)
    });
}
