//! Application event handling.
//!
//! Applies the results of background tasks (page loads, detail loads, account
//! calls) to the application state. Results that no longer match what is on
//! screen are dropped.

use crate::account::{CommentThread, PendingChange, SignUpOutcome, User, WishlistState};
use crate::app::{App, AppEvent, CommentOrigin, Loadable, LoginForm, LoginMode, View};
use crate::feed::ApplyOutcome;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::helpers::{spawn_wishlist_fill, spawn_wishlist_load};

/// Handle application events from background tasks.
pub(super) async fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match event {
        AppEvent::PageLoaded { ticket, result } => {
            let first_page = ticket.page() == 1;
            if app.feed.apply(ticket, result) == ApplyOutcome::Applied {
                if first_page {
                    app.reset_catalog_position();
                } else {
                    app.clamp_catalog_selection();
                }
            }
        }

        AppEvent::GenresLoaded(result) => match result {
            Ok(genres) => app.genres = genres,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load genres");
                app.set_status("Could not load genres");
            }
        },

        AppEvent::PlatformsLoaded(result) => match result {
            Ok(platforms) => app.platforms = platforms,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load platforms");
                app.set_status("Could not load platforms");
            }
        },

        AppEvent::DetailsLoaded {
            game_id,
            generation,
            result,
            cached,
        } => {
            if let Ok(details) = &result {
                app.detail_cache.put(game_id, Arc::clone(details));
                if let Some(wishlist) = app.wishlist.as_mut() {
                    if wishlist.contains(game_id) {
                        wishlist.fill(details.summary());
                    }
                }
            }
            let Some(page) = app.current_details(game_id, generation) else {
                tracing::debug!(game_id, generation, "Discarding stale details");
                return;
            };
            tracing::debug!(game_id, cached, ok = result.is_ok(), "Details loaded");
            page.details = match result {
                Ok(details) => Loadable::Ready(details),
                Err(e) => {
                    tracing::warn!(game_id, error = %e, "Failed to load game details");
                    Loadable::Failed(e.to_string())
                }
            };
        }

        AppEvent::CommentsLoaded {
            game_id,
            generation,
            result,
        } => {
            let Some(page) = app.current_details(game_id, generation) else {
                return;
            };
            page.comments = match result {
                Ok(comments) => Loadable::Ready(CommentThread::new(game_id, comments)),
                Err(e) => {
                    tracing::warn!(game_id, error = %e, "Failed to load comments");
                    Loadable::Failed(e.to_string())
                }
            };
            page.selected_comment = 0;
        }

        AppEvent::CommentPosted {
            game_id,
            change,
            result,
        } => {
            let thread = app
                .details
                .as_mut()
                .filter(|page| page.game_id == game_id)
                .and_then(|page| page.comments.ready_mut());
            match result {
                Ok(comment) => {
                    if let Some(comments) = app.profile.comments.ready_mut() {
                        comments.insert(0, comment.clone());
                    }
                    if let Some(thread) = thread {
                        thread.commit(change, Some(comment));
                    }
                    app.set_status("Comment posted");
                }
                Err(e) => {
                    tracing::warn!(game_id, error = %e, "Comment post failed");
                    if let Some(thread) = thread {
                        thread.rollback(change);
                    }
                    app.set_status(format!("Comment not posted: {e}"));
                }
            }
        }

        AppEvent::CommentDeleted {
            origin,
            change,
            result,
        } => match (origin, result) {
            (origin, Ok(())) => {
                if let PendingChange::CommentDeleted { comment, .. } = &change {
                    let id = comment.id;
                    match origin {
                        CommentOrigin::Details { .. } => {
                            if let Some(comments) = app.profile.comments.ready_mut() {
                                comments.retain(|c| c.id != id);
                            }
                        }
                        CommentOrigin::Profile => {
                            let thread = app
                                .details
                                .as_mut()
                                .and_then(|page| page.comments.ready_mut());
                            if let Some(thread) = thread {
                                let _ = thread.remove(id);
                            }
                        }
                    }
                }
                app.set_status("Comment deleted");
            }
            (CommentOrigin::Details { game_id }, Err(e)) => {
                tracing::warn!(game_id, error = %e, "Comment delete failed");
                let thread = app
                    .details
                    .as_mut()
                    .filter(|page| page.game_id == game_id)
                    .and_then(|page| page.comments.ready_mut());
                if let Some(thread) = thread {
                    thread.rollback(change);
                }
                app.set_status(format!("Comment not deleted: {e}"));
            }
            (CommentOrigin::Profile, Err(e)) => {
                tracing::warn!(error = %e, "Comment delete failed");
                app.restore_profile_comment(change);
                app.set_status(format!("Comment not deleted: {e}"));
            }
        },

        AppEvent::WishlistLoaded(result) => match result {
            Ok(ids) => {
                let mut wishlist = WishlistState::from_ids(ids);
                for game in app.feed.items() {
                    if wishlist.contains(game.id) {
                        wishlist.fill(game.clone());
                    }
                }
                tracing::debug!(count = wishlist.len(), "Wishlist loaded");
                app.wishlist = Some(wishlist);
                app.wishlist_selected = 0;
                spawn_wishlist_fill(app, event_tx);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load wishlist");
                app.set_status(format!("Could not load wishlist: {e}"));
            }
        },

        AppEvent::WishlistGameLoaded(game) => {
            if let Some(wishlist) = app.wishlist.as_mut() {
                wishlist.fill(game);
            }
        }

        AppEvent::WishlistSynced { change, result } => {
            let Some(wishlist) = app.wishlist.as_mut() else {
                return;
            };
            match result {
                Ok(()) => wishlist.commit(change),
                Err(e) => {
                    tracing::warn!(error = %e, "Wishlist update failed");
                    wishlist.rollback(change);
                    let len = wishlist.len();
                    if app.wishlist_selected >= len {
                        app.wishlist_selected = len.saturating_sub(1);
                    }
                    app.set_status(format!("Wishlist not updated: {e}"));
                }
            }
        }

        AppEvent::MembershipChecked { game_id, result } => match result {
            Ok(on_list) => {
                if let Some(page) = app.details.as_mut().filter(|p| p.game_id == game_id) {
                    page.wishlisted = Some(on_list);
                }
            }
            Err(e) => tracing::debug!(game_id, error = %e, "Wishlist membership check failed"),
        },

        AppEvent::SignedIn(result) => match result {
            Ok(user) => on_signed_in(app, user, event_tx),
            Err(e) => {
                tracing::info!(error = %e, "Sign in failed");
                app.login.form.submitting = false;
                app.login.form.error = Some(e.to_string());
            }
        },

        AppEvent::SignedUp(result) => match result {
            Ok(SignUpOutcome::SignedIn(user)) => on_signed_in(app, user, event_tx),
            Ok(SignUpOutcome::ConfirmationRequired(_)) => {
                let email = app.login.email().to_string();
                app.login = LoginForm::new(LoginMode::SignIn, &email);
                app.set_status("Check your email to confirm the account, then sign in");
            }
            Err(e) => {
                tracing::info!(error = %e, "Sign up failed");
                app.login.form.submitting = false;
                app.login.form.error = Some(e.to_string());
            }
        },

        AppEvent::SignedOut(result) => {
            app.clear_account_state();
            let email = app.prefs.last_email().unwrap_or("").to_string();
            app.login = LoginForm::new(LoginMode::SignIn, &email);
            match result {
                Ok(()) => app.set_status("Signed out"),
                Err(e) => app.set_status(format!("Signed out locally ({e})")),
            }
        }

        AppEvent::AccountUpdated(result) => match result {
            Ok(user) => {
                app.user = Some(user);
                app.profile.form = None;
                app.set_status("Account updated");
            }
            Err(e) => {
                tracing::info!(error = %e, "Account update failed");
                if let Some(form) = app.profile.form.as_mut() {
                    form.submitting = false;
                    form.error = Some(e.to_string());
                }
            }
        },

        AppEvent::ProfileCommentsLoaded(result) => {
            app.profile.comments = match result {
                Ok(comments) => Loadable::Ready(comments),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load profile comments");
                    Loadable::Failed(e.to_string())
                }
            };
            app.profile.selected = 0;
        }

        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            if task == "page_load" && app.feed.fail_in_flight() {
                app.feed_handle = None;
            }
            // Unstick forms waiting on a task that will never answer
            app.login.form.submitting = false;
            if let Some(form) = app.profile.form.as_mut() {
                form.submitting = false;
            }
            app.set_status(format!("Internal error in {task}"));
        }
    }
}

fn on_signed_in(app: &mut App, user: User, event_tx: &mpsc::Sender<AppEvent>) {
    let who = user.email.clone().unwrap_or_else(|| user.id.clone());
    tracing::info!(user_id = %user.id, "Signed in");
    app.user = Some(user);
    let email = app.login.email().to_string();
    app.login = LoginForm::new(LoginMode::SignIn, &email);
    if app.view == View::Login {
        app.view = if app.details.is_some() {
            View::Details
        } else {
            View::Catalog
        };
    }
    app.set_status(format!("Signed in as {who}"));
    spawn_wishlist_load(app, event_tx);
}
