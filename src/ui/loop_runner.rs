//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, background task events, and periodic ticks.

use crate::app::{App, AppEvent, Loadable, View};
use anyhow::Result;
use crossterm::{
    event::{Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::handle_app_event;
use super::helpers::{check_sentinel, spawn_filter_options, spawn_page_load};
use super::input::handle_input;
use super::render::render;

/// Number of frames in the loading spinner animation.
const SPINNER_FRAMES: usize = 10;

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` to multiplex:
/// - **Signals**: SIGTERM/SIGINT end the loop
/// - **Terminal input**: Key presses from crossterm's async event stream
/// - **Background tasks**: page, detail and account results via `AppEvent`
/// - **Periodic tick**: 250ms timer for status expiry and spinners
///
/// After every frame the end of the catalog list is checked and the next page
/// is requested when it is on screen.
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    start(app, &event_tx);

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();
    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
            check_sentinel(app, &event_tx);
        }

        if app.clear_expired_status() {
            app.needs_redraw = true;
        }

        // Drain pending app events before waiting on input
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event, &event_tx).await;
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        app.needs_redraw = true;
                        match handle_input(app, key.code, key.modifiers, &event_tx).await {
                            Ok(Action::Quit) => break,
                            Ok(Action::Continue) => {}
                            Err(e) => app.set_status(format!("Error: {e}")),
                        }
                    }
                    Some(Ok(Event::Resize(_, _))) => app.needs_redraw = true,
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => break,
                    _ => {}
                }
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event, &event_tx).await;
            }

            _ = tick_interval.tick() => {
                handle_tick(app);
            }
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// First page under the saved filters, plus the filter menus.
fn start(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let selection = app.prefs.saved_filters();
    tracing::info!(
        genre = selection.genre().unwrap_or(""),
        platform = selection.platform().unwrap_or(""),
        page_size = app.feed.page_size(),
        "Loading catalog"
    );
    let request = app.feed.set_filter(selection);
    spawn_page_load(app, request, event_tx);
    spawn_filter_options(app, event_tx);
}

/// Animates spinners while something visible is loading.
fn handle_tick(app: &mut App) {
    let loading = match app.view {
        View::Catalog => app.feed.is_loading(),
        View::Details => app.details.as_ref().is_some_and(|page| {
            matches!(page.details, Loadable::Loading) || matches!(page.comments, Loadable::Loading)
        }),
        View::Profile => matches!(app.profile.comments, Loadable::Loading),
        View::Login => app.login.form.submitting,
        View::Wishlist => app.wishlist.is_none(),
    };
    if loading {
        app.spinner_frame = (app.spinner_frame + 1) % SPINNER_FRAMES;
        app.needs_redraw = true;
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;

    #[tokio::test]
    async fn test_tick_spins_only_while_loading() {
        let mut app = test_app().await;
        app.needs_redraw = false;
        handle_tick(&mut app);
        assert_eq!(app.spinner_frame, 0);

        let _ = app.feed.reload();
        handle_tick(&mut app);
        assert_eq!(app.spinner_frame, 1);
        assert!(app.needs_redraw);
    }

    #[tokio::test]
    async fn test_start_requests_first_page() {
        let mut app = test_app().await;
        let (tx, _rx) = mpsc::channel(32);
        start(&mut app, &tx);
        assert!(app.feed.is_loading());
        assert!(app.feed_handle.is_some());
    }
}
