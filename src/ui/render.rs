//! Render dispatch for the TUI.
//!
//! Picks the view renderer for the current state, then draws overlays (filter
//! menu, help) on top.

use crate::app::{App, Form, MenuKind, MenuState, View};
use crate::util::truncate_to_width;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::{catalog, details, help, login, profile, status, wishlist};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
///
/// Takes `&mut App` because the catalog list records its viewport for the
/// sentinel check that follows each frame.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        // Nothing is visible, so the catalog must not look scrolled to the end
        app.catalog_viewport_rows = 0;
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    match app.view {
        View::Catalog => catalog::render(f, app, chunks[0]),
        View::Details => details::render(f, app, chunks[0]),
        View::Wishlist => wishlist::render(f, app, chunks[0]),
        View::Profile => profile::render(f, app, chunks[0]),
        View::Login => login::render(f, app, chunks[0]),
    }
    status::render(f, app, chunks[1]);

    if let MenuState::Open { kind, selected } = app.menu {
        render_menu_overlay(f, app, kind, selected);
    }

    if app.show_help {
        help::render(f, app);
    }
}

/// Genre/platform picker drawn over the catalog.
fn render_menu_overlay(f: &mut Frame, app: &App, kind: MenuKind, selected: usize) {
    let area = f.area();
    let options = app.menu_options(kind);

    let width = 36u16.min(area.width.saturating_sub(4));
    // +1 for "All", +2 for borders
    let height = (options.len() as u16)
        .saturating_add(3)
        .min(area.height.saturating_sub(4));
    let overlay = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );
    if overlay.width < 10 || overlay.height < 3 {
        return;
    }
    f.render_widget(Clear, overlay);

    let label_width = overlay.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = std::iter::once(format!("All {}s", kind.title().to_lowercase()))
        .chain(options.iter().map(|opt| opt.name.clone()))
        .map(|label| ListItem::new(truncate_to_width(&label, label_width).into_owned()))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(format!(" {} ", kind.title())),
        )
        .style(app.style("item_normal"))
        .highlight_style(app.style("menu_selected"))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(selected));
    f.render_stateful_widget(list, overlay, &mut state);
}

/// Draws a stack of labelled text fields, one per line, with the focused
/// field highlighted and masked fields shown as bullets.
pub(super) fn form_lines<'a>(app: &App, form: &'a Form) -> Vec<Line<'a>> {
    let mut lines = Vec::with_capacity(form.fields.len() * 2 + 2);
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let value = if field.masked {
            "\u{2022}".repeat(field.value.chars().count())
        } else {
            field.value.clone()
        };
        let cursor = if focused && !form.submitting { "_" } else { "" };
        let style = if focused {
            app.style("input_active")
        } else {
            app.style("input_inactive")
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>18}: ", field.label), app.style("detail_label")),
            Span::styled(format!("{value}{cursor}"), style),
        ]));
        lines.push(Line::from(""));
    }
    if form.submitting {
        lines.push(Line::from(Span::styled("Working...", app.style("item_meta"))));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(error.as_str(), app.style("banner_error"))));
    }
    lines
}

const SPINNER_FRAMES: [&str; 10] = [
    "\u{280b}", "\u{2819}", "\u{2839}", "\u{2838}", "\u{283c}", "\u{2834}", "\u{2826}", "\u{2827}",
    "\u{2807}", "\u{280f}",
];

/// Current frame of the loading spinner.
pub(super) fn spinner(app: &App) -> &'static str {
    SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
}

/// A rectangle of the given size centered in `area`, clamped to fit.
pub(super) fn centered_box(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{game, test_app};
    use crate::catalog::CatalogPage;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[tokio::test]
    async fn test_small_terminal_shows_warning() {
        let mut app = test_app().await;
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Terminal too small"));
        assert_eq!(app.catalog_viewport_rows, 0);
    }

    #[tokio::test]
    async fn test_catalog_frame_records_viewport() {
        let mut app = test_app().await;
        let request = app.feed.reload();
        app.feed.apply(
            request.ticket,
            Ok(CatalogPage {
                items: (1..=3).map(game).collect(),
                has_next: true,
                total: None,
                skipped: 0,
            }),
        );

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Game 1"));
        assert!(text.contains("Game 3"));
        assert!(app.catalog_viewport_rows > 3);
        assert!(app.sentinel_visible());
    }

    #[tokio::test]
    async fn test_every_view_renders() {
        let mut app = test_app().await;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        for view in [View::Catalog, View::Wishlist, View::Profile, View::Login] {
            app.view = view;
            terminal.draw(|f| render(f, &mut app)).unwrap();
        }
        app.begin_details(4, Some(game(4)));
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Game 4"));

        app.show_help = true;
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen_text(&terminal).contains("Help"));
    }

    #[test]
    fn test_centered_box_clamps() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered_box(10, 4, area), Rect::new(5, 3, 10, 4));
        assert_eq!(centered_box(50, 50, area), area);
    }
}
