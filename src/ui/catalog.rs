use crate::app::{App, MenuKind};
use crate::catalog::Game;
use crate::feed::FeedCondition;
use crate::util::{display_width, strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::render::spinner;

/// Render the filter bar and the game list.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_filter_bar(f, app, chunks[0]);
    render_list(f, app, chunks[1]);
}

fn render_filter_bar(f: &mut Frame, app: &App, area: Rect) {
    let selection = app.feed.selection();
    let mut spans = Vec::new();

    match &app.search_draft {
        Some(draft) => {
            spans.push(Span::styled("Search: ", app.style("detail_label")));
            spans.push(Span::styled(format!("{draft}_"), app.style("input_active")));
        }
        None => {
            spans.push(Span::styled("Search: ", app.style("detail_label")));
            spans.push(Span::styled(
                selection.search_query().unwrap_or("-").to_string(),
                app.style("input_inactive"),
            ));
        }
    }

    let genre = selection
        .genre()
        .map_or("All", |id| app.option_name(MenuKind::Genre, id));
    let platform = selection
        .platform()
        .map_or("All", |id| app.option_name(MenuKind::Platform, id));
    spans.push(Span::styled("   Genre: ", app.style("detail_label")));
    spans.push(Span::styled(genre.to_string(), app.style("item_normal")));
    spans.push(Span::styled("   Platform: ", app.style("detail_label")));
    spans.push(Span::styled(platform.to_string(), app.style("item_normal")));

    let title = match app.feed.total() {
        Some(total) => format!(" Games ({total}) "),
        None => " Games ".to_string(),
    };
    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(if app.search_draft.is_some() {
                app.style("panel_border_focused")
            } else {
                app.style("panel_border")
            })
            .title(title),
    );
    f.render_widget(bar, area);
}

fn render_list(f: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border"));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = inner.height as usize;
    app.catalog_viewport_rows = rows;
    app.scroll_catalog_to_selection();

    match app.feed.condition() {
        FeedCondition::Failed => {
            let message = app.feed.error_message().unwrap_or_default().to_string();
            render_banner(f, app, inner, &message, "Press r to retry", "banner_error");
            return;
        }
        FeedCondition::NoResults => {
            render_banner(
                f,
                app,
                inner,
                "No games match these filters.",
                "Press x to clear filters or / to search again",
                "banner_empty",
            );
            return;
        }
        FeedCondition::InitialLoading => {
            render_placeholders(f, app, inner);
            return;
        }
        FeedCondition::Loading if app.feed.items().is_empty() => {
            render_placeholders(f, app, inner);
            return;
        }
        FeedCondition::Loading | FeedCondition::Ready => {}
    }

    let width = inner.width as usize;
    let items = app.feed.items();
    let start = app.catalog_offset.min(items.len());
    let end = (start + rows).min(items.len());
    let mut lines: Vec<Line> = items[start..end]
        .iter()
        .enumerate()
        .map(|(i, game)| {
            let selected = start + i == app.catalog_selected;
            game_line(app, game, selected, width)
        })
        .collect();

    // Trailing row under the last item once it is on screen
    if lines.len() < rows {
        if app.feed.is_loading() {
            lines.push(Line::from(Span::styled(
                format!("{} Loading more games...", spinner(app)),
                app.style("item_meta"),
            )));
        } else if !app.feed.has_more() {
            lines.push(Line::from(Span::styled(
                "- End of results -",
                app.style("item_meta"),
            )));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

/// One list row: wishlist marker, name, rating, year, genres.
pub(super) fn game_line(app: &App, game: &Game, selected: bool, width: usize) -> Line<'static> {
    let marker = match app.is_wishlisted(game.id) {
        Some(true) => "\u{2665} ",
        _ => "  ",
    };
    let rating = format!(" {:>4.1}", game.rating);
    let year = game
        .released
        .as_deref()
        .and_then(|d| d.get(..4))
        .unwrap_or("----");
    let genres = game
        .genres
        .iter()
        .take(2)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let meta = format!("  {year}  {genres}");

    let name = strip_control_chars(&game.name);
    let fixed = display_width(marker) + rating.len();
    let name_room = width.saturating_sub(fixed).clamp(1, 40);
    let name = truncate_to_width(&name, name_room).into_owned();
    let pad = name_room.saturating_sub(display_width(&name));
    let meta_room = width.saturating_sub(fixed + name_room);
    let meta = truncate_to_width(&meta, meta_room).into_owned();

    let name_style = if selected {
        app.style("item_selected")
    } else {
        app.style("item_normal")
    };
    Line::from(vec![
        Span::styled(marker, app.style("wishlist_marker")),
        Span::styled(format!("{name}{}", " ".repeat(pad)), name_style),
        Span::styled(rating, app.style("item_rating")),
        Span::styled(meta, app.style("item_meta")),
    ])
}

/// Grey bars where games will appear, one per expected item.
fn render_placeholders(f: &mut Frame, app: &App, area: Rect) {
    let count = (app.feed.page_size() as usize).min(area.height as usize);
    let width = area.width.saturating_sub(4) as usize;
    let lines: Vec<Line> = (0..count)
        .map(|i| {
            // Vary the bar length so the skeleton reads as a list
            let len = width.saturating_sub((i * 7) % 17).max(4).min(width);
            Line::from(Span::styled(
                format!("  {}", "\u{2591}".repeat(len)),
                app.style("item_placeholder"),
            ))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn render_banner(f: &mut Frame, app: &App, area: Rect, message: &str, hint: &str, role: &str) {
    let top = area.height.saturating_sub(3) / 2;
    let banner_area = Rect {
        y: area.y + top,
        height: area.height.saturating_sub(top).min(3),
        ..area
    };
    let text = vec![
        Line::from(Span::styled(message.to_string(), app.style(role))),
        Line::from(""),
        Line::from(Span::styled(hint.to_string(), app.style("item_meta"))),
    ];
    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        banner_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{game, test_app};
    use crate::account::WishlistState;
    use crate::catalog::{CatalogError, CatalogPage, NamedRef};
    use crate::feed::{FilterSelection, LOAD_ERROR_MESSAGE};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                render(f, app, area)
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_initial_load_shows_placeholders() {
        let mut app = test_app().await;
        let _ = app.feed.reload();
        let screen = draw(&mut app);
        assert!(screen.contains('\u{2591}'));
    }

    #[tokio::test]
    async fn test_failure_shows_generic_message() {
        let mut app = test_app().await;
        let request = app.feed.reload();
        app.feed.apply(request.ticket, Err(CatalogError::Timeout));
        let screen = draw(&mut app);
        assert!(screen.contains(LOAD_ERROR_MESSAGE));
        assert!(app.feed.on_sentinel_visible().is_none());
    }

    #[tokio::test]
    async fn test_no_results_banner() {
        let mut app = test_app().await;
        let request = app.feed.reload();
        app.feed.apply(
            request.ticket,
            Ok(CatalogPage {
                items: Vec::new(),
                has_next: false,
                total: Some(0),
                skipped: 0,
            }),
        );
        assert!(draw(&mut app).contains("No games match"));
    }

    #[tokio::test]
    async fn test_rows_show_marker_and_end_of_results() {
        let mut app = test_app().await;
        let mut hades = game(1);
        hades.genres = vec![NamedRef {
            id: 4,
            name: "Action".into(),
        }];
        let request = app.feed.reload();
        app.feed.apply(
            request.ticket,
            Ok(CatalogPage {
                items: vec![hades, game(2)],
                has_next: false,
                total: Some(2),
                skipped: 0,
            }),
        );
        app.wishlist = Some(WishlistState::from_ids([1]));

        let screen = draw(&mut app);
        assert!(screen.contains("\u{2665} Game 1"));
        assert!(screen.contains("2020  Action"));
        assert!(screen.contains("End of results"));
        assert!(screen.contains("Games (2)"));
    }

    #[tokio::test]
    async fn test_filter_bar_shows_draft_and_names() {
        let mut app = test_app().await;
        app.genres = vec![NamedRef {
            id: 4,
            name: "Action".into(),
        }];
        let _ = app
            .feed
            .set_filter(FilterSelection::new("", Some("4"), None));
        app.search_draft = Some("halo".into());
        let screen = draw(&mut app);
        assert!(screen.contains("halo_"));
        assert!(screen.contains("Genre: Action"));
        assert!(screen.contains("Platform: All"));
    }
}
