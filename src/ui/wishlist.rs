use crate::app::App;
use crate::util::truncate_to_width;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::catalog::game_line;

/// Render the signed-in user's wishlist.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"));
    let inner = block.inner(area);

    let Some(wishlist) = &app.wishlist else {
        f.render_widget(
            Paragraph::new(Span::styled("Loading wishlist...", app.style("item_meta")))
                .block(block.title(" Wishlist ")),
            area,
        );
        return;
    };

    let title = format!(" Wishlist ({}) ", wishlist.len());
    let block = block
        .title(title)
        .title_bottom(" Enter open  w/d remove  Esc back ");

    if wishlist.is_empty() {
        f.render_widget(
            Paragraph::new(vec![
                Line::from(Span::styled(
                    "Your wishlist is empty.",
                    app.style("banner_empty"),
                )),
                Line::from(Span::styled(
                    "Press w on a game to add it.",
                    app.style("item_meta"),
                )),
            ])
            .block(block),
            area,
        );
        return;
    }

    let rows = inner.height as usize;
    let width = inner.width as usize;
    let skip = (app.wishlist_selected + 1).saturating_sub(rows.max(1));
    let lines: Vec<Line> = wishlist
        .entries()
        .iter()
        .enumerate()
        .skip(skip)
        .take(rows)
        .map(|(i, entry)| {
            let selected = i == app.wishlist_selected;
            match &entry.game {
                Some(game) => game_line(app, game, selected, width),
                // Details still loading
                None => {
                    let style = if selected {
                        app.style("item_selected")
                    } else {
                        app.style("item_placeholder")
                    };
                    let label = format!("  Game #{} ...", entry.game_id);
                    Line::from(Span::styled(
                        truncate_to_width(&label, width).into_owned(),
                        style,
                    ))
                }
            }
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::WishlistState;
    use crate::app::tests::{game, test_app};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
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
    async fn test_rows_with_and_without_details() {
        let mut app = test_app().await;
        let mut wishlist = WishlistState::from_ids([3, 8]);
        wishlist.fill(game(3));
        app.wishlist = Some(wishlist);

        let screen = draw(&app);
        assert!(screen.contains("Wishlist (2)"));
        assert!(screen.contains("Game 3"));
        assert!(screen.contains("Game #8"));
    }

    #[tokio::test]
    async fn test_empty_and_loading_states() {
        let mut app = test_app().await;
        assert!(draw(&app).contains("Loading wishlist"));
        app.wishlist = Some(WishlistState::from_ids(Vec::<u64>::new()));
        assert!(draw(&app).contains("Your wishlist is empty."));
    }
}
