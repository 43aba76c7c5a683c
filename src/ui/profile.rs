use crate::app::{App, Loadable};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::render::{form_lines, spinner};

/// Render the profile: account summary or edit form, then the user's comments.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let form_height = if app.profile.form.is_some() { 10 } else { 5 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(form_height), Constraint::Min(0)])
        .split(area);

    render_account(f, app, chunks[0]);
    render_comments(f, app, chunks[1]);
}

fn render_account(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(" Account ");

    let lines = match &app.profile.form {
        Some(form) => {
            let mut lines = form_lines(app, form);
            lines.push(Line::from(Span::styled(
                "Tab next field  Enter save  Esc cancel  (blank password keeps the current one)",
                app.style("item_meta"),
            )));
            lines
        }
        None => {
            let (email, id) = app
                .user
                .as_ref()
                .map(|u| (u.email.as_deref().unwrap_or("-"), u.id.as_str()))
                .unwrap_or(("-", "-"));
            vec![
                Line::from(vec![
                    Span::styled("Email: ", app.style("detail_label")),
                    Span::styled(email.to_string(), app.style("detail_body")),
                ]),
                Line::from(vec![
                    Span::styled("   Id: ", app.style("detail_label")),
                    Span::styled(id.to_string(), app.style("item_meta")),
                ]),
                Line::from(Span::styled(
                    "e edit account  X sign out",
                    app.style("item_meta"),
                )),
            ]
        }
    };
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_comments(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border"));
    let inner = block.inner(area);
    let width = inner.width as usize;

    let (title, lines) = match &app.profile.comments {
        Loadable::Loading => (
            " Your comments ".to_string(),
            vec![Line::from(Span::styled(
                format!("{} Loading...", spinner(app)),
                app.style("item_meta"),
            ))],
        ),
        Loadable::Failed(error) => (
            " Your comments ".to_string(),
            vec![Line::from(Span::styled(error.clone(), app.style("banner_error")))],
        ),
        Loadable::Ready(comments) if comments.is_empty() => (
            " Your comments (0) ".to_string(),
            vec![Line::from(Span::styled(
                "You have not commented on any games yet.",
                app.style("banner_empty"),
            ))],
        ),
        Loadable::Ready(comments) => {
            let rows = inner.height as usize;
            let skip = (app.profile.selected + 1).saturating_sub(rows.max(1));
            let lines = comments
                .iter()
                .enumerate()
                .skip(skip)
                .take(rows)
                .map(|(i, comment)| {
                    let style = if i == app.profile.selected {
                        app.style("item_selected")
                    } else {
                        app.style("detail_body")
                    };
                    let prefix = format!(
                        "{}  game #{:<8} ",
                        comment.created_at.format("%Y-%m-%d"),
                        comment.game_id
                    );
                    let room = width.saturating_sub(prefix.len());
                    let content = strip_control_chars(&comment.content);
                    Line::from(vec![
                        Span::styled(prefix, app.style("item_meta")),
                        Span::styled(truncate_to_width(&content, room).into_owned(), style),
                    ])
                })
                .collect();
            (format!(" Your comments ({}) ", comments.len()), lines)
        }
    };

    let block = block
        .title(title)
        .title_bottom(" Enter open game  d delete  r reload ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Comment, User};
    use crate::app::account_form;
    use crate::app::tests::test_app;
    use chrono::Utc;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
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
    async fn test_shows_account_and_comments() {
        let mut app = test_app().await;
        app.user = Some(User {
            id: "u-1".into(),
            email: Some("me@x.io".into()),
        });
        app.profile.comments = Loadable::Ready(vec![Comment {
            id: 1,
            user_id: "u-1".into(),
            game_id: 3498,
            content: "Still the best".into(),
            created_at: Utc::now(),
        }]);

        let screen = draw(&app);
        assert!(screen.contains("me@x.io"));
        assert!(screen.contains("game #3498"));
        assert!(screen.contains("Still the best"));
    }

    #[tokio::test]
    async fn test_edit_form_masks_passwords() {
        let mut app = test_app().await;
        let mut form = account_form("me@x.io");
        form.next_field();
        for c in "hunter22".chars() {
            form.push_char(c);
        }
        app.profile.form = Some(form);

        let screen = draw(&app);
        assert!(!screen.contains("hunter22"));
        assert!(screen.contains("\u{2022}\u{2022}\u{2022}"));
    }
}
