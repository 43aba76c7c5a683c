use crate::account::CommentThread;
use crate::app::{App, DetailsState, Loadable};
use crate::catalog::{GameDetails, NamedRef};
use crate::util::{html_to_text, strip_control_chars};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::render::spinner;

/// Render the game page: details on top, comments below.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(area);

    let Some(page) = app.details.as_ref() else {
        f.render_widget(
            Paragraph::new("No game selected").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let lines = detail_lines(app, page);
    let visible = chunks[0].height.saturating_sub(2);
    let max_scroll = (lines.len() as u16).saturating_sub(visible);
    let scroll = page.scroll.min(max_scroll);

    let marker = match app.is_wishlisted(page.game_id) {
        Some(true) => " \u{2665}",
        _ => "",
    };
    let title = format!(" {}{marker} ", strip_control_chars(&page.title()));
    let body = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        )
        .style(app.style("detail_body"))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(body, chunks[0]);

    render_comments(f, app, page, chunks[1]);

    if let Some(page) = app.details.as_mut() {
        page.scroll = scroll;
    }
}

fn detail_lines(app: &App, page: &DetailsState) -> Vec<Line<'static>> {
    match &page.details {
        Loadable::Loading => {
            let mut lines = vec![Line::from(Span::styled(
                format!("{} Loading game details...", spinner(app)),
                app.style("item_meta"),
            ))];
            // Show what the list already knew while the rest loads
            if let Some(game) = &page.summary {
                lines.push(Line::from(""));
                lines.push(field(app, "Rating", format!("{:.1}", game.rating)));
                if let Some(released) = &game.released {
                    lines.push(field(app, "Released", released.clone()));
                }
                lines.push(field(app, "Genres", names(&game.genres)));
            }
            lines
        }
        Loadable::Failed(error) => vec![
            Line::from(Span::styled(
                format!("Could not load this game: {error}"),
                app.style("banner_error"),
            )),
            Line::from(""),
            Line::from(Span::styled("Press r to retry", app.style("item_meta"))),
        ],
        Loadable::Ready(details) => ready_lines(app, details),
    }
}

fn ready_lines(app: &App, details: &GameDetails) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    lines.push(field(app, "Rating", format!("{:.1} / 5", details.rating)));
    lines.push(field(
        app,
        "Released",
        details.released.clone().unwrap_or_else(|| "TBA".into()),
    ));
    lines.push(field(app, "Genres", names(&details.genres)));
    lines.push(field(
        app,
        "Platforms",
        details
            .platforms
            .iter()
            .map(|p| p.platform.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    ));
    if !details.developers.is_empty() {
        lines.push(field(app, "Developers", names(&details.developers)));
    }
    if !details.publishers.is_empty() {
        lines.push(field(app, "Publishers", names(&details.publishers)));
    }
    if let Some(website) = details.website.as_deref().filter(|w| !w.is_empty()) {
        lines.push(Line::from(vec![
            Span::styled(format!("{:>11}: ", "Website"), app.style("detail_label")),
            Span::styled(strip_control_chars(website).into_owned(), app.style("detail_link")),
            Span::styled("  (o to open)", app.style("item_meta")),
        ]));
    }

    if let Some(description) = details.description.as_deref() {
        let text = html_to_text(description);
        let text = strip_control_chars(&text);
        if !text.trim().is_empty() {
            lines.push(Line::from(""));
            lines.push(heading(app, "About"));
            lines.extend(text.lines().map(|l| Line::from(l.to_string())));
        }
    }

    let with_requirements: Vec<_> = details.platforms_with_requirements().collect();
    if !with_requirements.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading(app, "System requirements"));
        for release in with_requirements {
            lines.push(Line::from(Span::styled(
                release.platform.name.clone(),
                app.style("detail_label"),
            )));
            let Some(req) = &release.requirements else {
                continue;
            };
            for block in [&req.minimum, &req.recommended].into_iter().flatten() {
                let text = html_to_text(block);
                lines.extend(
                    strip_control_chars(&text)
                        .lines()
                        .map(|l| Line::from(format!("  {l}"))),
                );
            }
        }
    }

    if !details.screenshots.is_empty() {
        lines.push(Line::from(""));
        lines.push(heading(
            app,
            &format!("Screenshots ({})", details.screenshots.len()),
        ));
        for shot in &details.screenshots {
            lines.push(Line::from(Span::styled(
                format!("  {}", strip_control_chars(&shot.image)),
                app.style("detail_link"),
            )));
        }
    }
    lines
}

fn render_comments(f: &mut Frame, app: &App, page: &DetailsState, area: Rect) {
    let (list_area, draft_area) = if page.draft.is_some() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(area);
        (chunks[0], Some(chunks[1]))
    } else {
        (area, None)
    };

    let own_id = app.user.as_ref().map(|u| u.id.as_str());
    let (title, lines) = match &page.comments {
        Loadable::Loading => (
            " Comments ".to_string(),
            vec![Line::from(Span::styled(
                format!("{} Loading comments...", spinner(app)),
                app.style("item_meta"),
            ))],
        ),
        Loadable::Failed(error) => (
            " Comments ".to_string(),
            vec![Line::from(Span::styled(
                error.clone(),
                app.style("banner_error"),
            ))],
        ),
        Loadable::Ready(thread) => (
            format!(" Comments ({}) ", thread.comments().len()),
            comment_lines(app, thread, page.selected_comment, own_id, list_area),
        ),
    };

    let hint = if app.user.is_some() {
        " c comment  d delete "
    } else {
        " L to sign in and comment "
    };
    let comments = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border"))
                .title(title)
                .title_bottom(hint),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(comments, list_area);

    if let (Some(area), Some(draft)) = (draft_area, &page.draft) {
        let input = Paragraph::new(format!("{draft}_"))
            .style(app.style("input_active"))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(app.style("panel_border_focused"))
                    .title(" New comment (Enter to post, Esc to cancel) "),
            );
        f.render_widget(input, area);
    }
}

fn comment_lines(
    app: &App,
    thread: &CommentThread,
    selected: usize,
    own_id: Option<&str>,
    area: Rect,
) -> Vec<Line<'static>> {
    if thread.comments().is_empty() {
        return vec![Line::from(Span::styled(
            "No comments yet.",
            app.style("banner_empty"),
        ))];
    }
    // Each comment takes two lines; keep the selected one in view
    let per_page = (area.height.saturating_sub(2) as usize / 2).max(1);
    let skip = (selected + 1).saturating_sub(per_page);

    let mut lines = Vec::new();
    for (i, comment) in thread.comments().iter().enumerate().skip(skip) {
        let author = if Some(comment.user_id.as_str()) == own_id {
            "You".to_string()
        } else {
            format!("User {}", short_id(&comment.user_id))
        };
        let when = comment.created_at.format("%Y-%m-%d %H:%M");
        let pending = if CommentThread::is_pending(comment) {
            Span::styled(" (posting...)", app.style("comment_pending"))
        } else {
            Span::raw("")
        };
        let prefix = if i == selected { "> " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(prefix),
            Span::styled(author, app.style("comment_author")),
            Span::styled(format!("  {when}"), app.style("item_meta")),
            pending,
        ]));
        let body_style = if i == selected {
            app.style("item_selected")
        } else {
            app.style("detail_body")
        };
        lines.push(Line::from(Span::styled(
            format!("    {}", strip_control_chars(&comment.content)),
            body_style,
        )));
    }
    lines
}

fn field(app: &App, label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:>11}: "), app.style("detail_label")),
        Span::styled(value, app.style("detail_body")),
    ])
}

fn heading(app: &App, text: &str) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), app.style("detail_heading")))
}

fn names(refs: &[NamedRef]) -> String {
    if refs.is_empty() {
        return "-".to_string();
    }
    refs.iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First eight characters of a user id.
fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
