use crate::app::{App, View};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar: the latest message, or key hints for the view.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        Cow::Borrowed(hints(app))
    };

    let account = match &app.user {
        Some(user) => Cow::Owned(format!(
            " {} ",
            user.email.as_deref().unwrap_or(user.id.as_str())
        )),
        None => Cow::Borrowed(" not signed in "),
    };
    let room = (area.width as usize).saturating_sub(account.len());
    let line = format!("{text:<room$}{account}");

    f.render_widget(Paragraph::new(line).style(app.style("status_bar")), area);
}

fn hints(app: &App) -> &'static str {
    if app.is_editing() {
        return match app.view {
            View::Login => "Tab next field | Enter submit | Esc cancel",
            _ => "Type to edit | Enter confirm | Esc cancel",
        };
    }
    match app.view {
        View::Catalog => "[/]search [g]enre [p]latform [x]clear [w]ishlist [W]list [P]rofile [?]help [q]uit",
        View::Details => "[j/k]comments [J/K]scroll [w]ishlist [c]omment [o]pen site [Esc]back",
        View::Wishlist => "[Enter]open [w]remove [r]eload [Esc]back",
        View::Profile => "[e]dit account [d]elete comment [X]sign out [Esc]back",
        View::Login => "Tab next field | Enter submit | Esc cancel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::User;
    use crate::app::tests::test_app;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 1)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                render(f, app, area)
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_message_replaces_hints() {
        let mut app = test_app().await;
        assert!(draw(&app).contains("[/]search"));
        app.set_status("Signed out");
        let line = draw(&app);
        assert!(line.contains("Signed out"));
        assert!(!line.contains("[/]search"));
    }

    #[tokio::test]
    async fn test_shows_account() {
        let mut app = test_app().await;
        assert!(draw(&app).contains("not signed in"));
        app.user = Some(User {
            id: "u1".into(),
            email: Some("me@x.io".into()),
        });
        assert!(draw(&app).trim_end().ends_with("me@x.io"));
    }
}
