use crate::app::{App, LoginMode};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::render::{centered_box, form_lines};

/// Render the sign in / register form.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let login = &app.login;
    let (title, switch_hint) = match login.mode {
        LoginMode::SignIn => (" Sign in ", "Ctrl+r create an account"),
        LoginMode::SignUp => (" Create account ", "Ctrl+r sign in instead"),
    };

    let mut lines = vec![Line::from("")];
    lines.extend(form_lines(app, &login.form));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Tab next field  Enter submit  Esc cancel  {switch_hint}"),
        app.style("item_meta"),
    )));
    if app.services.auth.is_none() {
        lines.push(Line::from(Span::styled(
            "No account backend configured (backend_url / backend_anon_key).",
            app.style("banner_error"),
        )));
    }

    let height = lines.len() as u16 + 2;
    let overlay = centered_box(76, height, area);
    f.render_widget(Clear, overlay);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        ),
        overlay,
    );
}
