use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::render::BRAND;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let username = app.config.last_username.as_deref().unwrap_or("your account");

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(BRAND, styles::title_style())),
        Line::from(Span::styled("Account Management", styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled("Sign Out", styles::highlight_style())),
        Line::from(""),
        Line::from(Span::styled(
            format!("Thank you for visiting {} Premium Jewelry Collection", BRAND),
            styles::list_item_style(),
        )),
        Line::from(Span::styled(
            format!("Signed in as {}", username),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", styles::muted_style()),
            Span::styled("Enter", styles::help_key_style()),
            Span::styled(" to sign out", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}
