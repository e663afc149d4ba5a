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
    let snapshot = app.posts_snapshot();
    let feed_line = if snapshot.is_loading() {
        "Loading the latest posts...".to_string()
    } else if snapshot.is_empty() {
        "Press Enter to browse the latest posts".to_string()
    } else {
        format!("{} posts loaded. Press Enter to browse", snapshot.len())
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(BRAND, styles::title_style())),
        Line::from(Span::styled("Premium Jewelry Collection", styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled("◇ ─── ◆ ─── ◇", styles::highlight_style())),
        Line::from(""),
        Line::from(Span::styled("Cuban Palm Chain", styles::list_item_style())),
        Line::from(Span::styled("Crafted to Perfection", styles::muted_style())),
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(feed_line, styles::muted_style())),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}
