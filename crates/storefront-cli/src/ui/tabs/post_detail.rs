use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use storefront_core::models::Post;

use crate::app::{App, Counter};
use crate::ui::styles;
use crate::ui::tabs::posts::render_notice;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(detail) = app.detail.as_ref() else {
        return;
    };
    let snapshot = app.posts_snapshot();

    if snapshot.is_loading() {
        render_notice(frame, area, "Loading...", styles::muted_style());
        return;
    }
    if let Some(error) = snapshot.error() {
        render_notice(frame, area, &format!("Oops! {}", error), styles::error_style());
        return;
    }
    let Some(post) = app.detail_post() else {
        render_notice(frame, area, "Post not found", styles::error_style());
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(5)])
        .split(area);

    render_content(frame, &post, chunks[0]);
    render_counter(frame, detail.counter, chunks[1]);
}

fn render_content(frame: &mut Frame, post: &Post, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(format!("Post #{}", post.id), styles::highlight_style())),
        Line::from(""),
        Line::from(Span::styled(post.title.clone(), styles::title_style())),
        Line::from(""),
        Line::from(Span::styled("Content", styles::muted_style())),
    ];
    lines.extend(
        post.body
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), styles::list_item_style()))),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Author ID  ", styles::muted_style()),
        Span::styled(post.owner_id.to_string(), styles::list_item_style()),
    ]));

    let block = Block::default()
        .title(" Post Details ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_counter(frame: &mut Frame, counter: Counter, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("[+]", styles::help_key_style()),
            Span::raw("   "),
            Span::styled(counter.value().to_string(), styles::counter_style()),
            Span::raw("   "),
            Span::styled("[-]", styles::help_key_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Quantity ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}
