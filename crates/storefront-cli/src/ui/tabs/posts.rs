use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use storefront_core::models::Post;
use storefront_core::utils::{single_line, truncate_string};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let snapshot = app.posts_snapshot();

    if snapshot.is_empty() {
        if snapshot.is_loading() {
            render_notice(frame, area, "Loading...", styles::muted_style());
            return;
        }
        let message = match snapshot.error() {
            Some(error) => format!("Oops! {}", error),
            None => "No posts loaded".to_string(),
        };
        render_notice_with_retry(frame, area, &message, snapshot.error().is_some());
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_post_list(frame, app, &snapshot.items, chunks[0]);
    render_post_preview(frame, snapshot.items.get(app.post_selection), chunks[1]);
}

fn render_post_list(frame: &mut Frame, app: &App, posts: &[Post], area: Rect) {
    let header = Row::new(vec![Cell::from("#"), Cell::from("Title"), Cell::from("Author")])
        .style(styles::title_style())
        .height(1);

    let title_width = (area.width as usize).saturating_sub(20).max(10);

    let rows: Vec<Row> = posts
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let style = if i == app.post_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(post.id.to_string()),
                Cell::from(truncate_string(&single_line(&post.title), title_width)),
                Cell::from(post.owner_id.to_string()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Fill(1),
        Constraint::Length(8),
    ];

    let title = format!(" Posts ({}) ", posts.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.post_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_post_preview(frame: &mut Frame, post: Option<&Post>, area: Rect) {
    let lines = match post {
        Some(post) => vec![
            Line::from(Span::styled(format!("Post #{}", post.id), styles::highlight_style())),
            Line::from(""),
            Line::from(Span::styled(single_line(&post.title), styles::title_style())),
            Line::from(""),
            Line::from(Span::styled(post.summary().to_string(), styles::list_item_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("Press ", styles::muted_style()),
                Span::styled("Enter", styles::help_key_style()),
                Span::styled(" for details", styles::muted_style()),
            ]),
        ],
        None => vec![Line::from(Span::styled("Nothing selected", styles::muted_style()))],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

/// Centered one-line message filling the content area
pub fn render_notice(frame: &mut Frame, area: Rect, message: &str, style: Style) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), style)),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_notice_with_retry(frame: &mut Frame, area: Rect, message: &str, is_error: bool) {
    let style = if is_error {
        styles::error_style()
    } else {
        styles::muted_style()
    };
    let action = if is_error { " to try again" } else { " to load" };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), style)),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", styles::muted_style()),
            Span::styled("r", styles::help_key_style()),
            Span::styled(action, styles::muted_style()),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
