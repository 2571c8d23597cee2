use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use chatbox_core::ChatRole;

use crate::app::App;
use crate::markdown::{role_style, wrap_line};

/// Width of the Send button including its border
const SEND_WIDTH: u16 = 10;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // The input wraps inside its border, beside the Send button
    let input_width = area.width.saturating_sub(SEND_WIDTH).saturating_sub(2);
    app.widget.input.set_wrap_width(input_width);

    let banner_height = if app.widget.banner.is_visible() { 1 } else { 0 };

    // Main layout: header, transcript, error banner, input, footer
    let [header_area, transcript_area, banner_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(banner_height),
        Constraint::Length(app.widget.input.height() + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, transcript_area);
    if banner_height > 0 {
        render_banner(app, frame, banner_area);
    }
    render_input(app, frame, input_row);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" chatbox ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.server_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_transcript(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing
    app.transcript_area = Some(area);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let mut lines: Vec<Line<'static>> = app
        .message_lines()
        .iter()
        .flatten()
        .flat_map(|line| wrap_line(line, inner_width))
        .collect();

    for indicator in app.widget.transcript.indicators() {
        lines.push(Line::from(Span::styled(
            format!("{}:", ChatRole::Assistant.display_name()),
            role_style(ChatRole::Assistant),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let label = indicator.kind.label().trim_end_matches('.');
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}{}", label, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    if lines.is_empty() {
        let placeholder = Paragraph::new(Text::from(Span::styled(
            "Say something to start the conversation...",
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let total = lines.len().min(u16::MAX as usize) as u16;
    let max_scroll = total.saturating_sub(inner_height);
    let scroll = app.widget.transcript.settle_scroll(max_scroll);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(chat, area);

    if max_scroll > 0 {
        let mut state = ScrollbarState::new(max_scroll as usize).position(scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            area,
            &mut state,
        );
    }
}

fn render_banner(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.widget.banner.message().unwrap_or_default();
    let banner = Paragraph::new(format!(" {} ", message))
        .style(Style::default().bg(Color::Red).fg(Color::White).add_modifier(Modifier::BOLD));
    frame.render_widget(banner, area);
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SEND_WIDTH),
    ])
    .areas(area);

    // Store area for mouse hit-testing
    app.send_area = Some(send_area);

    let input = &app.widget.input;
    let busy = app.widget.is_busy();
    let border_color = if input.is_focused() && !busy { Color::Yellow } else { Color::DarkGray };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message (Shift+Enter for newline) ");

    // Visual rows at the wrap width; tabs shown as one space so columns match the cursor
    let width = input_area.width.saturating_sub(2) as usize;
    let rows: Vec<Line> = input
        .text()
        .replace('\t', " ")
        .split('\n')
        .flat_map(|line| wrap_line(&Line::from(line.to_string()), width))
        .collect();

    // Scroll so the cursor row stays visible
    let (cursor_row, cursor_col) = input.cursor_position();
    let offset = cursor_row.saturating_sub(input.height().saturating_sub(1));

    let paragraph = Paragraph::new(Text::from(rows))
        .style(Style::default().fg(Color::Cyan))
        .block(input_block)
        .scroll((offset, 0));
    frame.render_widget(paragraph, input_area);

    if input.is_focused() && !busy {
        frame.set_cursor_position((
            input_area.x + cursor_col + 1,
            input_area.y + cursor_row - offset + 1,
        ));
    }

    let send_style = if app.widget.submit_enabled() {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let send = Paragraph::new(Line::from(Span::styled("Send", send_style)))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).border_style(send_style));
    frame.render_widget(send, send_area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.widget.is_busy() {
        (" WAIT ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![
        Span::styled(mode_text, mode_style),
        Span::raw(" "),
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", label_style),
        Span::styled(" Shift+Enter ", key_style),
        Span::styled(" newline ", label_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Ctrl+S ", key_style),
        Span::styled(" export ", label_style),
        Span::styled(" Ctrl+C ", key_style),
        Span::styled(" quit ", label_style),
    ];

    if let Some(status) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use chatbox_core::{SendError, SendRequest};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &mut App) -> String {
        draw_sized(app, 80, 24)
    }

    fn draw_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_loading_label_drawn_while_busy() {
        let (mut app, _rx) = test_app();
        app.send(SendRequest::greeting("Hello!"));
        assert!(draw(&mut app).contains("Connecting"));

        app.on_send_resolved(Ok("ready".to_string()));
        let screen = draw(&mut app);
        assert!(!screen.contains("Connecting"));
        assert!(screen.contains("ready"));
    }

    #[tokio::test]
    async fn test_generating_label_for_user_send() {
        let (mut app, _rx) = test_app();
        app.widget.input.set_text("question");
        app.submit();
        let screen = draw(&mut app);
        assert!(screen.contains("question"));
        assert!(screen.contains("Generating response"));
    }

    #[tokio::test]
    async fn test_error_banner_drawn() {
        let (mut app, _rx) = test_app();
        app.send(SendRequest::with_text("x"));
        app.on_send_resolved(Err(SendError::Application("quota exceeded".to_string())));
        assert!(draw(&mut app).contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_layout_records_hit_areas() {
        let (mut app, _rx) = test_app();
        draw(&mut app);
        let send = app.send_area.unwrap();
        assert_eq!(send.width, SEND_WIDTH);
        assert_eq!(send.y + send.height, 23);
        assert!(app.transcript_area.unwrap().height > 10);
    }

    #[tokio::test]
    async fn test_input_grows_with_newlines() {
        let (mut app, _rx) = test_app();
        app.widget.input.set_text("a\nb\nc");
        draw(&mut app);
        assert_eq!(app.widget.input.height(), 3);
        assert_eq!(app.send_area.unwrap().height, 5);
    }

    #[tokio::test]
    async fn test_wide_reply_is_drawn_in_full() {
        let (mut app, _rx) = test_app();
        app.send(SendRequest::with_text("x"));
        let reply = format!("{}끝", "가".repeat(30));
        app.on_send_resolved(Ok(reply));

        let screen = draw_sized(&mut app, 40, 20);
        assert_eq!(screen.matches('가').count(), 30);
        assert!(screen.contains('끝'));
    }

    #[tokio::test]
    async fn test_wide_input_wraps_by_columns() {
        let (mut app, _rx) = test_app();
        // 28 columns of input beside the Send button
        app.widget.input.set_text(&"가".repeat(15));
        let screen = draw_sized(&mut app, 28 + SEND_WIDTH + 2, 20);

        assert_eq!(app.widget.input.height(), 2);
        assert_eq!(app.widget.input.cursor_position(), (1, 2));
        assert_eq!(screen.matches('가').count(), 15);
    }

    #[tokio::test]
    async fn test_input_filling_the_row_stays_visible() {
        let (mut app, _rx) = test_app();
        let text = "a".repeat(28);
        app.widget.input.set_text(&text);
        let screen = draw_sized(&mut app, 28 + SEND_WIDTH + 2, 20);

        assert_eq!(app.widget.input.height(), 2);
        assert!(screen.contains(&text));
    }
}
