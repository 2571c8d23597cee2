use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::App;
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_STEP: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick(),
        AppEvent::SendResolved(outcome) => app.on_send_resolved(outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
            app.should_quit = true;
            return Ok(());
        }
        KeyCode::Char('s') if ctrl => {
            app.status = Some(match app.export_transcript() {
                Ok(path) => format!("Saved {}", path.display()),
                Err(e) => {
                    tracing::warn!(error = %e, "transcript export failed");
                    format!("Export failed: {}", e)
                }
            });
            return Ok(());
        }
        _ => {}
    }

    let input = &mut app.widget.input;
    match key.code {
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            input.insert_newline();
        }
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => {
            if input.is_empty() {
                app.widget.transcript.scroll_to_bottom();
            } else {
                input.move_end();
            }
        }
        KeyCode::PageUp => {
            let step = page_step(app);
            app.widget.transcript.scroll_up(step);
        }
        KeyCode::PageDown => {
            let step = page_step(app);
            app.widget.transcript.scroll_down(step);
        }
        KeyCode::Tab => input.insert_char('\t'),
        KeyCode::Char(c) if !ctrl => {
            input.insert_char(c);
            app.status = None;
        }
        _ => {}
    }
    Ok(())
}

fn handle_paste(app: &mut App, text: &str) {
    let input = &mut app.widget.input;
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' => input.insert_newline(),
            c => input.insert_char(c),
        }
    }
}

/// Page size: the visible transcript height less one line of overlap
fn page_step(app: &App) -> u16 {
    app.transcript_area
        .map(|r| r.height.saturating_sub(3).max(1))
        .unwrap_or(10)
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_transcript = app.transcript_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let on_send = app.send_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown if in_transcript => {
            app.widget.transcript.scroll_down(WHEEL_STEP);
        }
        MouseEventKind::ScrollUp if in_transcript => {
            app.widget.transcript.scroll_up(WHEEL_STEP);
        }
        MouseEventKind::Down(MouseButton::Left) if on_send => {
            if app.widget.submit_enabled() {
                app.submit();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{settle, test_app};
    use chatbox_core::{ChatRole, SendError};
    use crossterm::event::KeyEventState;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c), KeyModifiers::NONE)).unwrap();
        }
    }

    fn click(column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[tokio::test]
    async fn test_enter_submits_input() {
        let (mut app, mut rx) = test_app();
        type_text(&mut app, "  hi  ");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE)).unwrap();

        assert!(app.widget.is_busy());
        assert!(app.widget.input.is_empty());
        assert_eq!(app.widget.transcript.messages()[0].content, "hi");

        settle(&mut app, &mut rx).await;
        assert_eq!(app.widget.transcript.count_role(ChatRole::Assistant), 1);
    }

    #[tokio::test]
    async fn test_shift_enter_inserts_newline() {
        let (mut app, _rx) = test_app();
        type_text(&mut app, "a");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::SHIFT)).unwrap();
        type_text(&mut app, "b");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::ALT)).unwrap();

        assert_eq!(app.widget.input.text(), "a\nb\n");
        assert!(!app.widget.is_busy());
        assert!(app.widget.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_click_on_send_submits() {
        let (mut app, mut rx) = test_app();
        app.send_area = Some(Rect::new(70, 20, 8, 3));
        type_text(&mut app, "clicked");

        handle_event(&mut app, click(10, 21)).unwrap();
        assert!(!app.widget.is_busy());

        handle_event(&mut app, click(72, 21)).unwrap();
        assert!(app.widget.is_busy());
        settle(&mut app, &mut rx).await;
        assert_eq!(app.widget.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_send_resolved_appends_reply() {
        let (mut app, _rx) = test_app();
        app.widget.input.set_text("q");
        app.submit();

        handle_event(&mut app, AppEvent::SendResolved(Ok("answer".to_string()))).unwrap();
        assert!(!app.widget.is_busy());
        assert!(app.widget.transcript.indicators().is_empty());
        assert_eq!(app.widget.transcript.messages()[1].content, "answer");
    }

    #[tokio::test]
    async fn test_failed_send_shows_banner() {
        let (mut app, _rx) = test_app();
        app.widget.input.set_text("q");
        app.submit();

        let outcome = Err(SendError::Application("model offline".to_string()));
        handle_event(&mut app, AppEvent::SendResolved(outcome)).unwrap();
        assert_eq!(app.widget.banner.message(), Some("model offline"));
        assert!(app.widget.submit_enabled());
    }

    #[tokio::test]
    async fn test_paste_keeps_newlines() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, AppEvent::Paste("one\r\ntwo".to_string())).unwrap();
        assert_eq!(app.widget.input.text(), "one\ntwo");
    }

    #[tokio::test]
    async fn test_ctrl_q_quits() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, key(KeyCode::Char('q'), KeyModifiers::CONTROL)).unwrap();
        assert!(app.should_quit);
        assert!(app.widget.input.is_empty());
    }

    #[tokio::test]
    async fn test_wheel_scrolls_only_over_transcript() {
        let (mut app, _rx) = test_app();
        app.transcript_area = Some(Rect::new(0, 1, 80, 20));
        app.widget.transcript.scroll_down(10);

        let wheel = |row| {
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::ScrollUp,
                column: 5,
                row,
                modifiers: KeyModifiers::NONE,
            })
        };
        handle_event(&mut app, wheel(30)).unwrap();
        assert_eq!(app.widget.transcript.scroll(), 10);

        handle_event(&mut app, wheel(5)).unwrap();
        assert_eq!(app.widget.transcript.scroll(), 7);
        assert!(!app.widget.transcript.follows_tail());
    }

    #[tokio::test]
    async fn test_resize_leaves_state_alone() {
        let (mut app, _rx) = test_app();
        app.widget.input.set_text("draft");
        handle_event(&mut app, AppEvent::Resize).unwrap();
        assert_eq!(app.widget.input.text(), "draft");
        assert!(!app.should_quit);
        assert!(!app.widget.is_busy());
    }
}
