use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use ratatui::layout::Rect;
use ratatui::text::Line;
use tokio::sync::mpsc::UnboundedSender;

use chatbox_core::{ChatBackend, ChatWidget, Config, Dispatch, SendError, SendRequest};

use crate::markdown::render_message;
use crate::tui::AppEvent;

pub const EXPORT_FILE: &str = "chatbox-transcript.html";

pub struct App {
    // Core state
    pub should_quit: bool,
    pub widget: ChatWidget,
    pub server_url: String,
    pub greeting: String,
    pub syntax_theme: String,
    pub export_path: PathBuf,

    // Transient footer notice (export results)
    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub transcript_area: Option<Rect>,
    pub send_area: Option<Rect>,

    // Rendered lines per transcript message; the transcript is append-only
    line_cache: Vec<Vec<Line<'static>>>,

    backend: Arc<dyn ChatBackend>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        config: &Config,
        server_url: String,
        backend: Arc<dyn ChatBackend>,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            widget: ChatWidget::new(config.input_max_rows(), config.error_display()),
            server_url,
            greeting: config.greeting().to_string(),
            syntax_theme: config.syntax_theme().to_string(),
            export_path: PathBuf::from(EXPORT_FILE),
            status: None,
            animation_frame: 0,
            transcript_area: None,
            send_area: None,
            line_cache: Vec::new(),
            backend,
            events,
        }
    }

    /// Opening exchange: the greeting goes out without a user bubble
    pub fn start(&mut self) {
        let greeting = self.greeting.clone();
        self.send(SendRequest::greeting(greeting));
    }

    /// Send whatever is in the input field
    pub fn submit(&mut self) {
        self.send(SendRequest::from_input());
    }

    pub fn send(&mut self, request: SendRequest) {
        if let Some(dispatch) = self.widget.begin_send(request) {
            self.dispatch(dispatch);
        }
    }

    /// Spawn the network call; its outcome comes back as `AppEvent::SendResolved`
    fn dispatch(&mut self, dispatch: Dispatch) {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = backend.send(&dispatch.message).await;
            let _ = events.send(AppEvent::SendResolved(outcome));
        });
    }

    pub fn on_send_resolved(&mut self, outcome: Result<String, SendError>) {
        self.widget.resolve(outcome, Instant::now());
    }

    /// Tick animation frame and expire the error banner (called by Tick event)
    pub fn tick(&mut self) {
        if self.widget.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.widget.tick(Instant::now());
    }

    /// Rendered lines for every message, rendering only what's new
    pub fn message_lines(&mut self) -> &[Vec<Line<'static>>] {
        let messages = self.widget.transcript.messages();
        for message in &messages[self.line_cache.len()..] {
            self.line_cache.push(render_message(message, &self.syntax_theme));
        }
        &self.line_cache
    }

    pub fn export_transcript(&mut self) -> Result<PathBuf> {
        let page = self.widget.transcript.to_html_document("chatbox transcript");
        std::fs::write(&self.export_path, page)?;
        tracing::info!(path = %self.export_path.display(), "transcript exported");
        Ok(self.export_path.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    /// Backend that echoes the message back as bold markdown
    pub(crate) struct EchoBackend;

    #[async_trait]
    impl ChatBackend for EchoBackend {
        async fn send(&self, message: &str) -> Result<String, SendError> {
            Ok(format!("**{}**", message))
        }
    }

    pub(crate) fn test_app() -> (App, UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            &Config::new(),
            "http://127.0.0.1:5000".to_string(),
            Arc::new(EchoBackend),
            tx,
        );
        (app, rx)
    }

    /// Wait for the spawned request and feed its outcome back in
    pub(crate) async fn settle(app: &mut App, rx: &mut UnboundedReceiver<AppEvent>) {
        while let Some(event) = rx.recv().await {
            if let AppEvent::SendResolved(outcome) = event {
                app.on_send_resolved(outcome);
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_start_sends_greeting_without_user_bubble() {
        let (mut app, mut rx) = test_app();
        app.start();
        assert!(app.widget.is_busy());
        assert!(app.widget.transcript.is_empty());

        settle(&mut app, &mut rx).await;
        let messages = app.widget.transcript.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "**Hello!**");
        assert!(!app.widget.is_busy());
    }

    #[tokio::test]
    async fn test_line_cache_grows_with_transcript() {
        let (mut app, mut rx) = test_app();
        app.widget.input.set_text("hi");
        app.submit();
        assert_eq!(app.message_lines().len(), 1);

        settle(&mut app, &mut rx).await;
        assert_eq!(app.message_lines().len(), 2);
    }

    #[tokio::test]
    async fn test_export_writes_html() {
        let dir = tempfile::tempdir().unwrap();
        let (mut app, mut rx) = test_app();
        app.export_path = dir.path().join("out.html");
        app.send(SendRequest::with_text("x"));
        settle(&mut app, &mut rx).await;

        let path = app.export_transcript().unwrap();
        let page = std::fs::read_to_string(path).unwrap();
        assert!(page.contains("<strong>x</strong>"));
    }

    #[test]
    fn test_tick_animates_only_while_busy() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(&Config::new(), String::new(), Arc::new(EchoBackend), tx);
        app.tick();
        assert_eq!(app.animation_frame, 0);
    }
}
