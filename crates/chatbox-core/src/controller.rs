//! Send lifecycle: the busy/idle guard around one chat round trip
//!
//! A send is split in two so a front end can keep drawing while the request
//! is outstanding. [`ChatWidget::begin_send`] applies every view change that
//! precedes the network call and hands back a [`Dispatch`] describing the
//! one POST to issue. Whatever happens to that request, its outcome is fed
//! to [`ChatWidget::resolve`], which removes the loading indicator, shows the
//! reply or the error and returns the widget to idle.

use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::banner::ErrorBanner;
use crate::client::{ChatBackend, SendError};
use crate::input::InputField;
use crate::state::{ChatRole, Lifecycle};
use crate::transcript::{IndicatorId, LoadingKind, Transcript};

#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Explicit text; `None` (or empty) pulls the trimmed input field
    pub text: Option<String>,
    pub show_user_message: bool,
    /// The start-up exchange, shown as "connecting" rather than "generating"
    pub initial: bool,
}

impl SendRequest {
    pub fn from_input() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Opening exchange: no user bubble, "connecting" indicator
    pub fn greeting(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            show_user_message: false,
            initial: true,
        }
    }
}

impl Default for SendRequest {
    fn default() -> Self {
        Self {
            text: None,
            show_user_message: true,
            initial: false,
        }
    }
}

/// The single POST a caller must issue after `begin_send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub message: String,
}

/// Chat widget state and the controller driving it
#[derive(Debug)]
pub struct ChatWidget {
    pub transcript: Transcript,
    pub input: InputField,
    pub banner: ErrorBanner,
    lifecycle: Lifecycle,
    submit_enabled: bool,
    pending: Option<IndicatorId>,
}

impl ChatWidget {
    pub fn new(input_max_rows: u16, error_display: Duration) -> Self {
        Self {
            transcript: Transcript::new(),
            input: InputField::new(input_max_rows),
            banner: ErrorBanner::new(error_display),
            lifecycle: Lifecycle::Idle,
            submit_enabled: true,
            pending: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_busy(&self) -> bool {
        self.lifecycle.is_busy()
    }

    pub fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    /// Start a send; returns `None` when the request is dropped
    ///
    /// Requests are dropped while another send is in flight and when the
    /// resolved text is empty. Neither case changes any state.
    pub fn begin_send(&mut self, request: SendRequest) -> Option<Dispatch> {
        if self.lifecycle.is_busy() {
            debug!("send dropped: a request is already in flight");
            return None;
        }

        let explicit = request.text.filter(|t| !t.is_empty());
        let from_input = explicit.is_none();
        let text = match explicit {
            Some(text) => text,
            None => self.input.trimmed().to_string(),
        };
        if text.is_empty() {
            return None;
        }

        self.lifecycle = Lifecycle::Sending;
        self.submit_enabled = false;
        self.banner.hide();

        if request.show_user_message {
            self.transcript.append(ChatRole::User, &text);
        }

        if from_input {
            self.input.clear();
        }

        let kind = if request.initial {
            LoadingKind::Connecting
        } else {
            LoadingKind::Generating
        };
        self.pending = Some(self.transcript.show_indicator(kind));

        debug!(chars = text.chars().count(), initial = request.initial, "dispatching chat message");
        Some(Dispatch { message: text })
    }

    /// Apply the outcome of the outstanding send and return to idle
    ///
    /// Ignored when no send is outstanding.
    pub fn resolve(&mut self, outcome: Result<String, SendError>, now: Instant) {
        if !self.lifecycle.is_busy() {
            debug!("resolution ignored: no request in flight");
            return;
        }

        match outcome {
            Ok(reply) => {
                if let Some(id) = self.pending.take() {
                    self.transcript.remove_indicator(id);
                }
                self.transcript.append(ChatRole::Assistant, &reply);
            }
            Err(err) => {
                error!(kind = err.kind(), error = %err, "chat request failed");
                self.pending = None;
                self.transcript.clear_indicators();
                self.banner.show(err.to_string(), now);
            }
        }

        self.lifecycle = Lifecycle::Idle;
        self.submit_enabled = true;
        self.input.focus();
    }

    /// Run a whole send against `backend`, returning whether a request was issued
    pub async fn send(&mut self, backend: &dyn ChatBackend, request: SendRequest) -> bool {
        let Some(dispatch) = self.begin_send(request) else {
            return false;
        };
        let outcome = backend.send(&dispatch.message).await;
        self.resolve(outcome, Instant::now());
        true
    }

    /// Advance time-based state (banner expiry)
    pub fn tick(&mut self, now: Instant) {
        self.banner.tick(now);
    }
}

impl Default for ChatWidget {
    fn default() -> Self {
        Self::new(crate::input::DEFAULT_MAX_ROWS, crate::banner::DEFAULT_DISPLAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend answering from a fixed script and recording what it was sent
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<String, SendError>>>,
        calls: AtomicUsize,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(mut replies: Vec<Result<String, SendError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn send(&self, message: &str) -> Result<String, SendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().unwrap().push(message.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(SendError::Decode("script exhausted".into())))
        }
    }

    fn typed(widget: &mut ChatWidget, text: &str) {
        widget.input.set_wrap_width(40);
        widget.input.set_text(text);
    }

    #[test]
    fn test_send_while_busy_is_dropped() {
        let mut widget = ChatWidget::default();
        assert!(widget.begin_send(SendRequest::with_text("one")).is_some());
        let before = widget.transcript.len();

        assert!(widget.begin_send(SendRequest::with_text("two")).is_none());
        assert_eq!(widget.transcript.len(), before);
        assert_eq!(widget.transcript.indicators().len(), 1);
        assert!(widget.is_busy());
    }

    #[tokio::test]
    async fn test_busy_never_issues_second_call() {
        let backend = ScriptedBackend::new(vec![Ok("first".into())]);
        let mut widget = ChatWidget::default();
        let dispatch = widget.begin_send(SendRequest::with_text("one")).unwrap();

        assert!(!widget.send(&backend, SendRequest::with_text("two")).await);
        assert_eq!(backend.calls(), 0);

        let outcome = backend.send(&dispatch.message).await;
        widget.resolve(outcome, Instant::now());
        assert_eq!(backend.calls(), 1);
        assert_eq!(widget.transcript.count_role(ChatRole::Assistant), 1);
    }

    #[test]
    fn test_empty_text_is_noop() {
        let mut widget = ChatWidget::default();
        typed(&mut widget, "   \n ");
        assert!(widget.begin_send(SendRequest::from_input()).is_none());
        assert_eq!(widget.lifecycle(), Lifecycle::Idle);
        assert!(widget.submit_enabled());
        assert!(widget.transcript.indicators().is_empty());
        assert_eq!(widget.input.text(), "   \n ");
    }

    #[test]
    fn test_user_message_appended_only_when_requested() {
        let mut shown = ChatWidget::default();
        shown.begin_send(SendRequest::with_text("hi"));
        assert_eq!(shown.transcript.count_role(ChatRole::User), 1);

        let mut hidden = ChatWidget::default();
        hidden.begin_send(SendRequest {
            show_user_message: false,
            ..SendRequest::with_text("hi")
        });
        assert_eq!(hidden.transcript.count_role(ChatRole::User), 0);
    }

    #[test]
    fn test_user_bubble_and_indicator_precede_dispatch() {
        let mut widget = ChatWidget::default();
        typed(&mut widget, "  hello  ");
        let dispatch = widget
            .begin_send(SendRequest::from_input())
            .unwrap();

        assert_eq!(dispatch.message, "hello");
        assert_eq!(widget.transcript.messages()[0].content, "hello");
        assert_eq!(widget.transcript.indicators()[0].kind, LoadingKind::Generating);
        assert!(widget.input.is_empty());
        assert_eq!(widget.input.height(), 1);
        assert!(!widget.submit_enabled());
    }

    #[test]
    fn test_explicit_text_leaves_input_alone() {
        let mut widget = ChatWidget::default();
        typed(&mut widget, "draft");
        let dispatch = widget
            .begin_send(SendRequest::with_text("  spaced  "))
            .unwrap();
        assert_eq!(dispatch.message, "  spaced  ");
        assert_eq!(widget.input.text(), "draft");
    }

    #[test]
    fn test_begin_send_hides_previous_error() {
        let now = Instant::now();
        let mut widget = ChatWidget::default();
        widget.banner.show("old", now);
        widget.begin_send(SendRequest::with_text("hi"));
        assert!(!widget.banner.is_visible());
    }

    #[tokio::test]
    async fn test_no_orphaned_indicators() {
        let backend = ScriptedBackend::new(vec![
            Ok("fine".into()),
            Err(SendError::Status(StatusCode::BAD_GATEWAY)),
        ]);
        let mut widget = ChatWidget::default();

        widget.send(&backend, SendRequest::with_text("a")).await;
        assert!(widget.transcript.indicators().is_empty());

        widget.send(&backend, SendRequest::with_text("b")).await;
        assert!(widget.transcript.indicators().is_empty());
    }

    #[tokio::test]
    async fn test_success_renders_markdown_safely() {
        let backend = ScriptedBackend::new(vec![Ok("**hi** <script>alert(1)</script>".into())]);
        let mut widget = ChatWidget::default();
        widget.send(&backend, SendRequest::with_text("hello")).await;

        let reply = widget.transcript.messages().last().unwrap();
        assert_eq!(reply.role, ChatRole::Assistant);
        assert!(reply.html.contains("<strong>hi</strong>"));
        assert!(!reply.html.contains("**"));
        assert!(!reply.html.contains("<script"));
    }

    #[tokio::test]
    async fn test_status_failure_shows_generic_message() {
        let backend = ScriptedBackend::new(vec![Err(SendError::Status(
            StatusCode::INTERNAL_SERVER_ERROR,
        ))]);
        let mut widget = ChatWidget::default();
        widget.send(&backend, SendRequest::with_text("hello")).await;

        assert_eq!(widget.transcript.count_role(ChatRole::Assistant), 0);
        assert_eq!(widget.banner.message(), Some("A server error occurred."));
    }

    #[tokio::test]
    async fn test_application_error_shows_its_text() {
        let backend = ScriptedBackend::new(vec![Err(SendError::Application("rate limited".into()))]);
        let mut widget = ChatWidget::default();
        widget.send(&backend, SendRequest::with_text("hello")).await;

        assert_eq!(widget.transcript.count_role(ChatRole::Assistant), 0);
        assert_eq!(widget.banner.message(), Some("rate limited"));
    }

    #[tokio::test]
    async fn test_returns_to_idle_after_any_outcome() {
        let backend = ScriptedBackend::new(vec![
            Ok("ok".into()),
            Err(SendError::Decode("bad".into())),
        ]);
        let mut widget = ChatWidget::default();

        for text in ["a", "b"] {
            widget.input.blur();
            widget.send(&backend, SendRequest::with_text(text)).await;
            assert_eq!(widget.lifecycle(), Lifecycle::Idle);
            assert!(widget.submit_enabled());
            assert!(widget.input.is_focused());
        }
    }

    #[test]
    fn test_error_banner_auto_dismisses() {
        let now = Instant::now();
        let mut widget = ChatWidget::default();
        widget.begin_send(SendRequest::with_text("hi"));
        widget.resolve(Err(SendError::Application("nope".into())), now);

        widget.tick(now + Duration::from_secs(2));
        assert!(widget.banner.is_visible());
        widget.tick(now + Duration::from_secs(3));
        assert!(!widget.banner.is_visible());
    }

    #[test]
    fn test_resolve_without_send_is_ignored() {
        let mut widget = ChatWidget::default();
        widget.resolve(Ok("stray".into()), Instant::now());
        assert!(widget.transcript.is_empty());
    }

    #[tokio::test]
    async fn test_greeting_on_start() {
        let backend = ScriptedBackend::new(vec![Ok("Hello! How can I help?".into())]);
        let mut widget = ChatWidget::default();

        let dispatch = widget
            .begin_send(SendRequest::greeting("Hello!"))
            .unwrap();
        assert_eq!(widget.transcript.indicators()[0].kind, LoadingKind::Connecting);

        let outcome = backend.send(&dispatch.message).await;
        widget.resolve(outcome, Instant::now());

        assert_eq!(widget.transcript.count_role(ChatRole::Assistant), 1);
        assert_eq!(widget.transcript.count_role(ChatRole::User), 0);
        assert_eq!(*backend.sent.lock().unwrap(), vec!["Hello!".to_string()]);
    }

    #[tokio::test]
    async fn test_user_then_assistant_order() {
        let backend = ScriptedBackend::new(vec![Ok("Hi *there*".into())]);
        let mut widget = ChatWidget::default();
        typed(&mut widget, "hello");

        widget.send(&backend, SendRequest::from_input()).await;

        let messages = widget.transcript.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, ChatRole::Assistant);
        assert!(messages[1].html.contains("<em>there</em>"));
    }
}
