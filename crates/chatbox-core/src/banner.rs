use std::time::{Duration, Instant};

pub const DEFAULT_DISPLAY: Duration = Duration::from_secs(3);

/// Transient error banner that hides itself after a fixed interval
#[derive(Debug, Clone)]
pub struct ErrorBanner {
    message: Option<String>,
    raised_at: Option<Instant>,
    display_for: Duration,
}

impl ErrorBanner {
    pub fn new(display_for: Duration) -> Self {
        Self {
            message: None,
            raised_at: None,
            display_for,
        }
    }

    pub fn show(&mut self, message: impl Into<String>, now: Instant) {
        self.message = Some(message.into());
        self.raised_at = Some(now);
    }

    pub fn hide(&mut self) {
        self.message = None;
        self.raised_at = None;
    }

    /// Hide the banner once its display interval has elapsed
    pub fn tick(&mut self, now: Instant) {
        if let Some(raised_at) = self.raised_at {
            if now.saturating_duration_since(raised_at) >= self.display_for {
                self.hide();
            }
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.message.is_some()
    }
}

impl Default for ErrorBanner {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY)
    }
}
