pub mod banner;
pub mod client;
pub mod config;
pub mod controller;
pub mod highlight;
pub mod input;
pub mod render;
pub mod state;
pub mod transcript;

// Re-export main types for convenience
pub use banner::ErrorBanner;
pub use client::{ChatBackend, ChatClient, SendError};
pub use config::Config;
pub use controller::{ChatWidget, Dispatch, SendRequest};
pub use input::InputField;
pub use state::{ChatMessage, ChatRole, Lifecycle};
pub use transcript::{IndicatorId, LoadingIndicator, LoadingKind, Transcript};
