pub mod api;
pub mod app;
pub mod config;
pub mod conversation;
pub mod handler;
pub mod logging;
pub mod message;
pub mod tui;
pub mod ui;
pub mod upload;

// Re-export main types for convenience
pub use api::{ApiClient, ChatError, ChatResponse, DocumentBackend, UploadError};
pub use app::{App, Mode};
pub use config::Config;
pub use conversation::{ConversationControl, ConversationState};
pub use message::{ConversationLog, Message, Role};
pub use upload::{SelectedFile, SelectionError, UploadControl, UploadState};
