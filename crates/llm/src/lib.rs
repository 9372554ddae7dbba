//! Chat-completion integration
//!
//! Features:
//! - Streaming chat completions over the deployments endpoint
//! - Retrieval-augmented variant (`/extensions/chat/completions`)
//! - Incremental SSE record parsing that never splits a partial record
//! - Citation-marker stripping for retrieval-augmented replies

pub mod chat;
pub mod sse;

pub use chat::{ChatClient, ChatConfig, ChatDelta, ChatOutcome, DataSource};
pub use sse::RecordBuffer;

use thiserror::Error;

/// Chat client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for avatar_chat_core::Error {
    fn from(err: LlmError) -> Self {
        avatar_chat_core::Error::Chat(err.to_string())
    }
}
