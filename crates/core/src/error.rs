//! Shared error type

use thiserror::Error;

/// Core errors shared across the workspace
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chat error: {0}")]
    Chat(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Session error: {0}")]
    Session(String),
}

/// Result alias using the core error type
pub type Result<T> = std::result::Result<T, Error>;
