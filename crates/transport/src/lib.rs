//! Speech service transport
//!
//! Talks to the Azure Speech service: fetches the short-lived relay token
//! that carries TURN credentials for the avatar's media channel, renders
//! utterances to SSML, and drives the synthesis endpoint.

pub mod relay;
pub mod ssml;
pub mod synthesizer;

use thiserror::Error;

pub use relay::{fetch_relay_token, IceServerConfig, RelayToken};
pub use ssml::{build_ssml, xml_escape};
pub use synthesizer::{RestSynthesizer, SynthesizerConfig};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("relay token request failed: {0}")]
    Relay(String),

    #[error("synthesis request failed: {0}")]
    Synthesis(String),

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

impl From<TransportError> for avatar_chat_core::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Relay(msg) => avatar_chat_core::Error::Transport(msg),
            TransportError::Synthesis(msg) => avatar_chat_core::Error::Synthesis(msg),
            TransportError::Network(msg) => avatar_chat_core::Error::Transport(msg),
        }
    }
}
