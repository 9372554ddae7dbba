//! Core traits and types for the avatar chat client
//!
//! This crate provides the foundational types used across all other crates:
//! - Conversation transcript types (roles, messages, multimodal content)
//! - The `AvatarSynthesizer` trait (observable contract of the avatar handle)
//! - The `PlaybackProbe` trait (playback-position sampling for liveness checks)
//! - Error types

pub mod conversation;
pub mod error;
pub mod traits;

pub use conversation::{ContentPart, Message, MessageContent, Role, Transcript};
pub use error::{Error, Result};
pub use traits::{AvatarSynthesizer, PlaybackProbe, SpeakOutcome};
