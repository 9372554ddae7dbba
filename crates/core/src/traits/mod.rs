//! Trait seams for pluggable external services

pub mod speech;

pub use speech::{AvatarSynthesizer, PlaybackProbe, SpeakOutcome};
