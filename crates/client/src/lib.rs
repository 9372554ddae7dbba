//! Interactive avatar chat client
//!
//! Owns the live session: connects the speech transport, keeps the
//! conversation transcript, runs user turns through the chat stream and the
//! speech pipeline, and reacts to liveness events.

pub mod session;
pub mod turn;

pub use session::AvatarSession;
