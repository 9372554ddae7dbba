//! Streaming-to-speech pipeline
//!
//! The soul of the client: a streamed chat reply is split into speakable
//! sentences as fragments arrive, a serializer keeps at most one synthesis
//! call in flight while preserving FIFO order, and a liveness monitor
//! watches for a hung transport or an abandoned session.

pub mod liveness;
pub mod monitor;
pub mod queue;
pub mod splitter;

pub use liveness::LivenessState;
pub use monitor::{LivenessMonitor, MonitorConfig, SessionEvent};
pub use queue::SpeakQueue;
pub use splitter::SentenceSplitter;
