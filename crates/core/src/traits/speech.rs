//! Speech synthesis traits
//!
//! `AvatarSynthesizer` captures the observable contract of the avatar
//! synthesis handle: one utterance in, one completion out, plus a
//! cooperative stop. How the utterance is wrapped in voice markup and
//! delivered (and the real-time video transport behind the handle) is the
//! implementation's concern.

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// How a synthesis call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Audio was fully synthesized and delivered
    Completed,
    /// The call was cancelled by a stop request
    Cancelled,
}

/// Avatar synthesis handle
///
/// Implementations:
/// - `RestSynthesizer` - plain speech REST endpoint (audio only)
/// - test doubles recording calls and completing on demand
#[async_trait]
pub trait AvatarSynthesizer: Send + Sync + 'static {
    /// Synthesize one utterance
    ///
    /// `ending_silence_ms` appends a trailing silence directive to the
    /// generated markup (used after quick replies). Returns once the call
    /// completes or is cancelled; errors are reported to the caller and
    /// queue processing continues regardless.
    async fn speak(&self, text: &str, ending_silence_ms: u64) -> Result<SpeakOutcome>;

    /// Request cancellation of the in-flight synthesis call, if any
    ///
    /// Cooperative: an in-flight call may still complete a few milliseconds
    /// after the stop request was issued.
    async fn stop_speaking(&self) -> Result<()>;

    /// Release the handle
    fn close(&self);
}

/// Monotonic playback-position signal
///
/// Sampled by the liveness monitor to detect a hung transport: two samples
/// a fixed interval apart that compare equal while the session is active
/// mean playback has stalled.
pub trait PlaybackProbe: Send + Sync + 'static {
    /// Current playback position from session start
    fn position(&self) -> Duration;
}
