//! Avatar speech synthesizer backed by the speech service REST endpoint
//!
//! One utterance at a time is rendered to SSML and posted to the synthesis
//! endpoint. `stop_speaking` interrupts the in-flight request cooperatively;
//! the queue above treats an interrupted utterance the same as a completed
//! one and moves on.
//!
//! The synthesizer doubles as the playback probe for liveness monitoring:
//! its position clock runs while the transport is idle and, during a
//! request, advances with every received body chunk. Only a request that
//! stops yielding bytes reads as a stalled position; a long utterance
//! streaming normally does not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use avatar_chat_core::{AvatarSynthesizer, PlaybackProbe, Result, SpeakOutcome};

use crate::ssml::build_ssml;
use crate::TransportError;

#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    pub region: String,
    pub api_key: String,
    pub voice: String,
    /// Audio output format requested from the service
    pub output_format: String,
}

impl SynthesizerConfig {
    pub fn new(
        region: impl Into<String>,
        api_key: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            api_key: api_key.into(),
            voice: voice.into(),
            output_format: "audio-24khz-96kbitrate-mono-mp3".to_string(),
        }
    }
}

/// Position clock state
///
/// While `running`, the position advances in real time from `mark`. While
/// a request is in flight the clock is frozen and only `mark_progress`
/// (called per received body chunk) folds elapsed time in, so the position
/// tracks byte-level progress rather than mere request duration.
struct Progress {
    accumulated: Duration,
    mark: Instant,
    running: bool,
}

pub struct RestSynthesizer {
    config: SynthesizerConfig,
    client: reqwest::Client,
    cancel: Notify,
    closed: AtomicBool,
    progress: Mutex<Progress>,
}

impl RestSynthesizer {
    pub fn new(config: SynthesizerConfig) -> std::result::Result<Self, TransportError> {
        if config.api_key.is_empty() {
            return Err(TransportError::Synthesis("api key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            config,
            client,
            cancel: Notify::new(),
            closed: AtomicBool::new(false),
            progress: Mutex::new(Progress {
                accumulated: Duration::ZERO,
                mark: Instant::now(),
                running: true,
            }),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.config.region
        )
    }

    fn freeze_clock(&self) {
        let mut progress = self.progress.lock();
        if progress.running {
            let elapsed = progress.mark.elapsed();
            progress.accumulated += elapsed;
            progress.running = false;
        }
        progress.mark = Instant::now();
    }

    /// Fold elapsed time into the position; called per received body chunk
    fn mark_progress(&self) {
        let mut progress = self.progress.lock();
        let now = Instant::now();
        let delta = now - progress.mark;
        progress.accumulated += delta;
        progress.mark = now;
    }

    fn resume_clock(&self) {
        let mut progress = self.progress.lock();
        if !progress.running {
            progress.running = true;
            progress.mark = Instant::now();
        }
    }

    async fn synthesize(&self, ssml: String) -> std::result::Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.config.output_format)
            .body(ssml)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Synthesis(format!(
                "speech service returned {}",
                response.status()
            )));
        }

        // Drain the audio body chunk by chunk; each chunk is playback
        // progress as far as the liveness probe is concerned.
        let mut stream = response.bytes_stream();
        let mut bytes = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            bytes += chunk.len();
            self.mark_progress();
        }
        debug!(bytes, "synthesis complete");
        Ok(())
    }
}

#[async_trait]
impl AvatarSynthesizer for RestSynthesizer {
    async fn speak(&self, text: &str, ending_silence_ms: u64) -> Result<SpeakOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(avatar_chat_core::Error::Synthesis(
                "synthesizer is closed".into(),
            ));
        }
        let ssml = build_ssml(text, &self.config.voice, ending_silence_ms);
        debug!(chars = text.len(), voice = %self.config.voice, "speaking");

        self.freeze_clock();
        let outcome = tokio::select! {
            result = self.synthesize(ssml) => {
                result.map_err(avatar_chat_core::Error::from).map(|_| SpeakOutcome::Completed)
            }
            _ = self.cancel.notified() => {
                debug!("utterance cancelled");
                Ok(SpeakOutcome::Cancelled)
            }
        };
        self.resume_clock();
        outcome
    }

    async fn stop_speaking(&self) -> Result<()> {
        self.cancel.notify_waiters();
        Ok(())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("synthesizer closed");
            self.cancel.notify_waiters();
        }
    }
}

impl PlaybackProbe for RestSynthesizer {
    fn position(&self) -> Duration {
        let progress = self.progress.lock();
        if progress.running {
            progress.accumulated + progress.mark.elapsed()
        } else {
            progress.accumulated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_region() {
        let synth =
            RestSynthesizer::new(SynthesizerConfig::new("westus2", "key", "en-US-JennyNeural"))
                .unwrap();
        assert_eq!(
            synth.endpoint(),
            "https://westus2.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = RestSynthesizer::new(SynthesizerConfig::new("westus2", "", "voice"));
        assert!(result.is_err());
    }

    #[test]
    fn test_position_freezes_while_request_in_flight() {
        let synth =
            RestSynthesizer::new(SynthesizerConfig::new("westus2", "key", "voice")).unwrap();
        synth.freeze_clock();
        let frozen = synth.position();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(synth.position(), frozen);

        synth.resume_clock();
        std::thread::sleep(Duration::from_millis(20));
        assert!(synth.position() > frozen);
    }

    #[test]
    fn test_body_chunks_advance_position_during_request() {
        // A long but healthy request must not read as a stalled position:
        // every received chunk moves the clock forward even while frozen.
        let synth =
            RestSynthesizer::new(SynthesizerConfig::new("westus2", "key", "voice")).unwrap();
        synth.freeze_clock();
        let before = synth.position();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(synth.position(), before);
        synth.mark_progress();
        let after_chunk = synth.position();
        assert!(after_chunk > before);

        // Between chunks the clock stays frozen again.
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(synth.position(), after_chunk);

        synth.resume_clock();
    }

    #[tokio::test]
    async fn test_closed_synthesizer_refuses_to_speak() {
        let synth =
            RestSynthesizer::new(SynthesizerConfig::new("westus2", "key", "voice")).unwrap();
        synth.close();
        assert!(synth.speak("hello", 0).await.is_err());
    }
}
