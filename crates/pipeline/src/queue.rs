//! FIFO speech-output queue
//!
//! Sentences arrive faster than they can be spoken, so they are queued and
//! handed to the synthesizer one at a time. At most one utterance is in
//! flight; the rest wait in arrival order. A failed utterance is logged and
//! the queue moves on to the next one.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use avatar_chat_core::AvatarSynthesizer;

use crate::liveness::LivenessState;

struct Utterance {
    text: String,
    ending_silence_ms: u64,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Utterance>,
    speaking: bool,
}

pub struct SpeakQueue {
    synthesizer: Arc<dyn AvatarSynthesizer>,
    liveness: Arc<LivenessState>,
    state: Mutex<QueueState>,
}

impl SpeakQueue {
    pub fn new(synthesizer: Arc<dyn AvatarSynthesizer>, liveness: Arc<LivenessState>) -> Self {
        Self {
            synthesizer,
            liveness,
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Enqueue a sentence with no ending silence
    pub fn enqueue(self: &Arc<Self>, text: String) {
        self.enqueue_with_silence(text, 0);
    }

    /// Enqueue a sentence; speaks immediately when the queue is idle
    pub fn enqueue_with_silence(self: &Arc<Self>, text: String, ending_silence_ms: u64) {
        let utterance = Utterance {
            text,
            ending_silence_ms,
        };
        let first = {
            let mut state = self.state.lock();
            if state.speaking {
                state.pending.push_back(utterance);
                return;
            }
            state.speaking = true;
            utterance
        };
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            queue.run_worker(first).await;
        });
    }

    /// Speak utterances in order until the queue drains
    ///
    /// The speaking flag is toggled only here, so a cancel that races with
    /// completion cannot leave the queue stuck mid-flight.
    async fn run_worker(self: Arc<Self>, first: Utterance) {
        let mut current = first;
        loop {
            self.liveness.touch();
            self.liveness.set_speaking(true);
            debug!(chars = current.text.len(), "speaking utterance");
            match self
                .synthesizer
                .speak(&current.text, current.ending_silence_ms)
                .await
            {
                Ok(_) => self.liveness.touch(),
                Err(error) => warn!(%error, "utterance failed, continuing with queue"),
            }

            let next = {
                let mut state = self.state.lock();
                match state.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        // Both flags flip under the same lock so an enqueue
                        // racing this drain cannot observe the queue busy
                        // while liveness reports not-speaking.
                        state.speaking = false;
                        self.liveness.set_speaking(false);
                        break;
                    }
                }
            };
            current = next;
        }
    }

    /// Drop all pending utterances and interrupt the one in flight
    ///
    /// Safe to call when nothing is speaking.
    pub async fn cancel_all(&self) {
        self.state.lock().pending.clear();
        if let Err(error) = self.synthesizer.stop_speaking().await {
            warn!(%error, "failed to stop in-flight utterance");
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.state.lock().speaking
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use tokio::sync::Notify;

    use avatar_chat_core::{Result, SpeakOutcome};

    /// Synthesizer that records utterance order and tracks concurrency
    struct RecordingSynthesizer {
        spoken: SyncMutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        cancelled: AtomicBool,
        done: Notify,
    }

    impl RecordingSynthesizer {
        fn new() -> Self {
            Self {
                spoken: SyncMutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                cancelled: AtomicBool::new(false),
                done: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl AvatarSynthesizer for RecordingSynthesizer {
        async fn speak(&self, text: &str, _ending_silence_ms: u64) -> Result<SpeakOutcome> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.spoken.lock().push(text.to_string());
            self.done.notify_one();
            Ok(SpeakOutcome::Completed)
        }

        async fn stop_speaking(&self) -> Result<()> {
            self.cancelled.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_utterances_are_serialized_in_fifo_order() {
        let synthesizer = Arc::new(RecordingSynthesizer::new());
        let liveness = Arc::new(LivenessState::new());
        let queue = Arc::new(SpeakQueue::new(synthesizer.clone(), liveness.clone()));

        for i in 0..5 {
            queue.enqueue(format!("sentence {i}"));
        }

        for _ in 0..5 {
            synthesizer.done.notified().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(synthesizer.max_in_flight.load(Ordering::SeqCst), 1);
        let spoken = synthesizer.spoken.lock().clone();
        assert_eq!(
            spoken,
            (0..5).map(|i| format!("sentence {i}")).collect::<Vec<_>>()
        );
        assert!(!queue.is_speaking());
        assert!(!liveness.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_flag_tracks_queue_across_drain_and_reenqueue() {
        let synthesizer = Arc::new(RecordingSynthesizer::new());
        let liveness = Arc::new(LivenessState::new());
        let queue = Arc::new(SpeakQueue::new(synthesizer.clone(), liveness.clone()));

        queue.enqueue("one".to_string());
        synthesizer.done.notified().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!queue.is_speaking());
        assert!(!liveness.is_speaking());

        // Enqueue right after the drain; both flags must report speaking
        // together while the new worker runs.
        queue.enqueue("two".to_string());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(queue.is_speaking());
        assert!(liveness.is_speaking());

        synthesizer.done.notified().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!queue.is_speaking());
        assert!(!liveness.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_clears_pending_and_stops_synthesizer() {
        let synthesizer = Arc::new(RecordingSynthesizer::new());
        let liveness = Arc::new(LivenessState::new());
        let queue = Arc::new(SpeakQueue::new(synthesizer.clone(), liveness));

        for i in 0..4 {
            queue.enqueue(format!("sentence {i}"));
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        queue.cancel_all().await;
        assert_eq!(queue.pending_len(), 0);
        assert!(synthesizer.cancelled.load(Ordering::SeqCst));

        // Idempotent when nothing remains.
        queue.cancel_all().await;
        assert_eq!(queue.pending_len(), 0);

        // The in-flight worker still finishes and returns the queue to idle.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!queue.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_utterance_does_not_stall_queue() {
        struct FailFirst {
            calls: AtomicUsize,
            spoken: SyncMutex<Vec<String>>,
        }

        #[async_trait]
        impl AvatarSynthesizer for FailFirst {
            async fn speak(&self, text: &str, _ending_silence_ms: u64) -> Result<SpeakOutcome> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(avatar_chat_core::Error::Synthesis("boom".into()));
                }
                self.spoken.lock().push(text.to_string());
                Ok(SpeakOutcome::Completed)
            }

            async fn stop_speaking(&self) -> Result<()> {
                Ok(())
            }

            fn close(&self) {}
        }

        let synthesizer = Arc::new(FailFirst {
            calls: AtomicUsize::new(0),
            spoken: SyncMutex::new(Vec::new()),
        });
        let liveness = Arc::new(LivenessState::new());
        let queue = Arc::new(SpeakQueue::new(synthesizer.clone(), liveness));

        queue.enqueue("first".to_string());
        queue.enqueue("second".to_string());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(synthesizer.spoken.lock().clone(), vec!["second".to_string()]);
        assert!(!queue.is_speaking());
    }
}
