//! Session liveness monitor
//!
//! A background task that periodically runs two independent checks against a
//! live session:
//!
//! - hang detection: while the session is active, sample the playback
//!   position, wait a short window, and sample again. An unchanged position
//!   on an active session means the media stream has stalled, so the session
//!   is deactivated and a reconnect is requested.
//! - idle detection: when nothing has been spoken for longer than the idle
//!   timeout, the session is deactivated and torn down without a reconnect.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use avatar_chat_core::PlaybackProbe;

use crate::liveness::LivenessState;

/// Action requested by the monitor, handled by the session owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Playback stalled; tear the session down and establish a new one
    Reconnect,
    /// Session idle past the timeout; tear it down and stay down
    Teardown,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub hang_window: Duration,
    pub idle_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            hang_window: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(15),
        }
    }
}

pub struct LivenessMonitor {
    config: MonitorConfig,
    liveness: Arc<LivenessState>,
    probe: Arc<dyn PlaybackProbe>,
    events: mpsc::Sender<SessionEvent>,
}

impl LivenessMonitor {
    pub fn new(
        config: MonitorConfig,
        liveness: Arc<LivenessState>,
        probe: Arc<dyn PlaybackProbe>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            config,
            liveness,
            probe,
            events,
        }
    }

    /// Start the background poll loop; dropping or signalling the returned
    /// sender stops it
    pub fn spawn(self) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.check_hung().await;
                        self.check_idle().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            debug!("liveness monitor stopping");
                            break;
                        }
                    }
                }
            }
        });
        shutdown_tx
    }

    async fn check_hung(&self) {
        if !self.liveness.is_active() {
            return;
        }
        let before = self.probe.position();
        tokio::time::sleep(self.config.hang_window).await;
        if !self.liveness.is_active() {
            return;
        }
        if self.probe.position() == before && self.liveness.deactivate() {
            warn!(position_secs = before.as_secs_f64(), "playback stalled, requesting reconnect");
            if self.events.send(SessionEvent::Reconnect).await.is_err() {
                debug!("event receiver dropped");
            }
        }
    }

    async fn check_idle(&self) {
        if !self.liveness.is_active() {
            return;
        }
        let idle = self.liveness.idle_for();
        if idle > self.config.idle_timeout && self.liveness.deactivate() {
            info!(idle_secs = idle.as_secs(), "session idle past timeout, tearing down");
            if self.events.send(SessionEvent::Teardown).await.is_err() {
                debug!("event receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU64, Ordering};

    /// Probe whose position is driven manually from the test
    struct ManualProbe {
        millis: AtomicU64,
    }

    impl ManualProbe {
        fn new() -> Self {
            Self {
                millis: AtomicU64::new(0),
            }
        }

        fn advance(&self, by: Duration) {
            self.millis
                .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }
    }

    impl PlaybackProbe for ManualProbe {
        fn position(&self) -> Duration {
            Duration::from_millis(self.millis.load(Ordering::SeqCst))
        }
    }

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(100),
            hang_window: Duration::from_millis(100),
            idle_timeout: Duration::from_millis(500),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_playback_triggers_single_reconnect() {
        let liveness = Arc::new(LivenessState::new());
        let probe = Arc::new(ManualProbe::new());
        let (tx, mut rx) = mpsc::channel(4);
        liveness.activate();

        let shutdown = LivenessMonitor::new(test_config(), liveness.clone(), probe, tx).spawn();

        let event = rx.recv().await;
        assert_eq!(event, Some(SessionEvent::Reconnect));
        assert!(!liveness.is_active());

        // Session now inactive, no further events fire.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        let _ = shutdown.send(true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_advancing_playback_is_not_a_hang() {
        let liveness = Arc::new(LivenessState::new());
        let probe = Arc::new(ManualProbe::new());
        let (tx, mut rx) = mpsc::channel(4);
        liveness.activate();

        let config = MonitorConfig {
            idle_timeout: Duration::from_secs(3600),
            ..test_config()
        };
        let shutdown =
            LivenessMonitor::new(config, liveness.clone(), probe.clone(), tx).spawn();

        // Keep playback moving and activity fresh across several poll rounds.
        for _ in 0..10 {
            probe.advance(Duration::from_millis(50));
            liveness.touch();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert!(rx.try_recv().is_err());
        assert!(liveness.is_active());
        let _ = shutdown.send(true);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_torn_down_once() {
        let liveness = Arc::new(LivenessState::new());
        let probe = Arc::new(ManualProbe::new());
        let (tx, mut rx) = mpsc::channel(4);
        liveness.activate();

        // Keep playback advancing so only the idle check can fire.
        let config = MonitorConfig {
            hang_window: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
            idle_timeout: Duration::from_millis(300),
        };
        let probe_clone = probe.clone();
        tokio::spawn(async move {
            loop {
                probe_clone.advance(Duration::from_millis(50));
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        });

        let shutdown = LivenessMonitor::new(config, liveness.clone(), probe, tx).spawn();

        let event = rx.recv().await;
        assert_eq!(event, Some(SessionEvent::Teardown));
        assert!(!liveness.is_active());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
        let _ = shutdown.send(true);
    }
}
