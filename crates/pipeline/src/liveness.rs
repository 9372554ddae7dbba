//! Shared session liveness state
//!
//! Tracks the last time speech output was produced, whether an utterance is
//! currently in flight, and whether the session is still considered active.
//! The speech-output queue updates it; the liveness monitor reads it.

use std::time::{Duration, Instant};

use parking_lot::RwLock;

#[derive(Debug)]
pub struct LivenessState {
    last_activity: RwLock<Instant>,
    speaking: RwLock<bool>,
    active: RwLock<bool>,
}

impl Default for LivenessState {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessState {
    pub fn new() -> Self {
        Self {
            last_activity: RwLock::new(Instant::now()),
            speaking: RwLock::new(false),
            active: RwLock::new(false),
        }
    }

    /// Record speech activity now
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Time since the last recorded speech activity
    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    pub fn set_speaking(&self, speaking: bool) {
        *self.speaking.write() = speaking;
    }

    pub fn is_speaking(&self) -> bool {
        *self.speaking.read()
    }

    /// Mark the session active and reset the idle clock
    pub fn activate(&self) {
        *self.active.write() = true;
        self.touch();
    }

    /// Mark the session inactive; returns true only on the transition
    ///
    /// The monitor uses the return value to emit each teardown or reconnect
    /// event exactly once even when two checks race.
    pub fn deactivate(&self) -> bool {
        let mut active = self.active.write();
        std::mem::replace(&mut *active, false)
    }

    pub fn is_active(&self) -> bool {
        *self.active.read()
    }
}
