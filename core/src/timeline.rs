//! Video timeline clock
//!
//! The timeline is owned by the host (the video player). The pool only reads
//! a [`TimelineClock`] snapshot during a tick to compute progress and decide
//! which danmaku show their progress strip.
//!
//! # Units
//!
//! Both duration and position are in milliseconds.

use std::sync::{Arc, PoisonError, RwLock};

/// Default duration when the host has not reported one yet (one minute)
pub const DEFAULT_DURATION_MS: u64 = 60_000;

/// Duration/position pair with `1 <= duration` and `position <= duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineClock {
    duration_ms: u64,
    position_ms: u64,
}

impl TimelineClock {
    pub fn new(duration_ms: u64) -> Self {
        let mut clock = Self::default();
        clock.set_duration(duration_ms);
        clock
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Set the total duration, clamped to at least 1 ms
    pub fn set_duration(&mut self, duration_ms: u64) {
        if duration_ms == 0 {
            tracing::debug!("timeline duration 0 clamped to 1 ms");
        }
        self.duration_ms = duration_ms.max(1);
        // Keep position inside the (possibly shorter) timeline
        self.position_ms = self.position_ms.min(self.duration_ms);
    }

    /// Set the playback position, clamped to `0..=duration`
    ///
    /// Takes a signed value so hosts can pass raw player positions (which
    /// may be negative while seeking) without converting first.
    pub fn set_position(&mut self, position_ms: i64) {
        let clamped = position_ms.clamp(0, self.duration_ms.min(i64::MAX as u64) as i64);
        if clamped != position_ms {
            tracing::debug!(position_ms, clamped, "timeline position clamped");
        }
        self.position_ms = clamped as u64;
    }

    /// Move the position forward, saturating at the end of the timeline
    pub fn advance_by(&mut self, delta_ms: u64) {
        self.position_ms = self.position_ms.saturating_add(delta_ms).min(self.duration_ms);
    }

    /// Fraction of the timeline played, in `0.0..=1.0`
    pub fn progress(&self) -> f32 {
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0) as f32
    }

    /// True once playback reached `time_ms` (inclusive)
    pub fn has_reached(&self, time_ms: u64) -> bool {
        self.position_ms >= time_ms
    }
}

impl Default for TimelineClock {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_DURATION_MS,
            position_ms: 0,
        }
    }
}

/// Thread-safe handle to a timeline shared between the host and the
/// render thread. Cloning shares the same clock.
#[derive(Debug, Clone, Default)]
pub struct SharedTimeline {
    inner: Arc<RwLock<TimelineClock>>,
}

impl SharedTimeline {
    pub fn new(clock: TimelineClock) -> Self {
        Self {
            inner: Arc::new(RwLock::new(clock)),
        }
    }

    /// Copy of the current clock
    pub fn snapshot(&self) -> TimelineClock {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.update(|clock| clock.set_duration(duration_ms));
    }

    pub fn set_position(&self, position_ms: i64) {
        self.update(|clock| clock.set_position(position_ms));
    }

    pub fn advance_by(&self, delta_ms: u64) {
        self.update(|clock| clock.advance_by(delta_ms));
    }

    fn update(&self, f: impl FnOnce(&mut TimelineClock)) {
        let mut clock = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut clock);
    }
}
