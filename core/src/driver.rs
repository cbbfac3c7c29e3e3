//! Per-frame driver
//!
//! The host's rendering surface calls [`FrameDriver::on_frame`] once per
//! frame from the render thread. The driver turns the callback timestamp
//! into a frame delta, reads the shared timeline, ticks the pool and draws
//! the survivors through the pool's backend.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::GraphicsBackend;
use crate::danmaku::{DanmakuPool, TickReport};
use crate::timeline::SharedTimeline;

/// Result of one driven frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// Frames driven so far, including this one
    pub frame: u64,
    pub delta_secs: f32,
    pub report: TickReport,
}

/// Couples the timeline clock to a pool on the render thread
pub struct FrameDriver<B: GraphicsBackend> {
    pool: Arc<DanmakuPool<B>>,
    timeline: SharedTimeline,
    last_frame: Option<Instant>,
    frames: u64,
}

impl<B: GraphicsBackend> FrameDriver<B> {
    pub fn new(pool: Arc<DanmakuPool<B>>, timeline: SharedTimeline) -> Self {
        Self {
            pool,
            timeline,
            last_frame: None,
            frames: 0,
        }
    }

    pub fn pool(&self) -> &Arc<DanmakuPool<B>> {
        &self.pool
    }

    pub fn timeline(&self) -> &SharedTimeline {
        &self.timeline
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Forget the previous timestamp so the next frame has delta 0
    /// (surface paused and resumed).
    pub fn reset(&mut self) {
        self.last_frame = None;
    }

    /// Surface callback with the frame timestamp
    ///
    /// The very first frame (or the first after [`reset`](Self::reset)) uses
    /// a delta of 0.
    pub fn on_frame(&mut self, now: Instant) -> FrameStats {
        let delta_secs = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        self.on_frame_with_delta(delta_secs)
    }

    /// Surface callback for hosts that compute their own frame delta
    pub fn on_frame_with_delta(&mut self, delta_secs: f32) -> FrameStats {
        let delta_secs = if delta_secs.is_finite() {
            delta_secs.max(0.0)
        } else {
            0.0
        };
        let clock = self.timeline.snapshot();

        let report = self
            .pool
            .tick_frame(delta_secs, &clock, |backend, danmaku| danmaku.draw(backend));

        self.frames += 1;
        if report.draw_failures > 0 {
            tracing::warn!(
                frame = self.frames,
                failures = report.draw_failures,
                "frame rendered with draw failures"
            );
        }
        tracing::trace!(
            frame = self.frames,
            delta_secs,
            position_ms = clock.position_ms(),
            rendered = report.rendered,
            expired = report.expired,
            "frame"
        );

        FrameStats {
            frame: self.frames,
            delta_secs,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::danmaku::DanmakuSpec;
    use crate::testing::RecordingBackend;

    fn make_driver() -> FrameDriver<RecordingBackend> {
        let pool = Arc::new(DanmakuPool::new(RecordingBackend::with_width(100.0)));
        FrameDriver::new(pool, SharedTimeline::default())
    }

    #[test]
    fn test_first_frame_has_zero_delta() {
        let mut driver = make_driver();
        driver
            .pool()
            .add(DanmakuSpec::new("first", 20.0, [255; 4], 0.0))
            .unwrap();

        let stats = driver.on_frame(Instant::now());

        assert_eq!(stats.delta_secs, 0.0);
        assert_eq!(stats.frame, 1);
        assert_eq!(driver.pool().snapshot()[0].x, 1080.0);
    }

    #[test]
    fn test_delta_measured_between_frames() {
        let mut driver = make_driver();
        driver
            .pool()
            .add(DanmakuSpec::new("moving", 20.0, [255; 4], 0.0))
            .unwrap();
        let start = Instant::now();

        driver.on_frame(start);
        let stats = driver.on_frame(start + Duration::from_millis(500));

        assert!((stats.delta_secs - 0.5).abs() < 1e-6);
        assert!((driver.pool().snapshot()[0].x - 1030.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_restarts_delta() {
        let mut driver = make_driver();
        let start = Instant::now();
        driver.on_frame(start);
        driver.reset();

        let stats = driver.on_frame(start + Duration::from_secs(3));
        assert_eq!(stats.delta_secs, 0.0);
    }

    #[test]
    fn test_timestamp_going_backwards_is_zero_delta() {
        let mut driver = make_driver();
        let start = Instant::now() + Duration::from_secs(1);
        driver.on_frame(start);
        let stats = driver.on_frame(start - Duration::from_millis(10));
        assert_eq!(stats.delta_secs, 0.0);
    }

    #[test]
    fn test_frame_brackets_backend_and_reads_timeline() {
        let mut driver = make_driver();
        let counters = driver.pool().with_backend(|b| b.counters());
        driver.timeline().set_duration(10_000);
        driver.timeline().set_position(5_000);
        driver
            .pool()
            .add(DanmakuSpec::new("progress", 20.0, [255; 4], 0.0).with_appear_time(5_000))
            .unwrap();

        let stats = driver.on_frame_with_delta(1.0 / 60.0);

        assert_eq!(stats.report.rendered, 1);
        assert_eq!(counters.frames.load(Ordering::SeqCst), 1);
        assert!(!driver.pool().with_backend(|b| b.in_frame()));
        let sprite = driver.pool().with_backend(|b| b.drawn()[0]);
        assert_eq!(sprite.progress, 0.5);
        assert!(sprite.show_progress);
    }

    #[test]
    fn test_non_finite_delta_is_zero() {
        let mut driver = make_driver();
        let stats = driver.on_frame_with_delta(f32::INFINITY);
        assert_eq!(stats.delta_secs, 0.0);
    }
}
