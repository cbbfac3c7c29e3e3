//! Headless host surface
//!
//! A render thread plays the part of the platform surface callback: it
//! drains pending commands, drives one frame, then sleeps until the next
//! frame is due. A control thread feeds comments and advances the timeline
//! the way a video player would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use danmaku_core::{
    DanmakuPool, DanmakuSpec, FrameDriver, FrameStats, GraphicsBackend, SharedTimeline,
};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TryRecvError};

use crate::seed;
use crate::utils::format_position;

/// Commands sent to the render thread
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Host surface changed size
    Resize(u32, u32),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub fps: u32,
    /// Stop after this many frames
    pub max_frames: Option<u32>,
}

/// Totals over a render thread's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderSummary {
    pub frames: u64,
    pub rendered: usize,
    pub expired: usize,
    pub draw_failures: usize,
}

impl RenderSummary {
    fn record(&mut self, stats: &FrameStats) {
        self.frames = stats.frame;
        self.rendered += stats.report.rendered;
        self.expired += stats.report.expired;
        self.draw_failures += stats.report.draw_failures;
    }
}

/// Spawn the render thread for `driver`
pub fn spawn_render_thread<B>(
    driver: FrameDriver<B>,
    options: RenderOptions,
) -> (Sender<RenderCommand>, JoinHandle<RenderSummary>)
where
    B: GraphicsBackend + 'static,
{
    let (tx, rx) = mpsc::channel::<RenderCommand>(32);
    let handle = thread::spawn(move || run_render_loop(driver, rx, options));
    (tx, handle)
}

fn run_render_loop<B: GraphicsBackend>(
    mut driver: FrameDriver<B>,
    mut rx: Receiver<RenderCommand>,
    options: RenderOptions,
) -> RenderSummary {
    let fps = options.fps.max(1);
    let frame_interval = Duration::from_secs_f64(1.0 / fps as f64);
    let mut summary = RenderSummary::default();
    let mut next_frame = Instant::now();

    tracing::info!(fps, max_frames = ?options.max_frames, "Render thread started");

    'frames: loop {
        // Process all pending commands
        loop {
            match rx.try_recv() {
                Ok(RenderCommand::Resize(width, height)) => {
                    driver.pool().with_backend(|backend| backend.resize(width, height));
                    driver.pool().set_viewport_width(width as f32);
                }
                Ok(RenderCommand::Shutdown) | Err(TryRecvError::Disconnected) => break 'frames,
                Err(TryRecvError::Empty) => break,
            }
        }

        if options
            .max_frames
            .is_some_and(|max| summary.frames >= max as u64)
        {
            break;
        }

        let stats = driver.on_frame(Instant::now());
        summary.record(&stats);

        if stats.frame % fps as u64 == 0 {
            let clock = driver.timeline().snapshot();
            tracing::debug!(
                frame = stats.frame,
                position = %format_position(clock.position_ms()),
                live = driver.pool().len(),
                "Render progress"
            );
        }

        next_frame += frame_interval;
        let now = Instant::now();
        if next_frame > now {
            thread::sleep(next_frame - now);
        } else {
            // Running behind; don't try to catch up
            next_frame = now;
        }
    }

    tracing::info!(
        frames = summary.frames,
        expired = summary.expired,
        draw_failures = summary.draw_failures,
        "Render thread stopped"
    );
    summary
}

/// Spawn the control thread
///
/// Adds `initial` as one batch, then advances the timeline every `step`
/// and posts a fresh comment every `post_every` until `stop` is set.
pub fn spawn_control_thread<B>(
    pool: Arc<DanmakuPool<B>>,
    timeline: SharedTimeline,
    initial: Vec<DanmakuSpec>,
    step: Duration,
    post_every: Option<Duration>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()>
where
    B: GraphicsBackend + 'static,
{
    thread::spawn(move || {
        let requested = initial.len();
        match pool.add_batch(initial) {
            Ok(ids) => tracing::info!(added = ids.len(), "Seeded danmaku"),
            Err(e) => tracing::error!(error = %e, requested, "Seeding stopped early"),
        }

        let mut rng = rand::rng();
        let mut last_post = Instant::now();

        while !stop.load(Ordering::Relaxed) {
            thread::sleep(step);
            timeline.advance_by(step.as_millis() as u64);

            if let Some(interval) = post_every
                && last_post.elapsed() >= interval
            {
                last_post = Instant::now();
                let position = timeline.snapshot().position_ms();
                let spec = seed::random_spec(&mut rng, 1).with_appear_time(position);
                if let Err(e) = pool.add(spec) {
                    tracing::warn!(error = %e, "Failed to post danmaku");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::context::ContextHandle;
    use danmaku_types::SurfaceConfig;

    fn make_driver() -> FrameDriver<SoftwareBackend> {
        let config = SurfaceConfig {
            width: 32,
            height: 32,
            ..SurfaceConfig::default()
        };
        let backend = SoftwareBackend::new(ContextHandle::detached(), &config).unwrap();
        FrameDriver::new(Arc::new(DanmakuPool::new(backend)), SharedTimeline::default())
    }

    #[test]
    fn test_render_thread_stops_at_frame_limit() {
        let driver = make_driver();
        let pool = driver.pool().clone();
        let (_tx, handle) = spawn_render_thread(
            driver,
            RenderOptions {
                fps: 1000,
                max_frames: Some(5),
            },
        );

        let summary = handle.join().unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(pool.with_backend(|b| b.frame()), 5);
    }

    #[test]
    fn test_resize_then_shutdown() {
        let driver = make_driver();
        let pool = driver.pool().clone();
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(RenderCommand::Resize(64, 16)).unwrap();
        tx.try_send(RenderCommand::Shutdown).unwrap();

        let summary = run_render_loop(
            driver,
            rx,
            RenderOptions {
                fps: 1000,
                max_frames: None,
            },
        );

        assert_eq!(summary.frames, 0);
        assert_eq!(pool.with_backend(|b| (b.width(), b.height())), (64, 16));
        assert_eq!(pool.viewport_width(), 64.0);
    }

    #[test]
    fn test_dropped_sender_stops_thread() {
        let (tx, handle) = spawn_render_thread(
            make_driver(),
            RenderOptions {
                fps: 1000,
                max_frames: None,
            },
        );
        drop(tx);
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_control_thread_advances_timeline() {
        let driver = make_driver();
        let timeline = driver.timeline().clone();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_control_thread(
            driver.pool().clone(),
            timeline.clone(),
            Vec::new(),
            Duration::from_millis(5),
            None,
            stop.clone(),
        );

        thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        assert!(timeline.snapshot().position_ms() > 0);
    }
}
