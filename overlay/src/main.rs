//! Headless danmaku demo
//!
//! Seeds a pool with random (or imported) comments, plays a simulated
//! video timeline on a render thread and writes the last frame to a PNG.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use danmaku_core::context::{AppConfig, AppConfigExt};
use danmaku_core::{DanmakuPool, FrameDriver, SharedTimeline, SpeedMode, TimelineClock};
use danmaku_overlay::host::{self, RenderOptions};
use danmaku_overlay::{RenderContext, SoftwareBackend, logging, seed};

/// Interval between comments posted while the demo runs
const POST_INTERVAL: Duration = Duration::from_millis(750);

#[derive(Parser)]
#[command(version, about = "Headless danmaku renderer")]
struct Args {
    /// Random danmaku to seed
    #[arg(short, long)]
    count: Option<usize>,

    /// Frames to render before exiting
    #[arg(short, long)]
    frames: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    /// Advance a fixed 1/fps step per frame instead of the measured delta
    #[arg(long)]
    fixed_step: bool,

    #[arg(short, long)]
    global_speed: Option<f32>,

    /// JSON array of recorded danmaku to load instead of random ones
    #[arg(short, long)]
    import: Option<PathBuf>,

    /// Alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the final frame
    #[arg(short, long, default_value = "danmaku.png")]
    output: PathBuf,
}

fn main() -> Result<(), String> {
    let _log_guard = logging::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_path(path).map_err(|e| e.to_string())?,
        None => AppConfig::load(),
    };
    apply_overrides(&mut config, &args);

    let context = RenderContext::new(config.surface.font_family.clone());
    let backend =
        SoftwareBackend::new(context.handle(), &config.surface).map_err(|e| e.to_string())?;

    let pool = Arc::new(DanmakuPool::with_config(backend, &config.engine));
    pool.set_viewport_width(config.surface.width as f32);
    let timeline = SharedTimeline::new(TimelineClock::new(config.engine.duration_ms));

    let specs = match &args.import {
        Some(path) => seed::load_records(path).map_err(|e| e.to_string())?,
        None => seed::random_specs(config.demo.count, config.engine.duration_ms),
    };

    let fps = config.demo.fps;
    let step = Duration::from_secs_f64(1.0 / fps as f64);
    let stop = Arc::new(AtomicBool::new(false));

    let control = host::spawn_control_thread(
        pool.clone(),
        timeline.clone(),
        specs,
        step,
        args.import.is_none().then_some(POST_INTERVAL),
        stop.clone(),
    );

    let driver = FrameDriver::new(pool.clone(), timeline.clone());
    let (commands, render) = host::spawn_render_thread(
        driver,
        RenderOptions {
            fps,
            max_frames: Some(config.demo.frames),
        },
    );

    let summary = render
        .join()
        .map_err(|_| "Render thread panicked".to_string())?;
    drop(commands);

    stop.store(true, Ordering::Relaxed);
    if control.join().is_err() {
        tracing::error!("Control thread panicked");
    }

    pool.with_backend(|backend| backend.save_png(&args.output))
        .map_err(|e| e.to_string())?;

    tracing::info!(
        frames = summary.frames,
        rendered = summary.rendered,
        expired = summary.expired,
        draw_failures = summary.draw_failures,
        live = pool.len(),
        output = %args.output.display(),
        "Demo finished"
    );

    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(count) = args.count {
        config.demo.count = count;
    }
    if let Some(frames) = args.frames {
        config.demo.frames = frames;
    }
    if let Some(fps) = args.fps {
        config.demo.fps = fps;
    }
    if let Some(speed) = args.global_speed {
        config.engine.global_speed = speed;
    }
    // Same floor the render loop applies
    config.demo.fps = config.demo.fps.max(1);
    if args.fixed_step {
        config.engine.speed_mode = SpeedMode::FixedStep {
            fps: config.demo.fps as f32,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overridden(argv: &[&str]) -> AppConfig {
        let args = Args::parse_from(std::iter::once("danmaku-demo").chain(argv.iter().copied()));
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);
        config
    }

    #[test]
    fn test_fixed_step_uses_render_fps() {
        let config = overridden(&["--fixed-step", "--fps", "30"]);
        assert_eq!(config.engine.speed_mode, SpeedMode::FixedStep { fps: 30.0 });
    }

    #[test]
    fn test_zero_fps_fixed_step_still_moves() {
        let config = overridden(&["--fixed-step", "--fps", "0"]);
        assert_eq!(config.demo.fps, 1);
        assert_eq!(config.engine.speed_mode, SpeedMode::FixedStep { fps: 1.0 });
        assert!(config.engine.speed_mode.step_secs(0.0) > 0.0);
    }

    #[test]
    fn test_overrides_leave_unset_values() {
        let config = overridden(&["--count", "5", "--global-speed", "1.5"]);
        assert_eq!(config.demo.count, 5);
        assert_eq!(config.engine.global_speed, 1.5);
        assert_eq!(config.demo.frames, AppConfig::default().demo.frames);
        assert_eq!(config.engine.speed_mode, SpeedMode::Elapsed);
    }
}
