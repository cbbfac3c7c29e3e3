//! Shared configuration types for the danmaku engine
//!
//! This crate contains serializable configuration types that are shared between
//! the engine core (danmaku-core) and the software surface (danmaku-overlay).

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Color Type
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color as [r, g, b, a] bytes
pub type Color = [u8; 4];

/// Palette used by the demo host when seeding random danmaku
pub mod danmaku_colors {
    use super::Color;

    pub const RED: Color = [255, 0, 0, 255];
    pub const GREEN: Color = [0, 255, 0, 255];
    pub const BLUE: Color = [0, 0, 255, 255];
    pub const YELLOW: Color = [255, 255, 0, 255];
    pub const CYAN: Color = [0, 255, 255, 255];
    pub const MAGENTA: Color = [255, 0, 255, 255];
    pub const WHITE: Color = [255, 255, 255, 255];
    pub const ORANGE: Color = [255, 165, 0, 255];
    pub const BLACK: Color = [0, 0, 0, 255];

    pub const ALL: [Color; 8] = [RED, GREEN, BLUE, YELLOW, CYAN, MAGENTA, WHITE, ORANGE];
}

// ─────────────────────────────────────────────────────────────────────────────
// Speed Mode
// ─────────────────────────────────────────────────────────────────────────────

/// How a tick turns elapsed frame time into horizontal distance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum SpeedMode {
    /// Distance is integrated over the real frame delta.
    #[default]
    Elapsed,
    /// Distance per tick is fixed at `1 / fps` of the per-second rate,
    /// whatever the real frame delta was. Frame-rate dependent.
    FixedStep { fps: f32 },
}

impl SpeedMode {
    /// Frame step the original Android renderer assumed.
    pub const LEGACY_FPS: f32 = 60.0;

    pub fn legacy() -> Self {
        Self::FixedStep {
            fps: Self::LEGACY_FPS,
        }
    }

    /// Seconds of motion one tick represents for a given frame delta
    pub fn step_secs(&self, delta_secs: f32) -> f32 {
        match *self {
            SpeedMode::Elapsed => delta_secs,
            SpeedMode::FixedStep { fps } if fps > 0.0 => 1.0 / fps,
            SpeedMode::FixedStep { .. } => 0.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Pool and timeline defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pixels per second at global speed 1.0 and relative speed 1.0
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    /// Pool-wide speed multiplier (clamped to 0.0..=2.0)
    #[serde(default = "default_global_speed")]
    pub global_speed: f32,
    #[serde(default)]
    pub speed_mode: SpeedMode,
    /// Height of the progress strip drawn under each danmaku
    #[serde(default = "default_progress_bar_height")]
    pub progress_bar_height: f32,
    /// Initial timeline duration in milliseconds
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
}

fn default_base_speed() -> f32 {
    100.0
}
fn default_global_speed() -> f32 {
    1.0
}
fn default_progress_bar_height() -> f32 {
    5.0
}
fn default_duration_ms() -> u64 {
    60_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_speed: default_base_speed(),
            global_speed: default_global_speed(),
            speed_mode: SpeedMode::default(),
            progress_bar_height: default_progress_bar_height(),
            duration_ms: default_duration_ms(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Surface Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Host surface and software backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_surface_width")]
    pub width: u32,
    #[serde(default = "default_surface_height")]
    pub height: u32,
    /// Upper bound on live text textures; allocation fails beyond it
    #[serde(default = "default_max_textures")]
    pub max_textures: usize,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_clear_color")]
    pub clear_color: Color,
}

fn default_surface_width() -> u32 {
    1080
}
fn default_surface_height() -> u32 {
    1920
}
fn default_max_textures() -> usize {
    1024
}
fn default_font_family() -> String {
    "Noto Sans".to_string()
}
fn default_clear_color() -> Color {
    danmaku_colors::BLACK
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: default_surface_width(),
            height: default_surface_height(),
            max_textures: default_max_textures(),
            font_family: default_font_family(),
            clear_color: default_clear_color(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for the headless demo host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Random danmaku seeded at startup
    #[serde(default = "default_count")]
    pub count: usize,
    /// Frames rendered before exit
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Target frame rate of the render thread
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_count() -> usize {
    100
}
fn default_frames() -> u32 {
    600
}
fn default_fps() -> u32 {
    60
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            frames: default_frames(),
            fps: default_fps(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level persisted configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}
