//! A single scrolling comment (runtime state)
//!
//! # Lifecycle
//!
//! 1. `DanmakuSpec` handed to the pool → text measured, raster uploaded,
//!    `Danmaku` created at the right edge of the viewport
//! 2. Every tick: progress recomputed, `x` decreases by the frame distance
//! 3. Fully off the left edge (`x + width < 0`) → texture released → removed

use danmaku_types::Color;

use crate::backend::{
    BackendError, Extent, FontWeight, GraphicsBackend, Sprite, TextRaster, TextureId,
};
use crate::timeline::TimelineClock;

/// Height of the progress strip under each danmaku, in pixels
pub const DEFAULT_PROGRESS_BAR_HEIGHT: f32 = 5.0;

/// Pool-local danmaku identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DanmakuId(pub u64);

/// Creation parameters for a danmaku
#[derive(Debug, Clone, PartialEq)]
pub struct DanmakuSpec {
    pub text: String,
    /// Font size in pixels
    pub size: f32,
    pub color: Color,
    /// Top edge in screen space
    pub y: f32,
    /// Multiplier on top of the pool's global and base speed
    pub relative_speed: f32,
    /// Timeline offset (ms) from which the progress strip is shown
    pub appear_time_ms: u64,
    pub progress_color: Color,
    /// Left edge to start from instead of the viewport's right edge
    pub start_x: Option<f32>,
}

impl DanmakuSpec {
    pub fn new(text: impl Into<String>, size: f32, color: Color, y: f32) -> Self {
        Self {
            text: text.into(),
            size,
            color,
            y,
            relative_speed: 1.0,
            appear_time_ms: 0,
            progress_color: color,
            start_x: None,
        }
    }

    pub fn with_speed(mut self, relative_speed: f32) -> Self {
        self.relative_speed = relative_speed;
        self
    }

    pub fn with_appear_time(mut self, appear_time_ms: u64) -> Self {
        self.appear_time_ms = appear_time_ms;
        self
    }

    pub fn with_progress_color(mut self, color: Color) -> Self {
        self.progress_color = color;
        self
    }

    pub fn with_start_x(mut self, x: f32) -> Self {
        self.start_x = Some(x);
        self
    }
}

/// A live danmaku owned by a pool
///
/// Holds its backend texture until [`release`](Self::release) is called;
/// the pool guarantees that happens exactly once on every removal path.
#[derive(Debug)]
pub struct Danmaku {
    id: DanmakuId,
    text: String,
    size: f32,
    color: Color,

    // ─── Geometry ───────────────────────────────────────────────────────────
    x: f32,
    y: f32,
    extent: Extent,

    // ─── Motion and timing ──────────────────────────────────────────────────
    relative_speed: f32,
    appear_time_ms: u64,
    progress: f32,
    show_progress: bool,

    // ─── Display ────────────────────────────────────────────────────────────
    progress_color: Color,
    progress_bar_height: f32,

    /// `None` once released
    texture: Option<TextureId>,
}

impl Danmaku {
    /// Measure and rasterize the text, placing the danmaku at `spawn_x`
    /// unless the spec carries its own start position
    ///
    /// Fails without side effects if the backend cannot allocate the raster.
    pub fn create<B: GraphicsBackend + ?Sized>(
        id: DanmakuId,
        spec: DanmakuSpec,
        spawn_x: f32,
        progress_bar_height: f32,
        backend: &mut B,
    ) -> Result<Self, BackendError> {
        // Nothing can be rasterized at a degenerate size
        if !spec.size.is_finite() || spec.size <= 0.0 {
            return Err(BackendError::TextureAllocation {
                text: spec.text,
                width: 0,
                height: 0,
            });
        }

        let extent = backend.measure_text(&spec.text, spec.size, FontWeight::Bold);
        let texture = backend.upload_text(&TextRaster {
            text: &spec.text,
            size: spec.size,
            weight: FontWeight::Bold,
            color: spec.color,
            extent,
        })?;

        Ok(Self {
            id,
            text: spec.text,
            size: spec.size,
            color: spec.color,
            x: spec.start_x.unwrap_or(spawn_x),
            y: spec.y,
            extent,
            relative_speed: sanitize_speed(spec.relative_speed),
            appear_time_ms: spec.appear_time_ms,
            progress: 0.0,
            show_progress: false,
            progress_color: spec.progress_color,
            progress_bar_height,
            texture: Some(texture),
        })
    }

    pub fn id(&self) -> DanmakuId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.extent.width
    }

    pub fn height(&self) -> f32 {
        self.extent.height
    }

    pub fn relative_speed(&self) -> f32 {
        self.relative_speed
    }

    pub fn appear_time_ms(&self) -> u64 {
        self.appear_time_ms
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn show_progress(&self) -> bool {
        self.show_progress
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn is_released(&self) -> bool {
        self.texture.is_none()
    }

    /// Refresh progress state from the timeline
    pub fn sync_timeline(&mut self, clock: &TimelineClock) {
        self.progress = clock.progress();
        self.show_progress = clock.has_reached(self.appear_time_ms);
    }

    /// Move left by `distance` pixels
    pub fn advance(&mut self, distance: f32) {
        self.x -= distance;
    }

    /// Fully off the left edge of the viewport
    ///
    /// A position that is no longer finite can never come back on screen,
    /// so it counts as expired too.
    pub fn is_expired(&self) -> bool {
        !self.x.is_finite() || self.x + self.extent.width < 0.0
    }

    /// Give the texture back to the backend. Subsequent calls do nothing.
    pub fn release<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(texture) = self.texture.take() {
            backend.release(texture);
        }
    }

    /// Draw request for the current state, `None` after release
    pub fn sprite(&self) -> Option<Sprite> {
        self.texture.map(|texture| Sprite {
            texture,
            x: self.x,
            y: self.y,
            extent: self.extent,
            progress: self.progress,
            show_progress: self.show_progress,
            progress_color: self.progress_color,
            progress_bar_height: self.progress_bar_height,
        })
    }

    /// Issue the draw call for this danmaku
    pub fn draw<B: GraphicsBackend + ?Sized>(&self, backend: &mut B) -> Result<(), BackendError> {
        match self.sprite() {
            Some(sprite) => backend.draw(&sprite),
            None => Ok(()),
        }
    }

    pub(crate) fn snapshot(&self) -> DanmakuSnapshot {
        DanmakuSnapshot {
            id: self.id,
            text: self.text.clone(),
            x: self.x,
            y: self.y,
            width: self.extent.width,
            height: self.extent.height,
            progress: self.progress,
            show_progress: self.show_progress,
        }
    }
}

/// Non-finite relative speeds fall back to the default of 1.0
fn sanitize_speed(relative_speed: f32) -> f32 {
    if relative_speed.is_finite() {
        relative_speed
    } else {
        tracing::debug!(relative_speed, "non-finite relative speed, using 1.0");
        1.0
    }
}

/// Point-in-time copy of a danmaku, safe to hold outside the pool lock
#[derive(Debug, Clone, PartialEq)]
pub struct DanmakuSnapshot {
    pub id: DanmakuId,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub progress: f32,
    pub show_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBackend;

    fn make(backend: &mut RecordingBackend, spawn_x: f32) -> Danmaku {
        Danmaku::create(
            DanmakuId(1),
            DanmakuSpec::new("awsl", 30.0, [255, 0, 0, 255], 120.0).with_appear_time(2_000),
            spawn_x,
            DEFAULT_PROGRESS_BAR_HEIGHT,
            backend,
        )
        .unwrap()
    }

    #[test]
    fn test_create_measures_and_uploads() {
        let mut backend = RecordingBackend::with_width(100.0);
        let danmaku = make(&mut backend, 1080.0);

        assert_eq!(danmaku.x(), 1080.0);
        assert_eq!(danmaku.y(), 120.0);
        assert_eq!(danmaku.width(), 100.0);
        assert_eq!(backend.uploads(), 1);
        assert!(danmaku.texture().is_some());
    }

    #[test]
    fn test_failed_upload_creates_nothing() {
        let mut backend = RecordingBackend::with_width(100.0);
        backend.fail_uploads(true);
        let result = Danmaku::create(
            DanmakuId(1),
            DanmakuSpec::new("x", 30.0, [0, 0, 0, 255], 0.0),
            1080.0,
            DEFAULT_PROGRESS_BAR_HEIGHT,
            &mut backend,
        );
        assert!(matches!(result, Err(BackendError::TextureAllocation { .. })));
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_degenerate_size_rejected_before_backend() {
        let mut backend = RecordingBackend::with_width(100.0);
        for size in [0.0, -4.0, f32::NAN, f32::INFINITY] {
            let result = Danmaku::create(
                DanmakuId(1),
                DanmakuSpec::new("hi", size, [255; 4], 0.0),
                1080.0,
                DEFAULT_PROGRESS_BAR_HEIGHT,
                &mut backend,
            );
            assert!(
                matches!(result, Err(BackendError::TextureAllocation { .. })),
                "size {size} accepted"
            );
        }
        assert_eq!(backend.uploads(), 0);
    }

    #[test]
    fn test_non_finite_speed_falls_back_to_default() {
        let mut backend = RecordingBackend::with_width(100.0);
        for speed in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let danmaku = Danmaku::create(
                DanmakuId(1),
                DanmakuSpec::new("hi", 30.0, [255; 4], 0.0).with_speed(speed),
                1080.0,
                DEFAULT_PROGRESS_BAR_HEIGHT,
                &mut backend,
            )
            .unwrap();
            assert_eq!(danmaku.relative_speed(), 1.0);
        }
    }

    #[test]
    fn test_non_finite_position_is_expired() {
        let mut backend = RecordingBackend::with_width(100.0);
        let mut danmaku = make(&mut backend, 500.0);

        danmaku.advance(f32::NAN);
        assert!(danmaku.is_expired());
    }

    #[test]
    fn test_expiry_boundary() {
        let mut backend = RecordingBackend::with_width(100.0);
        let mut danmaku = make(&mut backend, 0.0);

        danmaku.advance(100.0);
        assert_eq!(danmaku.x(), -100.0);
        assert!(!danmaku.is_expired(), "x + width == 0 is still visible");

        danmaku.advance(0.5);
        assert!(danmaku.is_expired());
    }

    #[test]
    fn test_release_is_at_most_once() {
        let mut backend = RecordingBackend::with_width(100.0);
        let mut danmaku = make(&mut backend, 0.0);

        danmaku.release(&mut backend);
        danmaku.release(&mut backend);

        assert_eq!(backend.releases(), 1);
        assert!(danmaku.is_released());
        assert!(danmaku.sprite().is_none());
    }

    #[test]
    fn test_show_progress_boundary() {
        let mut backend = RecordingBackend::with_width(100.0);
        let mut danmaku = make(&mut backend, 0.0);
        let mut clock = TimelineClock::new(10_000);

        clock.set_position(1_999);
        danmaku.sync_timeline(&clock);
        assert!(!danmaku.show_progress());

        clock.set_position(2_000);
        danmaku.sync_timeline(&clock);
        assert!(danmaku.show_progress());
        assert_eq!(danmaku.progress(), 0.2);
    }

    #[test]
    fn test_progress_color_defaults_to_text_color() {
        let spec = DanmakuSpec::new("666", 20.0, [1, 2, 3, 4], 0.0);
        assert_eq!(spec.progress_color, [1, 2, 3, 4]);
        assert_eq!(spec.relative_speed, 1.0);
        assert_eq!(spec.appear_time_ms, 0);
    }
}
