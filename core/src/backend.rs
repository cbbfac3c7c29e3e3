//! Collaborator contracts for text measurement and drawing
//!
//! The engine never talks to a GPU or a font stack directly. A host supplies a
//! [`GraphicsBackend`] (which is also a [`TextMetrics`] provider) and the pool
//! funnels every allocation, draw and release through it while holding the
//! pool lock.

use danmaku_types::Color;
use thiserror::Error;

/// Width and height of a measured text run, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either side rounds to zero pixels
    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    Normal,
    #[default]
    Bold,
}

/// Opaque handle to a backend texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Everything a backend needs to rasterize one danmaku's text
#[derive(Debug, Clone, Copy)]
pub struct TextRaster<'a> {
    pub text: &'a str,
    pub size: f32,
    pub weight: FontWeight,
    pub color: Color,
    pub extent: Extent,
}

/// One draw request for a live danmaku
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub texture: TextureId,
    /// Left edge in screen space
    pub x: f32,
    /// Top edge in screen space (y grows downward)
    pub y: f32,
    pub extent: Extent,
    pub progress: f32,
    pub show_progress: bool,
    pub progress_color: Color,
    pub progress_bar_height: f32,
}

/// Errors raised by a graphics backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to allocate a {width}x{height} texture for '{text}'")]
    TextureAllocation {
        text: String,
        width: u32,
        height: u32,
    },

    #[error("failed to allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },

    #[error("texture budget exhausted ({max} live textures)")]
    TextureBudget { max: usize },

    #[error("unknown texture {0}")]
    UnknownTexture(TextureId),

    #[error("shared render context is gone")]
    ContextLost,
}

/// Text measurement collaborator
pub trait TextMetrics {
    fn measure_text(&mut self, text: &str, size: f32, weight: FontWeight) -> Extent;
}

/// Drawing collaborator owned by a [`DanmakuPool`](crate::DanmakuPool)
///
/// Every method is called with the pool lock held, so implementations never
/// see a draw for a texture that is concurrently being released.
pub trait GraphicsBackend: TextMetrics + Send {
    /// Rasterize text and keep the result as a texture
    fn upload_text(&mut self, raster: &TextRaster<'_>) -> Result<TextureId, BackendError>;

    /// Composite one danmaku onto the current frame
    fn draw(&mut self, sprite: &Sprite) -> Result<(), BackendError>;

    /// Free a texture. Unknown ids are ignored.
    fn release(&mut self, texture: TextureId);

    fn begin_frame(&mut self) {}

    fn end_frame(&mut self) {}

    /// Host surface changed size
    fn resize(&mut self, _width: u32, _height: u32) {}
}
