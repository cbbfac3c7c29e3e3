//! Danmaku engine core
//!
//! Owns the live set of scrolling comments, advances them once per frame
//! against a video timeline, and recycles backend textures as comments
//! leave the viewport.
//!
//! ```text
//! FrameDriver ──reads──▶ SharedTimeline
//!      │
//!      └─tick─▶ DanmakuPool ──upload/draw/release──▶ GraphicsBackend
//! ```

pub mod backend;
pub mod context;
pub mod danmaku;
pub mod driver;
pub mod error;
pub mod timeline;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use backend::{
    BackendError, Extent, FontWeight, GraphicsBackend, Sprite, TextMetrics, TextRaster, TextureId,
};
pub use danmaku::{Danmaku, DanmakuId, DanmakuPool, DanmakuSnapshot, DanmakuSpec, TickReport};
pub use danmaku_types::{Color, SpeedMode};
pub use driver::{FrameDriver, FrameStats};
pub use error::EngineError;
pub use timeline::{SharedTimeline, TimelineClock};
