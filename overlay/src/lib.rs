//! Danmaku Overlay Library
//!
//! Software rendering surface for the danmaku engine plus the pieces a
//! headless host needs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      host                           │
//! │        render thread, control thread, commands      │
//! ├─────────────────────────────────────────────────────┤
//! │                     backend                         │
//! │     SoftwareBackend (GraphicsBackend for the pool)  │
//! ├─────────────────────────────────────────────────────┤
//! │                     context                         │
//! │   RenderContext (owner) / ContextHandle (borrowers) │
//! ├─────────────────────────────────────────────────────┤
//! │                     renderer                        │
//! │            tiny-skia + cosmic-text                  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod context;
pub mod host;
pub mod logging;
pub mod renderer;
pub mod seed;
pub mod utils;

// Re-export commonly used types
pub use backend::{OverlayError, SoftwareBackend};
pub use context::{ContextHandle, RenderContext};
pub use host::{RenderCommand, RenderOptions, RenderSummary};
pub use renderer::Renderer;
pub use seed::DanmakuRecord;
pub use tiny_skia::Color;
