//! Danmaku system
//!
//! This module provides:
//! - **Specs**: creation parameters for a scrolling comment
//! - **Live danmaku**: runtime position, progress and texture state
//! - **Pool**: the synchronized collection the render thread ticks

mod item;
mod pool;


pub use item::{Danmaku, DanmakuId, DanmakuSnapshot, DanmakuSpec, DEFAULT_PROGRESS_BAR_HEIGHT};
pub use pool::{
    DanmakuPool, TickReport, DEFAULT_VIEWPORT_WIDTH, MAX_GLOBAL_SPEED, MIN_GLOBAL_SPEED,
};
