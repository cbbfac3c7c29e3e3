//! Synchronized collection of live danmaku
//!
//! All mutation (`add`, `tick`, `clear`) and every traversal happen under a
//! single mutex together with the backend, so a tick never observes a
//! half-inserted danmaku and a texture is never drawn after release.

use std::sync::{Mutex, MutexGuard, PoisonError};

use danmaku_types::{EngineConfig, SpeedMode};

use super::item::{Danmaku, DanmakuId, DanmakuSnapshot, DanmakuSpec};
use crate::backend::{BackendError, GraphicsBackend};
use crate::error::EngineError;
use crate::timeline::TimelineClock;

/// Spawn x for overlays before the host reports a surface width
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 1080.0;

pub const MIN_GLOBAL_SPEED: f32 = 0.0;
pub const MAX_GLOBAL_SPEED: f32 = 2.0;

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Danmaku examined (present at the start of the tick)
    pub visited: usize,
    /// Survivors successfully handed to the render callback
    pub rendered: usize,
    /// Danmaku that left the viewport and were released
    pub expired: usize,
    /// Survivors whose render failed this frame
    pub draw_failures: usize,
}

struct PoolState<B> {
    backend: B,
    items: Vec<Danmaku>,
    next_id: u64,
    global_speed: f32,
    base_speed: f32,
    speed_mode: SpeedMode,
    viewport_width: f32,
    progress_bar_height: f32,
}

impl<B: GraphicsBackend> PoolState<B> {
    fn construct(&mut self, spec: DanmakuSpec) -> Result<DanmakuId, EngineError> {
        let id = DanmakuId(self.next_id);
        let text = spec.text.clone();
        let danmaku = Danmaku::create(
            id,
            spec,
            self.viewport_width,
            self.progress_bar_height,
            &mut self.backend,
        )
        .map_err(|source| EngineError::Construction { text, source })?;

        tracing::debug!(
            id = id.0,
            text = danmaku.text(),
            width = danmaku.width(),
            "danmaku added"
        );
        self.next_id += 1;
        self.items.push(danmaku);
        Ok(id)
    }

    fn tick<F>(&mut self, delta_secs: f32, clock: &TimelineClock, mut render: F) -> TickReport
    where
        F: FnMut(&mut B, &Danmaku) -> Result<(), BackendError>,
    {
        let step = self.speed_mode.step_secs(delta_secs.max(0.0));
        let rate = self.global_speed * self.base_speed * step;

        let mut report = TickReport {
            visited: self.items.len(),
            ..TickReport::default()
        };

        // Filter in place: each danmaku is visited exactly once, expired ones
        // are released before they leave the vector.
        let backend = &mut self.backend;
        self.items.retain_mut(|danmaku| {
            danmaku.sync_timeline(clock);
            danmaku.advance(danmaku.relative_speed() * rate);

            if danmaku.is_expired() {
                danmaku.release(backend);
                tracing::debug!(id = danmaku.id().0, "danmaku expired");
                report.expired += 1;
                return false;
            }

            match render(backend, danmaku) {
                Ok(()) => report.rendered += 1,
                Err(e) => {
                    report.draw_failures += 1;
                    tracing::warn!(id = danmaku.id().0, error = %e, "danmaku draw failed");
                }
            }
            true
        });

        report
    }

    fn release_all(&mut self) -> usize {
        let count = self.items.len();
        for mut danmaku in self.items.drain(..) {
            danmaku.release(&mut self.backend);
        }
        count
    }
}

/// Thread-safe, ordered pool of live danmaku bound to one backend
pub struct DanmakuPool<B: GraphicsBackend> {
    state: Mutex<PoolState<B>>,
}

impl<B: GraphicsBackend> DanmakuPool<B> {
    /// Create an empty pool with default speeds
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &EngineConfig::default())
    }

    pub fn with_config(backend: B, config: &EngineConfig) -> Self {
        let pool = Self {
            state: Mutex::new(PoolState {
                backend,
                items: Vec::new(),
                next_id: 0,
                global_speed: 1.0,
                base_speed: 0.0,
                speed_mode: config.speed_mode,
                viewport_width: DEFAULT_VIEWPORT_WIDTH,
                progress_bar_height: config.progress_bar_height.max(0.0),
            }),
        };
        pool.set_global_speed(config.global_speed);
        pool.set_base_speed(config.base_speed);
        pool
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<B>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Control surface
    // ─────────────────────────────────────────────────────────────────────────

    /// Construct a danmaku and append it
    ///
    /// Nothing is added if the backend fails to allocate the text raster.
    pub fn add(&self, spec: DanmakuSpec) -> Result<DanmakuId, EngineError> {
        self.lock().construct(spec)
    }

    /// Add many danmaku under one lock acquisition
    ///
    /// Stops at the first failure; danmaku added before it stay in the pool.
    pub fn add_batch<I>(&self, specs: I) -> Result<Vec<DanmakuId>, EngineError>
    where
        I: IntoIterator<Item = DanmakuSpec>,
    {
        let mut state = self.lock();
        let mut ids = Vec::new();
        for spec in specs {
            match state.construct(spec) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    return Err(EngineError::Batch {
                        added: ids.len(),
                        source: Box::new(e),
                    });
                }
            }
        }
        tracing::debug!(count = ids.len(), "danmaku batch added");
        Ok(ids)
    }

    /// Release every danmaku and empty the pool. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let count = self.lock().release_all();
        tracing::debug!(count, "danmaku pool cleared");
        count
    }

    /// Set the pool-wide speed multiplier, clamped to `0.0..=2.0`
    pub fn set_global_speed(&self, factor: f32) {
        let clamped = if factor.is_nan() {
            MIN_GLOBAL_SPEED
        } else {
            factor.clamp(MIN_GLOBAL_SPEED, MAX_GLOBAL_SPEED)
        };
        if clamped != factor {
            tracing::debug!(factor, clamped, "global speed clamped");
        }
        self.lock().global_speed = clamped;
    }

    /// Set the base rate in pixels per second, clamped to `>= 0.0`
    pub fn set_base_speed(&self, rate: f32) {
        let clamped = if rate.is_nan() { 0.0 } else { rate.max(0.0) };
        if clamped != rate {
            tracing::debug!(rate, clamped, "base speed clamped");
        }
        self.lock().base_speed = clamped;
    }

    pub fn set_speed_mode(&self, mode: SpeedMode) {
        self.lock().speed_mode = mode;
    }

    /// Update the spawn x used for danmaku added from now on
    pub fn set_viewport_width(&self, width: f32) {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        self.lock().viewport_width = width;
    }

    pub fn global_speed(&self) -> f32 {
        self.lock().global_speed
    }

    pub fn base_speed(&self) -> f32 {
        self.lock().base_speed
    }

    pub fn speed_mode(&self) -> SpeedMode {
        self.lock().speed_mode
    }

    pub fn viewport_width(&self) -> f32 {
        self.lock().viewport_width
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Copies of every live danmaku, in arrival order
    pub fn snapshot(&self) -> Vec<DanmakuSnapshot> {
        self.lock().items.iter().map(Danmaku::snapshot).collect()
    }

    /// Run `f` against the backend while holding the pool lock
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.lock().backend)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-frame entry point
    // ─────────────────────────────────────────────────────────────────────────

    /// Advance every danmaku by one frame
    ///
    /// In arrival order, each danmaku gets its progress refreshed from
    /// `clock`, moves left, and is either released (off screen) or handed to
    /// `render`. A failing `render` is logged and skips only that danmaku
    /// for this frame.
    pub fn tick<F>(&self, delta_secs: f32, clock: &TimelineClock, render: F) -> TickReport
    where
        F: FnMut(&mut B, &Danmaku) -> Result<(), BackendError>,
    {
        self.lock().tick(delta_secs, clock, render)
    }

    /// [`tick`](Self::tick) bracketed by `begin_frame` / `end_frame`
    ///
    /// The whole frame runs under one lock acquisition, so no other
    /// [`with_backend`](Self::with_backend) caller lands mid-frame.
    pub fn tick_frame<F>(&self, delta_secs: f32, clock: &TimelineClock, render: F) -> TickReport
    where
        F: FnMut(&mut B, &Danmaku) -> Result<(), BackendError>,
    {
        let mut state = self.lock();
        state.backend.begin_frame();
        let report = state.tick(delta_secs, clock, render);
        state.backend.end_frame();
        report
    }
}

impl<B: GraphicsBackend> Drop for DanmakuPool<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let count = state.release_all();
        if count > 0 {
            tracing::debug!(count, "released danmaku on pool teardown");
        }
    }
}

impl<B: GraphicsBackend> std::fmt::Debug for DanmakuPool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DanmakuPool")
            .field("len", &state.items.len())
            .field("global_speed", &state.global_speed)
            .field("base_speed", &state.base_speed)
            .field("speed_mode", &state.speed_mode)
            .finish()
    }
}
