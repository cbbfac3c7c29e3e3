//! Recording backend used by the engine tests

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::{
    BackendError, Extent, FontWeight, GraphicsBackend, Sprite, TextMetrics, TextRaster, TextureId,
};

/// Counters shared with the test after the backend moved into a pool
#[derive(Debug, Default)]
pub struct Counters {
    pub uploads: AtomicUsize,
    pub releases: AtomicUsize,
    pub draws: AtomicUsize,
    pub frames: AtomicUsize,
}

/// Backend that measures every string at a fixed extent and records calls
#[derive(Debug)]
pub struct RecordingBackend {
    width: f32,
    height: f32,
    next_texture: u64,
    live: HashSet<TextureId>,
    released: Vec<TextureId>,
    drawn: Vec<Sprite>,
    fail_uploads: bool,
    /// Textures whose draw call fails
    fail_draw_for: HashSet<TextureId>,
    /// Between `begin_frame` and `end_frame`
    in_frame: bool,
    counters: Arc<Counters>,
}

impl RecordingBackend {
    pub fn with_width(width: f32) -> Self {
        Self {
            width,
            height: 20.0,
            next_texture: 1,
            live: HashSet::new(),
            released: Vec::new(),
            drawn: Vec::new(),
            fail_uploads: false,
            fail_draw_for: HashSet::new(),
            in_frame: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    pub fn fail_uploads(&mut self, fail: bool) {
        self.fail_uploads = fail;
    }

    pub fn fail_draw(&mut self, texture: TextureId) {
        self.fail_draw_for.insert(texture);
    }

    pub fn uploads(&self) -> usize {
        self.counters.uploads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    pub fn live_textures(&self) -> usize {
        self.live.len()
    }

    pub fn released(&self) -> &[TextureId] {
        &self.released
    }

    pub fn drawn(&self) -> &[Sprite] {
        &self.drawn
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn clear_drawn(&mut self) {
        self.drawn.clear();
    }
}

impl TextMetrics for RecordingBackend {
    fn measure_text(&mut self, _text: &str, _size: f32, _weight: FontWeight) -> Extent {
        Extent::new(self.width, self.height)
    }
}

impl GraphicsBackend for RecordingBackend {
    fn upload_text(&mut self, raster: &TextRaster<'_>) -> Result<TextureId, BackendError> {
        if self.fail_uploads || raster.text.is_empty() {
            return Err(BackendError::TextureAllocation {
                text: raster.text.to_string(),
                width: raster.extent.width as u32,
                height: raster.extent.height as u32,
            });
        }
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.live.insert(id);
        self.counters.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn draw(&mut self, sprite: &Sprite) -> Result<(), BackendError> {
        assert!(
            self.live.contains(&sprite.texture),
            "draw after release of {}",
            sprite.texture
        );
        if self.fail_draw_for.contains(&sprite.texture) {
            return Err(BackendError::UnknownTexture(sprite.texture));
        }
        self.drawn.push(*sprite);
        self.counters.draws.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self, texture: TextureId) {
        assert!(self.live.remove(&texture), "double release of {texture}");
        self.released.push(texture);
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn begin_frame(&mut self) {
        assert!(!self.in_frame, "begin_frame inside a frame");
        self.in_frame = true;
    }

    fn end_frame(&mut self) {
        self.in_frame = false;
        self.counters.frames.fetch_add(1, Ordering::SeqCst);
    }
}
