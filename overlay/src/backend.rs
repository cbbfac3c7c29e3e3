//! Software graphics backend
//!
//! Keeps one RGBA framebuffer per host surface and every uploaded text
//! raster as a standalone pixmap. Drawing is plain tiny-skia compositing,
//! so the backend runs anywhere (headless demo, tests).

use std::collections::HashMap;
use std::path::Path;

use danmaku_core::{
    BackendError, Extent, FontWeight, GraphicsBackend, Sprite, TextMetrics, TextRaster, TextureId,
};
use danmaku_types::SurfaceConfig;
use thiserror::Error;
use tiny_skia::{Color, Pixmap, PixmapPaint, Transform};

use crate::context::ContextHandle;
use crate::renderer::fill_rect;
use crate::utils::color_from_rgba;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("failed to encode framebuffer: {0}")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub struct SoftwareBackend {
    context: ContextHandle,
    surface: Pixmap,
    clear_color: Color,
    textures: HashMap<TextureId, Pixmap>,
    next_texture: u64,
    max_textures: usize,
    frames: u64,
}

impl SoftwareBackend {
    pub fn new(context: ContextHandle, config: &SurfaceConfig) -> Result<Self, BackendError> {
        let surface =
            Pixmap::new(config.width, config.height).ok_or(BackendError::SurfaceAllocation {
                width: config.width,
                height: config.height,
            })?;

        tracing::debug!(
            width = config.width,
            height = config.height,
            max_textures = config.max_textures,
            "Created software surface"
        );

        Ok(Self {
            context,
            surface,
            clear_color: color_from_rgba(config.clear_color),
            textures: HashMap::new(),
            next_texture: 1,
            max_textures: config.max_textures,
            frames: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Frames presented so far
    pub fn frame(&self) -> u64 {
        self.frames
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn surface(&self) -> &Pixmap {
        &self.surface
    }

    /// Keep an already rasterized pixmap as a texture
    pub fn upload_raster(&mut self, raster: Pixmap) -> Result<TextureId, BackendError> {
        if self.textures.len() >= self.max_textures {
            return Err(BackendError::TextureBudget {
                max: self.max_textures,
            });
        }

        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, raster);
        Ok(id)
    }

    /// Write the framebuffer as PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), OverlayError> {
        self.surface.save_png(path.as_ref())?;
        tracing::info!(path = ?path.as_ref(), frame = self.frames, "Saved framebuffer");
        Ok(())
    }
}

impl TextMetrics for SoftwareBackend {
    fn measure_text(&mut self, text: &str, size: f32, weight: FontWeight) -> Extent {
        match self
            .context
            .with_renderer(|renderer| renderer.measure_text(text, size, weight))
        {
            Ok(extent) => extent,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot measure text");
                Extent::default()
            }
        }
    }
}

impl GraphicsBackend for SoftwareBackend {
    fn upload_text(&mut self, raster: &TextRaster<'_>) -> Result<TextureId, BackendError> {
        if self.textures.len() >= self.max_textures {
            return Err(BackendError::TextureBudget {
                max: self.max_textures,
            });
        }

        let color = color_from_rgba(raster.color);
        let pixmap = self
            .context
            .with_renderer(|renderer| {
                renderer.rasterize_text(raster.text, raster.size, raster.weight, color)
            })?
            .ok_or_else(|| BackendError::TextureAllocation {
                text: raster.text.to_string(),
                width: raster.extent.width.ceil() as u32,
                height: raster.extent.height.ceil() as u32,
            })?;

        self.upload_raster(pixmap)
    }

    fn draw(&mut self, sprite: &Sprite) -> Result<(), BackendError> {
        let texture = self
            .textures
            .get(&sprite.texture)
            .ok_or(BackendError::UnknownTexture(sprite.texture))?;

        self.surface.draw_pixmap(
            sprite.x.round() as i32,
            sprite.y.round() as i32,
            texture.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        if sprite.show_progress {
            let bar_height = sprite.progress_bar_height.min(sprite.extent.height);
            fill_rect(
                &mut self.surface,
                sprite.x,
                sprite.y + sprite.extent.height - bar_height,
                sprite.extent.width * sprite.progress,
                bar_height,
                color_from_rgba(sprite.progress_color),
            );
        }

        Ok(())
    }

    fn release(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            tracing::warn!(%texture, "Release of unknown texture");
        }
    }

    fn begin_frame(&mut self) {
        self.surface.fill(self.clear_color);
    }

    fn end_frame(&mut self) {
        self.frames += 1;
    }

    fn resize(&mut self, width: u32, height: u32) {
        match Pixmap::new(width, height) {
            Some(surface) => {
                tracing::debug!(width, height, "Resized software surface");
                self.surface = surface;
            }
            None => tracing::warn!(width, height, "Ignoring resize to an empty surface"),
        }
    }
}

impl std::fmt::Debug for SoftwareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareBackend")
            .field("width", &self.surface.width())
            .field("height", &self.surface.height())
            .field("textures", &self.textures.len())
            .field("frames", &self.frames)
            .finish()
    }
}
