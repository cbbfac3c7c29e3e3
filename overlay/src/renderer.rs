//! Software text renderer using tiny-skia and cosmic-text
//!
//! Shapes danmaku text, measures it, and rasterizes it into standalone
//! RGBA pixmaps that the backend keeps as textures.
use std::collections::HashMap;

use cosmic_text::{
    Attrs, Buffer, Color as CosmicColor, Family, FontSystem, LayoutGlyph, Metrics, Shaping,
    SwashCache, Weight,
};
use danmaku_core::{Extent, FontWeight};
use tiny_skia::{Color, Paint, Pixmap, PixmapMut, Rect, Transform};

/// Maximum entries in the text shaping cache (LRU eviction when exceeded)
const TEXT_CACHE_MAX_ENTRIES: usize = 512;

/// Line height relative to font size
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Cached result of text shaping
struct ShapedText {
    glyphs: Vec<LayoutGlyph>,
    width: f32,
    height: f32,
    /// Baseline offset from the top of the first line
    baseline: f32,
    /// LRU tracking: incremented on each access
    last_used: u64,
}

/// Key for text cache: (text content, font size in tenths, weight)
type TextCacheKey = (String, u32, FontWeight);

/// Shaping cache and glyph rasterizer
pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    family: String,
    text_cache: HashMap<TextCacheKey, ShapedText>,
    cache_access_counter: u64,
}

impl Renderer {
    pub fn new(font_system: FontSystem, family: impl Into<String>) -> Self {
        Self {
            font_system,
            swash_cache: SwashCache::new(),
            family: family.into(),
            text_cache: HashMap::with_capacity(256),
            cache_access_counter: 0,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn cached_entries(&self) -> usize {
        self.text_cache.len()
    }

    /// Evict least recently used entries if cache is too large
    fn evict_lru_if_needed(&mut self) {
        if self.text_cache.len() <= TEXT_CACHE_MAX_ENTRIES {
            return;
        }

        // Drop the oldest quarter
        let target_size = TEXT_CACHE_MAX_ENTRIES * 3 / 4;
        let mut entries: Vec<_> = self
            .text_cache
            .iter()
            .map(|(k, v)| (k.clone(), v.last_used))
            .collect();
        entries.sort_by_key(|(_, last_used)| *last_used);

        let excess = self.text_cache.len() - target_size;
        for (key, _) in entries.into_iter().take(excess) {
            self.text_cache.remove(&key);
        }
    }

    fn cache_key(text: &str, size: f32, weight: FontWeight) -> TextCacheKey {
        (text.to_string(), (size * 10.0).round() as u32, weight)
    }

    /// Shape `text` if it is not cached yet, returning its cache key
    fn ensure_shaped(&mut self, text: &str, size: f32, weight: FontWeight) -> TextCacheKey {
        let key = Self::cache_key(text, size, weight);

        self.cache_access_counter += 1;
        let current_access = self.cache_access_counter;

        if let Some(cached) = self.text_cache.get_mut(&key) {
            cached.last_used = current_access;
            return key;
        }

        let metrics = Metrics::new(size, size * LINE_HEIGHT_FACTOR);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);

        let attrs = Attrs::new()
            .family(Family::Name(&self.family))
            .weight(match weight {
                FontWeight::Normal => Weight::NORMAL,
                FontWeight::Bold => Weight::BOLD,
            });
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let mut glyphs = Vec::new();
        let mut width = 0.0f32;
        let mut height = 0.0f32;
        let mut baseline = None;

        for run in buffer.layout_runs() {
            width = width.max(run.line_w);
            height += run.line_height;
            baseline.get_or_insert(run.line_y);
            glyphs.extend(run.glyphs.iter().cloned());
        }

        self.text_cache.insert(
            key.clone(),
            ShapedText {
                glyphs,
                width,
                height,
                baseline: baseline.unwrap_or(size),
                last_used: current_access,
            },
        );
        self.evict_lru_if_needed();

        key
    }

    /// Measure text dimensions (uses shaping cache)
    pub fn measure_text(&mut self, text: &str, size: f32, weight: FontWeight) -> Extent {
        if !is_shapeable(size) {
            return Extent::default();
        }
        let key = self.ensure_shaped(text, size, weight);
        self.text_cache
            .get(&key)
            .map(|shaped| Extent::new(shaped.width, shaped.height))
            .unwrap_or_default()
    }

    /// Rasterize text into a transparent pixmap of the measured extent
    ///
    /// Returns `None` when the extent is empty or no glyph produced coverage.
    pub fn rasterize_text(
        &mut self,
        text: &str,
        size: f32,
        weight: FontWeight,
        color: Color,
    ) -> Option<Pixmap> {
        if !is_shapeable(size) {
            return None;
        }
        let key = self.ensure_shaped(text, size, weight);
        let (glyphs, extent, baseline) = {
            let shaped = self.text_cache.get(&key)?;
            (
                shaped.glyphs.clone(),
                Extent::new(shaped.width, shaped.height),
                shaped.baseline,
            )
        };
        if extent.is_empty() {
            return None;
        }

        let mut pixmap = Pixmap::new(extent.width.ceil() as u32, extent.height.ceil() as u32)?;
        let text_color = cosmic_color(color);
        let mut covered = false;

        {
            let mut target = pixmap.as_mut();
            for glyph in &glyphs {
                let physical = glyph.physical((0.0, baseline), 1.0);

                if let Some(image) = self
                    .swash_cache
                    .get_image(&mut self.font_system, physical.cache_key)
                {
                    covered |= image.data.iter().any(|&a| a != 0);
                    draw_glyph_to_pixmap(
                        &mut target,
                        &image.data,
                        image.placement.width,
                        image.placement.height,
                        physical.x + image.placement.left,
                        physical.y - image.placement.top,
                        text_color,
                    );
                }
            }
        }

        covered.then_some(pixmap)
    }
}

/// cosmic-text rejects a zero line height
fn is_shapeable(size: f32) -> bool {
    size.is_finite() && size > 0.0
}

/// Convert a tiny-skia color to a cosmic-text color
fn cosmic_color(color: Color) -> CosmicColor {
    let c = color.to_color_u8();
    CosmicColor::rgba(c.red(), c.green(), c.blue(), c.alpha())
}

/// Fill an axis-aligned rectangle
pub fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let Some(rect) = Rect::from_xywh(x, y, w, h) else {
        return;
    };

    let mut paint = Paint::default();
    paint.set_color(color);
    paint.anti_alias = false;

    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}

/// Draw a glyph coverage mask onto a pixmap with alpha blending
fn draw_glyph_to_pixmap(
    pixmap: &mut PixmapMut,
    glyph_data: &[u8],
    glyph_width: u32,
    glyph_height: u32,
    dest_x: i32,
    dest_y: i32,
    color: CosmicColor,
) {
    let pixmap_width = pixmap.width() as i32;
    let pixmap_height = pixmap.height() as i32;
    let data = pixmap.data_mut();

    for gy in 0..glyph_height as i32 {
        let py = dest_y + gy;
        if py < 0 || py >= pixmap_height {
            continue;
        }

        for gx in 0..glyph_width as i32 {
            let px = dest_x + gx;
            if px < 0 || px >= pixmap_width {
                continue;
            }

            let Some(&alpha) = glyph_data.get((gy as u32 * glyph_width + gx as u32) as usize)
            else {
                continue;
            };
            if alpha == 0 {
                continue;
            }

            let i = ((py * pixmap_width + px) * 4) as usize;
            if i + 3 >= data.len() {
                continue;
            }

            // Premultiplied source-over
            let src_a = (alpha as u32 * color.a() as u32) / 255;
            let inv_a = 255 - src_a;

            data[i] = ((color.r() as u32 * src_a + data[i] as u32 * inv_a) / 255) as u8;
            data[i + 1] = ((color.g() as u32 * src_a + data[i + 1] as u32 * inv_a) / 255) as u8;
            data[i + 2] = ((color.b() as u32 * src_a + data[i + 2] as u32 * inv_a) / 255) as u8;
            data[i + 3] = (src_a + (data[i + 3] as u32 * inv_a) / 255) as u8;
        }
    }
}
