//! Single-line text on top of cosmic-text.
//!
//! One `FontSystem` and swash cache are shared by the whole process. Shaped
//! glyphs are identified by a compact [`GlyphKey`] that the renderer uses as
//! its atlas key and hands back to [`rasterize`].

use ahash::{AHashMap, AHasher};
use cosmic_text::{Attrs, Buffer, CacheKey, FontSystem, Metrics, Shaping, SwashCache, SwashImage};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::hash::{Hash, Hasher};

pub use cosmic_text::SwashContent;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey(pub u64);

#[derive(Clone, Debug)]
pub struct ShapedGlyph {
    pub key: GlyphKey,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub advance: f32,
}

pub struct GlyphBitmap {
    pub key: GlyphKey,
    pub w: u32,
    pub h: u32,
    pub content: SwashContent,
    pub data: Vec<u8>, // Mask: A8; Color/Subpixel: RGBA8
}

struct Engine {
    fs: FontSystem,
    cache: SwashCache,
    key_map: AHashMap<GlyphKey, CacheKey>,
}

impl Engine {
    fn image(&mut self, key: CacheKey) -> Option<SwashImage> {
        self.cache.get_image(&mut self.fs, key).clone()
    }

    fn shape(&mut self, text: &str, px: f32) -> Buffer {
        let mut buf = Buffer::new(&mut self.fs, Metrics::new(px, px * 1.3));
        {
            let mut b = buf.borrow_with(&mut self.fs);
            b.set_size(None, None);
            b.set_text(text, &Attrs::new(), Shaping::Advanced, None);
            b.shape_until_scroll(true);
        }
        buf
    }
}

static ENGINE: Lazy<Mutex<Engine>> = Lazy::new(|| {
    let fs = FontSystem::new();
    log::debug!("font system loaded {} faces", fs.db().len());
    Mutex::new(Engine {
        fs,
        cache: SwashCache::new(),
        key_map: AHashMap::new(),
    })
});

fn key_from_cachekey(k: &CacheKey) -> GlyphKey {
    let mut h = AHasher::default();
    k.hash(&mut h);
    GlyphKey(h.finish())
}

/// Shapes one line (no wrapping). Glyph positions are relative to the line
/// top; `y` is the baseline.
pub fn shape_line(text: &str, px: f32) -> Vec<ShapedGlyph> {
    let mut eng = ENGINE.lock();
    let buf = eng.shape(text, px);

    let mut out = Vec::new();
    for run in buf.layout_runs() {
        for g in run.glyphs {
            let phys = g.physical((0.0, run.line_y), 1.0);
            let key = key_from_cachekey(&phys.cache_key);
            eng.key_map.insert(key, phys.cache_key);

            let (w, h, left, top) = match eng.image(phys.cache_key) {
                Some(img) => (
                    img.placement.width as f32,
                    img.placement.height as f32,
                    img.placement.left as f32,
                    img.placement.top as f32,
                ),
                None => (0.0, 0.0, 0.0, 0.0),
            };

            out.push(ShapedGlyph {
                key,
                x: g.x + g.x_offset,
                y: run.line_y,
                w,
                h,
                bearing_x: left,
                bearing_y: top,
                advance: g.w,
            });
        }
    }
    out
}

/// Pixels for a key produced by [`shape_line`]; `None` for unknown keys and
/// glyphs without an image (spaces).
pub fn rasterize(key: GlyphKey) -> Option<GlyphBitmap> {
    let mut eng = ENGINE.lock();
    let ck = *eng.key_map.get(&key)?;
    let img = eng.image(ck)?;
    Some(GlyphBitmap {
        key,
        w: img.placement.width,
        h: img.placement.height,
        content: img.content,
        data: img.data,
    })
}

/// Caret positions of a single line.
#[derive(Clone, Debug, PartialEq)]
pub struct TextMetrics {
    /// positions[i] = advance up to boundary i (len == byte_offsets.len())
    pub positions: Vec<f32>,
    /// byte index per boundary, starting at 0 and ending at `text.len()`
    pub byte_offsets: Vec<usize>,
}

impl TextMetrics {
    /// Boundary at or after `byte`.
    pub fn boundary_at(&self, byte: usize) -> usize {
        match self.byte_offsets.binary_search(&byte) {
            Ok(i) | Err(i) => i.min(self.byte_offsets.len().saturating_sub(1)),
        }
    }

    /// Caret x for a byte index of the measured text.
    pub fn x_at(&self, byte: usize) -> f32 {
        self.positions
            .get(self.boundary_at(byte))
            .copied()
            .unwrap_or(0.0)
    }

    /// Byte index of the boundary closest to `x`.
    pub fn byte_near(&self, x: f32) -> usize {
        self.positions
            .iter()
            .zip(&self.byte_offsets)
            .min_by(|a, b| (a.0 - x).abs().total_cmp(&(b.0 - x).abs()))
            .map_or(0, |(_, &b)| b)
    }
}

pub fn metrics_for_textfield(text: &str, px: f32) -> TextMetrics {
    let mut eng = ENGINE.lock();
    let buf = eng.shape(text, px);

    let mut positions = vec![0.0f32];
    let mut byte_offsets = vec![0usize];
    let mut x = 0.0f32;

    for run in buf.layout_runs() {
        for g in run.glyphs {
            x = g.x + g.w;
            // Ligatures cover several chars with one glyph.
            if g.end > *byte_offsets.last().unwrap_or(&0) {
                positions.push(x);
                byte_offsets.push(g.end);
            }
        }
    }
    if *byte_offsets.last().unwrap_or(&0) != text.len() {
        positions.push(x);
        byte_offsets.push(text.len());
    }
    TextMetrics {
        positions,
        byte_offsets,
    }
}

/// Advance width of a single line.
pub fn line_width(text: &str, px: f32) -> f32 {
    metrics_for_textfield(text, px)
        .positions
        .last()
        .copied()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_one_boundary() {
        let m = metrics_for_textfield("", 16.0);
        assert_eq!(m.byte_offsets, vec![0]);
        assert_eq!(m.positions, vec![0.0]);
    }

    #[test]
    fn boundaries_end_at_text_len() {
        let t = "alice";
        let m = metrics_for_textfield(t, 16.0);
        assert_eq!(m.byte_offsets.first(), Some(&0));
        assert_eq!(m.byte_offsets.last(), Some(&t.len()));
        assert_eq!(m.positions.len(), m.byte_offsets.len());
        assert!(m.byte_offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn caret_lookup_lands_on_boundaries() {
        let m = TextMetrics {
            positions: vec![0.0, 10.0, 20.0],
            byte_offsets: vec![0, 1, 5],
        };
        assert_eq!(m.x_at(3), 20.0);
        assert_eq!(m.x_at(99), 20.0);
        assert_eq!(m.byte_near(-4.0), 0);
        assert_eq!(m.byte_near(14.0), 1);
        assert_eq!(m.byte_near(16.0), 5);
        assert_eq!(m.byte_near(500.0), 5);
    }

    #[test]
    fn unknown_key_does_not_rasterize() {
        assert!(rasterize(GlyphKey(0xdead_beef)).is_none());
    }
}
