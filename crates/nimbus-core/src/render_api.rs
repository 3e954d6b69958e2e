//! The seam between composition and a GPU (or test) renderer.

use crate::view::Scene;

/// Rasterization size for glyphs the scene does not size itself.
#[derive(Clone, Copy, Debug)]
pub struct GlyphRasterConfig {
    pub px: f32,
}

impl Default for GlyphRasterConfig {
    fn default() -> Self {
        Self { px: 18.0 }
    }
}

pub trait RenderBackend {
    fn configure_surface(&mut self, width: u32, height: u32);
    /// Draws and presents one scene. Image nodes are resolved against the
    /// thread-local image store at this point.
    fn frame(&mut self, scene: &Scene, glyph_cfg: GlyphRasterConfig);
}
