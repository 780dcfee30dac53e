use core::fmt;

use crate::paint::Rgb;
use crate::viewer::{Material, MaterialCache, MaterialId, Primitive, PrimitiveId, RenderGraph, ViewerOptions};

/// An acquired render context, owned by one viewer.
///
/// Surfaces upload geometry lazily from the primitives they are asked to draw
/// and keep it until the viewer releases the primitive.
pub trait RenderSurface {
    /// True once the context is gone (device lost, surface destroyed).
    fn is_lost(&self) -> bool;

    /// New drawable size in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, frame: &Frame<'_>) -> anyhow::Result<()>;

    /// Frees GPU state held for `id`. Unknown ids are ignored.
    fn release_primitive(&mut self, id: PrimitiveId);

    /// Frees GPU state held for `id`. Unknown ids are ignored.
    fn release_material(&mut self, id: MaterialId);
}

/// Stage of the context acquisition cascade.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ContextAttempt {
    /// Options as configured.
    Preferred,
    /// Reduced requirements: fallback adapter, downlevel limits, no MSAA.
    Compatible,
    /// Last resort. The surface only clears and marks the canvas as
    /// unavailable; it never draws scene geometry.
    Placeholder,
}

impl fmt::Display for ContextAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preferred => "preferred",
            Self::Compatible => "compatible",
            Self::Placeholder => "placeholder",
        })
    }
}

/// Creates render surfaces for a viewer. `'w` bounds the surface, usually by
/// the window it presents to.
pub trait ContextProvider<'w> {
    fn acquire(
        &mut self,
        attempt: ContextAttempt,
        options: &ViewerOptions,
    ) -> anyhow::Result<Box<dyn RenderSurface + 'w>>;
}

/// Everything a surface needs to draw one frame.
pub struct Frame<'a> {
    pub graph: &'a RenderGraph,
    pub materials: &'a MaterialCache,
    /// Column-major scene-to-clip transform.
    pub view_proj: [[f32; 4]; 4],
    pub clear_color: Rgb,
    pub clear_alpha: f32,
    /// Diagnostic shown by placeholder surfaces instead of the scene.
    pub notice: Option<&'a str>,
}

impl<'a> Frame<'a> {
    /// Visible primitives with their materials, in insertion order.
    pub fn draws(&self) -> impl Iterator<Item = (&'a Primitive, &'a Material)> + 'a {
        let materials = self.materials;
        self.graph.visible().filter_map(move |p| match materials.get(p.material) {
            Some(m) => Some((p, m)),
            None => {
                log::debug!("primitive {} has no material {}", p.id.raw(), p.material.raw());
                None
            }
        })
    }

    /// Clear color as linear RGBA.
    pub fn clear_rgba(&self) -> [f64; 4] {
        let [r, g, b] = self.clear_color.to_linear_f32();
        [r as f64, g as f64, b as f64, self.clear_alpha as f64]
    }
}
