//! Render surfaces.
//!
//! A viewer draws through a [`RenderSurface`] obtained from a
//! [`ContextProvider`]. Geometry arrives in scene units relative to the
//! document origin; `Frame::view_proj` maps it to clip space.

mod batch_renderer;
mod ctx;
mod gpu_surface;
mod headless;
mod notice_surface;
mod surface;

pub use batch_renderer::BatchRenderer;
pub use ctx::{RenderCtx, RenderTarget};
pub use gpu_surface::{GpuSurface, WindowContext};
pub use headless::{DrawRecord, HeadlessContext, HeadlessProbe, HeadlessSurface};
pub use notice_surface::NoticeSurface;
pub use surface::{ContextAttempt, ContextProvider, Frame, RenderSurface};
