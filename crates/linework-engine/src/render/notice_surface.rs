use anyhow::Result;
use winit::window::Window;

use super::batch_renderer::clear_color;
use super::gpu_surface::acquire_frame;
use super::{Frame, RenderSurface};
use crate::device::{Gpu, GpuFrame, GpuInit};
use crate::paint::Rgb;
use crate::viewer::{MaterialId, PrimitiveId};

/// Banner color marking an unavailable canvas.
const BANNER: Rgb = Rgb(0xd9822b);

/// Placeholder surface for a window whose scene renderer could not start.
///
/// Builds no pipelines and compiles no shaders. Each frame clears to the
/// background and, when the swapchain accepts texture writes, paints a banner
/// across the top. The surface follows the window size on its own because a
/// degraded viewer rejects resizes.
pub struct NoticeSurface<'w> {
    gpu: Gpu<'w>,
    window: &'w Window,
}

impl<'w> NoticeSurface<'w> {
    pub async fn new(window: &'w Window) -> Result<Self> {
        let gpu = Gpu::new(window, GpuInit::placeholder()).await?;
        Ok(Self { gpu, window })
    }

    fn write_banner(&self, texture: &wgpu::Texture) {
        if !self.gpu.surface_usage().contains(wgpu::TextureUsages::COPY_DST) {
            return;
        }
        let size = self.gpu.size();
        let rows = banner_rows(size.height);
        let Some(pixels) = banner_pixels(self.gpu.surface_format(), size.width, rows, BANNER) else {
            log::debug!("no banner for surface format {:?}", self.gpu.surface_format());
            return;
        };

        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(rows),
            },
            wgpu::Extent3d {
                width: size.width,
                height: rows,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl RenderSurface for NoticeSurface<'_> {
    fn is_lost(&self) -> bool {
        self.gpu.is_lost()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(winit::dpi::PhysicalSize::new(width, height));
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        anyhow::ensure!(!self.gpu.is_lost(), "gpu device lost");

        let size = self.window.inner_size();
        if size != self.gpu.size() {
            self.gpu.resize(size);
        }
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        let Some(GpuFrame {
            surface_texture,
            view,
            mut encoder,
        }) = acquire_frame(&mut self.gpu)?
        else {
            return Ok(());
        };

        let clear = clear_color(frame.clear_color, frame.clear_alpha, self.gpu.surface_format().is_srgb());
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("linework notice pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        // Texture writes run ahead of the next submission, so the clear is
        // submitted first and an empty submission flushes the banner after it.
        let queue = self.gpu.queue();
        queue.submit(std::iter::once(encoder.finish()));
        self.write_banner(&surface_texture.texture);
        queue.submit(std::iter::empty());

        if let Some(notice) = frame.notice {
            log::debug!("placeholder drawn: {notice}");
        }
        drop(view);
        surface_texture.present();
        Ok(())
    }

    fn release_primitive(&mut self, _id: PrimitiveId) {}

    fn release_material(&mut self, _id: MaterialId) {}
}

/// Banner height: a twelfth of the canvas, at least 4 rows.
fn banner_rows(height: u32) -> u32 {
    (height / 12).max(4).min(height)
}

/// Tightly packed banner rows in the byte order of `format`. Only 8-bit RGBA
/// and BGRA formats are supported. Bytes are sRGB-encoded, which both the
/// sRGB and the plain variants display as the intended color.
fn banner_pixels(format: wgpu::TextureFormat, width: u32, rows: u32, color: Rgb) -> Option<Vec<u8>> {
    use wgpu::TextureFormat::*;

    let (r, g, b) = (color.r(), color.g(), color.b());
    let texel = match format {
        Rgba8Unorm | Rgba8UnormSrgb => [r, g, b, 0xff],
        Bgra8Unorm | Bgra8UnormSrgb => [b, g, r, 0xff],
        _ => return None,
    };
    let count = width as usize * rows as usize;
    Some(texel.repeat(count))
}
