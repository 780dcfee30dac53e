use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::notice_surface::NoticeSurface;
use super::{BatchRenderer, ContextAttempt, ContextProvider, Frame, RenderCtx, RenderSurface, RenderTarget};
use crate::device::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
use crate::viewer::{MaterialId, PrimitiveId, ViewerOptions};

/// Render surface presenting to a window through wgpu.
pub struct GpuSurface<'w> {
    gpu: Gpu<'w>,
    renderer: BatchRenderer,
    msaa: Option<MsaaTarget>,
}

struct MsaaTarget {
    size: PhysicalSize<u32>,
    view: wgpu::TextureView,
}

impl<'w> GpuSurface<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let gpu = Gpu::new(window, init).await?;
        Ok(Self {
            gpu,
            renderer: BatchRenderer::new(),
            msaa: None,
        })
    }

    fn ensure_msaa(&mut self) {
        let size = self.gpu.size();
        if self.gpu.sample_count() <= 1 {
            self.msaa = None;
            return;
        }
        if self.msaa.as_ref().is_some_and(|m| m.size == size) {
            return;
        }

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("linework msaa target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: self.gpu.sample_count(),
            dimension: wgpu::TextureDimension::D2,
            format: self.gpu.surface_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.msaa = Some(MsaaTarget { size, view });
    }
}

/// Acquires a swapchain image, reconfiguring once if the surface is stale.
pub(super) fn acquire_frame(gpu: &mut Gpu<'_>) -> Result<Option<GpuFrame>> {
    for _ in 0..2 {
        let err = match gpu.begin_frame() {
            Ok(frame) => return Ok(Some(frame)),
            Err(e) => e,
        };
        let message = err.to_string();
        match gpu.handle_surface_error(err) {
            SurfaceErrorAction::Reconfigured => log::debug!("surface reconfigured: {message}"),
            SurfaceErrorAction::SkipFrame => {
                log::debug!("frame skipped: {message}");
                return Ok(None);
            }
            SurfaceErrorAction::Fatal => anyhow::bail!("surface error: {message}"),
        }
    }
    Ok(None)
}

impl RenderSurface for GpuSurface<'_> {
    fn is_lost(&self) -> bool {
        self.gpu.is_lost()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        anyhow::ensure!(!self.gpu.is_lost(), "gpu device lost");
        let size = self.gpu.size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }

        self.ensure_msaa();
        let Some(mut gpu_frame) = acquire_frame(&mut self.gpu)? else {
            return Ok(());
        };

        {
            let ctx = RenderCtx::new(
                self.gpu.device(),
                self.gpu.queue(),
                self.gpu.surface_format(),
                self.gpu.sample_count(),
            );
            let mut target = match self.msaa.as_ref() {
                Some(msaa) => RenderTarget::new(&mut gpu_frame.encoder, &msaa.view, Some(&gpu_frame.view)),
                None => RenderTarget::new(&mut gpu_frame.encoder, &gpu_frame.view, None),
            };
            self.renderer.render(&ctx, &mut target, frame);
        }

        self.gpu.submit(gpu_frame);
        Ok(())
    }

    fn release_primitive(&mut self, id: PrimitiveId) {
        self.renderer.release_primitive(id);
    }

    fn release_material(&mut self, id: MaterialId) {
        self.renderer.release_material(id);
    }
}

/// Acquires [`GpuSurface`]s for one window, or a [`NoticeSurface`] as the
/// last resort.
pub struct WindowContext<'w> {
    window: &'w Window,
}

impl<'w> WindowContext<'w> {
    pub fn new(window: &'w Window) -> Self {
        Self { window }
    }
}

impl<'w> ContextProvider<'w> for WindowContext<'w> {
    fn acquire(
        &mut self,
        attempt: ContextAttempt,
        options: &ViewerOptions,
    ) -> Result<Box<dyn RenderSurface + 'w>> {
        let init = match attempt {
            ContextAttempt::Preferred => GpuInit::preferred(options),
            ContextAttempt::Compatible => GpuInit::compatible(),
            ContextAttempt::Placeholder => {
                let surface = pollster::block_on(NoticeSurface::new(self.window))
                    .with_context(|| format!("{attempt} render context"))?;
                return Ok(Box::new(surface));
            }
        };
        let surface = pollster::block_on(GpuSurface::new(self.window, init))
            .with_context(|| format!("{attempt} render context"))?;
        Ok(Box::new(surface))
    }
}
