use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::{Extent, GpuContext, GpuInit, PresentationSurface};

/// GPU state bound to one window.
///
/// Construction order is context first, then surface. Field order makes the
/// drop order the reverse: the surface is released before the device.
pub struct Gpu<'w> {
    surface: PresentationSurface<'w>,
    context: GpuContext,
}

impl<'w> Gpu<'w> {
    /// Creates the device and presentation surface for `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu. Every failure in
    /// here is fatal for the viewer.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Surface lifetime is tied to `window` via `'w`.
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let context = GpuContext::new(instance, &surface, &init).await?;
        let surface = PresentationSurface::new(
            &context,
            surface,
            Extent::new(size.width, size.height),
            &init,
        )?;

        Ok(Self { surface, context })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn surface(&self) -> &PresentationSurface<'w> {
        &self.surface
    }

    /// Borrows the context immutably and the surface mutably at the same time.
    pub fn split_mut(&mut self) -> (&GpuContext, &mut PresentationSurface<'w>) {
        (&self.context, &mut self.surface)
    }

    /// Records a window resize; applied at the next frame boundary.
    pub fn request_resize(&mut self, size: PhysicalSize<u32>) {
        self.surface
            .request_resize(Extent::new(size.width, size.height));
    }
}

impl Drop for Gpu<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("failed to drain GPU work on shutdown: {e}");
        }
        self.surface.destroy();
    }
}
