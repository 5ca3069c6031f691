use anyhow::{Context, Result};

use crate::device::{Acquire, AcquiredImage, Extent, GpuContext, PresentationSurface};

/// Holds at most one open value between a `begin` and its matching `end`.
///
/// Misuse (double begin, end without begin) is a programming error and panics.
#[derive(Debug)]
pub struct FrameGate<T> {
    open: Option<T>,
}

impl<T> Default for FrameGate<T> {
    fn default() -> Self {
        Self { open: None }
    }
}

impl<T> FrameGate<T> {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn begin(&mut self, value: T) {
        assert!(self.open.is_none(), "frame already open");
        self.open = Some(value);
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.open.as_mut().expect("no frame open")
    }

    pub fn end(&mut self) -> T {
        self.open.take().expect("end_frame called without begin_frame")
    }
}

/// Returned by [`FrameOrchestrator::begin_frame`] for the frame being recorded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameInfo {
    /// Frame slot; indexes per-slot uniform buffers and bind groups.
    pub slot: usize,
    pub extent: Extent,
}

struct OpenFrame {
    info: FrameInfo,
    image: AcquiredImage,
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
}

/// Sequences acquire → record → submit → present for one frame at a time.
pub struct FrameOrchestrator {
    gate: FrameGate<OpenFrame>,
    clear_color: wgpu::Color,
}

impl FrameOrchestrator {
    pub fn new(clear_color: wgpu::Color) -> Self {
        Self {
            gate: FrameGate::default(),
            clear_color,
        }
    }

    pub fn is_frame_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Opens a frame.
    ///
    /// Applies pending resizes first. Returns `Ok(None)` when there is nothing
    /// to render this time around (minimized, surface out of date); the caller
    /// just skips the frame.
    pub fn begin_frame(
        &mut self,
        ctx: &GpuContext,
        surface: &mut PresentationSurface<'_>,
    ) -> Result<Option<FrameInfo>> {
        assert!(!self.gate.is_open(), "begin_frame called while a frame is open");

        if surface.needs_refresh() {
            surface.refresh(ctx)?;
        }

        let image = match surface.acquire_next_image(ctx)? {
            Acquire::Ready(image) => image,
            Acquire::OutOfDate => {
                surface.refresh(ctx)?;
                return Ok(None);
            }
            Acquire::Skip => return Ok(None),
        };

        let info = FrameInfo {
            slot: surface.current_slot(),
            extent: surface.extent(),
        };
        let encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("vista frame encoder"),
            });

        self.gate.begin(OpenFrame {
            info,
            image,
            encoder,
            pass: None,
        });
        Ok(Some(info))
    }

    /// Starts the main pass: clears color and depth, resolves MSAA into the
    /// swap image, viewport and scissor cover the whole extent.
    pub fn begin_render_pass(&mut self, surface: &PresentationSurface<'_>) -> Result<()> {
        let clear = self.clear_color;
        let frame = self.gate.get_mut();
        assert!(frame.pass.is_none(), "render pass already open");

        let targets = surface
            .targets()
            .context("render targets missing for an open frame")?;

        let (view, resolve_target) = match &targets.msaa_view {
            Some(msaa) => (msaa, Some(&frame.image.view)),
            None => (&frame.image.view, None),
        };

        let mut pass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("vista main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        let Extent { width, height } = frame.info.extent;
        pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        pass.set_scissor_rect(0, 0, width, height);

        frame.pass = Some(pass);
        Ok(())
    }

    /// The open render pass.
    pub fn pass(&mut self) -> &mut wgpu::RenderPass<'static> {
        self.gate
            .get_mut()
            .pass
            .as_mut()
            .expect("begin_render_pass not called")
    }

    pub fn end_render_pass(&mut self) {
        let frame = self.gate.get_mut();
        let pass = frame.pass.take();
        assert!(pass.is_some(), "end_render_pass without begin_render_pass");
        drop(pass);
    }

    /// Ends recording, submits and presents.
    ///
    /// A suboptimal swap chain or a resize during the frame is picked up by
    /// the next [`begin_frame`](Self::begin_frame).
    pub fn end_frame(&mut self, ctx: &GpuContext, surface: &mut PresentationSurface<'_>) {
        let mut frame = self.gate.end();
        // A pass still open here is closed implicitly.
        frame.pass = None;

        let commands = frame.encoder.finish();
        surface.submit_command_buffer(ctx, commands, frame.image);
        log::trace!("frame submitted on slot {}", frame.info.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── single open frame ─────────────────────────────────────────────────

    #[test]
    fn begin_then_end_returns_the_value() {
        let mut gate = FrameGate::default();
        assert!(!gate.is_open());
        gate.begin(7u32);
        assert!(gate.is_open());
        *gate.get_mut() += 1;
        assert_eq!(gate.end(), 8);
        assert!(!gate.is_open());
    }

    #[test]
    #[should_panic(expected = "frame already open")]
    fn double_begin_panics() {
        let mut gate = FrameGate::default();
        gate.begin(1u32);
        gate.begin(2u32);
    }

    #[test]
    #[should_panic(expected = "without begin_frame")]
    fn end_without_begin_panics() {
        let mut gate: FrameGate<u32> = FrameGate::default();
        gate.end();
    }

    #[test]
    fn gate_can_be_reopened_after_end() {
        let mut gate = FrameGate::default();
        for i in 0..3u32 {
            gate.begin(i);
            assert_eq!(gate.end(), i);
        }
    }
}
