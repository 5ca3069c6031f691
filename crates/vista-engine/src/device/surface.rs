use anyhow::{Context, Result, anyhow};

use super::context::GpuContext;
use super::frame::FrameRing;
use super::lifecycle::{Extent, SurfaceLifecycle, rebuild_in_place};
use super::{GpuError, GpuInit, SurfaceErrorAction};

/// Depth formats tried in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [wgpu::TextureFormat; 3] = [
    wgpu::TextureFormat::Depth32Float,
    wgpu::TextureFormat::Depth24PlusStencil8,
    wgpu::TextureFormat::Depth24Plus,
];

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        for f in preferred {
            if caps.formats.contains(&f) {
                return Some(f);
            }
        }
    }

    Some(caps.formats[0])
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Picks the first candidate the adapter can render depth into.
pub fn choose_depth_format(
    candidates: &[wgpu::TextureFormat],
    renderable: impl Fn(wgpu::TextureFormat) -> bool,
) -> std::result::Result<wgpu::TextureFormat, GpuError> {
    candidates
        .iter()
        .copied()
        .find(|f| renderable(*f))
        .ok_or(GpuError::UnsupportedDepthFormat)
}

/// Largest power-of-two sample count `<= requested` that `flags` supports.
pub fn choose_sample_count(flags: wgpu::TextureFormatFeatureFlags, requested: u32) -> u32 {
    let mut count = requested.max(1).next_power_of_two();
    if count > requested.max(1) {
        count /= 2;
    }
    while count > 1 {
        if flags.sample_count_supported(count) {
            return count;
        }
        count /= 2;
    }
    1
}

/// Attachment formats every pipeline is compiled against.
///
/// This plays the role of a render pass object: it survives swap-chain
/// recreation and only changes (bumping `generation`) when the surface format
/// does, which tells pipeline owners to recompile.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderTargetLayout {
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub generation: u64,
}

impl RenderTargetLayout {
    /// The layout for a new surface format, or `None` if `format` is the
    /// current one. The sample count is chosen again from `flags`, the
    /// features shared by the new color format and the depth format.
    pub fn with_color_format(
        self,
        format: wgpu::TextureFormat,
        flags: wgpu::TextureFormatFeatureFlags,
        requested_samples: u32,
    ) -> Option<Self> {
        (format != self.color_format).then(|| Self {
            color_format: format,
            sample_count: choose_sample_count(flags, requested_samples),
            generation: self.generation + 1,
            ..self
        })
    }
}

/// Feature flags both attachments support, as far as MSAA is concerned.
fn attachment_flags(
    adapter: &wgpu::Adapter,
    color: wgpu::TextureFormat,
    depth: wgpu::TextureFormat,
) -> wgpu::TextureFormatFeatureFlags {
    adapter.get_texture_format_features(color).flags
        & adapter.get_texture_format_features(depth).flags
}

/// Image-dependent attachments, rebuilt on every refresh.
pub struct RenderTargets {
    pub extent: Extent,
    pub depth_view: wgpu::TextureView,
    /// Multisampled color target resolving into the swap image. `None` at 1x.
    pub msaa_view: Option<wgpu::TextureView>,
}

/// A swap image ready to be rendered into.
pub struct AcquiredImage {
    pub texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

/// Outcome of [`PresentationSurface::acquire_next_image`].
pub enum Acquire {
    Ready(AcquiredImage),
    /// Surface is invalid; recreate and retry next frame, do not render.
    OutOfDate,
    /// Nothing to render this frame (zero area, timeout).
    Skip,
}

/// Swap chain, depth/MSAA targets and per-frame-slot fences.
pub struct PresentationSurface<'w> {
    /// Surface bound to the window; the window must outlive it.
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
    prefer_srgb: bool,
    requested_samples: u32,
    lifecycle: SurfaceLifecycle,
    layout: RenderTargetLayout,
    targets: Option<RenderTargets>,
    frames: FrameRing<wgpu::SubmissionIndex>,
}

impl<'w> PresentationSurface<'w> {
    /// Configures `surface` and builds the first set of targets.
    pub fn new(
        ctx: &GpuContext,
        surface: wgpu::Surface<'w>,
        extent: Extent,
        init: &GpuInit,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(ctx.adapter());
        let color_format = choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = choose_alpha_mode(&caps, init.alpha_mode);

        let adapter = ctx.adapter();
        let depth_format = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |f| {
            adapter
                .get_texture_format_features(f)
                .allowed_usages
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        })?;

        let flags = attachment_flags(adapter, color_format, depth_format);
        let sample_count = choose_sample_count(flags, init.sample_count);

        log::info!(
            "surface: color {color_format:?}, depth {depth_format:?}, {sample_count}x MSAA, {} frames in flight",
            init.frames_in_flight
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: color_format,
            width: extent.width.max(1),
            height: extent.height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        let mut this = Self {
            surface,
            config,
            prefer_srgb: init.prefer_srgb,
            requested_samples: init.sample_count,
            lifecycle: SurfaceLifecycle::new(),
            layout: RenderTargetLayout {
                color_format,
                depth_format,
                sample_count,
                generation: 0,
            },
            targets: None,
            frames: FrameRing::new(init.frames_in_flight),
        };

        this.lifecycle.request_resize(extent);
        this.refresh(ctx)?;
        Ok(this)
    }

    pub fn layout(&self) -> RenderTargetLayout {
        self.layout
    }

    pub fn extent(&self) -> Extent {
        self.lifecycle.extent()
    }

    pub fn lifecycle(&self) -> &SurfaceLifecycle {
        &self.lifecycle
    }

    pub fn targets(&self) -> Option<&RenderTargets> {
        self.targets.as_ref()
    }

    /// Frame slot the next frame records into.
    pub fn current_slot(&self) -> usize {
        self.frames.current()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    /// Swap-chain latency hint the surface was configured with.
    pub fn frame_latency(&self) -> u32 {
        self.config.desired_maximum_frame_latency
    }

    /// Records a resize. Nothing is rebuilt until [`refresh`](Self::refresh).
    pub fn request_resize(&mut self, extent: Extent) {
        log::debug!("resize requested: {}x{}", extent.width, extent.height);
        self.lifecycle.request_resize(extent);
    }

    pub fn needs_refresh(&self) -> bool {
        self.lifecycle.needs_refresh()
    }

    /// Recreates the swap chain and image-dependent targets.
    ///
    /// Waits for the device to go idle first so no in-flight frame still
    /// references the old targets. The target layout (our render pass) is
    /// reused unless the surface format changed.
    pub fn refresh(&mut self, ctx: &GpuContext) -> Result<()> {
        let Some(extent) = self.lifecycle.begin_refresh() else {
            log::debug!("surface refresh deferred (zero area)");
            return Ok(());
        };

        ctx.wait_idle().context("waiting idle before surface recreation")?;
        self.frames.clear_signals();
        self.targets = None;

        let caps = self.surface.get_capabilities(ctx.adapter());
        if let Some(format) = choose_surface_format(&caps, self.prefer_srgb) {
            let flags = attachment_flags(ctx.adapter(), format, self.layout.depth_format);
            if let Some(layout) = self
                .layout
                .with_color_format(format, flags, self.requested_samples)
            {
                log::info!(
                    "surface format changed {:?} -> {format:?}, {}x MSAA",
                    self.layout.color_format,
                    layout.sample_count
                );
                self.layout = layout;
                self.config.format = format;
            }
        }

        self.config.width = extent.width;
        self.config.height = extent.height;
        self.surface.configure(ctx.device(), &self.config);

        let layout = self.layout;
        rebuild_in_place(&mut self.targets, || build_targets(ctx, layout, extent))?;
        self.lifecycle.finish_refresh(extent);

        log::debug!("surface rebuilt at {}x{}", extent.width, extent.height);
        Ok(())
    }

    /// Waits for the slot about to be reused, then acquires the next swap image.
    ///
    /// The fence wait bounds the number of frames queued on the GPU to the
    /// number of frame slots.
    pub fn acquire_next_image(&mut self, ctx: &GpuContext) -> Result<Acquire> {
        if !self.lifecycle.is_ready() {
            return Ok(Acquire::Skip);
        }

        self.frames
            .wait_current(|index| ctx.wait_for(index))
            .context("waiting on frame slot fence")?;

        match self.surface.get_current_texture() {
            Ok(texture) => {
                if texture.suboptimal {
                    // Render this one; recreate at the next boundary.
                    self.lifecycle.mark_out_of_date();
                }
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(Acquire::Ready(AcquiredImage { texture, view }))
            }
            Err(err) => match SurfaceErrorAction::classify(&err) {
                SurfaceErrorAction::Reconfigured => {
                    log::warn!("swap chain out of date: {err}");
                    self.lifecycle.mark_out_of_date();
                    Ok(Acquire::OutOfDate)
                }
                SurfaceErrorAction::SkipFrame => {
                    log::debug!("skipping frame: {err}");
                    Ok(Acquire::Skip)
                }
                SurfaceErrorAction::Fatal => Err(anyhow!("failed to acquire swap image: {err}")),
            },
        }
    }

    /// Submits the frame's commands, records the slot fence and presents.
    ///
    /// The slot index advances only after presentation.
    pub fn submit_command_buffer(
        &mut self,
        ctx: &GpuContext,
        commands: wgpu::CommandBuffer,
        image: AcquiredImage,
    ) {
        let index = ctx.queue().submit(std::iter::once(commands));
        self.frames.signal(index);

        drop(image.view);
        image.texture.present();

        self.frames.advance();
    }

    /// Marks the surface destroyed. The owner waits idle before dropping it.
    pub fn destroy(&mut self) {
        self.targets = None;
        self.lifecycle.destroy();
    }
}

fn build_targets(
    ctx: &GpuContext,
    layout: RenderTargetLayout,
    extent: Extent,
) -> std::result::Result<RenderTargets, GpuError> {
    let depth = ctx.create_texture(
        "vista depth target",
        extent.width,
        extent.height,
        layout.depth_format,
        1,
        layout.sample_count,
        wgpu::TextureUsages::RENDER_ATTACHMENT,
    )?;
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    let msaa_view = if layout.sample_count > 1 {
        let color = ctx.create_texture(
            "vista msaa color target",
            extent.width,
            extent.height,
            layout.color_format,
            1,
            layout.sample_count,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        )?;
        Some(color.create_view(&wgpu::TextureViewDescriptor::default()))
    } else {
        None
    };

    Ok(RenderTargets {
        extent,
        depth_view,
        msaa_view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── depth format ──────────────────────────────────────────────────────

    #[test]
    fn depth_format_prefers_first_renderable() {
        let f = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |f| {
            f != wgpu::TextureFormat::Depth32Float
        });
        assert_eq!(f, Ok(wgpu::TextureFormat::Depth24PlusStencil8));
    }

    #[test]
    fn no_renderable_depth_format_is_an_error() {
        let f = choose_depth_format(&DEPTH_FORMAT_CANDIDATES, |_| false);
        assert_eq!(f, Err(GpuError::UnsupportedDepthFormat));
    }

    // ── sample count ──────────────────────────────────────────────────────

    #[test]
    fn sample_count_uses_requested_when_supported() {
        let flags = wgpu::TextureFormatFeatureFlags::MULTISAMPLE_X4;
        assert_eq!(choose_sample_count(flags, 4), 4);
    }

    #[test]
    fn sample_count_falls_back_to_lower_supported() {
        let flags = wgpu::TextureFormatFeatureFlags::MULTISAMPLE_X2;
        assert_eq!(choose_sample_count(flags, 8), 2);
    }

    #[test]
    fn sample_count_non_power_of_two_rounds_down() {
        let flags = wgpu::TextureFormatFeatureFlags::MULTISAMPLE_X4;
        assert_eq!(choose_sample_count(flags, 6), 4);
    }

    #[test]
    fn sample_count_without_support_is_one() {
        let flags = wgpu::TextureFormatFeatureFlags::empty();
        assert_eq!(choose_sample_count(flags, 4), 1);
        assert_eq!(choose_sample_count(flags, 0), 1);
    }

    // ── format change ─────────────────────────────────────────────────────

    fn bgra_4x() -> RenderTargetLayout {
        RenderTargetLayout {
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            depth_format: wgpu::TextureFormat::Depth32Float,
            sample_count: 4,
            generation: 3,
        }
    }

    #[test]
    fn same_format_keeps_the_layout() {
        let layout = bgra_4x();
        let flags = wgpu::TextureFormatFeatureFlags::empty();
        assert_eq!(
            layout.with_color_format(wgpu::TextureFormat::Bgra8UnormSrgb, flags, 4),
            None
        );
    }

    #[test]
    fn new_format_without_msaa_drops_to_one_sample() {
        let flags = wgpu::TextureFormatFeatureFlags::empty();
        let next = bgra_4x()
            .with_color_format(wgpu::TextureFormat::Rgba16Float, flags, 4)
            .unwrap();
        assert_eq!(next.color_format, wgpu::TextureFormat::Rgba16Float);
        assert_eq!(next.depth_format, wgpu::TextureFormat::Depth32Float);
        assert_eq!(next.sample_count, 1);
        assert_eq!(next.generation, 4);
    }

    #[test]
    fn new_format_with_msaa_keeps_requested_samples() {
        let flags = wgpu::TextureFormatFeatureFlags::MULTISAMPLE_X4;
        let next = RenderTargetLayout {
            sample_count: 1,
            ..bgra_4x()
        }
        .with_color_format(wgpu::TextureFormat::Rgba8UnormSrgb, flags, 4)
        .unwrap();
        assert_eq!(next.sample_count, 4);
        assert_eq!(next.generation, 4);
    }
}
