use anyhow::{Context, Result};
use glam::Mat4;

use crate::camera::{NavigationCamera, NavigationMode};
use crate::core::{App, AppControl, FrameCtx};
use crate::device::{GpuContext, MemoryLocation, RenderTargetLayout};
use crate::render::{
    BindlessTable, FrameOrchestrator, FrameUniforms, ModelLoader, PipelineSet, SceneState,
};

use super::bindings::{ViewerAction, camera_input, viewer_actions};
use super::config::ViewerConfig;

/// GPU resources created on the first frame, once a device exists.
struct ViewerGpu {
    bindless: BindlessTable,
    pipelines: PipelineSet,
    /// One uniform buffer per frame slot.
    uniforms: Vec<wgpu::Buffer>,
}

impl ViewerGpu {
    fn new(
        ctx: &GpuContext,
        layout: RenderTargetLayout,
        frames_in_flight: usize,
        max_textures: Option<u32>,
    ) -> Result<Self> {
        let bindless = BindlessTable::new(ctx, frames_in_flight, max_textures)?;
        let pipelines = PipelineSet::new(ctx, layout, bindless.layout());
        let uniforms = (0..frames_in_flight)
            .map(|slot| {
                ctx.create_buffer(
                    &format!("vista frame uniforms {slot}"),
                    FrameUniforms::SIZE,
                    wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    MemoryLocation::DeviceLocal,
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("creating per-frame uniform buffers")?;

        Ok(Self {
            bindless,
            pipelines,
            uniforms,
        })
    }
}

/// The model viewer: one scene, one navigation camera, dropped files replace
/// the scene.
pub struct Viewer<L> {
    config: ViewerConfig,
    loader: L,
    camera: NavigationCamera,
    mode: NavigationMode,
    scene: SceneState,
    frames: FrameOrchestrator,
    gpu: Option<ViewerGpu>,
}

impl<L: ModelLoader> Viewer<L> {
    pub fn new(config: ViewerConfig, loader: L) -> Self {
        Self {
            camera: NavigationCamera::new(config.camera.clone()),
            mode: NavigationMode::default(),
            scene: SceneState::new(config.show_grid),
            frames: FrameOrchestrator::new(config.clear_color),
            gpu: None,
            loader,
            config,
        }
    }

    pub fn camera(&self) -> &NavigationCamera {
        &self.camera
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Applies key actions; returns `Exit` if one asked to quit.
    fn apply_actions(&mut self, actions: &[ViewerAction]) -> AppControl {
        for action in actions {
            match *action {
                ViewerAction::Exit => return AppControl::Exit,
                ViewerAction::SetDisplayMode(mode) => {
                    log::debug!("display mode: {mode:?}");
                    self.scene.display_mode = mode;
                }
                ViewerAction::ToggleWalk => {
                    self.mode = self.mode.toggled();
                    log::info!("navigation mode: {:?}", self.mode);
                }
                ViewerAction::ToggleGrid => self.scene.show_grid = !self.scene.show_grid,
            }
        }
        AppControl::Continue
    }
}

impl<L: ModelLoader> App for Viewer<L> {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if self.apply_actions(&viewer_actions(ctx.input_frame)) == AppControl::Exit {
            return Ok(AppControl::Exit);
        }

        let viewport = ctx.window.physical_size();
        let input = camera_input(ctx.input, ctx.input_frame, self.mode, viewport);
        let view = self
            .camera
            .recalculate_view(&input, ctx.time.dt, ctx.time.elapsed);
        if let Some(warp) = self.camera.take_cursor_warp() {
            if !ctx.warp_cursor(warp.x, warp.y) {
                self.camera.cancel_cursor_warp();
            }
        }

        let (gpu_ctx, surface) = ctx.gpu.split_mut();

        if self.gpu.is_none() {
            let resources = ViewerGpu::new(
                gpu_ctx,
                surface.layout(),
                surface.frames_in_flight(),
                self.config.gpu.max_bindless_textures,
            )?;
            self.gpu = Some(resources);
        }
        let Some(res) = self.gpu.as_mut() else {
            return Ok(AppControl::Continue);
        };

        for path in &ctx.input_frame.dropped_files {
            match self
                .scene
                .load_file(gpu_ctx, &mut res.bindless, &mut self.loader, path)
            {
                Ok(()) => {
                    let name = path.file_name().unwrap_or(path.as_os_str());
                    let title = format!("{} - {}", self.config.runtime.title, name.to_string_lossy());
                    ctx.window.set_title(&title);
                }
                Err(e) => log::error!("{e:#}"),
            }
        }

        let Some(frame) = self.frames.begin_frame(gpu_ctx, surface)? else {
            return Ok(AppControl::Continue);
        };

        // A surface rebuild may have changed formats or sample count.
        let layout = surface.layout();
        if res.pipelines.is_stale_for(&layout) {
            res.pipelines = PipelineSet::new(gpu_ctx, layout, res.bindless.layout());
        }

        let uniforms = FrameUniforms::new(
            Mat4::IDENTITY,
            view,
            self.camera.projection(frame.extent.aspect()),
            self.camera.eye(),
        );
        let uniform_buffer = &res.uniforms[frame.slot];
        gpu_ctx
            .queue()
            .write_buffer(uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        let bind_group = res.bindless.bind_group(gpu_ctx, frame.slot, uniform_buffer);

        self.frames.begin_render_pass(surface)?;
        let pass = self.frames.pass();
        pass.set_bind_group(0, bind_group, &[]);
        self.scene.draw(pass, &res.pipelines);
        self.frames.end_render_pass();
        self.frames.end_frame(gpu_ctx, surface);

        Ok(AppControl::Continue)
    }
}
