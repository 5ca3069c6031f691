use crate::device::{GpuContext, RenderTargetLayout};

use super::scene::Vertex;
use super::uniforms::DrawPushConstants;

/// Precompiled pipeline variants.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PipelineKind {
    Wireframe,
    Solid,
    Textured,
    Grid,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 4] = [
        PipelineKind::Wireframe,
        PipelineKind::Solid,
        PipelineKind::Textured,
        PipelineKind::Grid,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Which index buffer a draw reads from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexSource {
    /// Boundary-edge line list.
    Edges,
    /// Triangle list.
    Triangles,
}

/// Model display mode, selected externally (keyboard) and read once per frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DisplayMode {
    Wireframe,
    #[default]
    Solid,
    Texture,
}

impl DisplayMode {
    /// Display mode → (pipeline, index buffer) lookup table.
    const TABLE: [(DisplayMode, PipelineKind, IndexSource); 3] = [
        (DisplayMode::Wireframe, PipelineKind::Wireframe, IndexSource::Edges),
        (DisplayMode::Solid, PipelineKind::Solid, IndexSource::Triangles),
        (DisplayMode::Texture, PipelineKind::Textured, IndexSource::Triangles),
    ];

    fn entry(self) -> (PipelineKind, IndexSource) {
        Self::TABLE
            .iter()
            .find(|(mode, ..)| *mode == self)
            .map(|&(_, kind, source)| (kind, source))
            .unwrap_or((PipelineKind::Solid, IndexSource::Triangles))
    }

    pub fn pipeline(self) -> PipelineKind {
        self.entry().0
    }

    pub fn index_source(self) -> IndexSource {
        self.entry().1
    }
}

/// The four render pipelines, sharing one layout (bindless bind group +
/// per-draw immediates).
///
/// Compiled against a [`RenderTargetLayout`]; the owner rebuilds the set when
/// the layout generation changes. Shader or pipeline creation failures go to
/// wgpu's device error handler, which aborts.
pub struct PipelineSet {
    target: RenderTargetLayout,
    pipelines: [wgpu::RenderPipeline; 4],
}

impl PipelineSet {
    pub fn new(
        ctx: &GpuContext,
        target: RenderTargetLayout,
        bindless_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let device = ctx.device();

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vista scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });
        let grid_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vista grid shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/grid.wgsl").into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vista pipeline layout"),
            bind_group_layouts: &[bindless_layout],
            immediate_size: DrawPushConstants::SIZE,
        });

        let build = |kind: PipelineKind| -> wgpu::RenderPipeline {
            let desc = PipelineDesc::for_kind(kind);
            let module = if kind == PipelineKind::Grid {
                &grid_shader
            } else {
                &scene_shader
            };
            let vertex_layouts = [Vertex::layout()];
            let buffers: &[wgpu::VertexBufferLayout<'_>] =
                if desc.vertex_input { &vertex_layouts } else { &[] };

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(desc.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target.color_format,
                        blend: desc.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: desc.topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: target.depth_format,
                    depth_write_enabled: desc.depth_write,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: target.sample_count,
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            })
        };

        let pipelines = PipelineKind::ALL.map(build);
        log::debug!(
            "pipelines compiled for {:?} / {:?} ({}x)",
            target.color_format,
            target.depth_format,
            target.sample_count
        );

        Self { target, pipelines }
    }

    /// Layout the set was compiled against.
    pub fn target(&self) -> RenderTargetLayout {
        self.target
    }

    /// True if the set must be rebuilt for `target`.
    pub fn is_stale_for(&self, target: &RenderTargetLayout) -> bool {
        self.target != *target
    }

    pub fn get(&self, kind: PipelineKind) -> &wgpu::RenderPipeline {
        &self.pipelines[kind.slot()]
    }
}

/// Fixed-function state per variant.
#[derive(Debug, Clone, PartialEq)]
struct PipelineDesc {
    label: &'static str,
    fragment_entry: &'static str,
    topology: wgpu::PrimitiveTopology,
    vertex_input: bool,
    depth_write: bool,
    blend: Option<wgpu::BlendState>,
}

impl PipelineDesc {
    fn for_kind(kind: PipelineKind) -> Self {
        match kind {
            PipelineKind::Wireframe => Self {
                label: "vista wireframe pipeline",
                fragment_entry: "fs_wire",
                topology: wgpu::PrimitiveTopology::LineList,
                vertex_input: true,
                depth_write: true,
                blend: None,
            },
            PipelineKind::Solid => Self {
                label: "vista solid pipeline",
                fragment_entry: "fs_solid",
                topology: wgpu::PrimitiveTopology::TriangleList,
                vertex_input: true,
                depth_write: true,
                blend: None,
            },
            PipelineKind::Textured => Self {
                label: "vista textured pipeline",
                fragment_entry: "fs_textured",
                topology: wgpu::PrimitiveTopology::TriangleList,
                vertex_input: true,
                depth_write: true,
                blend: None,
            },
            PipelineKind::Grid => Self {
                label: "vista grid pipeline",
                fragment_entry: "fs_main",
                topology: wgpu::PrimitiveTopology::TriangleList,
                vertex_input: false,
                depth_write: false,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            },
        }
    }
}
