use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};

use crate::device::GpuContext;
use crate::geometry::boundary_edges;

use super::bindless::{BindlessTable, TextureId, TextureImage};
use super::pipelines::{DisplayMode, IndexSource, PipelineKind, PipelineSet};
use super::uniforms::DrawPushConstants;

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2  // uv
    ];

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// One mesh as produced by a [`ModelLoader`]. Indices are local to `vertices`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub color: [f32; 3],
    pub offset: [f32; 3],
    pub texture: Option<TextureImage>,
}

/// Turns a dropped file into meshes. Parsing and image decoding live behind
/// this trait.
pub trait ModelLoader {
    fn load(&mut self, path: &Path) -> Result<Vec<LoadedModel>>;
}

/// A `[first, first + count)` span inside a shared buffer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Range {
    pub first: u32,
    pub count: u32,
}

impl Range {
    pub fn end(self) -> u32 {
        self.first + self.count
    }

    pub fn as_std(self) -> std::ops::Range<u32> {
        self.first..self.end()
    }
}

/// A loaded model: spans into the shared vertex/index/edge buffers plus its
/// per-draw immediates.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub name: String,
    pub vertices: Range,
    pub indices: Range,
    pub edges: Range,
    pub color: [f32; 3],
    pub offset: [f32; 3],
    pub texture_id: TextureId,
}

impl ModelInstance {
    pub fn push_constants(&self) -> DrawPushConstants {
        DrawPushConstants::new(self.offset, self.color, self.texture_id.0)
    }

    pub fn index_range(&self, source: IndexSource) -> std::ops::Range<u32> {
        match source {
            IndexSource::Edges => self.edges.as_std(),
            IndexSource::Triangles => self.indices.as_std(),
        }
    }
}

/// CPU image of the shared scene buffers.
///
/// Every model's vertices are appended to one vertex stream; its triangle and
/// boundary-edge indices stay model-local and are drawn with the model's
/// vertex offset as base vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryLayout {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub edges: Vec<u32>,
    pub instances: Vec<ModelInstance>,
}

impl GeometryLayout {
    /// Packs `models` in order. Each model comes with the texture index it was
    /// given in the bindless table.
    pub fn pack<'m>(models: impl IntoIterator<Item = (&'m LoadedModel, TextureId)>) -> Self {
        let mut out = Self::default();

        for (model, texture_id) in models {
            let edges = boundary_edges(&model.indices);

            let vertices = span(out.vertices.len(), model.vertices.len());
            let indices = span(out.indices.len(), model.indices.len());
            let edge_span = span(out.edges.len(), edges.len());

            out.vertices.extend_from_slice(&model.vertices);
            out.indices.extend_from_slice(&model.indices);
            out.edges.extend_from_slice(&edges);

            out.instances.push(ModelInstance {
                name: model.name.clone(),
                vertices,
                indices,
                edges: edge_span,
                color: model.color,
                offset: model.offset,
                texture_id,
            });
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

fn span(first: usize, count: usize) -> Range {
    Range {
        first: first as u32,
        count: count as u32,
    }
}

struct SceneBuffers {
    vertex: wgpu::Buffer,
    index: Option<wgpu::Buffer>,
    edge: Option<wgpu::Buffer>,
}

/// Everything the draw routine needs besides the frame: loaded models, their
/// shared GPU buffers, the display mode and grid toggle.
///
/// Owned by the viewer and passed to [`draw`](Self::draw) each frame.
pub struct SceneState {
    pub display_mode: DisplayMode,
    pub show_grid: bool,
    instances: Vec<ModelInstance>,
    buffers: Option<SceneBuffers>,
    vertex_count: u32,
    index_count: u32,
    edge_count: u32,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::default(),
            show_grid: true,
            instances: Vec::new(),
            buffers: None,
            vertex_count: 0,
            index_count: 0,
            edge_count: 0,
        }
    }
}

impl SceneState {
    pub fn new(show_grid: bool) -> Self {
        Self {
            show_grid,
            ..Self::default()
        }
    }

    pub fn instances(&self) -> &[ModelInstance] {
        &self.instances
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    /// Releases all models, their buffers and their textures.
    ///
    /// The caller must have drained the GPU: in-flight frames may still
    /// reference the buffers.
    pub fn clear(&mut self, bindless: &mut BindlessTable) {
        self.instances.clear();
        self.buffers = None;
        self.vertex_count = 0;
        self.index_count = 0;
        self.edge_count = 0;
        bindless.clear();
    }

    /// Replaces the scene with the contents of `path`.
    ///
    /// Waits for the device to go idle, releases the previous scene, then runs
    /// `loader` and uploads what it returns. On error the scene stays empty.
    pub fn load_file(
        &mut self,
        ctx: &GpuContext,
        bindless: &mut BindlessTable,
        loader: &mut dyn ModelLoader,
        path: &Path,
    ) -> Result<()> {
        let mut target = GpuScene {
            scene: self,
            ctx,
            bindless,
        };
        replace_scene(&mut target, loader, path)?;

        log::info!(
            "loaded {}: {} models, {} vertices, {} textures",
            path.display(),
            self.instances.len(),
            self.vertex_count,
            bindless.len() - 1
        );
        Ok(())
    }

    /// Uploads `models` into fresh shared buffers.
    pub fn rebuild(
        &mut self,
        ctx: &GpuContext,
        bindless: &mut BindlessTable,
        models: &[LoadedModel],
    ) -> Result<()> {
        let layout = prepare_layout(models, |image| bindless.append_texture(ctx, image))?;
        if layout.vertices.is_empty() {
            self.instances = layout.instances;
            return Ok(());
        }

        let vertex = ctx.create_buffer_init(
            "vista vertex buffer",
            bytemuck::cast_slice(&layout.vertices),
            wgpu::BufferUsages::VERTEX,
        )?;
        let index = non_empty_index_buffer(ctx, "vista index buffer", &layout.indices)?;
        let edge = non_empty_index_buffer(ctx, "vista edge buffer", &layout.edges)?;

        self.vertex_count = layout.vertices.len() as u32;
        self.index_count = layout.indices.len() as u32;
        self.edge_count = layout.edges.len() as u32;
        self.instances = layout.instances;
        self.buffers = Some(SceneBuffers {
            vertex,
            index,
            edge,
        });
        Ok(())
    }

    /// Records the scene into `pass`. The bindless bind group for the current
    /// frame slot must already be bound at group 0.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipelines: &PipelineSet) {
        if let Some(buffers) = &self.buffers {
            let source = self.display_mode.index_source();
            let index_buffer = match source {
                IndexSource::Edges => buffers.edge.as_ref(),
                IndexSource::Triangles => buffers.index.as_ref(),
            };

            if let Some(index_buffer) = index_buffer {
                pass.set_pipeline(pipelines.get(self.display_mode.pipeline()));
                pass.set_vertex_buffer(0, buffers.vertex.slice(..));
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for instance in &self.instances {
                    let range = instance.index_range(source);
                    if range.is_empty() {
                        continue;
                    }
                    let pc = instance.push_constants();
                    pass.set_immediates(0, bytemuck::bytes_of(&pc));
                    pass.draw_indexed(range, instance.vertices.first as i32, 0..1);
                }
            }
        }

        if self.show_grid {
            pass.set_pipeline(pipelines.get(PipelineKind::Grid));
            pass.set_immediates(0, bytemuck::bytes_of(&DrawPushConstants::default()));
            pass.draw(0..6, 0..1);
        }
    }
}

/// The device-side half of a scene swap.
trait SceneUpload {
    /// Blocks until no submitted frame can still read the current scene.
    fn drain(&mut self) -> Result<()>;
    fn clear(&mut self);
    fn upload(&mut self, models: &[LoadedModel]) -> Result<()>;
}

struct GpuScene<'a> {
    scene: &'a mut SceneState,
    ctx: &'a GpuContext,
    bindless: &'a mut BindlessTable,
}

impl SceneUpload for GpuScene<'_> {
    fn drain(&mut self) -> Result<()> {
        Ok(self.ctx.wait_idle()?)
    }

    fn clear(&mut self) {
        self.scene.clear(self.bindless);
    }

    fn upload(&mut self, models: &[LoadedModel]) -> Result<()> {
        self.scene.rebuild(self.ctx, self.bindless, models)
    }
}

/// Drain, clear, load, upload. A failure after the clear leaves `target`
/// empty, including textures appended by a partial upload.
fn replace_scene(
    target: &mut impl SceneUpload,
    loader: &mut dyn ModelLoader,
    path: &Path,
) -> Result<()> {
    target
        .drain()
        .context("waiting idle before replacing the scene")?;
    target.clear();

    let models = loader
        .load(path)
        .with_context(|| format!("loading {}", path.display()))?;
    if let Err(err) = target.upload(&models) {
        target.clear();
        return Err(err);
    }
    Ok(())
}

/// Gives every textured model a bindless index through `append`, then packs.
fn prepare_layout(
    models: &[LoadedModel],
    mut append: impl FnMut(&TextureImage) -> Result<TextureId>,
) -> Result<GeometryLayout> {
    let texture_ids = models
        .iter()
        .map(|m| match &m.texture {
            Some(image) => append(image).with_context(|| format!("texture of model '{}'", m.name)),
            None => Ok(TextureId::PLACEHOLDER),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GeometryLayout::pack(models.iter().zip(texture_ids)))
}

fn non_empty_index_buffer(
    ctx: &GpuContext,
    label: &str,
    indices: &[u32],
) -> Result<Option<wgpu::Buffer>> {
    if indices.is_empty() {
        return Ok(None);
    }
    ctx.create_buffer_init(label, bytemuck::cast_slice(indices), wgpu::BufferUsages::INDEX)
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::bindless::TextureRegistry;

    fn triangle_strip(name: &str, vertex_count: u32) -> LoadedModel {
        let vertices = (0..vertex_count)
            .map(|i| Vertex::new([i as f32, (i % 2) as f32, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]))
            .collect();
        let indices = (0..vertex_count - 2).flat_map(|i| [i, i + 1, i + 2]).collect();
        LoadedModel {
            name: name.to_string(),
            vertices,
            indices,
            color: [0.1, 0.5, 0.9],
            offset: [1.0, 0.0, 0.0],
            texture: None,
        }
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn ranges_are_contiguous_and_indices_stay_local() {
        let a = triangle_strip("a", 4);
        let b = triangle_strip("b", 5);
        let layout = GeometryLayout::pack([(&a, TextureId(0)), (&b, TextureId(0))]);

        let [ia, ib] = &layout.instances[..] else {
            panic!("expected two instances");
        };
        assert_eq!(ia.vertices, Range { first: 0, count: 4 });
        assert_eq!(ib.vertices, Range { first: 4, count: 5 });
        assert_eq!(ia.indices.end(), ib.indices.first);
        assert_eq!(ia.edges.end(), ib.edges.first);
        assert_eq!(layout.edges.len() as u32, ib.edges.end());

        // B's indices are not rebased; the draw supplies the base vertex.
        assert_eq!(&layout.indices[ib.indices.as_std().start as usize..][..3], &[0, 1, 2]);
    }

    #[test]
    fn edges_come_from_each_model_alone() {
        let quad = LoadedModel {
            indices: vec![0, 1, 2, 1, 3, 2],
            ..triangle_strip("quad", 4)
        };
        let layout = GeometryLayout::pack([(&quad, TextureId(0))]);
        assert_eq!(layout.edges, vec![0, 1, 0, 2, 1, 3, 2, 3]);
        assert_eq!(
            layout.instances[0].index_range(IndexSource::Edges),
            0..8
        );
        assert_eq!(
            layout.instances[0].index_range(IndexSource::Triangles),
            0..6
        );
    }

    #[test]
    fn push_constants_carry_offset_color_and_texture() {
        let m = triangle_strip("m", 3);
        let layout = GeometryLayout::pack([(&m, TextureId(4))]);
        let pc = layout.instances[0].push_constants();
        assert_eq!(pc.offset, [1.0, 0.0, 0.0]);
        assert_eq!(pc.color, [0.1, 0.5, 0.9]);
        assert_eq!(pc.texture_id, 4);
    }

    // ── scene replacement ─────────────────────────────────────────────────

    /// Loader over a fixed set of in-memory files.
    struct Files(Vec<(&'static str, Vec<LoadedModel>)>);

    impl ModelLoader for Files {
        fn load(&mut self, path: &Path) -> Result<Vec<LoadedModel>> {
            self.0
                .iter()
                .find(|(name, _)| Path::new(name) == path)
                .map(|(_, models)| models.clone())
                .context("no such file")
        }
    }

    /// CPU stand-in for the GPU scene: a texture registry and the packed
    /// layout, plus a log of the steps taken.
    struct CpuScene {
        textures: TextureRegistry<(u32, u32)>,
        layout: Option<GeometryLayout>,
        steps: Vec<&'static str>,
        fail_upload: bool,
    }

    impl CpuScene {
        fn new() -> Self {
            Self {
                textures: TextureRegistry::new(64, (1, 1)),
                layout: None,
                steps: Vec::new(),
                fail_upload: false,
            }
        }
    }

    impl SceneUpload for CpuScene {
        fn drain(&mut self) -> Result<()> {
            self.steps.push("drain");
            Ok(())
        }

        fn clear(&mut self) {
            self.steps.push("clear");
            self.textures.reset();
            self.layout = None;
        }

        fn upload(&mut self, models: &[LoadedModel]) -> Result<()> {
            self.steps.push("upload");
            let textures = &mut self.textures;
            let layout =
                prepare_layout(models, |image| Ok(textures.append((image.width, image.height))?))?;
            if self.fail_upload {
                anyhow::bail!("out of device memory");
            }
            self.layout = Some(layout);
            Ok(())
        }
    }

    fn files() -> Files {
        let a = LoadedModel {
            texture: Some(TextureImage::solid([200, 10, 10, 255])),
            ..triangle_strip("a", 2048)
        };
        Files(vec![("a.obj", vec![a]), ("b.obj", vec![triangle_strip("b", 10)])])
    }

    #[test]
    fn loading_b_after_a_keeps_only_b() {
        let mut loader = files();
        let mut scene = CpuScene::new();

        replace_scene(&mut scene, &mut loader, Path::new("a.obj")).unwrap();
        let a = scene.layout.as_ref().unwrap();
        assert_eq!(a.vertices.len(), 2048);
        assert_eq!(a.instances[0].texture_id, TextureId(1));
        assert_eq!(scene.textures.len(), 2);

        replace_scene(&mut scene, &mut loader, Path::new("b.obj")).unwrap();
        let b = scene.layout.as_ref().unwrap();
        assert_eq!(b.vertices.len(), 10);
        assert_eq!(b.indices.len(), 24);
        assert_eq!(b.instances.len(), 1);
        assert_eq!(b.instances[0].name, "b");
        assert!(b.edges.iter().all(|&i| i < 10));
        assert_eq!(scene.textures.len(), 1, "only the placeholder remains");
    }

    #[test]
    fn failing_loader_leaves_the_scene_empty() {
        let mut loader = files();
        let mut scene = CpuScene::new();
        replace_scene(&mut scene, &mut loader, Path::new("a.obj")).unwrap();
        scene.steps.clear();

        let err = replace_scene(&mut scene, &mut loader, Path::new("missing.obj")).unwrap_err();

        assert!(format!("{err:#}").contains("missing.obj"));
        assert_eq!(scene.steps, ["drain", "clear"]);
        assert!(scene.layout.is_none());
        assert_eq!(scene.textures.len(), 1);
    }

    #[test]
    fn failed_upload_releases_textures_it_appended() {
        let mut loader = files();
        let mut scene = CpuScene::new();
        scene.fail_upload = true;

        let err = replace_scene(&mut scene, &mut loader, Path::new("a.obj")).unwrap_err();

        assert!(err.to_string().contains("out of device memory"));
        assert_eq!(scene.steps, ["drain", "clear", "upload", "clear"]);
        assert!(scene.layout.is_none());
        assert_eq!(scene.textures.len(), 1);
    }

    #[test]
    fn texture_capacity_error_names_the_model() {
        let mut loader = files();
        let mut scene = CpuScene::new();
        scene.textures = TextureRegistry::new(1, (1, 1));

        let err = replace_scene(&mut scene, &mut loader, Path::new("a.obj")).unwrap_err();

        assert!(format!("{err:#}").contains("texture of model 'a'"));
        assert!(scene.layout.is_none());
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = Vertex::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn new_scene_shows_grid_in_solid_mode() {
        let scene = SceneState::default();
        assert_eq!(scene.display_mode, DisplayMode::Solid);
        assert!(scene.show_grid);
        assert!(scene.instances().is_empty());
    }
}
