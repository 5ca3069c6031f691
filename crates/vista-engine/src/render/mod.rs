//! Frame recording and scene drawing.
//!
//! - `frame`: single-open-frame orchestration over the presentation surface
//! - `bindless`: texture array shared by every draw, indexed per draw
//! - `pipelines`: wireframe / solid / textured / grid variants
//! - `scene`: loaded models packed into shared buffers
//!
//! Convention: world space is right-handed with +Z up; the grid lies on z = 0.

mod bindless;
mod frame;
mod pipelines;
mod scene;
mod uniforms;

pub use bindless::{
    BindlessTable, SlotGenerations, Texture, TextureId, TextureImage, TextureRegistry,
};
pub use frame::{FrameGate, FrameInfo, FrameOrchestrator};
pub use pipelines::{DisplayMode, IndexSource, PipelineKind, PipelineSet};
pub use scene::{
    GeometryLayout, LoadedModel, ModelInstance, ModelLoader, Range, SceneState, Vertex,
};
pub use uniforms::{DrawPushConstants, FrameUniforms};
