//! GPU device + presentation surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (`GpuContext`)
//! - buffer/texture creation and synchronous one-shot uploads
//! - the swap chain, depth/MSAA targets and their resize-driven recreation
//! - per-frame-slot fences bounding the frames in flight

mod context;
mod error;
mod frame;
mod gpu;
mod init;
mod lifecycle;
mod surface;

pub use context::{GpuContext, MemoryLocation, padded_bytes_per_row, resolve_memory};
pub(crate) use context::record_buffer_to_texture;
pub use error::{GpuError, SurfaceErrorAction};
pub use frame::FrameRing;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use lifecycle::{Extent, SurfaceLifecycle, SurfaceState, rebuild_in_place};
pub use surface::{
    Acquire, AcquiredImage, DEPTH_FORMAT_CANDIDATES, PresentationSurface, RenderTargetLayout,
    RenderTargets, choose_depth_format, choose_sample_count,
};
