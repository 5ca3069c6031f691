//! CPU-side model preprocessing.
//!
//! - boundary-edge extraction feeding the wireframe pipeline
//! - mip chain generation for uploaded textures

mod edges;
mod mips;

pub use edges::boundary_edges;
pub use mips::{MipLevel, generate_mip_chain, mip_level_count};
