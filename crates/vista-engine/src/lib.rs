//! Vista engine crate.
//!
//! Rendering core of the Vista model viewer: GPU device + presentation surface,
//! frame orchestration, bindless textures, pipelines and the navigation camera.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod camera;
pub mod geometry;
pub mod render;
pub mod viewer;
