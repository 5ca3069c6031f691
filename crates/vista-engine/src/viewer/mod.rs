//! The model viewer application.
//!
//! Ties the camera, scene and frame orchestration to the runtime's `App`
//! contract. GPU resources are created lazily on the first frame.

mod app;
mod bindings;
mod config;

pub use app::Viewer;
pub use bindings::{ViewerAction, camera_input, viewer_actions};
pub use config::ViewerConfig;
