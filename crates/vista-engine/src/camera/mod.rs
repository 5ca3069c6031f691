//! Navigation camera.
//!
//! Two modes over one eye/focal pair:
//! - orbit/pan (default): keypad hotkeys, scroll zoom, middle-drag orbit,
//!   shift+middle-drag pan, animated reset and preset views
//! - walk: WASD/E/Q movement and mouse look while the right button is held
//!
//! The camera consumes a [`CameraInput`] snapshot and time only; it never
//! touches window or GPU state.

mod config;
mod input;
mod navigation;
mod presets;
mod projection;

pub use config::CameraConfig;
pub use input::{CameraCommand, CameraInput, NavigationMode, WalkKeys};
pub use navigation::{AnimationKind, CameraState, DragKind, NavigationCamera, wrap_cursor};
pub use presets::{MAX_PRESET_DISTANCE, OrbitPreset};
pub use projection::{ClipSpace, perspective};
