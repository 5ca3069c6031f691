use glam::Vec2;

use super::presets::OrbitPreset;

/// Navigation style. The toggle lives outside the camera.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum NavigationMode {
    #[default]
    Orbit,
    Walk,
}

impl NavigationMode {
    pub fn toggled(self) -> Self {
        match self {
            NavigationMode::Orbit => NavigationMode::Walk,
            NavigationMode::Walk => NavigationMode::Orbit,
        }
    }
}

/// Discrete orbit actions, normally bound to the keypad.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CameraCommand {
    RotateLeft,
    RotateRight,
    RotateUp,
    RotateDown,
    ResetHome,
    Preset(OrbitPreset),
}

/// Walk-mode movement keys held this frame.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct WalkKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

/// Everything the camera reads for one frame.
///
/// Built once per frame from the window input state; the camera never sees
/// platform events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraInput {
    pub mode: NavigationMode,
    /// Actions this frame. Held rotate keys repeat every frame.
    pub commands: Vec<CameraCommand>,
    /// Accumulated wheel steps; positive zooms in.
    pub scroll: f32,
    /// Cursor position in physical pixels.
    pub cursor: Option<Vec2>,
    /// Framebuffer size in physical pixels.
    pub viewport: Vec2,
    pub middle_down: bool,
    pub right_down: bool,
    pub shift: bool,
    pub walk: WalkKeys,
}
