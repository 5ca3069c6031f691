use glam::Vec3;

use super::projection::ClipSpace;

/// Camera tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Scales hotkey rotation steps and animation duration
    /// (`rotation_speed * 0.2` seconds).
    pub rotation_speed: f32,
    /// Walk speed, world units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse motion.
    pub mouse_sensitivity: f32,
    /// Eye displacement per scroll step.
    pub zoom_step: f32,
    pub pan_speed: f32,

    pub home_eye: Vec3,
    pub home_focal: Vec3,
    pub home_up: Vec3,

    /// Vertical field of view, radians.
    pub fov_y: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub clip_space: ClipSpace,
}

impl CameraConfig {
    /// Length of reset/preset transitions, seconds.
    pub fn animation_duration(&self) -> f32 {
        self.rotation_speed * 0.2
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 2.5,
            move_speed: 3.0,
            mouse_sensitivity: 0.005,
            zoom_step: 0.2,
            pan_speed: 2.0,
            home_eye: Vec3::new(4.0, -6.0, 3.0),
            home_focal: Vec3::ZERO,
            home_up: Vec3::Z,
            fov_y: 45f32.to_radians(),
            z_near: 0.05,
            z_far: 500.0,
            clip_space: ClipSpace::YUp,
        }
    }
}
