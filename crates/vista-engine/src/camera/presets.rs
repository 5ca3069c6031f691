use glam::Vec3;

/// Fixed orbit views. Each is an (axis, up) pair; the eye moves to
/// `focal + distance * axis`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OrbitPreset {
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
    Isometric,
    InverseIsometric,
}

/// Presets never place the eye further than this from the focal point.
pub const MAX_PRESET_DISTANCE: f32 = 100.0;

impl OrbitPreset {
    pub const ALL: [OrbitPreset; 8] = [
        OrbitPreset::Front,
        OrbitPreset::Back,
        OrbitPreset::Left,
        OrbitPreset::Right,
        OrbitPreset::Top,
        OrbitPreset::Bottom,
        OrbitPreset::Isometric,
        OrbitPreset::InverseIsometric,
    ];

    /// Unit direction from the focal point to the eye.
    pub fn axis(self) -> Vec3 {
        match self {
            OrbitPreset::Front => Vec3::NEG_Y,
            OrbitPreset::Back => Vec3::Y,
            OrbitPreset::Left => Vec3::NEG_X,
            OrbitPreset::Right => Vec3::X,
            OrbitPreset::Top => Vec3::Z,
            OrbitPreset::Bottom => Vec3::NEG_Z,
            OrbitPreset::Isometric => Vec3::new(1.0, -1.0, 1.0).normalize(),
            OrbitPreset::InverseIsometric => Vec3::new(-1.0, 1.0, 1.0).normalize(),
        }
    }

    pub fn up(self) -> Vec3 {
        match self {
            OrbitPreset::Top => Vec3::NEG_Y,
            OrbitPreset::Bottom => Vec3::Y,
            _ => Vec3::Z,
        }
    }

    /// Eye position for this preset around `focal`, keeping the current
    /// eye-focal distance (clamped to [`MAX_PRESET_DISTANCE`]).
    pub fn target_eye(self, eye: Vec3, focal: Vec3) -> Vec3 {
        let distance = focal.distance(eye).clamp(0.0, MAX_PRESET_DISTANCE);
        focal + distance * self.axis()
    }
}
