use glam::Mat4;

/// Vertical orientation of clip space.
///
/// wgpu (like D3D and Metal) has +Y up in NDC. Vulkan-style targets have +Y
/// down and need the projection's Y scale negated.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ClipSpace {
    #[default]
    YUp,
    YDown,
}

/// Right-handed perspective projection with `[0, 1]` depth.
pub fn perspective(fov_y: f32, aspect: f32, z_near: f32, z_far: f32, clip: ClipSpace) -> Mat4 {
    let mut proj = Mat4::perspective_rh(fov_y, aspect.max(1e-3), z_near, z_far);
    if clip == ClipSpace::YDown {
        proj.y_axis.y *= -1.0;
    }
    proj
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn y_down_flips_only_the_y_scale() {
        let up = perspective(1.0, 1.5, 0.1, 100.0, ClipSpace::YUp);
        let down = perspective(1.0, 1.5, 0.1, 100.0, ClipSpace::YDown);
        assert_eq!(down.y_axis.y, -up.y_axis.y);
        assert_eq!(down.x_axis, up.x_axis);
        assert_eq!(down.z_axis, up.z_axis);
        assert_eq!(down.w_axis, up.w_axis);
    }

    #[test]
    fn point_above_axis_lands_in_upper_half_for_y_up() {
        let proj = perspective(1.0, 1.0, 0.1, 100.0, ClipSpace::YUp);
        let ndc = proj.project_point3(Vec3::new(0.0, 1.0, -5.0));
        assert!(ndc.y > 0.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn zero_aspect_does_not_produce_nan() {
        let proj = perspective(1.0, 0.0, 0.1, 100.0, ClipSpace::YUp);
        assert!(proj.is_finite());
    }
}
