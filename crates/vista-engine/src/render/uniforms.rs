//! GPU-visible data blocks shared with `shaders/*.wgsl`.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Per-draw immediate data (push constants).
///
/// Matches `DrawImmediates` in the shaders: `vec3` fields are 16-byte aligned,
/// so `texture_id` packs into the tail of `color`'s slot.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct DrawPushConstants {
    pub offset: [f32; 3],
    pub _pad: f32,
    pub color: [f32; 3],
    pub texture_id: u32,
}

impl DrawPushConstants {
    pub const SIZE: u32 = std::mem::size_of::<Self>() as u32;

    pub fn new(offset: [f32; 3], color: [f32; 3], texture_id: u32) -> Self {
        Self {
            offset,
            _pad: 0.0,
            color,
            texture_id,
        }
    }
}

/// Per-frame uniform block, one buffer per frame slot.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj_inverse: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _pad: f32,
}

impl FrameUniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(model: Mat4, view: Mat4, proj: Mat4, camera_pos: Vec3) -> Self {
        let normal_matrix = model.inverse().transpose();
        let view_proj_inverse = (proj * view).inverse();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: proj.to_cols_array_2d(),
            view_proj_inverse: view_proj_inverse.to_cols_array_2d(),
            camera_pos: camera_pos.to_array(),
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn push_constant_layout_matches_wgsl() {
        assert_eq!(DrawPushConstants::SIZE, 32);
        assert_eq!(offset_of!(DrawPushConstants, offset), 0);
        assert_eq!(offset_of!(DrawPushConstants, color), 16);
        assert_eq!(offset_of!(DrawPushConstants, texture_id), 28);
        assert!(DrawPushConstants::SIZE <= 128);
    }

    #[test]
    fn frame_uniform_layout_matches_wgsl() {
        assert_eq!(offset_of!(FrameUniforms, view_proj_inverse), 256);
        assert_eq!(offset_of!(FrameUniforms, camera_pos), 320);
        assert_eq!(FrameUniforms::SIZE, 336);
        assert_eq!(FrameUniforms::SIZE % 16, 0);
    }

    #[test]
    fn view_proj_inverse_round_trips_a_point() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, -5.0, 2.0), Vec3::ZERO, Vec3::Z);
        let proj = Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0);
        let u = FrameUniforms::new(Mat4::IDENTITY, view, proj, Vec3::ZERO);

        let p = Vec3::new(0.3, 0.7, -0.2);
        let clip = (proj * view).project_point3(p);
        let back = Mat4::from_cols_array_2d(&u.view_proj_inverse).project_point3(clip);
        assert!((back - p).length() < 1e-4);
    }

    #[test]
    fn normal_matrix_of_uniform_scale_keeps_direction() {
        let model = Mat4::from_scale(Vec3::splat(2.0));
        let u = FrameUniforms::new(model, Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO);
        let n = Mat4::from_cols_array_2d(&u.normal_matrix).transform_vector3(Vec3::X);
        assert!((n.normalize() - Vec3::X).length() < 1e-6);
    }
}
