//! The 24 axis-aligned orientations of a cube
//!
//! Rotation `r` is composed as `tilt[r % 6] * spin[r / 6]`: a spin about +Y
//! (0/90/180/270 degrees) followed by a tilt that points the up axis at one
//! of the six directions (+Z by 0/90/180/270 degrees, then +X by +90/-90).
//! Rotation 0 is the identity.

use std::sync::LazyLock;

use crate::core::types::{Mat4, Vec3};

/// Number of distinct voxel orientations
pub const ROTATION_COUNT: usize = 24;

static ROTATIONS: LazyLock<[Mat4; ROTATION_COUNT]> = LazyLock::new(|| {
    let spins = [0.0f32, 90.0, 180.0, 270.0].map(|deg| Mat4::from_rotation_y(deg.to_radians()));
    let tilts = [
        Mat4::from_rotation_z(0.0),
        Mat4::from_rotation_z(90.0f32.to_radians()),
        Mat4::from_rotation_z(180.0f32.to_radians()),
        Mat4::from_rotation_z(270.0f32.to_radians()),
        Mat4::from_rotation_x(90.0f32.to_radians()),
        Mat4::from_rotation_x((-90.0f32).to_radians()),
    ];
    std::array::from_fn(|r| tilts[r % 6] * spins[r / 6])
});

static ROTATIONS_INVERTED: LazyLock<[Mat4; ROTATION_COUNT]> = LazyLock::new(|| {
    let rotations = *ROTATIONS;
    rotations.map(|m| m.inverse())
});

/// Rotation matrix for an orientation index, `None` if out of range
pub fn rotation_matrix(rotation: u8) -> Option<&'static Mat4> {
    ROTATIONS.get(rotation as usize)
}

/// Inverse rotation matrix for an orientation index, `None` if out of range
pub fn rotation_matrix_inverted(rotation: u8) -> Option<&'static Mat4> {
    ROTATIONS_INVERTED.get(rotation as usize)
}

/// Rotate a direction vector (w = 0) by the inverse of orientation `rotation`
pub fn rotate_direction_inverted(rotation: u8, dir: Vec3) -> Option<Vec3> {
    rotation_matrix_inverted(rotation).map(|m| m.transform_vector3(dir))
}
