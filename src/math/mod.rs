//! Mathematical utilities

pub mod aabb;
pub mod ray;
pub mod rotation;

pub use aabb::Aabb;
pub use ray::{Ray, intersect_box, vec_to_normal};
pub use rotation::{ROTATION_COUNT, rotation_matrix, rotation_matrix_inverted};
