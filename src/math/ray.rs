//! Ray segment type and box intersection

use crate::core::types::Vec3;
use super::aabb::Aabb;

/// A ray segment running from `origin` towards a target point
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized direction
    pub direction: Vec3,
    /// Precomputed 1/direction for fast AABB intersection
    pub inv_direction: Vec3,
    /// Distance from origin to the target point
    pub length: f32,
}

impl Ray {
    /// Create a ray segment between two points
    pub fn between(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        let length = delta.length();
        let direction = delta.normalize_or_zero();
        Self {
            origin: from,
            direction,
            inv_direction: Vec3::new(
                1.0 / direction.x,
                1.0 / direction.y,
                1.0 / direction.z,
            ),
            length,
        }
    }

    /// Get point along ray at parameter t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray-AABB intersection using slab method
    /// Returns Some((t_near, t_far)) if the box is crossed within the segment
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let t1 = (aabb.min - self.origin) * self.inv_direction;
        let t2 = (aabb.max - self.origin) * self.inv_direction;

        let t_min = t1.min(t2);
        let t_max = t1.max(t2);

        let t_near = t_min.x.max(t_min.y).max(t_min.z);
        let t_far = t_max.x.min(t_max.y).min(t_max.z);

        if t_near <= t_far && t_far >= 0.0 && t_near <= self.length {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }
}

/// Intersect the segment `from..to` with the box `[min, max]`.
///
/// Returns the entry point, or `from` itself when the segment starts inside.
pub fn intersect_box(min: Vec3, max: Vec3, from: Vec3, to: Vec3) -> Option<Vec3> {
    let ray = Ray::between(from, to);
    if ray.length == 0.0 {
        return None;
    }
    ray.intersects_aabb(&Aabb::new(min, max))
        .map(|(t_near, _)| ray.at(t_near))
}

/// Snap an offset from a unit box centre to the normal of the face it lies on.
pub fn vec_to_normal(vec: Vec3) -> Vec3 {
    if vec.x >= 0.49 {
        Vec3::X
    } else if vec.x <= -0.49 {
        Vec3::NEG_X
    } else if vec.y >= 0.49 {
        Vec3::Y
    } else if vec.y <= -0.49 {
        Vec3::NEG_Y
    } else if vec.z >= 0.49 {
        Vec3::Z
    } else {
        Vec3::NEG_Z
    }
}
