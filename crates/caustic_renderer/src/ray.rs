//! Ray representation.

use crate::Medium;
use caustic_math::Vec3;

/// A ray travelling through a medium.
///
/// The medium is borrowed from the scene (or [`crate::VACUUM`]); rays are
/// cheap to copy.
#[derive(Debug, Clone, Copy)]
pub struct Ray<'m> {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    pub medium: &'m Medium,
}

impl<'m> Ray<'m> {
    /// Create a ray; `direction` is normalized.
    pub fn new(origin: Vec3, direction: Vec3, medium: &'m Medium) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            medium,
        }
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VACUUM;

    #[test]
    fn test_ray_normalizes_and_advances() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -4.0), &VACUUM);
        assert_eq!(ray.direction, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(ray.at(2.0), Vec3::new(1.0, 0.0, -2.0));
        assert_eq!(ray.medium.index, 1.0);
    }
}
