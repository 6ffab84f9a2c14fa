//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection. The
//! outward normal follows the counter-clockwise winding `v0, v1, v2`.

use std::sync::Arc;

use caustic_math::Vec3;
use rand::RngCore;

use crate::config::MIN_HIT_DISTANCE;
use crate::sampling::gen_f32;
use crate::{Geometry, Material, Ray, SurfaceHit, SurfaceSampler};

/// A single-sided-normal triangle (hit from both sides).
#[derive(Debug, Clone)]
pub struct Triangle {
    v0: Vec3,
    edge1: Vec3,
    edge2: Vec3,
    normal: Vec3,
    material: Arc<Material>,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: Arc<Material>) -> Self {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        Self {
            v0,
            edge1,
            edge2,
            normal: edge1.cross(edge2).normalize_or_zero(),
            material,
        }
    }

    /// Two triangles covering the quad `v0, v1, v2, v3` (same winding).
    pub fn quad(v0: Vec3, v1: Vec3, v2: Vec3, v3: Vec3, material: Arc<Material>) -> [Self; 2] {
        [
            Self::new(v0, v1, v2, material.clone()),
            Self::new(v0, v2, v3, material),
        ]
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

impl Geometry for Triangle {
    fn intersect<'a>(&'a self, ray: &Ray<'_>, hit: &mut SurfaceHit<'a>) -> bool {
        let h = ray.direction.cross(self.edge2);
        let a = self.edge1.dot(h);

        // Parallel to the plane
        if a.abs() < 1e-8 {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(self.edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * self.edge2.dot(q);
        if t <= MIN_HIT_DISTANCE || t >= hit.distance {
            return false;
        }

        *hit = SurfaceHit {
            distance: t,
            normal: self.normal,
            material: Some(&self.material),
            u,
            v,
        };
        true
    }
}

impl SurfaceSampler for Triangle {
    fn sample_surface(&self, _index: usize, _count: usize, rng: &mut dyn RngCore) -> (Vec3, Vec3) {
        // Fold the unit square onto the triangle
        let (mut u, mut v) = (gen_f32(rng), gen_f32(rng));
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        (self.v0 + u * self.edge1 + v * self.edge2, self.normal)
    }

    fn area(&self) -> f32 {
        0.5 * self.edge1.cross(self.edge2).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bsdf, Color, VACUUM};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn floor() -> Triangle {
        let material = Arc::new(Material::new(Bsdf::diffuse(Color::ONE)));
        // Counter-clockwise seen from above: normal +Y
        Triangle::new(
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
            material,
        )
    }

    #[test]
    fn test_triangle_hit_both_sides() {
        let tri = floor();
        assert!((tri.normal() - Vec3::Y).length() < 1e-6);

        let down = Ray::new(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, &VACUUM);
        let mut hit = SurfaceHit::new();
        assert!(tri.intersect(&down, &mut hit));
        assert!((hit.distance - 2.0).abs() < 1e-5);
        assert_eq!(hit.normal, Vec3::Y);

        let up = Ray::new(Vec3::new(0.0, -3.0, 0.0), Vec3::Y, &VACUUM);
        let mut hit = SurfaceHit::new();
        assert!(tri.intersect(&up, &mut hit));
        // Normal stays outward regardless of the ray side
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn test_triangle_miss() {
        let tri = floor();
        let outside = Ray::new(Vec3::new(5.0, 2.0, 0.0), -Vec3::Y, &VACUUM);
        let mut hit = SurfaceHit::new();
        assert!(!tri.intersect(&outside, &mut hit));

        let parallel = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X, &VACUUM);
        assert!(!tri.intersect(&parallel, &mut hit));
    }

    #[test]
    fn test_quad_sampling_stays_on_surface() {
        let material = Arc::new(Material::default());
        let quad = Triangle::quad(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            material,
        );
        let total: f32 = quad.iter().map(|t| t.area()).sum();
        assert!((total - 1.0).abs() < 1e-6);

        let mut rng = StdRng::seed_from_u64(13);
        for tri in &quad {
            for i in 0..50 {
                let (p, _) = tri.sample_surface(i, 50, &mut rng);
                assert!((p.y - 1.0).abs() < 1e-6);
                assert!((0.0..=1.0).contains(&p.x) && (0.0..=1.0).contains(&p.z));
            }
        }
    }
}
