//! Sphere primitive.

use std::f32::consts::PI;
use std::sync::Arc;

use caustic_math::Vec3;
use rand::RngCore;

use crate::config::MIN_HIT_DISTANCE;
use crate::sampling::uniform_sphere;
use crate::{Geometry, Material, Ray, SurfaceHit, SurfaceSampler};

/// A sphere primitive.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Arc<Material>,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material: Arc<Material>) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Spherical coordinates of a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> (f32, f32) {
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

impl Geometry for Sphere {
    fn intersect<'a>(&'a self, ray: &Ray<'_>, hit: &mut SurfaceHit<'a>) -> bool {
        // Unit direction: a = 1
        let oc = self.center - ray.origin;
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - c;
        if discriminant < 0.0 {
            return false;
        }
        let sqrtd = discriminant.sqrt();

        let accept = |t: f32| t > MIN_HIT_DISTANCE && t < hit.distance;
        let root = if accept(h - sqrtd) {
            h - sqrtd
        } else if accept(h + sqrtd) {
            h + sqrtd
        } else {
            return false;
        };

        let normal = (ray.at(root) - self.center) / self.radius;
        let (u, v) = Self::sphere_uv(normal);
        *hit = SurfaceHit {
            distance: root,
            normal,
            material: Some(&self.material),
            u,
            v,
        };
        true
    }
}

impl SurfaceSampler for Sphere {
    fn sample_surface(&self, _index: usize, _count: usize, rng: &mut dyn RngCore) -> (Vec3, Vec3) {
        let normal = uniform_sphere(rng);
        (self.center + self.radius * normal, normal)
    }

    fn area(&self) -> f32 {
        4.0 * PI * self.radius * self.radius
    }
}
