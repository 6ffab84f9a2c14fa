//! Geometry capability: closest-hit queries and shadow tests.

use std::sync::Arc;

use caustic_math::Vec3;
use rand::RngCore;

use crate::config::SHADOW_EPSILON;
use crate::{Material, Ray, VACUUM};

/// Closest intersection found so far along a ray.
///
/// `distance` starts at infinity and doubles as the search limit: a
/// primitive only records a hit closer than the current value.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit<'a> {
    pub distance: f32,
    /// Outward geometric normal (not flipped towards the ray)
    pub normal: Vec3,
    pub material: Option<&'a Material>,
    /// Surface parameterisation at the hit
    pub u: f32,
    pub v: f32,
}

impl<'a> SurfaceHit<'a> {
    pub fn new() -> Self {
        Self::within(f32::INFINITY)
    }

    /// A query that ignores anything at or beyond `max_distance`.
    pub fn within(max_distance: f32) -> Self {
        Self {
            distance: max_distance,
            normal: Vec3::ZERO,
            material: None,
            u: 0.0,
            v: 0.0,
        }
    }

    /// True once a primitive has recorded an intersection.
    pub fn is_hit(&self) -> bool {
        self.material.is_some()
    }
}

impl Default for SurfaceHit<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything a ray can intersect.
pub trait Geometry: Send + Sync {
    /// Record the intersection in `hit` if it is closer than `hit.distance`.
    ///
    /// Returns true if `hit` was updated.
    fn intersect<'a>(&'a self, ray: &Ray<'_>, hit: &mut SurfaceHit<'a>) -> bool;

    /// True if something blocks the segment `from -> to`.
    fn is_in_shadow(&self, from: Vec3, to: Vec3) -> bool {
        let segment = to - from;
        let length = segment.length();
        if length <= SHADOW_EPSILON {
            return false;
        }
        let ray = Ray::new(from, segment, &VACUUM);
        let mut hit = SurfaceHit::within(length - SHADOW_EPSILON);
        self.intersect(&ray, &mut hit)
    }
}

/// Surfaces that can produce points for light emission.
pub trait SurfaceSampler: Send + Sync {
    /// Point and outward normal for the `index`-th of `count` samples.
    fn sample_surface(&self, index: usize, count: usize, rng: &mut dyn RngCore) -> (Vec3, Vec3);

    /// Total surface area.
    fn area(&self) -> f32;
}

/// A linear list of geometry.
#[derive(Default)]
pub struct GeometryList {
    objects: Vec<Arc<dyn Geometry>>,
}

impl GeometryList {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub fn add(&mut self, object: impl Geometry + 'static) {
        self.objects.push(Arc::new(object));
    }

    /// Add geometry that is also referenced elsewhere (e.g. by an area light).
    pub fn add_shared(&mut self, object: Arc<dyn Geometry>) {
        self.objects.push(object);
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Geometry for GeometryList {
    fn intersect<'a>(&'a self, ray: &Ray<'_>, hit: &mut SurfaceHit<'a>) -> bool {
        let mut hit_anything = false;
        for object in &self.objects {
            hit_anything |= object.intersect(ray, hit);
        }
        hit_anything
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bsdf, Sphere};

    fn grey() -> Arc<Material> {
        Arc::new(Material::new(Bsdf::diffuse(Vec3::splat(0.5))))
    }

    #[test]
    fn test_list_keeps_closest() {
        let mut list = GeometryList::new();
        list.add(Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, grey()));
        list.add(Sphere::new(Vec3::new(0.0, 0.0, -4.0), 1.0, grey()));
        assert_eq!(list.len(), 2);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z, &VACUUM);
        let mut hit = SurfaceHit::new();
        assert!(list.intersect(&ray, &mut hit));
        assert!((hit.distance - 3.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_list_miss() {
        let mut list = GeometryList::new();
        list.add(Sphere::new(Vec3::new(0.0, 0.0, -4.0), 1.0, grey()));

        let ray = Ray::new(Vec3::ZERO, Vec3::Y, &VACUUM);
        let mut hit = SurfaceHit::new();
        assert!(!list.intersect(&ray, &mut hit));
        assert!(!hit.is_hit());
        assert_eq!(hit.distance, f32::INFINITY);
    }

    #[test]
    fn test_shadow_segment() {
        let mut list = GeometryList::new();
        list.add(Sphere::new(Vec3::new(0.0, 0.0, -4.0), 1.0, grey()));

        assert!(list.is_in_shadow(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0)));
        // Segment ends before the sphere
        assert!(!list.is_in_shadow(Vec3::ZERO, Vec3::new(0.0, 0.0, -2.0)));
        assert!(!list.is_in_shadow(Vec3::ZERO, Vec3::new(0.0, 10.0, 0.0)));
    }
}
