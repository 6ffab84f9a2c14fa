//! Materials bundle a surface response, the medium behind the surface
//! and optional self-emission.

use std::sync::Arc;

use caustic_math::Vec3;

use crate::{Bsdf, Medium, SamplingType, SurfaceLight};

/// Immutable material shared by any number of primitives.
#[derive(Debug, Clone)]
pub struct Material {
    /// `None` makes the surface a pure absorber (or pure emitter)
    pub bsdf: Option<Bsdf>,
    /// Medium entered when crossing the surface against its normal
    pub inside_medium: Arc<Medium>,
    pub surface_light: Option<SurfaceLight>,
}

impl Material {
    /// Surface with the given response over vacuum.
    pub fn new(bsdf: Bsdf) -> Self {
        Self {
            bsdf: Some(bsdf),
            ..Default::default()
        }
    }

    /// Emissive surface that does not reflect.
    pub fn emissive(light: SurfaceLight) -> Self {
        Self {
            surface_light: Some(light),
            ..Default::default()
        }
    }

    /// Set the medium behind the surface.
    pub fn with_inside_medium(mut self, medium: Arc<Medium>) -> Self {
        self.inside_medium = medium;
        self
    }

    /// Set the self-emission.
    pub fn with_surface_light(mut self, light: SurfaceLight) -> Self {
        self.surface_light = Some(light);
        self
    }

    /// Sampling flags; empty for surfaces without a BSDF.
    pub fn sampling_type(&self, camera_dir: Vec3, normal: Vec3) -> SamplingType {
        self.bsdf
            .as_ref()
            .map_or(SamplingType::empty(), |bsdf| bsdf.sampling_type(camera_dir, normal))
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            bsdf: None,
            inside_medium: Arc::new(Medium::vacuum()),
            surface_light: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_material_builders() {
        let glass = Arc::new(Medium::non_interacting(1.5));
        let material = Material::new(Bsdf::refractive(Color::ONE)).with_inside_medium(glass.clone());

        assert!(Arc::ptr_eq(&material.inside_medium, &glass));
        assert!(material.surface_light.is_none());
        assert!(material
            .sampling_type(Vec3::Y, Vec3::Y)
            .contains(SamplingType::CAUSTICS));
    }

    #[test]
    fn test_emissive_has_no_bsdf() {
        let lamp = Material::emissive(SurfaceLight::new(Color::splat(4.0)));
        assert!(lamp.bsdf.is_none());
        assert_eq!(lamp.inside_medium.index, 1.0);
        assert!(lamp.sampling_type(Vec3::Y, Vec3::Y).is_empty());
    }
}
