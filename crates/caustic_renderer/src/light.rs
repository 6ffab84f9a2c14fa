//! Light sources.
//!
//! Singular lights (point, directional) illuminate shading points directly.
//! Point and area lights can also emit photons for the photon tracer.

use std::fmt;
use std::sync::Arc;

use caustic_math::Vec3;
use rand::RngCore;

use crate::sampling::{uniform_hemisphere, uniform_sphere};
use crate::{Color, Geometry, Medium, RenderError, RenderResult, SurfaceSampler};

/// Distance to the shadow probe point of a directional light.
const DIRECTIONAL_SHADOW_DISTANCE: f32 = 1.0e5;

/// Uniform emission attached to a material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLight {
    pub intensity: Color,
}

impl SurfaceLight {
    pub fn new(intensity: Color) -> Self {
        Self { intensity }
    }

    /// Radiance leaving `_position` towards `_direction`.
    pub fn radiance(&self, _position: Vec3, _direction: Vec3, _normal: Vec3) -> Color {
        self.intensity
    }
}

/// Light arriving at a shading point from a singular light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incident {
    pub radiance: Color,
    /// Unit direction from the shading point towards the light
    pub direction: Vec3,
}

/// An emitted photon's starting state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub position: Vec3,
    pub direction: Vec3,
    /// This sample's share of the light's power
    pub power: Color,
}

/// Emitter backed by a surface.
#[derive(Clone)]
pub struct AreaLight {
    pub intensity: Color,
    pub shape: Arc<dyn SurfaceSampler>,
}

impl fmt::Debug for AreaLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AreaLight")
            .field("intensity", &self.intensity)
            .field("area", &self.shape.area())
            .finish()
    }
}

/// A light source.
#[derive(Debug, Clone)]
pub enum Light {
    Point {
        position: Vec3,
        intensity: Color,
        /// Medium the light sits in; vacuum when `None`
        medium: Option<Arc<Medium>>,
    },
    Directional {
        /// Unit direction the light travels in
        direction: Vec3,
        intensity: Color,
    },
    Area(AreaLight),
}

impl Light {
    pub fn point(position: Vec3, intensity: Color) -> Self {
        Light::Point {
            position,
            intensity,
            medium: None,
        }
    }

    pub fn directional(direction: Vec3, intensity: Color) -> Self {
        Light::Directional {
            direction: direction.normalize(),
            intensity,
        }
    }

    pub fn area(intensity: Color, shape: Arc<dyn SurfaceSampler>) -> Self {
        Light::Area(AreaLight { intensity, shape })
    }

    /// Place a point light inside a medium. Other lights are unchanged.
    pub fn with_medium(self, medium: Arc<Medium>) -> Self {
        match self {
            Light::Point {
                position,
                intensity,
                ..
            } => Light::Point {
                position,
                intensity,
                medium: Some(medium),
            },
            other => other,
        }
    }

    /// Medium emitted photons start in, if not vacuum.
    pub fn medium(&self) -> Option<&Medium> {
        match self {
            Light::Point { medium, .. } => medium.as_deref(),
            _ => None,
        }
    }

    /// Whether the light can be evaluated from a shading point.
    pub fn is_singular(&self) -> bool {
        matches!(self, Light::Point { .. } | Light::Directional { .. })
    }

    /// Radiance reaching `point`, or `None` when shadowed or not singular.
    pub fn radiance(&self, point: Vec3, geometry: &dyn Geometry) -> Option<Incident> {
        match self {
            Light::Point {
                position,
                intensity,
                ..
            } => {
                let to_light = *position - point;
                let distance_squared = to_light.length_squared();
                if distance_squared == 0.0 || geometry.is_in_shadow(point, *position) {
                    return None;
                }
                Some(Incident {
                    radiance: *intensity / distance_squared,
                    direction: to_light / distance_squared.sqrt(),
                })
            }
            Light::Directional {
                direction,
                intensity,
            } => {
                let probe = point - *direction * DIRECTIONAL_SHADOW_DISTANCE;
                if geometry.is_in_shadow(point, probe) {
                    return None;
                }
                Some(Incident {
                    radiance: *intensity,
                    direction: -*direction,
                })
            }
            Light::Area(_) => None,
        }
    }

    /// Draw the `index`-th of `count` photon emissions.
    pub fn sample_emission(
        &self,
        index: usize,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> RenderResult<Emission> {
        let share = count.max(1) as f32;
        match self {
            Light::Point {
                position,
                intensity,
                ..
            } => Ok(Emission {
                position: *position,
                direction: uniform_sphere(rng),
                power: *intensity / share,
            }),
            Light::Directional { .. } => Err(RenderError::EmissionUnsupported("directional light")),
            Light::Area(area) => {
                let (position, normal) = area.shape.sample_surface(index, count, rng);
                Ok(Emission {
                    position,
                    direction: uniform_hemisphere(normal, rng),
                    power: area.intensity * area.shape.area() / share,
                })
            }
        }
    }
}
