//! Caustic - CPU photon-mapping renderer
//!
//! A recursive ray tracer combined with a two-pass photon-mapping
//! global illumination estimator. Photons are shot from the lights into
//! a caustics map and a global map; the backward integrator then fuses
//! emission, direct lighting, both density estimates and a recursive
//! hemisphere gather.
//!
//! Dielectric volumes nest: both tracers carry a [`MediumStack`] that is
//! pushed when a ray enters a volume and popped when it leaves.

mod bsdf;
mod bucket;
mod camera;
mod config;
mod error;
mod hittable;
mod image_buffer;
mod kdtree;
mod light;
mod material;
mod medium;
mod photon_map;
mod photon_tracer;
mod ray;
mod renderer;
mod sampling;
mod sphere;
mod triangle;

pub use bsdf::{Bsdf, BsdfSample, SamplingType, Shading};
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use camera::Camera;
pub use config::{PhotonTracerConfig, RenderConfig, MIN_HIT_DISTANCE, SHADOW_EPSILON};
pub use error::{RenderError, RenderResult};
pub use hittable::{Geometry, GeometryList, SurfaceHit, SurfaceSampler};
pub use image_buffer::{color_to_rgba, linear_to_gamma, ImageBuffer};
pub use kdtree::KdTree;
pub use light::{AreaLight, Emission, Incident, Light, SurfaceLight};
pub use material::Material;
pub use medium::{
    Boundary, Crossing, Medium, MediumSample, MediumStack, ScatterEvent, Scattering,
    StackChange, StackTransition, VACUUM,
};
pub use photon_map::{Photon, PhotonMap, PhotonMapBuilder};
pub use photon_tracer::PhotonTracer;
pub use ray::Ray;
pub use renderer::Raytracer;
pub use sampling::gen_f32;
pub use sphere::Sphere;
pub use triangle::Triangle;

/// Re-export math types from caustic_math
pub use caustic_math::{Aabb, Frame, Vec3};

/// RGB radiance, power or reflectance.
pub type Color = Vec3;
