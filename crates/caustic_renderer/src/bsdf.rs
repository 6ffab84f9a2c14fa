//! Surface scattering functions.
//!
//! Every variant answers four questions: the point-wise value
//! ([`Bsdf::evaluate`]), an importance-sampled continuation direction with
//! its Monte-Carlo weight ([`Bsdf::sample`]), which lighting strategies
//! apply ([`Bsdf::sampling_type`]) and how many gather rays are useful
//! ([`Bsdf::max_samples`]).
//!
//! Delta distributions (mirror, refraction) cannot be evaluated point-wise
//! and always evaluate to zero; they are driven purely by sampling.

use std::f32::consts::PI;

use bitflags::bitflags;
use caustic_math::{Frame, Vec3};
use rand::RngCore;

use crate::medium::{Boundary, Medium};
use crate::sampling::{gen_f32, uniform_hemisphere};
use crate::Color;

bitflags! {
    /// Lighting strategies a surface supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SamplingType: u8 {
        /// Point-evaluable; receives direct light from singular sources
        const SINGULAR = 1 << 0;
        /// Supports stochastic gathering through `sample`
        const MULTIPLE_SAMPLE = 1 << 1;
        /// Specular; seeds and propagates caustic paths
        const CAUSTICS = 1 << 2;
    }
}

/// Geometric and volumetric context of a shading point.
#[derive(Debug, Clone, Copy)]
pub struct Shading<'m> {
    pub point: Vec3,
    /// Outward surface normal
    pub normal: Vec3,
    pub inside: &'m Medium,
    pub outside: &'m Medium,
}

impl<'m> Shading<'m> {
    pub fn new(point: Vec3, normal: Vec3, boundary: &Boundary<'m>) -> Self {
        Self {
            point,
            normal,
            inside: boundary.inside,
            outside: boundary.outside,
        }
    }

    /// Refractive index ratio `inside / outside`.
    #[inline]
    pub fn index_ratio(&self) -> f32 {
        self.inside.index / self.outside.index
    }
}

/// A sampled continuation direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BsdfSample {
    pub direction: Vec3,
    /// Throughput factor, already divided by the number of samples drawn
    pub weight: Color,
}

/// Lambertian reflector.
#[derive(Debug, Clone, PartialEq)]
pub struct Diffuse {
    /// Albedo pre-divided by pi
    coefficients: Color,
}

impl Diffuse {
    pub fn new(albedo: Color) -> Self {
        Self {
            coefficients: albedo / PI,
        }
    }

    fn evaluate(&self, normal: Vec3, in_dir: Vec3, out_dir: Vec3) -> Color {
        if normal.dot(in_dir) * normal.dot(out_dir) < 0.0 {
            Color::ZERO
        } else {
            self.coefficients
        }
    }

    /// Cosine-weighted hemisphere draw. The cosine cancels the pdf, so the
    /// weight is `pi / n` rather than `2 pi / n`.
    fn sample(&self, sample_count: usize, normal: Vec3, rng: &mut dyn RngCore) -> BsdfSample {
        let phi = 2.0 * PI * gen_f32(rng);
        let sin_theta = gen_f32(rng).sqrt();
        let cos_theta = (1.0 - sin_theta * sin_theta).max(0.0).sqrt();

        let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
        BsdfSample {
            direction: Frame::from_normal(normal).to_world(local),
            weight: self.coefficients * (PI / sample_count as f32),
        }
    }
}

/// Phong lobe around the mirror direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Phong {
    coefficients: Color,
    exponent: f32,
}

impl Phong {
    pub fn new(coefficients: Color, exponent: f32) -> Self {
        Self {
            coefficients,
            exponent,
        }
    }

    fn evaluate(&self, normal: Vec3, in_dir: Vec3, out_dir: Vec3) -> Color {
        let mirrored = caustic_math::reflect(in_dir, normal);
        self.coefficients * mirrored.dot(out_dir).max(0.0).powf(self.exponent)
    }
}

/// Perfect mirror.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflective {
    reflectance: Color,
}

impl Reflective {
    pub fn new(reflectance: Color) -> Self {
        Self { reflectance }
    }

    fn sample(&self, normal: Vec3, camera_dir: Vec3) -> BsdfSample {
        BsdfSample {
            direction: -camera_dir + 2.0 * normal.dot(camera_dir) * normal,
            weight: self.reflectance,
        }
    }
}

/// Ideal dielectric transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct Refractive {
    transmittance: Color,
}

impl Refractive {
    pub fn new(transmittance: Color) -> Self {
        Self { transmittance }
    }

    /// Refract the direction towards the camera through a surface with
    /// outward `normal` and index ratio `inside / outside`.
    ///
    /// Returns the transmitted travel direction, or the mirror direction on
    /// total internal reflection.
    pub fn refract_ray(camera_dir: Vec3, normal: Vec3, ratio: f32) -> Vec3 {
        let cos_a = normal.dot(camera_dir);
        // eta = n_from / n_to, with the camera on the "from" side
        let (normal, cos_a, eta) = if cos_a < 0.0 {
            (-normal, -cos_a, ratio)
        } else {
            (normal, cos_a, 1.0 / ratio)
        };

        let cos2_b = 1.0 - eta * eta * (1.0 - cos_a * cos_a);
        if cos2_b < 0.0 {
            return -camera_dir + 2.0 * cos_a * normal;
        }

        let tangent = (camera_dir - cos_a * normal).normalize_or_zero();
        let sin_b = (1.0 - cos2_b).max(0.0).sqrt();
        -cos2_b.sqrt() * normal - sin_b * tangent
    }

    fn sample(&self, ctx: &Shading<'_>, camera_dir: Vec3) -> BsdfSample {
        BsdfSample {
            direction: Self::refract_ray(camera_dir, ctx.normal, ctx.index_ratio()),
            weight: self.transmittance,
        }
    }
}

/// Surface scattering function of a material.
#[derive(Debug, Clone, PartialEq)]
pub enum Bsdf {
    Diffuse(Diffuse),
    Phong(Phong),
    Reflective(Reflective),
    Refractive(Refractive),
    /// Fixed 50/50 split: sample 0 reflects, every other sample refracts
    ReflectiveRefractive {
        reflective: Reflective,
        refractive: Refractive,
    },
    /// Translucent solid: refracts light in from outside and scatters it
    /// diffusely out of the surface
    TransmissiveDiffuse {
        diffuse: Diffuse,
        refractive: Refractive,
    },
}

impl Bsdf {
    /// Lambertian surface with the given albedo.
    pub fn diffuse(albedo: Color) -> Self {
        Bsdf::Diffuse(Diffuse::new(albedo))
    }

    pub fn phong(coefficients: Color, exponent: f32) -> Self {
        Bsdf::Phong(Phong::new(coefficients, exponent))
    }

    pub fn reflective(reflectance: Color) -> Self {
        Bsdf::Reflective(Reflective::new(reflectance))
    }

    pub fn refractive(transmittance: Color) -> Self {
        Bsdf::Refractive(Refractive::new(transmittance))
    }

    pub fn reflective_refractive(reflectance: Color, transmittance: Color) -> Self {
        Bsdf::ReflectiveRefractive {
            reflective: Reflective::new(reflectance),
            refractive: Refractive::new(transmittance),
        }
    }

    pub fn transmissive_diffuse(albedo: Color, transmittance: Color) -> Self {
        Bsdf::TransmissiveDiffuse {
            diffuse: Diffuse::new(albedo),
            refractive: Refractive::new(transmittance),
        }
    }

    /// Value of the distribution for light arriving along `in_dir` and
    /// leaving along `out_dir` (both pointing away from the surface).
    pub fn evaluate(&self, ctx: &Shading<'_>, in_dir: Vec3, out_dir: Vec3) -> Color {
        let n = ctx.normal;
        match self {
            Bsdf::Diffuse(diffuse) => diffuse.evaluate(n, in_dir, out_dir),
            Bsdf::Phong(phong) => phong.evaluate(n, in_dir, out_dir),
            Bsdf::Reflective(_) | Bsdf::Refractive(_) | Bsdf::ReflectiveRefractive { .. } => {
                Color::ZERO
            }
            Bsdf::TransmissiveDiffuse { diffuse, .. } => {
                let cos_out = n.dot(out_dir);
                if in_dir.dot(n) < 0.0 && cos_out > 0.0 {
                    let refracted = Refractive::refract_ray(in_dir, n, ctx.index_ratio());
                    diffuse.coefficients / cos_out * refracted.dot(out_dir).max(0.0)
                } else {
                    Color::ZERO
                }
            }
        }
    }

    /// Draw the `ray_index`-th of `sample_count` continuation directions
    /// for a ray arriving from `camera_dir`.
    pub fn sample(
        &self,
        ray_index: usize,
        sample_count: usize,
        ctx: &Shading<'_>,
        camera_dir: Vec3,
        rng: &mut dyn RngCore,
    ) -> BsdfSample {
        match self {
            Bsdf::Diffuse(diffuse) => diffuse.sample(sample_count, ctx.normal, rng),
            Bsdf::Phong(_) => self.sample_hemisphere(sample_count, ctx, camera_dir, rng),
            Bsdf::Reflective(reflective) => reflective.sample(ctx.normal, camera_dir),
            Bsdf::Refractive(refractive) => refractive.sample(ctx, camera_dir),
            Bsdf::ReflectiveRefractive {
                reflective,
                refractive,
            } => {
                if ray_index == 0 {
                    reflective.sample(ctx.normal, camera_dir)
                } else {
                    refractive.sample(ctx, camera_dir)
                }
            }
            Bsdf::TransmissiveDiffuse {
                diffuse,
                refractive,
            } => {
                if camera_dir.dot(ctx.normal) < 0.0 {
                    diffuse.sample(sample_count, ctx.normal, rng)
                } else {
                    refractive.sample(ctx, camera_dir)
                }
            }
        }
    }

    /// Uniform hemisphere fallback for variants without a matched sampler.
    fn sample_hemisphere(
        &self,
        sample_count: usize,
        ctx: &Shading<'_>,
        camera_dir: Vec3,
        rng: &mut dyn RngCore,
    ) -> BsdfSample {
        let direction = uniform_hemisphere(ctx.normal, rng);
        let scale = direction.dot(ctx.normal) * 2.0 * PI / sample_count as f32;
        BsdfSample {
            direction,
            weight: self.evaluate(ctx, direction, camera_dir) * scale,
        }
    }

    pub fn sampling_type(&self, camera_dir: Vec3, normal: Vec3) -> SamplingType {
        match self {
            Bsdf::Diffuse(_) | Bsdf::Phong(_) => {
                SamplingType::SINGULAR | SamplingType::MULTIPLE_SAMPLE
            }
            Bsdf::Reflective(_) | Bsdf::Refractive(_) | Bsdf::ReflectiveRefractive { .. } => {
                SamplingType::MULTIPLE_SAMPLE | SamplingType::CAUSTICS
            }
            Bsdf::TransmissiveDiffuse { .. } => {
                if camera_dir.dot(normal) > 0.0 {
                    SamplingType::MULTIPLE_SAMPLE | SamplingType::CAUSTICS
                } else {
                    SamplingType::SINGULAR | SamplingType::MULTIPLE_SAMPLE
                }
            }
        }
    }

    /// Upper bound on useful gather rays; `usize::MAX` means unbounded.
    pub fn max_samples(&self, camera_dir: Vec3, normal: Vec3) -> usize {
        match self {
            Bsdf::Diffuse(_) | Bsdf::Phong(_) => usize::MAX,
            Bsdf::Reflective(_) | Bsdf::Refractive(_) => 1,
            Bsdf::ReflectiveRefractive { .. } => 2,
            Bsdf::TransmissiveDiffuse { .. } => {
                if camera_dir.dot(normal) > 0.0 {
                    1
                } else {
                    usize::MAX
                }
            }
        }
    }
}
