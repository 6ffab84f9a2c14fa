//! Forward photon tracing.
//!
//! Photons leave a light, bounce through the scene using one BSDF sample
//! per hit and deposit their power on surfaces. Emission indices are cut
//! into fixed-size batches; each batch owns an RNG seeded from the
//! configured seed and its batch index, so a configuration always yields
//! the same photon map no matter how rayon schedules the batches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::{
    Boundary, Color, Geometry, Light, MediumStack, Photon, PhotonMapBuilder, PhotonTracerConfig,
    Ray, RenderResult, SamplingType, Shading, SurfaceHit, VACUUM,
};

/// Builds photon maps from lights.
#[derive(Debug, Default)]
pub struct PhotonTracer {
    config: PhotonTracerConfig,
    photons_emitted: AtomicU64,
    photons_stored: AtomicU64,
}

impl PhotonTracer {
    pub fn new(config: PhotonTracerConfig) -> Self {
        Self {
            config,
            photons_emitted: AtomicU64::new(0),
            photons_stored: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PhotonTracerConfig {
        &self.config
    }

    /// Total photons emitted across all tracing calls.
    pub fn photons_emitted(&self) -> u64 {
        self.photons_emitted.load(Ordering::Relaxed)
    }

    /// Total photons deposited across all tracing calls.
    pub fn photons_stored(&self) -> u64 {
        self.photons_stored.load(Ordering::Relaxed)
    }

    /// Trace a caustics map: only specular-then-diffuse paths deposit.
    pub fn trace_caustics_photons(
        &self,
        geometry: &dyn Geometry,
        sample_count: usize,
        light: &Light,
        builder: &mut PhotonMapBuilder,
    ) -> RenderResult<usize> {
        self.trace_photons(geometry, sample_count, light, builder, true)
    }

    /// Emit `sample_count` photons from `light` and append the deposits to
    /// `builder`. Returns the number of photons deposited.
    pub fn trace_photons(
        &self,
        geometry: &dyn Geometry,
        sample_count: usize,
        light: &Light,
        builder: &mut PhotonMapBuilder,
        caustics_only: bool,
    ) -> RenderResult<usize> {
        self.config.validate()?;

        let kind = if caustics_only { "caustics" } else { "global" };
        log::info!("Tracing {} {} photons", sample_count, kind);
        let start = Instant::now();

        let start_medium = light.medium().unwrap_or(&VACUUM);
        let batch_size = self.config.batch_size;
        let batch_count = sample_count.div_ceil(batch_size);

        let batches = (0..batch_count)
            .into_par_iter()
            .map(|batch| -> RenderResult<Vec<Photon>> {
                let mut rng = StdRng::seed_from_u64(batch_seed(self.config.seed, batch));
                let mut photons = Vec::new();
                let first = batch * batch_size;
                let last = (first + batch_size).min(sample_count);

                for index in first..last {
                    let emission = light.sample_emission(index, sample_count, &mut rng)?;
                    let ray = Ray::new(emission.position, emission.direction, start_medium);
                    let mut stack = MediumStack::new();
                    self.trace_path(
                        geometry,
                        ray,
                        emission.power,
                        &mut stack,
                        &mut rng,
                        caustics_only,
                        &mut photons,
                    );
                }
                Ok(photons)
            })
            .collect::<RenderResult<Vec<Vec<Photon>>>>()?;

        let stored: usize = batches.iter().map(Vec::len).sum();
        for photons in batches {
            builder.extend(photons);
        }

        self.photons_emitted
            .fetch_add(sample_count as u64, Ordering::Relaxed);
        self.photons_stored.fetch_add(stored as u64, Ordering::Relaxed);

        log::info!(
            "Traced {} {} photons in {:.2?}: {} stored",
            sample_count,
            kind,
            start.elapsed(),
            stored
        );
        Ok(stored)
    }

    /// Follow one photon until it leaves the scene, is absorbed or runs
    /// out of depth or power.
    #[allow(clippy::too_many_arguments)]
    fn trace_path<'s>(
        &self,
        geometry: &'s dyn Geometry,
        mut ray: Ray<'s>,
        initial_power: Color,
        stack: &mut MediumStack<'s>,
        rng: &mut dyn RngCore,
        caustics_only: bool,
        out: &mut Vec<Photon>,
    ) {
        let reject_below = initial_power * self.config.reject_ratio;
        let mut power = initial_power;
        let mut depth = 0;

        loop {
            if depth >= self.config.max_iterations || power.cmplt(reject_below).all() {
                return;
            }

            let mut hit = SurfaceHit::new();
            geometry.intersect(&ray, &mut hit);
            let Some(material) = hit.material else {
                return;
            };

            let position = ray.at(hit.distance);
            let normal = hit.normal;
            let incoming = -ray.direction;

            // Medium events are free: same depth, no deposit
            let medium = ray
                .medium
                .sample_scattering(ray.origin, normal, position, rng);
            power *= medium.attenuation;
            if let Some(event) = medium.event {
                ray = Ray::new(event.position, event.direction, ray.medium);
                continue;
            }

            let caustic_surface = material
                .sampling_type(incoming, normal)
                .contains(SamplingType::CAUSTICS);
            if !caustics_only || (!caustic_surface && depth > 0) {
                out.push(Photon {
                    position,
                    direction: incoming,
                    power,
                });
            }
            if caustics_only && !caustic_surface {
                return;
            }

            let Some(bsdf) = material.bsdf.as_ref() else {
                return;
            };
            let Some(boundary) = Boundary::resolve(&ray, normal, &material.inside_medium, stack)
            else {
                log::trace!("Photon left a volume with an empty medium stack at {}", position);
                return;
            };

            let ctx = Shading::new(position, normal, &boundary);
            let sample = bsdf.sample(0, 1, &ctx, incoming, rng);
            let Some(crossing) = stack.cross(&boundary, sample.direction, normal) else {
                return;
            };

            power *= sample.weight;
            let origin = crossing.origin(position, ray.direction, self.config.hit_translate);
            ray = Ray::new(origin, sample.direction, crossing.medium);
            depth += 1;
        }
    }
}

/// Seed for one batch, spread so neighbouring batches get unrelated streams.
fn batch_seed(seed: u64, batch: usize) -> u64 {
    seed ^ (batch as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bsdf, GeometryList, Material, Medium, RenderError, Sphere, StackTransition, Triangle};
    use caustic_math::Vec3;
    use std::sync::Arc;

    fn floor(list: &mut GeometryList) {
        let grey = Arc::new(Material::new(Bsdf::diffuse(Color::splat(0.6))));
        let [a, b] = Triangle::quad(
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::new(-20.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, -20.0),
            grey,
        );
        list.add(a);
        list.add(b);
    }

    fn glass_ball_scene() -> GeometryList {
        let mut list = GeometryList::new();
        floor(&mut list);
        let glass = Arc::new(
            Material::new(Bsdf::refractive(Color::ONE))
                .with_inside_medium(Arc::new(Medium::non_interacting(1.5))),
        );
        list.add(Sphere::new(Vec3::new(0.0, 2.0, 0.0), 1.0, glass));
        list
    }

    fn clear_shell() -> Arc<Material> {
        Arc::new(
            Material::new(Bsdf::refractive(Color::ONE))
                .with_inside_medium(Arc::new(Medium::non_interacting(1.0))),
        )
    }

    #[test]
    fn test_concentric_spheres_push_push_pop_pop() {
        let mut list = GeometryList::new();
        list.add(Sphere::new(Vec3::ZERO, 2.0, clear_shell()));
        list.add(Sphere::new(Vec3::ZERO, 1.0, clear_shell()));

        let tracer = PhotonTracer::default();
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, &VACUUM);
        let mut stack = MediumStack::recording();
        let mut rng = StdRng::seed_from_u64(1);
        let mut photons = Vec::new();
        tracer.trace_path(&list, ray, Color::ONE, &mut stack, &mut rng, false, &mut photons);

        assert_eq!(
            stack.transitions(),
            Some(
                &[
                    StackTransition::Push,
                    StackTransition::Push,
                    StackTransition::Pop,
                    StackTransition::Pop
                ][..]
            )
        );
        assert!(stack.is_empty());
        assert_eq!(photons.len(), 4);
        let zs: Vec<f32> = photons.iter().map(|p| p.position.z).collect();
        for (z, expected) in zs.iter().zip([-2.0, -1.0, 1.0, 2.0]) {
            assert!((z - expected).abs() < 1e-2);
        }
    }

    #[test]
    fn test_caustics_photons_land_on_diffuse_floor() {
        let scene = glass_ball_scene();
        let light = Light::point(Vec3::new(0.0, 5.0, 0.0), Color::splat(100.0));
        let tracer = PhotonTracer::default();

        let mut builder = PhotonMapBuilder::new();
        let stored = tracer
            .trace_caustics_photons(&scene, 4000, &light, &mut builder)
            .unwrap();

        assert!(stored > 0);
        assert_eq!(stored, builder.len());
        let map = builder.finalize();
        for photon in map.photons() {
            assert!(photon.position.y.abs() < 1e-3);
            assert!(photon.direction.y > 0.0);
        }
        assert_eq!(tracer.photons_emitted(), 4000);
        assert_eq!(tracer.photons_stored(), stored as u64);
    }

    #[test]
    fn test_global_photons_direct_hits() {
        let mut scene = GeometryList::new();
        floor(&mut scene);
        let light = Light::point(Vec3::new(0.0, 1.0, 0.0), Color::splat(10.0));
        let tracer = PhotonTracer::default();

        let mut builder = PhotonMapBuilder::new();
        let stored = tracer
            .trace_photons(&scene, 2000, &light, &mut builder, false)
            .unwrap();

        // Roughly half the photons head down; diffuse bounces escape upward
        assert!(stored > 850 && stored < 1150, "stored {}", stored);
        let map = builder.finalize();
        assert!(map
            .photons()
            .all(|p| (p.power - Color::splat(10.0 / 2000.0)).length() < 1e-6));
    }

    #[test]
    fn test_photon_map_is_reproducible() {
        let scene = glass_ball_scene();
        let light = Light::point(Vec3::new(0.5, 5.0, 0.0), Color::splat(50.0));
        let tracer = PhotonTracer::new(PhotonTracerConfig {
            batch_size: 97,
            ..Default::default()
        });

        let trace = || {
            let mut builder = PhotonMapBuilder::new();
            tracer
                .trace_photons(&scene, 1000, &light, &mut builder, false)
                .unwrap();
            builder
        };

        let parallel = trace();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let serial = pool.install(trace);

        assert_eq!(parallel.len(), serial.len());
        let a: Vec<Photon> = parallel.finalize().photons().copied().collect();
        let b: Vec<Photon> = serial.finalize().photons().copied().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_directional_light_cannot_emit() {
        let scene = glass_ball_scene();
        let light = Light::directional(-Vec3::Y, Color::ONE);
        let mut builder = PhotonMapBuilder::new();
        let result = PhotonTracer::default().trace_photons(&scene, 10, &light, &mut builder, false);
        assert!(matches!(result, Err(RenderError::EmissionUnsupported(_))));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let scene = glass_ball_scene();
        let light = Light::point(Vec3::Y, Color::ONE);
        let tracer = PhotonTracer::new(PhotonTracerConfig {
            batch_size: 0,
            ..Default::default()
        });
        let mut builder = PhotonMapBuilder::new();
        assert!(matches!(
            tracer.trace_photons(&scene, 10, &light, &mut builder, false),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_scatter_events_are_free() {
        let fog = Arc::new(Medium::random_scatter(1.0, 20.0, Color::ZERO));
        let shell = Arc::new(
            Material::new(Bsdf::refractive(Color::ONE)).with_inside_medium(fog.clone()),
        );
        let mut list = GeometryList::new();
        list.add(Sphere::new(Vec3::ZERO, 2.0, shell));

        // One surface interaction allowed; the walk inside the fog must not use it up
        let tracer = PhotonTracer::new(PhotonTracerConfig {
            max_iterations: 1,
            ..PhotonTracerConfig::default()
        });
        let mut stack = MediumStack::new();
        stack.push(&VACUUM);
        let mut rng = StdRng::seed_from_u64(17);
        let mut photons = Vec::new();
        let ray = Ray::new(Vec3::ZERO, Vec3::X, &fog);
        tracer.trace_path(&list, ray, Color::ONE, &mut stack, &mut rng, false, &mut photons);

        assert_eq!(photons.len(), 1);
        assert!((photons[0].position.length() - 2.0).abs() < 1e-2);
        assert_eq!(photons[0].power, Color::ONE);
    }
}
