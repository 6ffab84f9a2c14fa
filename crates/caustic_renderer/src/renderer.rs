//! Backward integrator.
//!
//! Camera rays are traced recursively. Each shading point adds surface
//! emission, direct light from singular sources, the caustics map
//! estimate and either a global map lookup or a hemisphere gather.
//!
//! Two depths bound the recursion: `depth` counts every bounce, `depth2`
//! only the stochastic ones. Bounces with few enough rays (mirrors,
//! refraction) are "perfect" and leave `depth2` alone.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use caustic_math::Vec3;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::{
    generate_buckets, render_bucket, Bsdf, BucketResult, Boundary, Camera, Color, Geometry,
    ImageBuffer, Light, MediumStack, PhotonMap, Ray, RenderConfig, RenderError, RenderResult,
    SamplingType, Shading, SurfaceHit,
};

/// Everything a single trace reads.
struct Scene<'s> {
    geometry: &'s dyn Geometry,
    /// Visible light shapes, tested by camera and perfect-bounce rays only
    singular_light_geometry: Option<&'s dyn Geometry>,
    lights: Vec<&'s Light>,
    global_map: Option<&'s PhotonMap>,
    caustics_map: Option<&'s PhotonMap>,
}

/// Clears the running flag when a render ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Renders images from a scene and its photon maps.
#[derive(Debug, Default)]
pub struct Raytracer {
    config: RenderConfig,
    running: AtomicBool,
    rays_traced: AtomicU64,
    primary_rays_traced: AtomicU64,
}

impl Raytracer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            rays_traced: AtomicU64::new(0),
            primary_rays_traced: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Rays traced by the last render, camera rays included.
    pub fn rays_traced(&self) -> u64 {
        self.rays_traced.load(Ordering::Relaxed)
    }

    pub fn primary_rays_traced(&self) -> u64 {
        self.primary_rays_traced.load(Ordering::Relaxed)
    }

    /// Render one image.
    ///
    /// `singular_light_geometry` holds the visible shapes of lights. It is
    /// intersected by rays that have not taken a stochastic bounce, since
    /// the photon maps already account for the light those shapes emit
    /// into diffuse paths. Only singular lights contribute direct light;
    /// area lights are reached through the photon maps.
    ///
    /// Fails with [`RenderError::AlreadyRunning`] if called while another
    /// render on the same tracer is in progress.
    pub fn render(
        &self,
        camera: &Camera,
        geometry: &dyn Geometry,
        singular_light_geometry: Option<&dyn Geometry>,
        lights: &[Light],
        global_map: Option<&PhotonMap>,
        caustics_map: Option<&PhotonMap>,
    ) -> RenderResult<ImageBuffer> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RenderError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        camera.validate()?;
        self.config.validate()?;
        log::debug!("Render config: {:?}", self.config);

        let lights = lights
            .iter()
            .filter(|light| {
                if !light.is_singular() {
                    log::warn!("Skipping non-singular light in direct lighting: {:?}", light);
                }
                light.is_singular()
            })
            .collect();
        let scene = Scene {
            geometry,
            singular_light_geometry,
            lights,
            global_map,
            caustics_map,
        };

        self.rays_traced.store(0, Ordering::Relaxed);
        self.primary_rays_traced.store(0, Ordering::Relaxed);

        let (width, height) = (camera.image_width, camera.image_height);
        let buckets = generate_buckets(width, height, self.config.bucket_size);
        log::info!(
            "Rendering {}x{} in {} buckets, {} rays per pixel",
            width,
            height,
            buckets.len(),
            self.config.rays_per_pixel
        );
        let start = Instant::now();

        let results: Vec<BucketResult> = buckets
            .par_iter()
            .map(|bucket| {
                let result = render_bucket(bucket, |x, y| self.render_pixel(camera, &scene, x, y));
                log::debug!(
                    "Bucket {} at ({}, {}) done",
                    bucket.index,
                    bucket.x,
                    bucket.y
                );
                result
            })
            .collect();

        let mut image = ImageBuffer::new(width, height);
        for result in &results {
            image.write_bucket(result);
        }

        log::info!(
            "Rendered in {:.2?}: {} primary rays, {} rays total",
            start.elapsed(),
            self.primary_rays_traced(),
            self.rays_traced()
        );
        Ok(image)
    }

    /// Average of the camera samples through one pixel. The RNG is seeded
    /// from the pixel coordinates so every pixel renders deterministically.
    fn render_pixel<'s>(&self, camera: &'s Camera, scene: &Scene<'s>, x: u32, y: u32) -> Color {
        let mut rng = StdRng::seed_from_u64(x as u64 * camera.image_height as u64 + y as u64);
        let samples = self.config.rays_per_pixel;

        let mut color = Color::ZERO;
        for _ in 0..samples {
            let jitter: Option<&mut dyn RngCore> = if samples > 1 { Some(&mut rng) } else { None };
            let direction = camera.pixel_direction(x, y, jitter);
            let ray = Ray::new(camera.position(), direction, camera.starting_medium());
            let mut stack = MediumStack::new();
            color += self.trace(scene, ray, 0, 0, &mut stack, &mut rng);
        }
        self.primary_rays_traced
            .fetch_add(samples as u64, Ordering::Relaxed);
        color / samples as f32
    }

    /// Radiance arriving at `ray.origin` from `ray.direction`.
    fn trace<'s>(
        &self,
        scene: &Scene<'s>,
        ray: Ray<'s>,
        depth: u32,
        depth2: u32,
        stack: &mut MediumStack<'s>,
        rng: &mut dyn RngCore,
    ) -> Color {
        if depth >= self.config.max_iterations {
            return Color::ZERO;
        }
        self.rays_traced.fetch_add(1, Ordering::Relaxed);

        // Scatter events continue the same ray segment without costing depth
        let mut ray = ray;
        let mut throughput = Color::ONE;
        let (hit, material) = loop {
            let mut hit = SurfaceHit::new();
            scene.geometry.intersect(&ray, &mut hit);
            if depth2 == 0 {
                if let Some(light_geometry) = scene.singular_light_geometry {
                    light_geometry.intersect(&ray, &mut hit);
                }
            }
            let Some(material) = hit.material else {
                return Color::ZERO;
            };

            let end = ray.at(hit.distance);
            let medium = ray
                .medium
                .sample_scattering(ray.origin, hit.normal, end, rng);
            throughput *= medium.attenuation;
            match medium.event {
                Some(event) => ray = Ray::new(event.position, event.direction, ray.medium),
                None => break (hit, material),
            }
        };

        let position = ray.at(hit.distance);
        let normal = hit.normal;
        let camera_dir = -ray.direction;

        let Some(boundary) = Boundary::resolve(&ray, normal, &material.inside_medium, stack) else {
            log::trace!("Medium stack underflow at {}", position);
            return Color::ZERO;
        };

        let mut radiance = material
            .surface_light
            .as_ref()
            .map_or(Color::ZERO, |light| {
                light.radiance(position, camera_dir, normal)
            });
        let Some(bsdf) = material.bsdf.as_ref() else {
            return throughput * radiance;
        };

        let ctx = Shading::new(position, normal, &boundary);
        let sampling = bsdf.sampling_type(camera_dir, normal);

        if sampling.contains(SamplingType::SINGULAR) {
            radiance += self.direct_light(scene, &ctx, bsdf, camera_dir);
        }
        if let Some(map) = scene.caustics_map {
            radiance += map.estimate_radiance(
                &ctx,
                bsdf,
                camera_dir,
                self.config.caustics_photon_map_gather_radius,
            );
        }

        let sample_count = bsdf
            .max_samples(camera_dir, normal)
            .min(self.gather_rays(depth2));
        let perfect = sample_count <= self.config.gather_iteration_threshold;

        if depth2 > 0 && !perfect {
            if let Some(map) = scene.global_map {
                radiance += map.estimate_radiance(
                    &ctx,
                    bsdf,
                    camera_dir,
                    self.config.global_photon_map_gather_radius,
                );
                return throughput * radiance;
            }
        }

        if sampling.contains(SamplingType::MULTIPLE_SAMPLE)
            && (depth2 < self.config.max_gather_iterations || perfect)
        {
            let next_depth2 = if perfect { depth2 } else { depth2 + 1 };
            for i in 0..sample_count {
                let sample = bsdf.sample(i, sample_count, &ctx, camera_dir, rng);
                let Some(crossing) = stack.cross(&boundary, sample.direction, normal) else {
                    log::trace!("Medium stack underflow leaving {}", position);
                    continue;
                };

                let origin = crossing.origin(position, ray.direction, self.config.hit_translate);
                let child = Ray::new(origin, sample.direction, crossing.medium);
                let incoming = self.trace(scene, child, depth + 1, next_depth2, stack, rng);
                stack.restore(crossing.change);

                if !incoming.is_finite() {
                    log::trace!("Dropping non-finite gather sample at {}", position);
                    continue;
                }
                radiance += sample.weight * incoming;
            }
        }

        throughput * radiance
    }

    /// Sum of unshadowed singular light reflected towards `camera_dir`.
    fn direct_light(
        &self,
        scene: &Scene<'_>,
        ctx: &Shading<'_>,
        bsdf: &Bsdf,
        camera_dir: Vec3,
    ) -> Color {
        scene
            .lights
            .iter()
            .filter_map(|light| light.radiance(ctx.point, scene.geometry))
            .filter_map(|incident| {
                let cos = ctx.normal.dot(incident.direction);
                (cos > 0.0).then(|| {
                    incident.radiance * cos * bsdf.evaluate(ctx, camera_dir, incident.direction)
                })
            })
            .sum()
    }

    /// Gather rays allowed at stochastic depth `depth2`.
    fn gather_rays(&self, depth2: u32) -> usize {
        let decay = (-self.config.secondary_ray_decay * depth2 as f32).exp();
        (self.config.secondary_rays as f32 * decay) as usize
    }
}
