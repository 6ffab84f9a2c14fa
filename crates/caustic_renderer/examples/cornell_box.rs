//! Cornell box with a glass ball.
//!
//! Traces a global and a caustics photon map from a point light, renders
//! the box and saves a PNG. Pass a JSON render config path as the first
//! argument to override the defaults. `RUST_LOG=info` shows progress.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use caustic_renderer::{
    Bsdf, Camera, Color, GeometryList, Light, Material, Medium, PhotonMapBuilder, PhotonTracer,
    PhotonTracerConfig, RenderConfig, Raytracer, Sphere, Triangle, Vec3,
};

const GLOBAL_PHOTONS: usize = 200_000;
const CAUSTICS_PHOTONS: usize = 500_000;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            RenderConfig::load(&path).with_context(|| format!("loading render config {}", path))?
        }
        None => RenderConfig {
            rays_per_pixel: 4,
            secondary_rays: 64,
            ..RenderConfig::default()
        },
    };

    let scene = build_scene();
    let lights = [Light::point(Vec3::new(0.0, 1.9, 0.0), Color::splat(3.0))];

    let tracer = PhotonTracer::new(PhotonTracerConfig::default());
    let mut global = PhotonMapBuilder::with_capacity(GLOBAL_PHOTONS);
    let mut caustics = PhotonMapBuilder::new();
    for light in &lights {
        tracer.trace_photons(&scene, GLOBAL_PHOTONS, light, &mut global, false)?;
        tracer.trace_caustics_photons(&scene, CAUSTICS_PHOTONS, light, &mut caustics)?;
    }
    let global = global.finalize();
    let caustics = caustics.finalize();

    let mut camera = Camera::new()
        .with_resolution(400, 400)
        .with_position(
            Vec3::new(0.0, 1.0, 3.4),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
        )
        .with_fov(40.0);
    camera.initialize();

    let raytracer = Raytracer::new(config);
    let image = raytracer.render(
        &camera,
        &scene,
        None,
        &lights,
        Some(&global),
        Some(&caustics),
    )?;

    let filename = "cornell_box.png";
    let output = image::RgbaImage::from_raw(image.width, image.height, image.to_rgba())
        .ok_or_else(|| anyhow!("pixel buffer does not match image size"))?;
    output
        .save(filename)
        .with_context(|| format!("saving {}", filename))?;
    log::info!("Saved to {}", filename);
    Ok(())
}

fn wall(list: &mut GeometryList, corners: [Vec3; 4], color: Color) {
    let material = Arc::new(Material::new(Bsdf::diffuse(color)));
    let [a, b] = Triangle::quad(corners[0], corners[1], corners[2], corners[3], material);
    list.add(a);
    list.add(b);
}

/// Unit box spanning x, z in [-1, 1] and y in [0, 2], open towards +z.
/// Corners wind so that every face normal points into the box.
fn build_scene() -> GeometryList {
    let white = Color::splat(0.73);
    let red = Color::new(0.65, 0.05, 0.05);
    let green = Color::new(0.12, 0.45, 0.15);
    let v = Vec3::new;

    let mut list = GeometryList::new();
    // Floor, ceiling, back
    wall(&mut list, [v(-1.0, 0.0, -1.0), v(-1.0, 0.0, 1.0), v(1.0, 0.0, 1.0), v(1.0, 0.0, -1.0)], white);
    wall(&mut list, [v(-1.0, 2.0, -1.0), v(1.0, 2.0, -1.0), v(1.0, 2.0, 1.0), v(-1.0, 2.0, 1.0)], white);
    wall(&mut list, [v(-1.0, 0.0, -1.0), v(1.0, 0.0, -1.0), v(1.0, 2.0, -1.0), v(-1.0, 2.0, -1.0)], white);
    // Left, right
    wall(&mut list, [v(-1.0, 0.0, -1.0), v(-1.0, 2.0, -1.0), v(-1.0, 2.0, 1.0), v(-1.0, 0.0, 1.0)], red);
    wall(&mut list, [v(1.0, 0.0, -1.0), v(1.0, 0.0, 1.0), v(1.0, 2.0, 1.0), v(1.0, 2.0, -1.0)], green);

    let glass = Arc::new(
        Material::new(Bsdf::reflective_refractive(Color::splat(0.1), Color::splat(0.9)))
            .with_inside_medium(Arc::new(Medium::non_interacting(1.5))),
    );
    list.add(Sphere::new(v(0.4, 0.45, 0.1), 0.45, glass));

    let plaster = Arc::new(Material::new(Bsdf::phong(Color::splat(0.6), 20.0)));
    list.add(Sphere::new(v(-0.45, 0.35, -0.5), 0.35, plaster));

    list
}
