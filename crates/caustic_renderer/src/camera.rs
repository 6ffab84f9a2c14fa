//! Pinhole camera for primary ray generation.

use std::sync::Arc;

use caustic_math::Vec3;
use rand::RngCore;

use crate::sampling::gen_f32;
use crate::{Medium, RenderError, RenderResult, VACUUM};

/// Pinhole camera.
///
/// Configure with the builder methods, then call [`Camera::initialize`]
/// before rendering.
#[derive(Debug, Clone)]
pub struct Camera {
    // Image settings
    pub image_width: u32,
    pub image_height: u32,

    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees
    vfov: f32,

    /// Medium the camera sits in; vacuum when `None`
    starting_medium: Option<Arc<Medium>>,

    // Cached computed values (set by initialize())
    initialized: bool,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            starting_medium: None,
            initialized: false,
            pixel00_loc: Vec3::ZERO,
            pixel_delta_u: Vec3::ZERO,
            pixel_delta_v: Vec3::ZERO,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self.initialized = false;
        self
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self.initialized = false;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self.initialized = false;
        self
    }

    /// Start primary rays inside `medium` (e.g. an underwater camera).
    pub fn with_starting_medium(mut self, medium: Arc<Medium>) -> Self {
        self.starting_medium = Some(medium);
        self
    }

    /// Compute the viewport (must be called before generating rays).
    pub fn initialize(&mut self) {
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width =
            viewport_height * (self.image_width as f32 / self.image_height.max(1) as f32);

        let w = (self.look_from - self.look_at).normalize_or_zero();
        let u = self.vup.cross(w).normalize_or_zero();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;
        self.pixel_delta_u = viewport_u / self.image_width.max(1) as f32;
        self.pixel_delta_v = viewport_v / self.image_height.max(1) as f32;

        let viewport_upper_left = self.look_from - w - viewport_u / 2.0 - viewport_v / 2.0;
        self.pixel00_loc = viewport_upper_left + 0.5 * (self.pixel_delta_u + self.pixel_delta_v);
        self.initialized = true;
    }

    /// Check that the camera can produce rays.
    pub fn validate(&self) -> RenderResult<()> {
        if !self.initialized {
            return Err(RenderError::InvalidCamera("camera not initialized".into()));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(RenderError::InvalidCamera(format!(
                "zero-sized image {}x{}",
                self.image_width, self.image_height
            )));
        }
        if !(self.vfov > 0.0 && self.vfov < 180.0) {
            return Err(RenderError::InvalidCamera(format!(
                "field of view {} out of range",
                self.vfov
            )));
        }
        if self.pixel_delta_u == Vec3::ZERO || self.pixel_delta_v == Vec3::ZERO {
            return Err(RenderError::InvalidCamera("degenerate view basis".into()));
        }
        Ok(())
    }

    /// Eye position.
    pub fn position(&self) -> Vec3 {
        self.look_from
    }

    /// Medium primary rays start in.
    pub fn starting_medium(&self) -> &Medium {
        self.starting_medium.as_deref().unwrap_or(&VACUUM)
    }

    /// Unit direction through pixel `(x, y)`; the pixel center unless a
    /// jitter source is given.
    pub fn pixel_direction(&self, x: u32, y: u32, jitter: Option<&mut dyn RngCore>) -> Vec3 {
        let (dx, dy) = match jitter {
            Some(rng) => (gen_f32(rng) - 0.5, gen_f32(rng) - 0.5),
            None => (0.0, 0.0),
        };
        let pixel_sample = self.pixel00_loc
            + (x as f32 + dx) * self.pixel_delta_u
            + (y as f32 + dy) * self.pixel_delta_v;
        (pixel_sample - self.look_from).normalize()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
