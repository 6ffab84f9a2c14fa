//! Numeric configuration for the integrator and the photon tracer.
//!
//! Both structs deserialize from partial JSON documents; missing fields
//! take the defaults below.

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::bucket::DEFAULT_BUCKET_SIZE;
use crate::{RenderError, RenderResult};

/// Minimum distance along a ray at which a new intersection is accepted.
pub const MIN_HIT_DISTANCE: f32 = 1e-3;

/// Slack subtracted from segment lengths in shadow tests.
pub const SHADOW_EPSILON: f32 = 1e-5;

/// Backward integrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Maximum total bounce depth
    pub max_iterations: u32,
    /// Maximum depth counted only over stochastic (gather) bounces
    pub max_gather_iterations: u32,
    /// Bounces spawning at most this many rays count as perfect reflection
    /// and do not consume the gather budget
    pub gather_iteration_threshold: usize,
    /// Number of gather rays spawned on the first stochastic bounce
    pub secondary_rays: usize,
    /// Gather rays shrink as `exp(-secondary_ray_decay * depth2)`
    pub secondary_ray_decay: f32,
    /// Camera samples per pixel; more than one enables sub-pixel jitter
    pub rays_per_pixel: u32,
    /// Offset along the incoming ray applied to continuation origins
    pub hit_translate: f32,
    /// Gather radius for the global photon map
    pub global_photon_map_gather_radius: f32,
    /// Gather radius for the caustics photon map (feature size)
    pub caustics_photon_map_gather_radius: f32,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_gather_iterations: 1,
            gather_iteration_threshold: 3,
            secondary_rays: 1000,
            secondary_ray_decay: 3.0,
            rays_per_pixel: 1,
            hit_translate: 3.0 * MIN_HIT_DISTANCE,
            global_photon_map_gather_radius: 0.4,
            caustics_photon_map_gather_radius: 0.1,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RenderConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        parse(json)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        load(path.as_ref())
    }

    /// Reject settings the integrator cannot run with.
    pub fn validate(&self) -> RenderResult<()> {
        if self.rays_per_pixel == 0 {
            return invalid("rays_per_pixel must be at least 1");
        }
        if self.bucket_size == 0 {
            return invalid("bucket_size must be at least 1");
        }
        if !non_negative(self.secondary_ray_decay) {
            return invalid("secondary_ray_decay must be non-negative");
        }
        if !non_negative(self.hit_translate) {
            return invalid("hit_translate must be non-negative");
        }
        if !positive(self.global_photon_map_gather_radius)
            || !positive(self.caustics_photon_map_gather_radius)
        {
            return invalid("photon map gather radii must be positive");
        }
        Ok(())
    }
}

/// Forward photon tracer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotonTracerConfig {
    /// Maximum number of surface bounces per photon
    pub max_iterations: u32,
    /// A photon stops once every channel falls below this fraction of its
    /// initial power
    pub reject_ratio: f32,
    /// Offset along the incoming ray applied to continuation origins
    pub hit_translate: f32,
    /// Base seed; a given seed always produces the same photon map
    pub seed: u64,
    /// Emitted samples per independently seeded work unit
    pub batch_size: usize,
}

impl Default for PhotonTracerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            reject_ratio: 0.01,
            hit_translate: 3.0 * MIN_HIT_DISTANCE,
            seed: 123,
            batch_size: 4096,
        }
    }
}

impl PhotonTracerConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        parse(json)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        load(path.as_ref())
    }

    /// Reject settings the tracer cannot run with.
    pub fn validate(&self) -> RenderResult<()> {
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.reject_ratio) {
            return invalid("reject_ratio must lie in [0, 1]");
        }
        if !non_negative(self.hit_translate) {
            return invalid("hit_translate must be non-negative");
        }
        Ok(())
    }
}

fn parse<T: DeserializeOwned>(json: &str) -> RenderResult<T> {
    Ok(serde_json::from_str(json)?)
}

fn load<T: DeserializeOwned>(path: &Path) -> RenderResult<T> {
    let text = std::fs::read_to_string(path)?;
    let config = parse(&text)?;
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

// NaN fails both checks.
fn non_negative(value: f32) -> bool {
    value >= 0.0
}

fn positive(value: f32) -> bool {
    value > 0.0
}

fn invalid(message: &str) -> RenderResult<()> {
    Err(RenderError::InvalidConfig(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_config_defaults_validate() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_iterations, 5);
        assert_eq!(config.secondary_rays, 1000);
    }

    #[test]
    fn test_render_config_partial_json() {
        let config =
            RenderConfig::from_json(r#"{ "max_gather_iterations": 2, "rays_per_pixel": 4 }"#)
                .unwrap();

        assert_eq!(config.max_gather_iterations, 2);
        assert_eq!(config.rays_per_pixel, 4);
        // Untouched fields keep their defaults
        assert_eq!(config.gather_iteration_threshold, 3);
        assert_eq!(config.caustics_photon_map_gather_radius, 0.1);
    }

    #[test]
    fn test_render_config_rejects_zero_rays() {
        let config = RenderConfig {
            rays_per_pixel: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RenderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_photon_config_json_errors() {
        assert!(matches!(
            PhotonTracerConfig::from_json("{ not json"),
            Err(RenderError::Parse(_))
        ));

        let config = PhotonTracerConfig::from_json(r#"{ "reject_ratio": 0.05 }"#).unwrap();
        assert_eq!(config.reject_ratio, 0.05);
        assert_eq!(config.max_iterations, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_photon_config_rejects_bad_ratio() {
        let config = PhotonTracerConfig {
            reject_ratio: 2.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = RenderConfig::load("/nonexistent/caustic/render.json");
        assert!(matches!(result, Err(RenderError::Io(_))));
    }
}
