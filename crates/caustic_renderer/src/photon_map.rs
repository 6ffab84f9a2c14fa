//! Photon storage and density estimation.
//!
//! Photons are appended to a [`PhotonMapBuilder`] while tracing. Calling
//! [`PhotonMapBuilder::finalize`] builds the spatial index and yields an
//! immutable [`PhotonMap`] that answers range and nearest queries.

use std::f32::consts::PI;
use std::time::Instant;

use caustic_math::Vec3;

use crate::{Bsdf, Color, KdTree, Shading};

/// A recorded light sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Photon {
    pub position: Vec3,
    /// Unit direction pointing back along the incoming photon path
    pub direction: Vec3,
    pub power: Color,
}

/// Append-only photon collection.
#[derive(Debug, Clone, Default)]
pub struct PhotonMapBuilder {
    photons: Vec<Photon>,
}

impl PhotonMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            photons: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, photon: Photon) {
        self.photons.push(photon);
    }

    pub fn len(&self) -> usize {
        self.photons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photons.is_empty()
    }

    /// Append all photons of another builder, keeping their order.
    pub fn merge(&mut self, other: PhotonMapBuilder) {
        self.photons.extend(other.photons);
    }

    /// Build the spatial index.
    pub fn finalize(self) -> PhotonMap {
        let start = Instant::now();
        let count = self.photons.len();
        let tree = KdTree::build(self.photons.into_iter().map(|p| (p.position, p)).collect());
        log::info!(
            "Photon map finalized: {} photons indexed in {:.2?}",
            count,
            start.elapsed()
        );
        PhotonMap { tree }
    }
}

impl Extend<Photon> for PhotonMapBuilder {
    fn extend<I: IntoIterator<Item = Photon>>(&mut self, iter: I) {
        self.photons.extend(iter);
    }
}

/// Finalized, queryable photon map.
#[derive(Debug, Clone)]
pub struct PhotonMap {
    tree: KdTree<Photon>,
}

impl PhotonMap {
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// All stored photons, in no particular order.
    pub fn photons(&self) -> impl Iterator<Item = &Photon> + '_ {
        self.tree.iter().map(|(_, photon)| photon)
    }

    /// Photons within `radius` of `point` (inclusive), unordered.
    pub fn range_query(&self, point: Vec3, radius: f32) -> Vec<&Photon> {
        self.tree.range(point, radius)
    }

    /// The `n` photons closest to `point`, nearest first.
    pub fn nearest(&self, point: Vec3, n: usize) -> Vec<&Photon> {
        self.tree.nearest(point, n)
    }

    /// Radiance towards `camera_dir` estimated from photons within
    /// `radius`, with a flat disk kernel.
    ///
    /// Photons arriving from behind the shading normal are ignored.
    pub fn estimate_radiance(
        &self,
        ctx: &Shading<'_>,
        bsdf: &Bsdf,
        camera_dir: Vec3,
        radius: f32,
    ) -> Color {
        let flux: Color = self
            .range_query(ctx.point, radius)
            .into_iter()
            .filter_map(|photon| {
                let cos = ctx.normal.dot(photon.direction);
                (cos >= 0.0).then(|| {
                    photon.power * cos * bsdf.evaluate(ctx, photon.direction, camera_dir)
                })
            })
            .sum();
        flux / (PI * radius * radius)
    }
}
