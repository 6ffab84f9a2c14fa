//! Orthonormal shading frames.

use crate::Vec3;

/// Right-handed orthonormal basis `[tangent, binormal, normal]` around a
/// unit normal. Local `z` maps to the normal.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub binormal: Vec3,
    pub normal: Vec3,
}

impl Frame {
    /// Build a frame around `normal` (assumed unit length).
    ///
    /// The tangent is taken perpendicular to the dominant component of the
    /// normal so the construction never divides by a vanishing coordinate.
    pub fn from_normal(normal: Vec3) -> Self {
        let sq = normal * normal;
        let tangent = if sq.x > sq.y && sq.x > sq.z {
            Vec3::new(-normal.y / normal.x, 1.0, 0.0)
        } else if sq.y > sq.z {
            Vec3::new(0.0, -normal.z / normal.y, 1.0)
        } else {
            Vec3::new(0.0, 1.0, -normal.y / normal.z)
        }
        .normalize();
        let binormal = normal.cross(tangent);

        Self {
            tangent,
            binormal,
            normal,
        }
    }

    /// Transform a direction expressed in this frame into world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.tangent * local.x + self.binormal * local.y + self.normal * local.z
    }

    /// Transform a world-space direction into this frame.
    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        Vec3::new(
            world.dot(self.tangent),
            world.dot(self.binormal),
            world.dot(self.normal),
        )
    }
}

/// Mirror `v` about `n`: `v - 2 (v . n) n`.
///
/// For a direction pointing away from the surface use `-reflect(v, n)`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(frame: &Frame) {
        assert!((frame.tangent.length() - 1.0).abs() < 1e-5);
        assert!((frame.binormal.length() - 1.0).abs() < 1e-5);
        assert!(frame.tangent.dot(frame.normal).abs() < 1e-5);
        assert!(frame.binormal.dot(frame.normal).abs() < 1e-5);
        assert!(frame.tangent.dot(frame.binormal).abs() < 1e-5);
    }

    #[test]
    fn test_frame_axis_normals() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::X, -Vec3::Y, -Vec3::Z] {
            assert_orthonormal(&Frame::from_normal(n));
        }
    }

    #[test]
    fn test_frame_oblique_normal() {
        let n = Vec3::new(0.3, -0.8, 0.5).normalize();
        let frame = Frame::from_normal(n);
        assert_orthonormal(&frame);

        let local = Vec3::new(0.2, 0.4, 0.8);
        let round_trip = frame.to_local(frame.to_world(local));
        assert!((round_trip - local).length() < 1e-5);
        assert!((frame.to_world(Vec3::Z) - n).length() < 1e-6);
    }

    #[test]
    fn test_reflect() {
        let v = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(reflect(v, Vec3::Y), Vec3::new(1.0, 1.0, 0.0));
    }
}
