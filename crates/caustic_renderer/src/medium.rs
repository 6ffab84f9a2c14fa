//! Participating media and the nested-medium stack.
//!
//! Every ray travels through exactly one [`Medium`]. Crossing a material
//! boundary either enters the material's inside medium (the previous
//! ambient medium is pushed onto a [`MediumStack`]) or leaves it (the
//! stack is popped). Both tracers drive the stack through
//! [`MediumStack::cross`] and undo crossings with [`MediumStack::restore`].

use caustic_math::Vec3;
use rand::RngCore;

use crate::sampling::{gen_f32, uniform_sphere};
use crate::{Color, Ray};

/// The ambient medium used by default for cameras, lights and shadow rays.
pub static VACUUM: Medium = Medium {
    index: 1.0,
    scattering: Scattering::None,
};

/// How a medium interacts with light travelling through it.
#[derive(Debug, Clone, PartialEq)]
pub enum Scattering {
    /// Light passes unaltered.
    None,
    /// Exponentially distributed scatter events with a uniformly random new
    /// direction, plus per-channel Beer-Lambert absorption.
    Random {
        /// Rate of the exponential scatter-distance distribution
        scatter_lambda: f32,
        /// Absorption coefficient per channel
        absorption: Color,
    },
}

/// A volumetric medium with an invariant refractive index.
#[derive(Debug, Clone, PartialEq)]
pub struct Medium {
    pub index: f32,
    pub scattering: Scattering,
}

/// A scatter event inside a medium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterEvent {
    pub position: Vec3,
    pub direction: Vec3,
}

/// Result of sampling a segment through a medium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediumSample {
    /// Transmittance up to the event, or over the whole segment
    pub attenuation: Color,
    pub event: Option<ScatterEvent>,
}

impl Medium {
    /// Index-1 medium that never interacts.
    pub fn vacuum() -> Self {
        VACUUM.clone()
    }

    /// Clear dielectric with the given refractive index.
    pub fn non_interacting(index: f32) -> Self {
        Self {
            index,
            scattering: Scattering::None,
        }
    }

    /// Scattering and absorbing medium.
    pub fn random_scatter(index: f32, scatter_lambda: f32, absorption: Color) -> Self {
        Self {
            index,
            scattering: Scattering::Random {
                scatter_lambda,
                absorption,
            },
        }
    }

    /// Sample the segment `start -> end` that ends on a surface with normal
    /// `_normal`.
    pub fn sample_scattering(
        &self,
        start: Vec3,
        _normal: Vec3,
        end: Vec3,
        rng: &mut dyn RngCore,
    ) -> MediumSample {
        let (scatter_lambda, absorption) = match &self.scattering {
            Scattering::None => {
                return MediumSample {
                    attenuation: Color::ONE,
                    event: None,
                }
            }
            Scattering::Random {
                scatter_lambda,
                absorption,
            } => (*scatter_lambda, *absorption),
        };

        let x = if scatter_lambda != 0.0 {
            // 1 - u keeps the logarithm finite
            -(1.0 - gen_f32(rng)).ln() / scatter_lambda
        } else {
            f32::INFINITY
        };

        let segment = end - start;
        let length = segment.length();
        if x > length {
            return MediumSample {
                attenuation: beer_lambert(absorption, length),
                event: None,
            };
        }

        MediumSample {
            attenuation: beer_lambert(absorption, x),
            event: Some(ScatterEvent {
                position: start + segment * (x / length),
                direction: uniform_sphere(rng),
            }),
        }
    }
}

impl Default for Medium {
    fn default() -> Self {
        Self::vacuum()
    }
}

#[inline]
fn beer_lambert(absorption: Color, distance: f32) -> Color {
    (-absorption * distance).exp()
}

/// In/out media at a surface hit.
#[derive(Debug, Clone, Copy)]
pub struct Boundary<'m> {
    pub inside: &'m Medium,
    pub outside: &'m Medium,
    /// The incoming ray travels from the inside of the surface
    pub from_inside: bool,
}

impl<'m> Boundary<'m> {
    /// Work out the media on both sides of a hit with outward `normal`.
    ///
    /// Returns `None` when the ray claims to be leaving a volume but the
    /// stack holds no enclosing medium.
    pub fn resolve(
        ray: &Ray<'m>,
        normal: Vec3,
        material_inside: &'m Medium,
        stack: &MediumStack<'m>,
    ) -> Option<Self> {
        if ray.direction.dot(normal) > 0.0 {
            Some(Self {
                inside: ray.medium,
                outside: stack.top()?,
                from_inside: true,
            })
        } else {
            Some(Self {
                inside: material_inside,
                outside: ray.medium,
                from_inside: false,
            })
        }
    }

    /// Refractive index ratio `inside / outside`.
    #[inline]
    pub fn index_ratio(&self) -> f32 {
        self.inside.index / self.outside.index
    }
}

/// Change applied to a stack by [`MediumStack::cross`].
#[derive(Debug, Clone, Copy)]
pub enum StackChange<'m> {
    Unchanged,
    Pushed,
    Popped(&'m Medium),
}

/// Transition recorded by a journaling stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackTransition {
    Push,
    Pop,
}

/// A continuation ray's medium after crossing (or bouncing off) a boundary.
#[derive(Debug, Clone, Copy)]
pub struct Crossing<'m> {
    pub medium: &'m Medium,
    pub change: StackChange<'m>,
    /// The new direction is on the other side of the surface
    pub transmitted: bool,
}

impl Crossing<'_> {
    /// Continuation origin: nudged forward along the old direction when
    /// transmitted, backward when reflected.
    #[inline]
    pub fn origin(&self, hit_point: Vec3, old_direction: Vec3, hit_translate: f32) -> Vec3 {
        let sign = if self.transmitted { 1.0 } else { -1.0 };
        hit_point + (sign * hit_translate) * old_direction
    }
}

/// LIFO of the media enclosing the current ray.
#[derive(Debug, Clone, Default)]
pub struct MediumStack<'m> {
    stack: Vec<&'m Medium>,
    journal: Option<Vec<StackTransition>>,
}

impl<'m> MediumStack<'m> {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            journal: None,
        }
    }

    /// A stack that records every push and pop made by [`Self::cross`].
    pub fn recording() -> Self {
        Self {
            stack: Vec::new(),
            journal: Some(Vec::new()),
        }
    }

    pub fn push(&mut self, medium: &'m Medium) {
        self.stack.push(medium);
    }

    pub fn pop(&mut self) -> Option<&'m Medium> {
        self.stack.pop()
    }

    /// Innermost enclosing medium.
    pub fn top(&self) -> Option<&'m Medium> {
        self.stack.last().copied()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Media from outermost to innermost.
    pub fn iter(&self) -> impl Iterator<Item = &'m Medium> + '_ {
        self.stack.iter().copied()
    }

    /// Recorded transitions, if journaling.
    pub fn transitions(&self) -> Option<&[StackTransition]> {
        self.journal.as_deref()
    }

    /// Update the stack for a continuation in `direction` from a hit on
    /// `boundary`. Returns `None` on underflow.
    pub fn cross(
        &mut self,
        boundary: &Boundary<'m>,
        direction: Vec3,
        normal: Vec3,
    ) -> Option<Crossing<'m>> {
        let exits = direction.dot(normal) > 0.0;
        let crossing = match (boundary.from_inside, exits) {
            (true, true) => {
                let outside = self.stack.pop()?;
                self.record(StackTransition::Pop);
                Crossing {
                    medium: outside,
                    change: StackChange::Popped(outside),
                    transmitted: true,
                }
            }
            (true, false) => Crossing {
                medium: boundary.inside,
                change: StackChange::Unchanged,
                transmitted: false,
            },
            (false, true) => Crossing {
                medium: boundary.outside,
                change: StackChange::Unchanged,
                transmitted: false,
            },
            (false, false) => {
                self.stack.push(boundary.outside);
                self.record(StackTransition::Push);
                Crossing {
                    medium: boundary.inside,
                    change: StackChange::Pushed,
                    transmitted: true,
                }
            }
        };
        Some(crossing)
    }

    /// Undo a crossing once the continuation has been traced.
    pub fn restore(&mut self, change: StackChange<'m>) {
        match change {
            StackChange::Unchanged => {}
            StackChange::Pushed => {
                self.stack.pop();
            }
            StackChange::Popped(medium) => self.stack.push(medium),
        }
    }

    fn record(&mut self, transition: StackTransition) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(transition);
        }
    }
}

impl PartialEq for MediumStack<'_> {
    /// Stacks are equal when they hold the same media instances in order.
    fn eq(&self, other: &Self) -> bool {
        self.stack.len() == other.stack.len()
            && self
                .stack
                .iter()
                .zip(&other.stack)
                .all(|(a, b)| std::ptr::eq(*a, *b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_non_interacting_never_scatters() {
        let mut rng = StdRng::seed_from_u64(1);
        let glass = Medium::non_interacting(1.5);
        let sample = glass.sample_scattering(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 10.0), &mut rng);
        assert!(sample.event.is_none());
        assert_eq!(sample.attenuation, Color::ONE);
    }

    #[test]
    fn test_zero_lambda_never_scatters() {
        let mut rng = StdRng::seed_from_u64(2);
        let medium = Medium::random_scatter(1.0, 0.0, Color::ZERO);
        for i in 0..100 {
            let end = Vec3::new(0.0, 0.0, 1.0 + i as f32 * 50.0);
            let sample = medium.sample_scattering(Vec3::ZERO, -Vec3::Z, end, &mut rng);
            assert!(sample.event.is_none());
            assert_eq!(sample.attenuation, Color::ONE);
        }
    }

    #[test]
    fn test_absorption_over_segment() {
        let mut rng = StdRng::seed_from_u64(3);
        let medium = Medium::random_scatter(1.0, 0.0, Color::new(0.5, 0.0, 1.0));
        let sample =
            medium.sample_scattering(Vec3::ZERO, Vec3::Y, Vec3::new(0.0, 2.0, 0.0), &mut rng);
        assert!(sample.event.is_none());
        assert!((sample.attenuation.x - (-1.0f32).exp()).abs() < 1e-6);
        assert_eq!(sample.attenuation.y, 1.0);
        assert!((sample.attenuation.z - (-2.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_dense_medium_scatters_within_segment() {
        let mut rng = StdRng::seed_from_u64(4);
        let fog = Medium::random_scatter(1.0, 50.0, Color::splat(0.1));
        let end = Vec3::new(10.0, 0.0, 0.0);
        let mut events = 0;
        for _ in 0..200 {
            let sample = fog.sample_scattering(Vec3::ZERO, -Vec3::X, end, &mut rng);
            if let Some(event) = sample.event {
                events += 1;
                assert!(event.position.x >= 0.0 && event.position.x <= 10.0);
                assert!((event.direction.length() - 1.0).abs() < 1e-4);
                assert!(sample.attenuation.x <= 1.0);
            }
        }
        assert!(events > 190);
    }

    #[test]
    fn test_resolve_boundary_sides() {
        let glass = Medium::non_interacting(1.5);
        let mut stack = MediumStack::new();

        let entering = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, &VACUUM);
        let boundary = Boundary::resolve(&entering, Vec3::Z, &glass, &stack).unwrap();
        assert!(!boundary.from_inside);
        assert_eq!(boundary.inside.index, 1.5);
        assert_eq!(boundary.outside.index, 1.0);
        assert!((boundary.index_ratio() - 1.5).abs() < 1e-6);

        // Leaving with nothing on the stack is an underflow
        let leaving = Ray::new(Vec3::ZERO, Vec3::Z, &glass);
        assert!(Boundary::resolve(&leaving, Vec3::Z, &glass, &stack).is_none());

        stack.push(&VACUUM);
        let boundary = Boundary::resolve(&leaving, Vec3::Z, &glass, &stack).unwrap();
        assert!(boundary.from_inside);
        assert!(std::ptr::eq(boundary.outside, &VACUUM));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_cross_and_restore() {
        let glass = Medium::non_interacting(1.5);
        let mut stack = MediumStack::recording();
        let before = stack.clone();

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z, &VACUUM);
        let boundary = Boundary::resolve(&ray, Vec3::Z, &glass, &stack).unwrap();

        // Reflection leaves the stack alone
        let reflected = stack.cross(&boundary, Vec3::Z, Vec3::Z).unwrap();
        assert!(!reflected.transmitted);
        assert!(std::ptr::eq(reflected.medium, &VACUUM));
        assert_eq!(stack, before);

        let entered = stack.cross(&boundary, -Vec3::Z, Vec3::Z).unwrap();
        assert!(entered.transmitted);
        assert!(std::ptr::eq(entered.medium, &glass));
        assert_eq!(stack.len(), 1);

        stack.restore(entered.change);
        assert_eq!(stack, before);
        assert_eq!(stack.transitions(), Some(&[StackTransition::Push][..]));
    }

    #[test]
    fn test_cross_origin_offset() {
        let crossing = Crossing {
            medium: &VACUUM,
            change: StackChange::Unchanged,
            transmitted: true,
        };
        let p = crossing.origin(Vec3::ZERO, -Vec3::Z, 0.01);
        assert_eq!(p, Vec3::new(0.0, 0.0, -0.01));

        let crossing = Crossing {
            transmitted: false,
            ..crossing
        };
        assert_eq!(crossing.origin(Vec3::ZERO, -Vec3::Z, 0.01), Vec3::new(0.0, 0.0, 0.01));
    }
}
