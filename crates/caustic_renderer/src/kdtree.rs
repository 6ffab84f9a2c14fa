//! Static 3D k-d tree over point payloads.
//!
//! The tree is stored implicitly: the root of any index range `[lo, hi)`
//! sits at `(lo + hi) / 2`, everything left of it is `<=` along that
//! node's split axis and everything right of it is `>=`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use caustic_math::{Aabb, Vec3};

/// Balanced k-d tree built once from a set of points.
#[derive(Debug, Clone)]
pub struct KdTree<T> {
    entries: Vec<(Vec3, T)>,
    axes: Vec<u8>,
}

impl<T> KdTree<T> {
    /// Build by median split on the longest axis of each subrange.
    pub fn build(mut entries: Vec<(Vec3, T)>) -> Self {
        let mut axes = vec![0u8; entries.len()];
        build_range(&mut entries, &mut axes);
        Self { entries, axes }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every payload, in tree order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec3, &T)> + '_ {
        self.entries.iter().map(|(p, item)| (*p, item))
    }

    /// Payloads whose point lies within `radius` of `center` (inclusive).
    pub fn range(&self, center: Vec3, radius: f32) -> Vec<&T> {
        let mut found = Vec::new();
        if radius >= 0.0 {
            self.range_in(0, self.entries.len(), center, radius, &mut found);
        }
        found
    }

    fn range_in<'a>(&'a self, lo: usize, hi: usize, center: Vec3, radius: f32, found: &mut Vec<&'a T>) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        let (point, item) = &self.entries[mid];
        if point.distance_squared(center) <= radius * radius {
            found.push(item);
        }

        let axis = self.axes[mid] as usize;
        let split = point[axis];
        if center[axis] - radius <= split {
            self.range_in(lo, mid, center, radius, found);
        }
        if center[axis] + radius >= split {
            self.range_in(mid + 1, hi, center, radius, found);
        }
    }

    /// The `n` payloads closest to `center`, nearest first.
    pub fn nearest(&self, center: Vec3, n: usize) -> Vec<&T> {
        if n == 0 {
            return Vec::new();
        }
        let mut heap = BinaryHeap::with_capacity(n + 1);
        self.nearest_in(0, self.entries.len(), center, n, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| &self.entries[c.index].1)
            .collect()
    }

    fn nearest_in(
        &self,
        lo: usize,
        hi: usize,
        center: Vec3,
        n: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        let point = self.entries[mid].0;

        heap.push(Candidate {
            distance_squared: point.distance_squared(center),
            index: mid,
        });
        if heap.len() > n {
            heap.pop();
        }

        let axis = self.axes[mid] as usize;
        let offset = center[axis] - point[axis];
        let (near, far) = if offset <= 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.nearest_in(near.0, near.1, center, n, heap);
        let worst = heap.peek().map_or(f32::INFINITY, |c| c.distance_squared);
        if heap.len() < n || offset * offset <= worst {
            self.nearest_in(far.0, far.1, center, n, heap);
        }
    }
}

fn build_range<T>(entries: &mut [(Vec3, T)], axes: &mut [u8]) {
    if entries.is_empty() {
        return;
    }
    let bounds = Aabb::from_points(entries.iter().map(|(p, _)| *p));
    let axis = bounds.longest_axis();
    let mid = entries.len() / 2;
    entries.select_nth_unstable_by(mid, |a, b| a.0[axis].total_cmp(&b.0[axis]));
    axes[mid] = axis as u8;

    let (left, right) = entries.split_at_mut(mid);
    let (left_axes, right_axes) = axes.split_at_mut(mid);
    build_range(left, left_axes);
    build_range(&mut right[1..], &mut right_axes[1..]);
}

/// Max-heap entry keyed on distance.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_squared: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_squared
            .total_cmp(&other.distance_squared)
            .then(self.index.cmp(&other.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<(Vec3, usize)> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                let p = Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-3.0..3.0),
                );
                (p, i)
            })
            .collect()
    }

    #[test]
    fn test_range_matches_brute_force() {
        let points = random_points(2000, 21);
        let tree = KdTree::build(points.clone());
        assert_eq!(tree.len(), 2000);

        for (center, radius) in [
            (Vec3::ZERO, 0.5),
            (Vec3::new(4.0, 0.5, -2.0), 1.25),
            (Vec3::new(-2.0, 0.0, 1.0), 3.0),
            (Vec3::new(20.0, 0.0, 0.0), 1.0),
        ] {
            let mut got: Vec<usize> = tree.range(center, radius).into_iter().copied().collect();
            got.sort_unstable();
            let expected: Vec<usize> = points
                .iter()
                .filter(|(p, _)| p.distance_squared(center) <= radius * radius)
                .map(|(_, i)| *i)
                .collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_range_is_inclusive() {
        let tree = KdTree::build(vec![
            (Vec3::new(1.0, 0.0, 0.0), 'a'),
            (Vec3::new(0.0, 2.0, 0.0), 'b'),
            (Vec3::new(0.0, 0.0, 0.0), 'c'),
        ]);
        let mut got: Vec<char> = tree.range(Vec3::ZERO, 1.0).into_iter().copied().collect();
        got.sort_unstable();
        assert_eq!(got, vec!['a', 'c']);
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points = random_points(1500, 22);
        let tree = KdTree::build(points.clone());
        let center = Vec3::new(0.3, -0.2, 0.7);

        let got: Vec<usize> = tree.nearest(center, 10).into_iter().copied().collect();

        let mut sorted = points.clone();
        sorted.sort_by(|a, b| {
            a.0.distance_squared(center)
                .total_cmp(&b.0.distance_squared(center))
        });
        let expected: Vec<usize> = sorted.iter().take(10).map(|(_, i)| *i).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_empty_and_small() {
        let empty: KdTree<u32> = KdTree::build(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.range(Vec3::ZERO, 10.0).is_empty());
        assert!(empty.nearest(Vec3::ZERO, 3).is_empty());

        let single = KdTree::build(vec![(Vec3::ONE, 7u32)]);
        assert_eq!(single.nearest(Vec3::ZERO, 5), vec![&7]);
    }

    #[test]
    fn test_duplicate_points() {
        let tree = KdTree::build((0..64).map(|i| (Vec3::splat(1.0), i)).collect());
        assert_eq!(tree.range(Vec3::splat(1.0), 0.0).len(), 64);
        assert_eq!(tree.nearest(Vec3::ZERO, 4).len(), 4);
    }
}
