//! Nearest-neighbor search over a point cloud.
//!
//! The triangulator only needs one capability from its spatial index: given
//! a point index, return nearby point indices with squared distances,
//! nearest first. [`NeighborSearch`] is that contract. Two adapters are
//! provided:
//!
//! - [`KdTreeSearch`] wraps a `kiddo` kd-tree.
//! - [`BruteForceSearch`] scans every point; useful as an oracle and for
//!   tiny clouds.
//!
//! Both order results by squared distance and then by point index, so they
//! return identical neighborhoods for the same cloud. Non-finite points are
//! never returned and have empty neighborhoods.
//!
//! # Example
//!
//! ```
//! use mesh_triangulate::{BruteForceSearch, KdTreeSearch, NeighborSearch, PointCloud, SearchIndex};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cloud = PointCloud::new();
//! for i in 0..4 {
//!     cloud.add_point(Point3::new(f64::from(i), 0.0, 0.0), Vector3::z());
//! }
//!
//! let tree = KdTreeSearch::build(&cloud);
//! let scan = BruteForceSearch::build(&cloud);
//!
//! let near = tree.nearest(0, 3);
//! assert_eq!(near.iter().map(|n| n.index).collect::<Vec<_>>(), vec![0, 1, 2]);
//! assert_eq!(near, scan.nearest(0, 3));
//! ```

use std::fmt;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::{Point3, Rotation3};

use crate::pointcloud::PointCloud;

/// A neighbor returned by a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the neighbor in the point cloud.
    pub index: usize,
    /// Squared Euclidean distance to the query point.
    pub sqr_distance: f64,
}

/// Read-only neighbor queries by point index.
///
/// Implementations must be deterministic and return results sorted by
/// ascending squared distance. The query point itself is part of the
/// result set.
pub trait NeighborSearch: Sync {
    /// Up to `k` nearest points to point `query`.
    fn nearest(&self, query: usize, k: usize) -> Vec<Neighbor>;

    /// Up to `k` points within `radius` of point `query`, nearest first.
    fn within(&self, query: usize, radius: f64, k: usize) -> Vec<Neighbor>;
}

impl<T: NeighborSearch + ?Sized> NeighborSearch for &T {
    fn nearest(&self, query: usize, k: usize) -> Vec<Neighbor> {
        (**self).nearest(query, k)
    }

    fn within(&self, query: usize, radius: f64, k: usize) -> Vec<Neighbor> {
        (**self).within(query, radius, k)
    }
}

/// A neighbor search that can be (re)built from a cloud.
///
/// Needed wherever the cloud grows after the search was created, as in
/// [`TriangulationSession::update_mesh`](crate::TriangulationSession::update_mesh).
pub trait SearchIndex: NeighborSearch + Sized {
    /// Builds the search over every finite point of `cloud`.
    fn build(cloud: &PointCloud) -> Self;
}

/// Sorts by distance, then index, and keeps the first `k`.
fn rank(neighbors: &mut Vec<Neighbor>, k: usize) {
    neighbors.sort_by(|a, b| {
        a.sqr_distance
            .total_cmp(&b.sqr_distance)
            .then(a.index.cmp(&b.index))
    });
    neighbors.truncate(k);
}

fn finite_positions(cloud: &PointCloud) -> Vec<Option<Point3<f64>>> {
    cloud
        .points
        .iter()
        .map(|p| {
            p.position
                .coords
                .iter()
                .all(|c| c.is_finite())
                .then_some(p.position)
        })
        .collect()
}

// Relative slack when comparing distances measured in the rotated frame.
const FRAME_SLACK: f64 = 1e-9;

/// Neighbor search backed by a `kiddo` kd-tree.
///
/// Points are stored in a fixed rotated frame. kiddo refuses to split a
/// bucket whose points share the coordinate on the split axis, which flat,
/// axis-aligned scans would otherwise hit. Distances are rotation
/// invariant; candidates are re-ranked by their exact distance in the
/// original frame.
///
/// Exactly coincident points share one tree item, so any number of
/// duplicates fits in a bucket.
pub struct KdTreeSearch {
    tree: KdTree<f64, 3>,
    positions: Vec<Option<Point3<f64>>>,
    /// Point indices at each tree item's position.
    groups: Vec<Vec<usize>>,
    rotation: Rotation3<f64>,
}

/// Bit pattern of a position, with `-0.0` folded into `0.0`.
fn position_bits(p: &Point3<f64>) -> [u64; 3] {
    [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()]
}

impl KdTreeSearch {
    fn frame() -> Rotation3<f64> {
        Rotation3::from_euler_angles(0.618_034, 0.414_214, 0.732_051)
    }

    fn key(&self, p: &Point3<f64>) -> [f64; 3] {
        let r = self.rotation * p;
        [r.x, r.y, r.z]
    }

    /// Number of points stored in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.iter().flatten().count()
    }

    /// Returns true if the tree holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exact neighbors of `query` among tree candidates within
    /// `sqr_bound` (rotated frame), filtered to `sqr_limit`.
    #[allow(clippy::cast_possible_truncation)]
    fn collect_within(
        &self,
        q: &Point3<f64>,
        sqr_bound: f64,
        sqr_limit: f64,
        k: usize,
    ) -> Vec<Neighbor> {
        let bound = sqr_bound * (1.0 + FRAME_SLACK) + f64::EPSILON;
        let candidates = self.tree.within::<SquaredEuclidean>(&self.key(q), bound);
        let mut neighbors: Vec<Neighbor> = candidates
            .iter()
            .flat_map(|c| self.groups.get(c.item as usize).into_iter().flatten())
            .filter_map(|&index| {
                let p = self.positions.get(index).copied().flatten()?;
                let sqr_distance = (p - q).norm_squared();
                (sqr_distance <= sqr_limit).then_some(Neighbor {
                    index,
                    sqr_distance,
                })
            })
            .collect();
        rank(&mut neighbors, k);
        neighbors
    }
}

impl SearchIndex for KdTreeSearch {
    fn build(cloud: &PointCloud) -> Self {
        let positions = finite_positions(cloud);
        let rotation = Self::frame();
        let mut tree = KdTree::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_position: HashMap<[u64; 3], usize> = HashMap::new();

        for (i, p) in positions.iter().enumerate() {
            let Some(p) = p else {
                continue;
            };
            match by_position.entry(position_bits(p)) {
                Entry::Occupied(slot) => groups[*slot.get()].push(i),
                Entry::Vacant(slot) => {
                    let item = groups.len();
                    slot.insert(item);
                    groups.push(vec![i]);
                    let key = rotation * p;
                    tree.add(&[key.x, key.y, key.z], item as u64);
                }
            }
        }

        Self {
            tree,
            positions,
            groups,
            rotation,
        }
    }
}

impl NeighborSearch for KdTreeSearch {
    fn nearest(&self, query: usize, k: usize) -> Vec<Neighbor> {
        let Some(q) = self.positions.get(query).copied().flatten() else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }

        // The k-th distance bounds the candidate set; re-querying by radius
        // pulls in every point tied with it so ties resolve by index.
        let first = self.tree.nearest_n::<SquaredEuclidean>(&self.key(&q), k);
        let Some(kth) = first.last() else {
            return Vec::new();
        };
        self.collect_within(&q, kth.distance, f64::INFINITY, k)
    }

    fn within(&self, query: usize, radius: f64, k: usize) -> Vec<Neighbor> {
        let Some(q) = self.positions.get(query).copied().flatten() else {
            return Vec::new();
        };
        if k == 0 || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let sqr_radius = radius * radius;
        self.collect_within(&q, sqr_radius, sqr_radius, k)
    }
}

impl fmt::Debug for KdTreeSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KdTreeSearch")
            .field("points", &self.len())
            .finish_non_exhaustive()
    }
}

/// Neighbor search by linear scan.
#[derive(Debug, Clone)]
pub struct BruteForceSearch {
    positions: Vec<Option<Point3<f64>>>,
}

impl BruteForceSearch {
    fn scan(&self, q: &Point3<f64>, sqr_limit: f64, k: usize) -> Vec<Neighbor> {
        let mut neighbors: Vec<Neighbor> = self
            .positions
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                let sqr_distance = (p.as_ref()? - q).norm_squared();
                (sqr_distance <= sqr_limit).then_some(Neighbor {
                    index,
                    sqr_distance,
                })
            })
            .collect();
        rank(&mut neighbors, k);
        neighbors
    }
}

impl SearchIndex for BruteForceSearch {
    fn build(cloud: &PointCloud) -> Self {
        Self {
            positions: finite_positions(cloud),
        }
    }
}

impl NeighborSearch for BruteForceSearch {
    fn nearest(&self, query: usize, k: usize) -> Vec<Neighbor> {
        match self.positions.get(query).copied().flatten() {
            Some(q) => self.scan(&q, f64::INFINITY, k),
            None => Vec::new(),
        }
    }

    fn within(&self, query: usize, radius: f64, k: usize) -> Vec<Neighbor> {
        match self.positions.get(query).copied().flatten() {
            Some(q) if radius >= 0.0 => self.scan(&q, radius * radius, k),
            _ => Vec::new(),
        }
    }
}
