//! Oriented point clouds.
//!
//! The triangulator reads points by index: a position and a normal each.
//! [`PointCloud`] is the minimal container providing that access.
//!
//! # Example
//!
//! ```
//! use mesh_triangulate::{CloudPoint, PointCloud};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cloud = PointCloud::new();
//! cloud.add_point(Point3::new(0.0, 0.0, 0.0), Vector3::z());
//! cloud.push(CloudPoint::from_coords(1.0, 0.0, 0.0, Vector3::z()));
//!
//! assert_eq!(cloud.len(), 2);
//! assert!(cloud.is_valid_point(1));
//! ```

use mesh_types::Vertex;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A sample point with its surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CloudPoint {
    /// The 3D position of the point.
    pub position: Point3<f64>,

    /// Surface normal at the point. Expected to be unit length; it is
    /// normalized again wherever the direction matters.
    pub normal: Vector3<f64>,
}

impl CloudPoint {
    /// Creates a point from a position and a normal.
    #[must_use]
    pub const fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    /// Creates a point from x, y, z coordinates and a normal.
    #[must_use]
    pub const fn from_coords(x: f64, y: f64, z: f64, normal: Vector3<f64>) -> Self {
        Self::new(Point3::new(x, y, z), normal)
    }

    /// Returns true if the position is finite and the normal is finite and
    /// non-zero.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_triangulate::CloudPoint;
    /// use nalgebra::Vector3;
    ///
    /// assert!(CloudPoint::from_coords(0.0, 1.0, 2.0, Vector3::z()).is_valid());
    /// assert!(!CloudPoint::from_coords(f64::NAN, 1.0, 2.0, Vector3::z()).is_valid());
    /// assert!(!CloudPoint::from_coords(0.0, 1.0, 2.0, Vector3::zeros()).is_valid());
    /// ```
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.position.coords.iter().all(|c| c.is_finite())
            && self.normal.iter().all(|c| c.is_finite())
            && self.normal.norm_squared() > 0.0
    }

    /// The normal scaled to unit length.
    #[must_use]
    pub fn unit_normal(&self) -> Vector3<f64> {
        self.normal.normalize()
    }

    /// Converts this point to a mesh vertex carrying its normal.
    #[must_use]
    pub const fn to_vertex(&self) -> Vertex {
        Vertex::with_normal(self.position, self.normal)
    }
}

/// An ordered collection of oriented points.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointCloud {
    /// The points in this cloud.
    pub points: Vec<CloudPoint>,
}

impl PointCloud {
    /// Creates an empty point cloud.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Creates a point cloud with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Creates a point cloud from parallel position and normal slices.
    ///
    /// Extra entries in the longer slice are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_triangulate::PointCloud;
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let positions = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
    /// let normals = [Vector3::z(), Vector3::z()];
    /// let cloud = PointCloud::from_parts(&positions, &normals);
    /// assert_eq!(cloud.len(), 2);
    /// ```
    #[must_use]
    pub fn from_parts(positions: &[Point3<f64>], normals: &[Vector3<f64>]) -> Self {
        let points = positions
            .iter()
            .zip(normals)
            .map(|(p, n)| CloudPoint::new(*p, *n))
            .collect();
        Self { points }
    }

    /// Returns the number of points in the cloud.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the cloud has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Adds a point to the cloud.
    pub fn push(&mut self, point: CloudPoint) {
        self.points.push(point);
    }

    /// Adds a point from a position and a normal.
    pub fn add_point(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.points.push(CloudPoint::new(position, normal));
    }

    /// Returns the point at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CloudPoint> {
        self.points.get(index)
    }

    /// Returns true if `index` exists and the point there is usable.
    #[must_use]
    pub fn is_valid_point(&self, index: usize) -> bool {
        self.points.get(index).is_some_and(CloudPoint::is_valid)
    }

    /// Mesh vertices mirroring the cloud, one per point.
    #[must_use]
    pub fn to_mesh_vertices(&self) -> Vec<Vertex> {
        self.points.iter().map(CloudPoint::to_vertex).collect()
    }
}

impl FromIterator<CloudPoint> for PointCloud {
    fn from_iter<I: IntoIterator<Item = CloudPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl Extend<CloudPoint> for PointCloud {
    fn extend<I: IntoIterator<Item = CloudPoint>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}
