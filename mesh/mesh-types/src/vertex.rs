//! Mesh vertices.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A mesh vertex: a position with an optional unit normal.
///
/// Reconstructed meshes carry the normals of the sample points they were
/// built from, so the normal travels with the vertex rather than living in
/// a separate attribute table.
///
/// # Example
///
/// ```
/// use mesh_types::{Vertex, Point3, Vector3};
///
/// let v = Vertex::with_normal(Point3::new(1.0, 2.0, 3.0), Vector3::z());
/// assert_eq!(v.position.y, 2.0);
/// assert!(v.normal.is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    /// Position in 3D space.
    pub position: Point3<f64>,

    /// Unit normal, if known.
    pub normal: Option<Vector3<f64>>,
}

impl Vertex {
    /// Create a vertex without a normal.
    #[inline]
    #[must_use]
    pub const fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
        }
    }

    /// Create a vertex from raw coordinates.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::Vertex;
    ///
    /// let v = Vertex::from_coords(1.0, 0.0, -1.0);
    /// assert_eq!(v.position.z, -1.0);
    /// assert!(v.normal.is_none());
    /// ```
    #[inline]
    #[must_use]
    pub const fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Create a vertex with a normal.
    #[inline]
    #[must_use]
    pub const fn with_normal(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            position,
            normal: Some(normal),
        }
    }

    /// Squared distance to another vertex.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        (self.position - other.position).norm_squared()
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Point3::origin())
    }
}
