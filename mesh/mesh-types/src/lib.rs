//! Mesh types shared by the reconstruction crates.
//!
//! - [`Vertex`] - position with an optional unit normal
//! - [`IndexedMesh`] - triangles as index triples into a vertex list
//! - [`face_key`] - the vertex set of a face, ignoring rotation and winding
//!
//! # Layer 0
//!
//! No rendering, no I/O. Coordinates are unit-agnostic `f64`.
//!
//! # Example
//!
//! ```
//! use mesh_types::{IndexedMesh, Point3, Vector3, Vertex, face_key};
//!
//! let normal = Vector3::z();
//! let mut mesh = IndexedMesh::with_capacity(3, 1);
//! mesh.vertices.push(Vertex::with_normal(Point3::new(0.0, 0.0, 0.0), normal));
//! mesh.vertices.push(Vertex::with_normal(Point3::new(1.0, 0.0, 0.0), normal));
//! mesh.vertices.push(Vertex::with_normal(Point3::new(0.5, 1.0, 0.0), normal));
//! mesh.faces.push([0, 1, 2]);
//!
//! assert!(mesh.has_valid_faces());
//! assert_eq!(face_key(mesh.faces[0]), face_key([2, 1, 0]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod mesh;
mod vertex;

pub use mesh::{IndexedMesh, face_key};
pub use vertex::Vertex;

pub use nalgebra::{Point3, Vector3};
