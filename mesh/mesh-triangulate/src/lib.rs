//! Greedy projection triangulation of oriented point clouds.
//!
//! This crate reconstructs a triangle mesh from points with normals by
//! growing a front across the cloud:
//!
//! - **Point cloud** - [`PointCloud`], points with normals addressed by index
//! - **Neighbor search** - [`NeighborSearch`], with kd-tree and linear-scan adapters
//! - **Geometry** - tangent frames and 2D visibility predicates
//! - **Session** - [`TriangulationSession`], the per-point state machine
//! - **Merging** - combining triangulations of overlapping point sets
//!
//! # Layer 0
//!
//! No rendering, no I/O. Meshes are plain [`mesh_types::IndexedMesh`]
//! values with one vertex per input point.
//!
//! # Algorithm
//!
//! A seed point and two free neighbors form the first triangle of a
//! component. Points on the open front are then processed in discovery
//! order: each one projects its neighbors into its tangent plane, keeps the
//! ones it can see without crossing an existing front edge, and fills the
//! fan between its two front neighbors with triangles. Wide openings stay
//! open and the point becomes part of the boundary. When the front is
//! exhausted a new component is seeded from any remaining free point.
//!
//! # Quick Start
//!
//! ```
//! use mesh_triangulate::{GreedyParams, GreedyProjectionTriangulation, PointCloud, PointState, SurfaceReconstruction};
//! use nalgebra::{Point3, Vector3};
//! use std::f64::consts::PI;
//!
//! let mut cloud = PointCloud::new();
//! for j in 0..5 {
//!     for i in 0..5 {
//!         cloud.add_point(Point3::new(f64::from(i), f64::from(j), 0.0), Vector3::z());
//!     }
//! }
//!
//! let params = GreedyParams::new()
//!     .with_mu(2.5)
//!     .with_search_radius(1.5)
//!     .with_max_nearest_neighbors(10)
//!     .with_minimum_angle(PI / 18.0)
//!     .with_maximum_angle(2.0 * PI / 3.0)
//!     .with_maximum_surface_angle(PI / 4.0);
//!
//! let result = GreedyProjectionTriangulation::new(params).reconstruct(&cloud).unwrap();
//!
//! assert_eq!(result.mesh.faces.len(), 32);
//! assert_eq!(result.diagnostics.states[12], PointState::Completed);
//! assert_eq!(result.diagnostics.states[0], PointState::Boundary);
//! println!("{result}");
//! ```
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`params`] | Triangulation parameters |
//! | [`pointcloud`] | Point cloud container |
//! | [`search`] | Neighbor search contract and adapters |
//! | [`geometry`] | Tangent frames, angles, visibility |
//! | [`session`] | Triangulation state machine and incremental update |
//! | [`merge`] | Merging and overlap removal |
//! | [`reconstruct`] | The [`SurfaceReconstruction`] strategy |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)] // ffn/sfn, f_r/s_r
#![allow(clippy::needless_range_loop)] // slot indices address several arrays

pub mod error;
pub mod geometry;
pub mod merge;
pub mod params;
pub mod pointcloud;
pub mod reconstruct;
pub mod search;
pub mod session;
pub mod state;

pub use error::{TriangulationError, TriangulationResult};
pub use merge::{merge_meshes, remove_overlap_triangles};
pub use params::GreedyParams;
pub use pointcloud::{CloudPoint, PointCloud};
pub use reconstruct::{GreedyProjectionTriangulation, Reconstruction, SurfaceReconstruction};
pub use search::{BruteForceSearch, KdTreeSearch, Neighbor, NeighborSearch, SearchIndex};
pub use session::TriangulationSession;
pub use state::{PointState, TriangulationDiagnostics, TriangulationStats};
