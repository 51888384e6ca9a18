//! Combining triangulations of overlapping point sets.
//!
//! Both operations assume the two meshes index the same point cloud. They
//! only delete or append whole faces; vertices are never touched.

use hashbrown::HashSet;
use mesh_types::{IndexedMesh, face_key};
use tracing::debug;

use crate::state::PointState;

/// Replaces the part of `mesh1` covered by `mesh2`.
///
/// Removes from `mesh1` every face whose three vertices are
/// [`Completed`](PointState::Completed) or [`Boundary`](PointState::Boundary)
/// in `states2` (the point states of the run that produced `mesh2`), then
/// appends the faces of `mesh2` that `mesh1` does not already contain.
/// Vertices missing from `states2` count as not meshed.
///
/// Returns the number of faces removed from `mesh1`.
///
/// # Example
///
/// ```
/// use mesh_triangulate::{PointState, merge_meshes};
/// use mesh_types::{IndexedMesh, Vertex};
///
/// let vertices = vec![Vertex::from_coords(0.0, 0.0, 0.0); 4];
/// let mut mesh1 = IndexedMesh::from_parts(vertices.clone(), vec![[0, 1, 2], [1, 2, 3]]);
/// let mesh2 = IndexedMesh::from_parts(vertices, vec![[2, 1, 3]]);
/// let states2 = [
///     PointState::Free,
///     PointState::Boundary,
///     PointState::Completed,
///     PointState::Boundary,
/// ];
///
/// let removed = merge_meshes(&mut mesh1, &mesh2, &states2);
/// assert_eq!(removed, 1);
/// assert_eq!(mesh1.faces, vec![[0, 1, 2], [2, 1, 3]]);
/// ```
pub fn merge_meshes(mesh1: &mut IndexedMesh, mesh2: &IndexedMesh, states2: &[PointState]) -> usize {
    let meshed = |v: u32| {
        states2
            .get(v as usize)
            .is_some_and(|s| s.is_meshed())
    };
    let removed = mesh1.retain_faces(|face| !face.iter().all(|&v| meshed(v)));

    let mut present: HashSet<[u32; 3]> = mesh1.faces.iter().map(|&f| face_key(f)).collect();
    let before = mesh1.faces.len();
    for &face in &mesh2.faces {
        if present.insert(face_key(face)) {
            mesh1.faces.push(face);
        }
    }

    debug!(
        removed,
        appended = mesh1.faces.len() - before,
        "Merged triangulations"
    );
    removed
}

/// Removes from `mesh1` every face whose three vertices all belong to some
/// face of `mesh2`.
///
/// Returns the number of faces removed.
///
/// # Example
///
/// ```
/// use mesh_triangulate::remove_overlap_triangles;
/// use mesh_types::{IndexedMesh, Vertex};
///
/// let vertices = vec![Vertex::from_coords(0.0, 0.0, 0.0); 5];
/// let mut mesh1 = IndexedMesh::from_parts(vertices.clone(), vec![[0, 1, 2], [2, 3, 4]]);
/// let mesh2 = IndexedMesh::from_parts(vertices, vec![[0, 1, 3], [1, 2, 3]]);
///
/// assert_eq!(remove_overlap_triangles(&mut mesh1, &mesh2), 1);
/// assert_eq!(mesh1.faces, vec![[2, 3, 4]]);
/// ```
pub fn remove_overlap_triangles(mesh1: &mut IndexedMesh, mesh2: &IndexedMesh) -> usize {
    let used = mesh2.vertex_triangle_lists();
    let in_mesh2 = |v: u32| used.get(v as usize).is_some_and(|tris| !tris.is_empty());
    let removed = mesh1.retain_faces(|face| !face.iter().all(|&v| in_mesh2(v)));
    debug!(removed, "Removed overlapping triangles");
    removed
}
