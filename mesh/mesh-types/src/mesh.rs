//! Indexed triangle mesh.

use crate::Vertex;
use hashbrown::HashSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh.
///
/// Vertices and faces are stored separately, with faces referencing
/// vertices by index. Meshes produced by surface reconstruction keep one
/// vertex per input sample, so face indices are also sample indices.
///
/// # Example
///
/// ```
/// use mesh_types::{IndexedMesh, Vertex};
///
/// let mut mesh = IndexedMesh::from_vertices(vec![
///     Vertex::from_coords(0.0, 0.0, 0.0),
///     Vertex::from_coords(1.0, 0.0, 0.0),
///     Vertex::from_coords(0.0, 1.0, 0.0),
/// ]);
/// mesh.faces.push([0, 1, 2]);
///
/// assert!(mesh.has_valid_faces());
/// assert_eq!(mesh.max_edge_length(), Some(2.0_f64.sqrt()));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexedMesh {
    /// Vertex data.
    pub vertices: Vec<Vertex>,

    /// Triangle faces as indices into the vertex array.
    pub faces: Vec<[u32; 3]>,
}

/// Canonical key for a face, independent of its rotation and winding.
///
/// Two faces share a key exactly when they use the same three vertices.
///
/// # Example
///
/// ```
/// use mesh_types::face_key;
///
/// assert_eq!(face_key([4, 1, 2]), face_key([2, 4, 1]));
/// assert_eq!(face_key([4, 1, 2]), face_key([1, 4, 2]));
/// ```
#[inline]
#[must_use]
pub fn face_key(face: [u32; 3]) -> [u32; 3] {
    let mut key = face;
    key.sort_unstable();
    key
}

impl IndexedMesh {
    /// Create a new empty mesh.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh with pre-allocated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Create a mesh from vertices and faces.
    #[inline]
    #[must_use]
    pub const fn from_parts(vertices: Vec<Vertex>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Create a mesh that shares its vertex list with `vertices` and has no
    /// faces yet.
    #[must_use]
    pub fn from_vertices(vertices: Vec<Vertex>) -> Self {
        Self {
            vertices,
            faces: Vec::new(),
        }
    }

    /// Returns true if every face references three distinct, existing
    /// vertices.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{IndexedMesh, Vertex};
    ///
    /// let vertices = vec![Vertex::from_coords(0.0, 0.0, 0.0); 3];
    /// assert!(IndexedMesh::from_parts(vertices.clone(), vec![[0, 1, 2]]).has_valid_faces());
    /// assert!(!IndexedMesh::from_parts(vertices.clone(), vec![[0, 1, 1]]).has_valid_faces());
    /// assert!(!IndexedMesh::from_parts(vertices, vec![[0, 1, 3]]).has_valid_faces());
    /// ```
    #[must_use]
    pub fn has_valid_faces(&self) -> bool {
        let n = self.vertices.len();
        self.faces.iter().all(|&[a, b, c]| {
            a != b && b != c && a != c && [a, b, c].iter().all(|&i| (i as usize) < n)
        })
    }

    /// Number of faces that repeat the vertex set of an earlier face.
    #[must_use]
    pub fn duplicate_face_count(&self) -> usize {
        let mut seen = HashSet::with_capacity(self.faces.len());
        self.faces
            .iter()
            .filter(|&&face| !seen.insert(face_key(face)))
            .count()
    }

    /// Length of the longest triangle edge, or `None` for a mesh without
    /// faces. Faces with out-of-range indices are ignored.
    #[must_use]
    pub fn max_edge_length(&self) -> Option<f64> {
        let mut longest: Option<f64> = None;
        for &[a, b, c] in &self.faces {
            let (Some(va), Some(vb), Some(vc)) = (
                self.vertices.get(a as usize),
                self.vertices.get(b as usize),
                self.vertices.get(c as usize),
            ) else {
                continue;
            };
            let edge = va
                .distance_squared(vb)
                .max(vb.distance_squared(vc))
                .max(va.distance_squared(vc))
                .sqrt();
            longest = Some(longest.map_or(edge, |l| l.max(edge)));
        }
        longest
    }

    /// For every vertex, the indices of the faces that contain it.
    ///
    /// Faces referencing missing vertices only contribute to the vertices
    /// that exist.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_types::{IndexedMesh, Vertex};
    ///
    /// let vertices = vec![Vertex::default(); 4];
    /// let mesh = IndexedMesh::from_parts(vertices, vec![[0, 1, 2], [1, 3, 2]]);
    /// let lists = mesh.vertex_triangle_lists();
    ///
    /// assert_eq!(lists[0], vec![0]);
    /// assert_eq!(lists[1], vec![0, 1]);
    /// assert_eq!(lists[3], vec![1]);
    /// ```
    #[must_use]
    pub fn vertex_triangle_lists(&self) -> Vec<Vec<usize>> {
        let mut lists = vec![Vec::new(); self.vertices.len()];
        for (face_index, face) in self.faces.iter().enumerate() {
            for &v in face {
                if let Some(list) = lists.get_mut(v as usize) {
                    list.push(face_index);
                }
            }
        }
        lists
    }

    /// Keep only the faces for which `keep` returns true, preserving order.
    ///
    /// Returns the number of faces removed.
    pub fn retain_faces<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[u32; 3]) -> bool,
    {
        let before = self.faces.len();
        self.faces.retain(|face| keep(face));
        before - self.faces.len()
    }
}
