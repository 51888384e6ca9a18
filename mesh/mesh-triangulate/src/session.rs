//! Triangulation sessions.
//!
//! A [`TriangulationSession`] owns the point cloud, the neighbor search and
//! every per-point array of one reconstruction: state, front links, source
//! and component id. Runs are sequential; the only parallel step is the
//! optional neighborhood prefetch.
//!
//! # Example
//!
//! ```
//! use mesh_triangulate::{GreedyParams, KdTreeSearch, PointCloud, PointState, SearchIndex, TriangulationSession};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cloud = PointCloud::new();
//! for j in 0..3 {
//!     for i in 0..3 {
//!         cloud.add_point(Point3::new(f64::from(i), f64::from(j), 0.0), Vector3::z());
//!     }
//! }
//!
//! let search = KdTreeSearch::build(&cloud);
//! let params = GreedyParams::for_spacing(1.0).with_max_nearest_neighbors(10);
//! let mut session = TriangulationSession::new(cloud, search, params).unwrap();
//! session.run();
//!
//! assert_eq!(session.faces().len(), 8);
//! assert_eq!(session.point_states()[4], PointState::Completed);
//! ```

mod front;

use std::collections::VecDeque;

use hashbrown::HashSet;
use mesh_types::{IndexedMesh, face_key};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{TriangulationError, TriangulationResult};
use crate::geometry::TangentFrame;
use crate::params::GreedyParams;
use crate::pointcloud::{CloudPoint, PointCloud};
use crate::search::{Neighbor, NeighborSearch, SearchIndex};
use crate::state::{PointState, TriangulationDiagnostics, TriangulationStats};

/// State of one greedy projection triangulation.
///
/// Build it over a cloud and a neighbor search of that same cloud, call
/// [`run`](Self::run), then read the faces and per-point arrays. Further
/// points can be added later with [`update_mesh`](Self::update_mesh).
#[derive(Debug)]
pub struct TriangulationSession<S> {
    params: GreedyParams,
    cloud: PointCloud,
    normals: Vec<Vector3<f64>>,
    search: S,

    state: Vec<PointState>,
    source: Vec<Option<usize>>,
    ffn: Vec<Option<usize>>,
    sfn: Vec<Option<usize>>,
    part: Vec<Option<usize>>,

    queued: Vec<bool>,
    queue: VecDeque<usize>,
    faces: Vec<[u32; 3]>,
    emitted: HashSet<[u32; 3]>,
    components: usize,

    // Set when the previous chain step already linked the current point.
    already_connected: bool,
    prefetched: Option<Vec<Vec<Neighbor>>>,
    fronts_outside_search: usize,
    warned_outside_search: bool,
}

fn check_capacity(count: usize) -> TriangulationResult<()> {
    if u32::try_from(count).is_err() {
        return Err(TriangulationError::TooManyPoints { count });
    }
    Ok(())
}

fn initial_state(point: &CloudPoint) -> PointState {
    if point.is_valid() {
        PointState::Free
    } else {
        PointState::Unreachable
    }
}

fn unit_normal(point: &CloudPoint) -> Vector3<f64> {
    if point.is_valid() {
        point.unit_normal()
    } else {
        Vector3::zeros()
    }
}

impl<S: NeighborSearch> TriangulationSession<S> {
    /// Creates a session over every valid point of `cloud`.
    ///
    /// `search` must index the same cloud. Points with a non-finite
    /// position or an unusable normal start [`PointState::Unreachable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are invalid, the cloud is empty,
    /// or the cloud has more points than `u32` face indices can address.
    pub fn new(cloud: PointCloud, search: S, params: GreedyParams) -> TriangulationResult<Self> {
        params.validate()?;
        if cloud.is_empty() {
            return Err(TriangulationError::EmptyPointCloud);
        }
        check_capacity(cloud.len())?;

        let n = cloud.len();
        let state = cloud.points.iter().map(initial_state).collect();
        let normals = cloud.points.iter().map(unit_normal).collect();

        Ok(Self {
            params,
            cloud,
            normals,
            search,
            state,
            source: vec![None; n],
            ffn: vec![None; n],
            sfn: vec![None; n],
            part: vec![None; n],
            queued: vec![false; n],
            queue: VecDeque::new(),
            faces: Vec::new(),
            emitted: HashSet::new(),
            components: 0,
            already_connected: false,
            prefetched: None,
            fronts_outside_search: 0,
            warned_outside_search: false,
        })
    }

    /// Creates a session restricted to the points listed in `indices`.
    ///
    /// All other points start [`PointState::Unreachable`] and are never
    /// connected, though they still occupy neighbor slots.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new), plus [`TriangulationError::IndexOutOfRange`]
    /// for an index past the end of the cloud.
    pub fn with_indices(
        cloud: PointCloud,
        search: S,
        params: GreedyParams,
        indices: &[usize],
    ) -> TriangulationResult<Self> {
        let len = cloud.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(TriangulationError::IndexOutOfRange { index, len });
        }

        let mut session = Self::new(cloud, search, params)?;
        let mut selected = vec![false; len];
        for &i in indices {
            selected[i] = true;
        }
        for (state, keep) in session.state.iter_mut().zip(selected) {
            if !keep {
                *state = PointState::Unreachable;
            }
        }
        Ok(session)
    }

    /// Grows components until no free point and no queued front remains.
    ///
    /// Returns the number of triangles added by this call.
    pub fn run(&mut self) -> usize {
        let before = self.faces.len();
        self.warned_outside_search = false;

        info!(
            points = self.cloud.len(),
            queued = self.queue.len(),
            "Starting greedy projection triangulation"
        );

        if self.params.parallel_search {
            self.prefetch();
        }

        self.advance_front();
        let mut cursor = 0;
        while let Some(offset) = self.state[cursor..]
            .iter()
            .position(|&s| s == PointState::Free)
        {
            let seed = cursor + offset;
            cursor = seed + 1;

            let component = self.components;
            self.seed_component(seed);
            if self.components > component {
                debug!(seed, component, "Seeded component");
            }
            self.advance_front();
        }
        self.prefetched = None;

        let added = self.faces.len() - before;
        info!(
            triangles = added,
            components = self.components,
            fronts_outside_search = self.fronts_outside_search,
            "Triangulation complete"
        );
        added
    }

    fn advance_front(&mut self) {
        while let Some(r) = self.queue.pop_front() {
            if self.state[r] == PointState::Fringe {
                self.process_fringe(r);
            }
        }
    }

    fn prefetch(&mut self) {
        let search = &self.search;
        let k = self.params.max_nearest_neighbors;
        let neighborhoods: Vec<Vec<Neighbor>> = (0..self.cloud.len())
            .into_par_iter()
            .map(|i| search.nearest(i, k))
            .collect();
        debug!(points = neighborhoods.len(), "Prefetched neighborhoods");
        self.prefetched = Some(neighborhoods);
    }

    /// Neighbors of `r`: `r` itself in slot 0, then the nearest other
    /// points by ascending distance.
    fn neighborhood(&self, r: usize) -> Vec<Neighbor> {
        let k = self.params.max_nearest_neighbors;
        let found = match &self.prefetched {
            Some(cache) => cache.get(r).cloned().unwrap_or_default(),
            None => self.search.nearest(r, k),
        };

        let n = self.cloud.len();
        let mut out = Vec::with_capacity(k);
        out.push(Neighbor {
            index: r,
            sqr_distance: 0.0,
        });
        out.extend(
            found
                .into_iter()
                .filter(|nb| nb.index != r && nb.index < n),
        );
        out.truncate(k);
        out
    }

    fn note_front_outside_search(&mut self, r: usize) {
        self.fronts_outside_search += 1;
        if !self.warned_outside_search {
            self.warned_outside_search = true;
            warn!(
                point = r,
                max_nearest_neighbors = self.params.max_nearest_neighbors,
                "Front neighbors fall outside the neighbor search; consider increasing max_nearest_neighbors"
            );
        }
    }
}

impl<S: SearchIndex> TriangulationSession<S> {
    /// Adds `points` to the cloud and extends the existing mesh.
    ///
    /// New points start free. Boundary points with a new point within
    /// `search_radius` among their nearest neighbors are re-opened as
    /// fringe; completed points and untouched regions keep their state.
    /// The neighbor search is rebuilt over the grown cloud.
    ///
    /// Returns the number of triangles added.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::TooManyPoints`] if the grown cloud no
    /// longer fits `u32` face indices; the session is left unchanged.
    pub fn update_mesh<I>(&mut self, points: I) -> TriangulationResult<usize>
    where
        I: IntoIterator<Item = CloudPoint>,
    {
        let base = self.cloud.len();
        self.cloud.extend(points);
        let len = self.cloud.len();
        if let Err(err) = check_capacity(len) {
            self.cloud.points.truncate(base);
            return Err(err);
        }

        for point in &self.cloud.points[base..] {
            self.state.push(initial_state(point));
            self.normals.push(unit_normal(point));
        }
        self.source.resize(len, None);
        self.ffn.resize(len, None);
        self.sfn.resize(len, None);
        self.part.resize(len, None);

        self.search = S::build(&self.cloud);
        self.queued = vec![false; len];
        self.queue.clear();

        let radius = self.params.search_radius;
        let k = self.params.max_nearest_neighbors;
        let mut reopened: Vec<usize> = Vec::new();
        for i in base..len {
            for nb in self.search.within(i, radius, k) {
                let j = nb.index;
                if j < base
                    && self.state[j] == PointState::Boundary
                    && self.ffn[j].is_some()
                    && self.sfn[j].is_some()
                {
                    reopened.push(j);
                }
            }
        }
        reopened.sort_unstable();
        reopened.dedup();

        debug!(
            added = len - base,
            reopened = reopened.len(),
            "Extending triangulation"
        );

        for &j in &reopened {
            self.state[j] = PointState::Fringe;
            self.queued[j] = true;
            self.queue.push_back(j);
        }

        Ok(self.run())
    }
}

impl<S> TriangulationSession<S> {
    fn position(&self, i: usize) -> Point3<f64> {
        self.cloud.points[i].position
    }

    fn sqr_dist(&self, a: usize, b: usize) -> f64 {
        (self.position(a) - self.position(b)).norm_squared()
    }

    fn frame(&self, r: usize) -> TangentFrame {
        TangentFrame::new(&self.position(r), &self.normals[r])
    }

    #[allow(clippy::cast_possible_truncation)] // bounded by check_capacity
    fn add_triangle(&mut self, a: usize, b: usize, c: usize) {
        let face = [a as u32, b as u32, c as u32];
        if self.emitted.insert(face_key(face)) {
            self.faces.push(face);
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn is_emitted(&self, a: usize, b: usize, c: usize) -> bool {
        self.emitted
            .contains(&face_key([a as u32, b as u32, c as u32]))
    }

    /// Puts `v` on the front, reached through `source`.
    fn add_fringe(&mut self, v: usize, source: usize) {
        if self.source[v].is_none() {
            self.source[v] = Some(source);
        }
        self.part[v] = self.part[source];
        if !self.queued[v] {
            self.queued[v] = true;
            self.queue.push_back(v);
        }
    }

    fn has_link(&self, v: usize, other: usize) -> bool {
        self.ffn[v] == Some(other) || self.sfn[v] == Some(other)
    }

    /// Front links of `v` are exactly `{a, b}`.
    fn links_are(&self, v: usize, a: usize, b: usize) -> bool {
        (self.ffn[v] == Some(a) && self.sfn[v] == Some(b))
            || (self.ffn[v] == Some(b) && self.sfn[v] == Some(a))
    }

    fn replace_link(&mut self, v: usize, old: usize, new: usize) {
        if self.ffn[v] == Some(old) {
            self.ffn[v] = Some(new);
        } else if self.sfn[v] == Some(old) {
            self.sfn[v] = Some(new);
        }
    }

    /// The front edge `v`-`old` was covered by a triangle; `v` now faces
    /// `new`. Completes `v` if its other link already is `new`.
    fn relink(&mut self, v: usize, old: usize, new: usize) {
        if self.ffn[v] == Some(old) {
            if self.sfn[v] == Some(new) {
                self.state[v] = PointState::Completed;
            } else {
                self.ffn[v] = Some(new);
            }
        } else if self.sfn[v] == Some(old) {
            if self.ffn[v] == Some(new) {
                self.state[v] = PointState::Completed;
            } else {
                self.sfn[v] = Some(new);
            }
        }
    }

    /// Number of points in the cloud.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    /// Returns true if the cloud is empty. Never the case for a session
    /// built through [`new`](TriangulationSession::new).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    /// Parameters of this session.
    #[must_use]
    pub const fn params(&self) -> &GreedyParams {
        &self.params
    }

    /// The (possibly grown) point cloud.
    #[must_use]
    pub const fn cloud(&self) -> &PointCloud {
        &self.cloud
    }

    /// The neighbor search in use.
    #[must_use]
    pub const fn search(&self) -> &S {
        &self.search
    }

    /// Emitted triangles, in emission order.
    #[must_use]
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// State of every point.
    #[must_use]
    pub fn point_states(&self) -> &[PointState] {
        &self.state
    }

    /// Component id of every point; `None` if never connected.
    #[must_use]
    pub fn part_ids(&self) -> &[Option<usize>] {
        &self.part
    }

    /// First front neighbor of every point.
    #[must_use]
    pub fn ffn(&self) -> &[Option<usize>] {
        &self.ffn
    }

    /// Second front neighbor of every point.
    #[must_use]
    pub fn sfn(&self) -> &[Option<usize>] {
        &self.sfn
    }

    /// Point through which every point was first connected.
    #[must_use]
    pub fn sources(&self) -> &[Option<usize>] {
        &self.source
    }

    /// Number of components seeded so far.
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.components
    }

    /// Front points closed as boundary because their front neighbors or
    /// source lay outside the neighbor search result.
    #[must_use]
    pub const fn fronts_outside_search(&self) -> usize {
        self.fronts_outside_search
    }

    /// The mesh: one vertex per cloud point and the emitted faces.
    #[must_use]
    pub fn mesh(&self) -> IndexedMesh {
        IndexedMesh::from_parts(self.cloud.to_mesh_vertices(), self.faces.clone())
    }

    /// Copies of the per-point arrays.
    #[must_use]
    pub fn diagnostics(&self) -> TriangulationDiagnostics {
        TriangulationDiagnostics {
            states: self.state.clone(),
            part_ids: self.part.clone(),
            ffn: self.ffn.clone(),
            sfn: self.sfn.clone(),
            sources: self.source.clone(),
        }
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> TriangulationStats {
        TriangulationStats {
            fronts_outside_search: self.fronts_outside_search,
            ..TriangulationStats::from_states(&self.state, self.faces.len(), self.components)
        }
    }
}
