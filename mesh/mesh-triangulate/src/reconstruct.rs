//! Surface reconstruction entry points.
//!
//! [`SurfaceReconstruction`] is the capability shared by reconstruction
//! strategies: turn an oriented point cloud into a mesh.
//! [`GreedyProjectionTriangulation`] implements it on top of a
//! [`TriangulationSession`].
//!
//! # Example
//!
//! ```
//! use mesh_triangulate::{GreedyParams, GreedyProjectionTriangulation, PointCloud, SurfaceReconstruction};
//! use nalgebra::{Point3, Vector3};
//!
//! let mut cloud = PointCloud::new();
//! for j in 0..4 {
//!     for i in 0..4 {
//!         cloud.add_point(Point3::new(f64::from(i), f64::from(j), 0.0), Vector3::z());
//!     }
//! }
//!
//! let gp3 = GreedyProjectionTriangulation::new(GreedyParams::for_spacing(1.0));
//! let result = gp3.reconstruct(&cloud).unwrap();
//! assert_eq!(result.mesh.faces.len(), 18);
//! println!("{result}");
//! ```

use std::fmt;

use mesh_types::IndexedMesh;

use crate::error::TriangulationResult;
use crate::params::GreedyParams;
use crate::pointcloud::PointCloud;
use crate::search::{KdTreeSearch, NeighborSearch, SearchIndex};
use crate::session::TriangulationSession;
use crate::state::{TriangulationDiagnostics, TriangulationStats};

/// A strategy that reconstructs a surface mesh from an oriented cloud.
pub trait SurfaceReconstruction {
    /// Reconstructs a mesh over every valid point of `cloud`.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy is misconfigured or the cloud is
    /// unusable.
    fn reconstruct(&self, cloud: &PointCloud) -> TriangulationResult<Reconstruction>;
}

/// Output of a reconstruction.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// The mesh: one vertex per input point.
    pub mesh: IndexedMesh,

    /// Per-point states, component ids and front links.
    pub diagnostics: TriangulationDiagnostics,

    /// Summary counts.
    pub stats: TriangulationStats,
}

impl<S> From<&TriangulationSession<S>> for Reconstruction {
    fn from(session: &TriangulationSession<S>) -> Self {
        Self {
            mesh: session.mesh(),
            diagnostics: session.diagnostics(),
            stats: session.stats(),
        }
    }
}

impl fmt::Display for Reconstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.stats, f)
    }
}

/// Greedy projection triangulation.
///
/// Holds the parameters; every call runs a fresh session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GreedyProjectionTriangulation {
    params: GreedyParams,
}

impl GreedyProjectionTriangulation {
    /// Creates the strategy with `params`.
    #[must_use]
    pub const fn new(params: GreedyParams) -> Self {
        Self { params }
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &GreedyParams {
        &self.params
    }

    /// Replaces all parameters.
    pub fn set_params(&mut self, params: GreedyParams) {
        self.params = params;
    }

    /// Nearest-neighbor distance multiplier.
    #[must_use]
    pub const fn mu(&self) -> f64 {
        self.params.mu
    }

    /// Sets the nearest-neighbor distance multiplier.
    pub fn set_mu(&mut self, mu: f64) {
        self.params.mu = mu;
    }

    /// Maximum neighbors per search.
    #[must_use]
    pub const fn max_nearest_neighbors(&self) -> usize {
        self.params.max_nearest_neighbors
    }

    /// Sets the maximum neighbors per search.
    pub fn set_max_nearest_neighbors(&mut self, nnn: usize) {
        self.params.max_nearest_neighbors = nnn;
    }

    /// Search radius, also the maximum edge length.
    #[must_use]
    pub const fn search_radius(&self) -> f64 {
        self.params.search_radius
    }

    /// Sets the search radius.
    pub fn set_search_radius(&mut self, radius: f64) {
        self.params.search_radius = radius;
    }

    /// Preferred minimum triangle angle.
    #[must_use]
    pub const fn minimum_angle(&self) -> f64 {
        self.params.minimum_angle
    }

    /// Sets the preferred minimum triangle angle.
    pub fn set_minimum_angle(&mut self, angle: f64) {
        self.params.minimum_angle = angle;
    }

    /// Preferred maximum triangle angle.
    #[must_use]
    pub const fn maximum_angle(&self) -> f64 {
        self.params.maximum_angle
    }

    /// Sets the preferred maximum triangle angle.
    pub fn set_maximum_angle(&mut self, angle: f64) {
        self.params.maximum_angle = angle;
    }

    /// Maximum normal deviation between connected points.
    #[must_use]
    pub const fn maximum_surface_angle(&self) -> f64 {
        self.params.maximum_surface_angle
    }

    /// Sets the maximum normal deviation.
    pub fn set_maximum_surface_angle(&mut self, angle: f64) {
        self.params.maximum_surface_angle = angle;
    }

    /// Whether normals are trusted to be consistently oriented.
    #[must_use]
    pub const fn normal_consistency(&self) -> bool {
        self.params.normal_consistency
    }

    /// Sets whether normals are consistently oriented.
    pub fn set_normal_consistency(&mut self, consistent: bool) {
        self.params.normal_consistency = consistent;
    }

    /// Whether neighborhoods are prefetched in parallel.
    #[must_use]
    pub const fn parallel_search(&self) -> bool {
        self.params.parallel_search
    }

    /// Sets whether neighborhoods are prefetched in parallel.
    pub fn set_parallel_search(&mut self, parallel: bool) {
        self.params.parallel_search = parallel;
    }

    /// Reconstructs `cloud` with a caller-supplied neighbor search over it.
    ///
    /// # Errors
    ///
    /// See [`TriangulationSession::new`].
    pub fn reconstruct_with<S: NeighborSearch>(
        &self,
        cloud: &PointCloud,
        search: S,
    ) -> TriangulationResult<Reconstruction> {
        let mut session = TriangulationSession::new(cloud.clone(), search, self.params.clone())?;
        session.run();
        Ok(Reconstruction::from(&session))
    }

    /// Reconstructs only the points of `cloud` listed in `indices`.
    ///
    /// Points outside the subset stay unreachable. Face indices still refer
    /// to the full cloud.
    ///
    /// # Errors
    ///
    /// See [`TriangulationSession::with_indices`].
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_triangulate::{GreedyParams, GreedyProjectionTriangulation, KdTreeSearch, PointCloud, PointState, SearchIndex};
    /// use nalgebra::{Point3, Vector3};
    ///
    /// let mut cloud = PointCloud::new();
    /// for i in 0..6 {
    ///     cloud.add_point(Point3::new(f64::from(i % 3), f64::from(i / 3), 0.0), Vector3::z());
    /// }
    /// let search = KdTreeSearch::build(&cloud);
    /// let gp3 = GreedyProjectionTriangulation::new(GreedyParams::for_spacing(1.0));
    ///
    /// let result = gp3.reconstruct_indices(&cloud, &[0, 1, 3, 4], search).unwrap();
    /// assert_eq!(result.mesh.faces.len(), 2);
    /// assert_eq!(result.diagnostics.states[5], PointState::Unreachable);
    /// ```
    pub fn reconstruct_indices<S: NeighborSearch>(
        &self,
        cloud: &PointCloud,
        indices: &[usize],
        search: S,
    ) -> TriangulationResult<Reconstruction> {
        let mut session =
            TriangulationSession::with_indices(cloud.clone(), search, self.params.clone(), indices)?;
        session.run();
        Ok(Reconstruction::from(&session))
    }

    /// Runs a session that stays open for [`update_mesh`].
    ///
    /// [`update_mesh`]: TriangulationSession::update_mesh
    ///
    /// # Errors
    ///
    /// See [`TriangulationSession::new`].
    pub fn start_session<S: SearchIndex>(
        &self,
        cloud: PointCloud,
    ) -> TriangulationResult<TriangulationSession<S>> {
        let search = S::build(&cloud);
        let mut session = TriangulationSession::new(cloud, search, self.params.clone())?;
        session.run();
        Ok(session)
    }
}

impl SurfaceReconstruction for GreedyProjectionTriangulation {
    fn reconstruct(&self, cloud: &PointCloud) -> TriangulationResult<Reconstruction> {
        self.params.validate()?;
        self.reconstruct_with(cloud, KdTreeSearch::build(cloud))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TriangulationError;
    use crate::search::BruteForceSearch;
    use crate::state::PointState;
    use nalgebra::{Point3, Vector3};
    use std::f64::consts::PI;

    fn grid(n: u32) -> PointCloud {
        let mut cloud = PointCloud::new();
        for j in 0..n {
            for i in 0..n {
                cloud.add_point(Point3::new(f64::from(i), f64::from(j), 0.0), Vector3::z());
            }
        }
        cloud
    }

    #[test]
    fn test_accessors_round_trip() {
        let mut gp3 = GreedyProjectionTriangulation::default();
        gp3.set_mu(2.5);
        gp3.set_max_nearest_neighbors(100);
        gp3.set_search_radius(0.025);
        gp3.set_minimum_angle(PI / 18.0);
        gp3.set_maximum_angle(2.0 * PI / 3.0);
        gp3.set_maximum_surface_angle(PI / 4.0);
        gp3.set_normal_consistency(true);
        gp3.set_parallel_search(true);

        assert!((gp3.mu() - 2.5).abs() < f64::EPSILON);
        assert_eq!(gp3.max_nearest_neighbors(), 100);
        assert!((gp3.search_radius() - 0.025).abs() < f64::EPSILON);
        assert!((gp3.minimum_angle() - PI / 18.0).abs() < f64::EPSILON);
        assert!((gp3.maximum_angle() - 2.0 * PI / 3.0).abs() < f64::EPSILON);
        assert!((gp3.maximum_surface_angle() - PI / 4.0).abs() < f64::EPSILON);
        assert!(gp3.normal_consistency());
        assert!(gp3.parallel_search());
        assert!(gp3.params().validate().is_ok());
    }

    #[test]
    fn test_default_strategy_fails_fast() {
        let gp3 = GreedyProjectionTriangulation::default();
        let err = gp3.reconstruct(&grid(3)).unwrap_err();
        assert!(matches!(err, TriangulationError::InvalidParameter { .. }));
    }

    #[test]
    fn test_empty_cloud_error() {
        let gp3 = GreedyProjectionTriangulation::new(GreedyParams::for_spacing(1.0));
        let err = gp3.reconstruct(&PointCloud::new()).unwrap_err();
        assert!(matches!(err, TriangulationError::EmptyPointCloud));
    }

    #[test]
    fn test_strategies_through_trait_object() {
        let gp3 = GreedyProjectionTriangulation::new(
            GreedyParams::for_spacing(1.0).with_max_nearest_neighbors(10),
        );
        let strategy: &dyn SurfaceReconstruction = &gp3;
        let result = strategy.reconstruct(&grid(5)).unwrap();

        assert_eq!(result.mesh.faces.len(), 32);
        assert_eq!(result.stats.completed, 9);
        assert_eq!(result.stats.boundary, 16);
        assert!(format!("{result}").contains("32 triangles"));
    }

    #[test]
    fn test_search_adapters_agree() {
        let cloud = grid(6);
        let gp3 = GreedyProjectionTriangulation::new(
            GreedyParams::for_spacing(1.0).with_max_nearest_neighbors(10),
        );
        let kd = gp3.reconstruct(&cloud).unwrap();
        let scan = gp3
            .reconstruct_with(&cloud, BruteForceSearch::build(&cloud))
            .unwrap();
        assert_eq!(kd.mesh.faces, scan.mesh.faces);
        assert_eq!(kd.diagnostics, scan.diagnostics);
    }

    #[test]
    fn test_start_session_then_update() {
        let gp3 = GreedyProjectionTriangulation::new(
            GreedyParams::for_spacing(1.0).with_max_nearest_neighbors(10),
        );
        let full = grid(6);
        let (left, right): (Vec<_>, Vec<_>) = full
            .points
            .iter()
            .copied()
            .partition(|p| p.position.x <= 2.0);

        let mut session = gp3
            .start_session::<KdTreeSearch>(left.into_iter().collect())
            .unwrap();
        assert_eq!(session.faces().len(), 20);
        session.update_mesh(right).unwrap();
        assert_eq!(session.faces().len(), 50);
        assert!(
            session
                .point_states()
                .iter()
                .all(|&s| s != PointState::Free && s != PointState::Fringe)
        );
    }
}
