//! Triangulation parameters.

use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{TriangulationError, TriangulationResult};

/// Parameters for greedy projection triangulation.
///
/// All fields default to zero (or `false`), which leaves the algorithm
/// disabled until the caller configures it: [`validate`](Self::validate)
/// rejects a zero `mu`, `search_radius` or neighbor count.
///
/// # Example
///
/// ```
/// use mesh_triangulate::GreedyParams;
/// use std::f64::consts::PI;
///
/// let params = GreedyParams::new()
///     .with_mu(2.5)
///     .with_search_radius(0.025)
///     .with_max_nearest_neighbors(100)
///     .with_maximum_surface_angle(PI / 4.0)
///     .with_minimum_angle(PI / 18.0)
///     .with_maximum_angle(2.0 * PI / 3.0);
///
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GreedyParams {
    /// Multiplier applied to the distance of the nearest neighbor to get
    /// the local connection radius. Adapts to sampling density.
    ///
    /// Default: 0.0 (must be set)
    pub mu: f64,

    /// Maximum number of neighbors returned by a search, the query point
    /// included.
    ///
    /// Default: 0 (must be at least 3)
    pub max_nearest_neighbors: usize,

    /// Hard cap on neighbor distance and on triangle edge length.
    ///
    /// Default: 0.0 (must be set)
    pub search_radius: f64,

    /// Preferred minimum triangle angle in radians. Soft bound.
    ///
    /// Default: 0.0
    pub minimum_angle: f64,

    /// Preferred maximum triangle angle in radians. Wider openings in a
    /// point's fan are left as boundary gaps.
    ///
    /// Default: 0.0
    pub maximum_angle: f64,

    /// Maximum deviation, in radians, between the normal of a point and the
    /// normals of the neighbors it may connect to.
    ///
    /// Default: 0.0
    pub maximum_surface_angle: f64,

    /// Whether input normals are consistently oriented. When `false`,
    /// a neighbor whose normal points the other way is compared against
    /// the flipped normal.
    ///
    /// Default: false
    pub normal_consistency: bool,

    /// Compute every neighborhood up front on the rayon thread pool. The
    /// triangulation itself stays sequential and the output is identical.
    ///
    /// Default: false
    pub parallel_search: bool,
}

impl Default for GreedyParams {
    fn default() -> Self {
        Self {
            mu: 0.0,
            max_nearest_neighbors: 0,
            search_radius: 0.0,
            minimum_angle: 0.0,
            maximum_angle: 0.0,
            maximum_surface_angle: 0.0,
            normal_consistency: false,
            parallel_search: false,
        }
    }
}

impl GreedyParams {
    /// Creates unconfigured parameters (all zero).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for a cloud sampled at roughly uniform `spacing`.
    ///
    /// Uses `mu = 2.5`, a search radius of `1.5 * spacing` (enough to reach
    /// diagonal neighbors on a regular grid), 30 neighbors, a 10° to 120°
    /// angle preference and a 45° surface angle.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_triangulate::GreedyParams;
    ///
    /// let params = GreedyParams::for_spacing(0.01);
    /// assert!((params.search_radius - 0.015).abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn for_spacing(spacing: f64) -> Self {
        Self {
            mu: 2.5,
            max_nearest_neighbors: 30,
            search_radius: 1.5 * spacing,
            minimum_angle: PI / 18.0,
            maximum_angle: 2.0 * PI / 3.0,
            maximum_surface_angle: PI / 4.0,
            normal_consistency: false,
            parallel_search: false,
        }
    }

    /// Like [`for_spacing`](Self::for_spacing) with a smaller neighborhood
    /// and parallel neighbor search.
    #[must_use]
    pub fn fast(spacing: f64) -> Self {
        Self {
            max_nearest_neighbors: 12,
            parallel_search: true,
            ..Self::for_spacing(spacing)
        }
    }

    /// Sets the nearest-neighbor distance multiplier.
    #[must_use]
    pub const fn with_mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    /// Sets the maximum number of neighbors per search.
    #[must_use]
    pub const fn with_max_nearest_neighbors(mut self, nnn: usize) -> Self {
        self.max_nearest_neighbors = nnn;
        self
    }

    /// Sets the search radius (maximum edge length).
    #[must_use]
    pub const fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = radius;
        self
    }

    /// Sets the preferred minimum triangle angle (radians).
    #[must_use]
    pub const fn with_minimum_angle(mut self, angle: f64) -> Self {
        self.minimum_angle = angle;
        self
    }

    /// Sets the preferred maximum triangle angle (radians).
    #[must_use]
    pub const fn with_maximum_angle(mut self, angle: f64) -> Self {
        self.maximum_angle = angle;
        self
    }

    /// Sets the maximum normal deviation between connected points (radians).
    #[must_use]
    pub const fn with_maximum_surface_angle(mut self, angle: f64) -> Self {
        self.maximum_surface_angle = angle;
        self
    }

    /// Sets whether input normals are consistently oriented.
    #[must_use]
    pub const fn with_normal_consistency(mut self, consistent: bool) -> Self {
        self.normal_consistency = consistent;
        self
    }

    /// Sets whether neighborhoods are prefetched in parallel.
    #[must_use]
    pub const fn with_parallel_search(mut self, parallel: bool) -> Self {
        self.parallel_search = parallel;
        self
    }

    /// Squared search radius.
    #[must_use]
    pub fn sqr_search_radius(&self) -> f64 {
        self.search_radius * self.search_radius
    }

    /// Checks that the parameters can drive a triangulation.
    ///
    /// # Errors
    ///
    /// Returns [`TriangulationError::InvalidParameter`] if `search_radius`
    /// or `mu` is not a positive finite number, if fewer than 3 neighbors
    /// are allowed, or if an angle is negative or not finite.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_triangulate::GreedyParams;
    ///
    /// assert!(GreedyParams::default().validate().is_err());
    /// assert!(GreedyParams::for_spacing(1.0).validate().is_ok());
    /// ```
    pub fn validate(&self) -> TriangulationResult<()> {
        if !(self.search_radius.is_finite() && self.search_radius > 0.0) {
            return Err(TriangulationError::invalid(
                "search_radius",
                self.search_radius,
                "must be a positive finite distance",
            ));
        }
        if !(self.mu.is_finite() && self.mu > 0.0) {
            return Err(TriangulationError::invalid(
                "mu",
                self.mu,
                "must be a positive finite multiplier",
            ));
        }
        if self.max_nearest_neighbors < 3 {
            return Err(TriangulationError::invalid(
                "max_nearest_neighbors",
                self.max_nearest_neighbors,
                "must allow at least 3 neighbors",
            ));
        }
        for (name, angle) in [
            ("minimum_angle", self.minimum_angle),
            ("maximum_angle", self.maximum_angle),
            ("maximum_surface_angle", self.maximum_surface_angle),
        ] {
            if !(angle.is_finite() && angle >= 0.0) {
                return Err(TriangulationError::invalid(
                    name,
                    angle,
                    "must be a non-negative finite angle",
                ));
            }
        }
        Ok(())
    }
}
