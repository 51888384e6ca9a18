//! Error types for triangulation operations.

use thiserror::Error;

/// Errors that can occur before or during a triangulation run.
///
/// Degenerate neighborhoods are not errors: the affected points are marked
/// unreachable and the run continues. Only misconfiguration and unusable
/// input are reported here.
#[derive(Debug, Error)]
pub enum TriangulationError {
    /// The point cloud has no points.
    #[error("Point cloud is empty")]
    EmptyPointCloud,

    /// A parameter is outside its valid range.
    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value, formatted.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// A point index does not exist in the cloud.
    #[error("Point index {index} out of range for cloud of {len} points")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of points in the cloud.
        len: usize,
    },

    /// The cloud cannot be addressed with 32-bit face indices.
    #[error("Point cloud has {count} points, more than 32-bit face indices can address")]
    TooManyPoints {
        /// Number of points in the cloud.
        count: usize,
    },
}

impl TriangulationError {
    pub(crate) fn invalid(name: &'static str, value: impl ToString, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

/// Result type for triangulation operations.
pub type TriangulationResult<T> = std::result::Result<T, TriangulationError>;
