//! Per-point states and run diagnostics.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a point stands in the triangulation.
///
/// Points start [`Free`](Self::Free) and move toward
/// [`Completed`](Self::Completed) or [`Boundary`](Self::Boundary).
/// [`Unreachable`](Self::Unreachable) points are never connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PointState {
    /// Not yet visited.
    #[default]
    Free,
    /// On the open front of a growing component, waiting to be processed.
    Fringe,
    /// Processed; part of the mesh border.
    Boundary,
    /// Processed and fully surrounded by triangles.
    Completed,
    /// Excluded, invalid, or with a degenerate neighborhood.
    Unreachable,
}

impl PointState {
    /// True for points that carry no triangles yet.
    #[must_use]
    pub const fn is_unconnected(self) -> bool {
        matches!(self, Self::Free | Self::Unreachable)
    }

    /// True for points that are part of the mesh and closed for new
    /// candidates.
    #[must_use]
    pub const fn is_meshed(self) -> bool {
        matches!(self, Self::Completed | Self::Boundary)
    }
}

impl fmt::Display for PointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Free => "free",
            Self::Fringe => "fringe",
            Self::Boundary => "boundary",
            Self::Completed => "completed",
            Self::Unreachable => "unreachable",
        };
        f.write_str(name)
    }
}

/// Per-point arrays exposed after a run.
///
/// Indexed like the input cloud. Links and sources are `None` where a point
/// was never connected.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriangulationDiagnostics {
    /// Final state of every point.
    pub states: Vec<PointState>,
    /// Connected-component id of every point.
    pub part_ids: Vec<Option<usize>>,
    /// First front neighbor of every point.
    pub ffn: Vec<Option<usize>>,
    /// Second front neighbor of every point.
    pub sfn: Vec<Option<usize>>,
    /// Point through which every point was first connected.
    pub sources: Vec<Option<usize>>,
}

/// Summary counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriangulationStats {
    /// Points in the cloud.
    pub points: usize,
    /// Triangles in the mesh.
    pub triangles: usize,
    /// Connected components grown.
    pub components: usize,
    /// Points in [`PointState::Completed`].
    pub completed: usize,
    /// Points in [`PointState::Boundary`].
    pub boundary: usize,
    /// Points in [`PointState::Unreachable`].
    pub unreachable: usize,
    /// Front points closed as boundary because a front neighbor or source
    /// lay outside their neighbor search result.
    pub fronts_outside_search: usize,
}

impl TriangulationStats {
    /// Tallies states into a stats record.
    #[must_use]
    pub fn from_states(states: &[PointState], triangles: usize, components: usize) -> Self {
        let count = |s: PointState| states.iter().filter(|&&x| x == s).count();
        Self {
            points: states.len(),
            triangles,
            components,
            completed: count(PointState::Completed),
            boundary: count(PointState::Boundary),
            unreachable: count(PointState::Unreachable),
            fronts_outside_search: 0,
        }
    }
}

impl fmt::Display for TriangulationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GreedyProjection: {} triangles, {} components, {} completed, {} boundary, {} unreachable of {} points",
            self.triangles,
            self.components,
            self.completed,
            self.boundary,
            self.unreachable,
            self.points
        )
    }
}
