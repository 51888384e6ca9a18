//! Property-based tests for greedy projection triangulation.
//!
//! These tests use proptest to generate random oriented clouds and verify
//! invariants of the resulting meshes.
//!
//! Run with: cargo test -p mesh-triangulate -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mesh_triangulate::{
    BruteForceSearch, GreedyParams, GreedyProjectionTriangulation, KdTreeSearch, PointCloud,
    PointState, SearchIndex, TriangulationSession,
};
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;
use std::f64::consts::PI;

// =============================================================================
// Strategies for generating random clouds
// =============================================================================

/// A point on a slightly noisy plane over `[0, 5]^2`.
fn arb_plane_point() -> impl Strategy<Value = [f64; 3]> {
    (0.0..5.0f64, 0.0..5.0f64, -0.05..0.05f64).prop_map(|(x, y, z)| [x, y, z])
}

/// A noisy plane cloud with up-facing normals.
fn arb_plane_cloud(max_points: usize) -> impl Strategy<Value = PointCloud> {
    prop::collection::vec(arb_plane_point(), 3..=max_points).prop_map(|points| {
        points
            .into_iter()
            .map(|[x, y, z]| mesh_triangulate::CloudPoint::from_coords(x, y, z, Vector3::z()))
            .collect()
    })
}

/// Points on a sphere of radius 3 with outward normals.
fn arb_sphere_cloud(max_points: usize) -> impl Strategy<Value = PointCloud> {
    prop::collection::vec((0.0..PI, 0.0..2.0 * PI), 3..=max_points).prop_map(|angles| {
        let mut cloud = PointCloud::with_capacity(angles.len());
        for (theta, phi) in angles {
            let normal = Vector3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            cloud.add_point(Point3::from(normal * 3.0), normal);
        }
        cloud
    })
}

/// Parameters spanning the ranges the algorithm is tuned for.
fn arb_params() -> impl Strategy<Value = GreedyParams> {
    (
        prop::sample::select(vec![0.8, 1.5, 2.0]),
        prop::sample::select(vec![5usize, 10, 20]),
        prop::sample::select(vec![2.0, 2.5, 3.0]),
    )
        .prop_map(|(radius, nnn, mu)| {
            GreedyParams::new()
                .with_mu(mu)
                .with_max_nearest_neighbors(nnn)
                .with_search_radius(radius)
                .with_minimum_angle(PI / 18.0)
                .with_maximum_angle(2.0 * PI / 3.0)
                .with_maximum_surface_angle(PI / 4.0)
        })
}

fn run(cloud: &PointCloud, params: &GreedyParams) -> TriangulationSession<KdTreeSearch> {
    let mut session =
        TriangulationSession::new(cloud.clone(), KdTreeSearch::build(cloud), params.clone())
            .unwrap();
    session.run();
    session
}

fn check_invariants(
    session: &TriangulationSession<KdTreeSearch>,
    radius: f64,
) -> Result<(), TestCaseError> {
    let mesh = session.mesh();
    prop_assert!(mesh.has_valid_faces());
    prop_assert_eq!(mesh.duplicate_face_count(), 0);

    for face in &mesh.faces {
        prop_assert!(face[0] != face[1] && face[1] != face[2] && face[0] != face[2]);
    }
    let longest = mesh.max_edge_length().unwrap_or(0.0);
    prop_assert!(
        longest <= radius + 1e-9,
        "edge {} longer than search radius {}",
        longest,
        radius
    );

    for (i, state) in session.point_states().iter().enumerate() {
        prop_assert_ne!(*state, PointState::Fringe, "point {} left on the front", i);
        if *state == PointState::Completed {
            prop_assert!(session.ffn()[i].is_some() && session.sfn()[i].is_some());
        }
    }
    Ok(())
}

// =============================================================================
// Mesh invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Faces on noisy planes are valid, distinct and never span the radius.
    #[test]
    fn proptest_plane_invariants(cloud in arb_plane_cloud(120), params in arb_params()) {
        let session = run(&cloud, &params);
        check_invariants(&session, params.search_radius)?;
    }

    /// Faces on a sphere obey the same invariants.
    #[test]
    fn proptest_sphere_invariants(cloud in arb_sphere_cloud(120), params in arb_params()) {
        let session = run(&cloud, &params);
        check_invariants(&session, params.search_radius)?;
    }

    /// Part ids are assigned exactly to the points that were connected.
    #[test]
    fn proptest_part_ids_match_states(cloud in arb_plane_cloud(80), params in arb_params()) {
        let session = run(&cloud, &params);
        let components = session.component_count();
        for (state, part) in session.point_states().iter().zip(session.part_ids()) {
            if state.is_meshed() {
                prop_assert!(part.is_some_and(|p| p < components));
            }
        }
    }
}

// =============================================================================
// Determinism
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Two runs over the same input produce the same faces in the same order.
    #[test]
    fn proptest_runs_are_deterministic(cloud in arb_plane_cloud(100), params in arb_params()) {
        let first = run(&cloud, &params);
        let second = run(&cloud, &params);
        prop_assert_eq!(first.faces(), second.faces());
        prop_assert_eq!(first.point_states(), second.point_states());
    }

    /// The kd-tree and the linear scan drive identical triangulations.
    #[test]
    fn proptest_search_backends_agree(cloud in arb_plane_cloud(100), params in arb_params()) {
        let gp3 = GreedyProjectionTriangulation::new(params);
        let kd = gp3.reconstruct_with(&cloud, KdTreeSearch::build(&cloud)).unwrap();
        let brute = gp3.reconstruct_with(&cloud, BruteForceSearch::build(&cloud)).unwrap();
        prop_assert_eq!(kd.mesh.faces, brute.mesh.faces);
    }

    /// Prefetching neighborhoods in parallel does not change the result.
    #[test]
    fn proptest_prefetch_matches_serial(cloud in arb_plane_cloud(100), params in arb_params()) {
        let serial = run(&cloud, &params);
        let parallel = run(&cloud, &params.clone().with_parallel_search(true));
        prop_assert_eq!(serial.faces(), parallel.faces());
    }
}
