//! End-to-end triangulation scenarios on small, hand-checkable clouds.
//!
//! Run with: cargo test -p mesh-triangulate --test scenarios

#![allow(clippy::unwrap_used, clippy::expect_used)]

use mesh_triangulate::{
    BruteForceSearch, GreedyParams, GreedyProjectionTriangulation, KdTreeSearch, PointCloud,
    PointState, SearchIndex, SurfaceReconstruction, TriangulationSession, merge_meshes,
    remove_overlap_triangles,
};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

// =============================================================================
// Fixtures
// =============================================================================

fn params(nnn: usize) -> GreedyParams {
    GreedyParams::new()
        .with_mu(2.5)
        .with_max_nearest_neighbors(nnn)
        .with_search_radius(1.5)
        .with_minimum_angle(PI / 18.0)
        .with_maximum_angle(2.0 * PI / 3.0)
        .with_maximum_surface_angle(PI / 4.0)
}

/// Unit-spaced `n x n` grid in the XY plane, row-major, normals from `normal`.
fn grid_with(n: u32, normal: impl Fn(u32, u32) -> Vector3<f64>) -> PointCloud {
    let mut cloud = PointCloud::new();
    for j in 0..n {
        for i in 0..n {
            cloud.add_point(Point3::new(f64::from(i), f64::from(j), 0.0), normal(i, j));
        }
    }
    cloud
}

fn grid(n: u32) -> PointCloud {
    grid_with(n, |_, _| Vector3::z())
}

fn equilateral(offset_x: f64, cloud: &mut PointCloud) {
    let h = 3.0_f64.sqrt() / 2.0;
    cloud.add_point(Point3::new(offset_x, 0.0, 0.0), Vector3::z());
    cloud.add_point(Point3::new(offset_x + 1.0, 0.0, 0.0), Vector3::z());
    cloud.add_point(Point3::new(offset_x + 0.5, h, 0.0), Vector3::z());
}

fn triangulate(cloud: &PointCloud, params: GreedyParams) -> mesh_triangulate::Reconstruction {
    GreedyProjectionTriangulation::new(params)
        .reconstruct(cloud)
        .expect("triangulation should succeed")
}

fn assert_edges_within(result: &mesh_triangulate::Reconstruction, radius: f64) {
    assert!(result.mesh.has_valid_faces());
    assert_eq!(result.mesh.duplicate_face_count(), 0);
    assert!(result.mesh.max_edge_length().is_none_or(|l| l <= radius + 1e-9));
}

// =============================================================================
// Planar grids
// =============================================================================

#[test]
fn test_grid_interior_completed_edges_boundary() {
    let result = triangulate(&grid(5), params(10));

    assert_eq!(result.mesh.faces.len(), 32);
    assert_edges_within(&result, 1.5);

    for j in 0..5 {
        for i in 0..5 {
            let state = result.diagnostics.states[j * 5 + i];
            if (1..4).contains(&i) && (1..4).contains(&j) {
                assert_eq!(state, PointState::Completed, "interior ({i}, {j})");
            } else {
                assert_eq!(state, PointState::Boundary, "edge ({i}, {j})");
            }
        }
    }
    assert_eq!(result.stats.completed, 9);
    assert_eq!(result.stats.boundary, 16);
    assert_eq!(result.stats.components, 1);
}

#[test]
fn test_grid_triangle_counts() {
    for (n, expected) in [(4, 18), (6, 50), (10, 162)] {
        let result = triangulate(&grid(n), params(10));
        assert_eq!(result.mesh.faces.len(), expected, "grid {n}");
        assert_edges_within(&result, 1.5);
    }
}

#[test]
fn test_flipped_normals_without_consistency() {
    let down = triangulate(&grid_with(5, |_, _| -Vector3::z()), params(10));
    assert_eq!(down.mesh.faces.len(), 32);
    assert_eq!(down.stats.completed, 9);

    let checker = grid_with(5, |i, j| {
        if (i + j) % 2 == 0 { Vector3::z() } else { -Vector3::z() }
    });
    let result = triangulate(&checker, params(10));
    assert_eq!(result.mesh.faces.len(), 32);
    assert_edges_within(&result, 1.5);
}

#[test]
fn test_flipped_normals_block_growth_with_consistency() {
    let checker = grid_with(5, |i, j| {
        if (i + j) % 2 == 0 { Vector3::z() } else { -Vector3::z() }
    });
    let result = triangulate(&checker, params(10).with_normal_consistency(true));

    // Seeds still close one triangle each; no front grows past them.
    assert_eq!(result.mesh.faces.len(), 7);
    assert_eq!(result.stats.components, 7);
    assert_eq!(result.stats.completed, 0);
    assert_edges_within(&result, 1.5);

    let parts = &result.diagnostics.part_ids;
    let mut seen = Vec::new();
    for face in &result.mesh.faces {
        let part = parts[face[0] as usize];
        assert!(part.is_some());
        assert!(face.iter().all(|&v| parts[v as usize] == part));
        assert!(!seen.contains(&part), "component {part:?} grew past its seed");
        seen.push(part);
    }
    for v in 21..25 {
        assert_eq!(result.diagnostics.states[v], PointState::Unreachable);
    }
}

#[test]
fn test_small_neighborhood_keeps_invariants() {
    let result = triangulate(&grid(5), params(4));
    assert_eq!(result.mesh.faces.len(), 5);
    assert_edges_within(&result, 1.5);
    assert!(
        !result
            .diagnostics
            .states
            .contains(&PointState::Fringe)
    );
}

#[test]
fn test_radius_below_diagonal_leaves_grid_unmeshed() {
    let mut p = params(10);
    p.search_radius = 1.05;
    let result = triangulate(&grid(8), p);
    assert!(result.mesh.faces.is_empty());
    assert_eq!(result.stats.completed + result.stats.boundary, 0);
}

// =============================================================================
// Components and degenerate input
// =============================================================================

#[test]
fn test_single_triangle() {
    let mut cloud = PointCloud::new();
    equilateral(0.0, &mut cloud);

    let mut p = params(10);
    p.search_radius = 2.0;
    let result = triangulate(&cloud, p);

    assert_eq!(result.mesh.faces.len(), 1);
    assert!(
        result
            .diagnostics
            .states
            .iter()
            .all(|&s| s == PointState::Completed)
    );
    assert_eq!(result.diagnostics.part_ids, vec![Some(0); 3]);
}

#[test]
fn test_separated_clusters_are_separate_components() {
    let mut cloud = PointCloud::new();
    equilateral(0.0, &mut cloud);
    equilateral(100.0, &mut cloud);

    let mut p = params(10);
    p.search_radius = 2.0;
    let result = triangulate(&cloud, p);

    assert_eq!(result.mesh.faces.len(), 2);
    assert_eq!(result.stats.components, 2);
    let parts = &result.diagnostics.part_ids;
    assert_eq!(parts[0], parts[1]);
    assert_eq!(parts[1], parts[2]);
    assert_eq!(parts[3], parts[4]);
    assert_eq!(parts[4], parts[5]);
    assert_ne!(parts[0], parts[3]);

    for face in &result.mesh.faces {
        let cluster = face[0] / 3;
        assert!(face.iter().all(|&v| v / 3 == cluster), "face {face:?} crosses clusters");
    }
}

#[test]
fn test_many_coincident_points() {
    let mut cloud = grid(5);
    for _ in 0..40 {
        cloud.add_point(Point3::new(2.0, 2.0, 0.0), Vector3::z());
    }

    let result = triangulate(&cloud, params(10));
    assert_eq!(result.mesh.faces.len(), 42);
    assert_edges_within(&result, 1.5);

    let brute = GreedyProjectionTriangulation::new(params(10))
        .reconstruct_with(&cloud, BruteForceSearch::build(&cloud))
        .unwrap();
    assert_eq!(result.mesh.faces, brute.mesh.faces);
    assert_eq!(result.diagnostics.states, brute.diagnostics.states);
}

#[test]
fn test_non_finite_point_is_unreachable() {
    let mut cloud = grid(5);
    cloud.add_point(Point3::new(f64::NAN, 2.0, 0.0), Vector3::z());

    let result = triangulate(&cloud, params(10));

    assert_eq!(result.mesh.faces.len(), 32);
    assert_eq!(result.diagnostics.states[25], PointState::Unreachable);
    assert!(result.mesh.faces.iter().all(|f| !f.contains(&25)));
}

#[test]
fn test_zero_normal_point_is_unreachable() {
    let mut cloud = grid(3);
    cloud.add_point(Point3::new(10.0, 10.0, 0.0), Vector3::zeros());

    let result = triangulate(&cloud, params(10));

    assert_eq!(result.mesh.faces.len(), 8);
    assert_eq!(result.diagnostics.states[9], PointState::Unreachable);
}

// =============================================================================
// Determinism and search backends
// =============================================================================

#[test]
fn test_repeated_runs_are_identical() {
    let cloud = grid(6);
    let first = triangulate(&cloud, params(10));
    let second = triangulate(&cloud, params(10));

    assert_eq!(first.mesh.faces, second.mesh.faces);
    assert_eq!(first.diagnostics.states, second.diagnostics.states);
    assert_eq!(first.diagnostics.sources, second.diagnostics.sources);
}

#[test]
fn test_parallel_prefetch_matches_serial() {
    let cloud = grid(10);
    let serial = triangulate(&cloud, params(10));
    let parallel = triangulate(&cloud, params(10).with_parallel_search(true));

    assert_eq!(serial.mesh.faces, parallel.mesh.faces);
    assert_eq!(serial.diagnostics.states, parallel.diagnostics.states);
}

#[test]
fn test_brute_force_matches_kd_tree() {
    let cloud = grid(7);
    let gp3 = GreedyProjectionTriangulation::new(params(10));

    let kd = gp3
        .reconstruct_with(&cloud, KdTreeSearch::build(&cloud))
        .unwrap();
    let brute = gp3
        .reconstruct_with(&cloud, BruteForceSearch::build(&cloud))
        .unwrap();

    assert_eq!(kd.mesh.faces, brute.mesh.faces);
}

// =============================================================================
// Incremental update and merging
// =============================================================================

#[test]
fn test_update_fills_right_half() {
    let full = grid(6);
    let mut left = PointCloud::new();
    let mut right = Vec::new();
    for (index, point) in full.points.iter().enumerate() {
        if index % 6 < 3 {
            left.push(*point);
        } else {
            right.push(*point);
        }
    }

    let mut session: TriangulationSession<KdTreeSearch> =
        GreedyProjectionTriangulation::new(params(10))
            .start_session(left)
            .unwrap();
    assert_eq!(session.faces().len(), 20);

    session.update_mesh(right).unwrap();
    let mesh = session.mesh();
    assert_eq!(mesh.faces.len(), 50);
    assert_eq!(mesh.vertices.len(), 36);
    assert_eq!(mesh.duplicate_face_count(), 0);
    assert!(mesh.max_edge_length().is_some_and(|l| l <= 1.5 + 1e-9));
}

#[test]
fn test_merge_subset_into_full_run() {
    let cloud = grid(5);
    let gp3 = GreedyProjectionTriangulation::new(params(10));
    let full = gp3.reconstruct(&cloud).unwrap();

    let left: Vec<usize> = (0..25).filter(|i| i % 5 < 3).collect();
    let part = gp3
        .reconstruct_indices(&cloud, &left, KdTreeSearch::build(&cloud))
        .unwrap();
    assert_eq!(part.mesh.faces.len(), 16);

    let mut merged = full.mesh.clone();
    let removed = merge_meshes(&mut merged, &part.mesh, &part.diagnostics.states);
    assert_eq!(removed, 16);
    assert_eq!(merged.faces.len(), 32);
    assert_eq!(merged.duplicate_face_count(), 0);

    let mut trimmed = full.mesh;
    assert_eq!(remove_overlap_triangles(&mut trimmed, &part.mesh), 16);
    assert_eq!(trimmed.faces.len(), 16);
}
