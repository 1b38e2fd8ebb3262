//! Degenerate datasets, width-flag interactions, and corruption detection.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TreeConfig;
use crate::dataset::{Dataset, Point};
use crate::error::TreeError;
use crate::tree::{KdTree, Query};

use super::helpers::{build_tree, check_against_brute_force, dataset_from, random_dataset};

#[test]
fn test_equidistant_pair_ties_on_a_single_neighbour_query() {
    let data = dataset_from(&[&[-1.0, 0.0], &[1.0, 0.0]]);
    let mut tree = build_tree(data, 1);

    let ids = tree.k_nearest(Query::Values(&[0.0, 0.0]), 1).unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(tree.distances().unwrap(), &[1.0, 1.0]);
}

#[test]
fn test_unit_capacity_singles_out_every_point() {
    let mut rng = StdRng::seed_from_u64(64);
    let data = random_dataset(&mut rng, 64, 2);
    // Width floor effectively disabled so splitting runs to singletons.
    let mut tree = KdTree::new(TreeConfig::new(1, 1e-9, false).unwrap());
    tree.build(data.clone()).unwrap();

    let stats = tree.stats();
    assert_eq!(stats.leaves, 64);
    assert_eq!(stats.nodes, 127);
    tree.verify().unwrap();

    check_against_brute_force(&mut tree, &data, &[0.0, 0.0], 5);
}

#[test]
fn test_constant_dimensions_are_never_split() {
    let mut data = Dataset::new(3).unwrap();
    let mut rng = StdRng::seed_from_u64(10);
    for _ in 0..100 {
        use rand::Rng;
        data.push(Point::new(vec![
            rng.gen_range(-5.0..5.0),
            2.5,
            rng.gen_range(-5.0..5.0),
        ]))
        .unwrap();
    }
    let tree = build_tree(data, 8);

    let state = tree.built.as_ref().unwrap();
    for node in &state.arena {
        if let Some(split) = node.split {
            assert_ne!(split.dim, 1, "split along a zero-width dimension");
        }
    }
}

#[test]
fn test_width_normalization_changes_which_dimension_splits() {
    // dim 0 spans ~100, dim 1 spans ~1: raw widths always pick dim 0,
    // universe-relative widths prefer the un-split dim 1 below the root.
    let mut raw_data = Dataset::new(2).unwrap();
    for i in 0..40 {
        raw_data
            .push(Point::new(vec![i as f64 * 2.5, (i % 10) as f64 / 10.0]))
            .unwrap();
    }
    let normalized_data = raw_data.clone();

    let mut raw_tree = KdTree::new(TreeConfig::new(10, 0.001, false).unwrap());
    raw_tree.build(raw_data).unwrap();
    let state = raw_tree.built.as_ref().unwrap();
    assert!(state
        .arena
        .iter()
        .filter_map(|n| n.split)
        .all(|s| s.dim == 0));

    let mut norm_tree = KdTree::new(TreeConfig::new(10, 0.001, true).unwrap());
    norm_tree.build(normalized_data).unwrap();
    let state = norm_tree.built.as_ref().unwrap();
    assert!(state
        .arena
        .iter()
        .filter_map(|n| n.split)
        .any(|s| s.dim == 1));
}

#[test]
fn test_unbuilt_trees_report_empty_and_refuse_queries() {
    let tree = KdTree::default();
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.stats().nodes, 0);
    assert!(tree.dataset().is_none());
    assert!(matches!(tree.verify(), Err(TreeError::NotBuilt)));

    let rendered = format!("{tree:?}");
    assert!(rendered.contains("KdTree"));
    assert!(rendered.contains("built: false"));
}

#[test]
fn test_verify_reports_duplicated_index_entries() {
    let mut rng = StdRng::seed_from_u64(55);
    let mut tree = build_tree(random_dataset(&mut rng, 50, 2), 5);
    tree.verify().unwrap();

    let state = tree.built.as_mut().unwrap();
    state.idx[1] = state.idx[0];
    let err = tree.verify().unwrap_err();
    assert!(matches!(err, TreeError::StructuralInconsistency(_)));
}

#[test]
fn test_verify_reports_ranges_that_no_longer_tile() {
    let mut rng = StdRng::seed_from_u64(56);
    let mut tree = build_tree(random_dataset(&mut rng, 50, 2), 5);

    let state = tree.built.as_mut().unwrap();
    state.arena[0].end += 1;
    let err = tree.verify().unwrap_err();
    assert!(matches!(err, TreeError::StructuralInconsistency(_)));
}
