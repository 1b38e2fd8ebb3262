//! Shared fixtures: dataset builders, a brute-force oracle with the same
//! tie rules as the tree, and a recording diagnostics sink.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::TreeConfig;
use crate::dataset::{Dataset, Point, PointId};
use crate::diagnostics::{DiagnosticsSink, LeafReason};
use crate::metric::EuclideanDistance;
use crate::tree::KdTree;

pub fn dataset_from(rows: &[&[f64]]) -> Dataset {
    let mut data = Dataset::new(rows[0].len()).unwrap();
    for row in rows {
        data.push(Point::new(row.to_vec())).unwrap();
    }
    data
}

pub fn random_dataset(rng: &mut StdRng, n: usize, dims: usize) -> Dataset {
    let mut data = Dataset::new(dims).unwrap();
    for _ in 0..n {
        let values: Vec<f64> = (0..dims).map(|_| rng.gen_range(-10.0..10.0)).collect();
        data.push(Point::new(values)).unwrap();
    }
    data
}

/// Points on a coarse integer grid, so duplicates and exact distance ties
/// occur constantly.
pub fn grid_dataset(rng: &mut StdRng, n: usize, dims: usize) -> Dataset {
    let mut data = Dataset::new(dims).unwrap();
    for _ in 0..n {
        let values: Vec<f64> = (0..dims).map(|_| rng.gen_range(-3i32..=3) as f64).collect();
        data.push(Point::new(values)).unwrap();
    }
    data
}

pub fn build_tree(data: Dataset, max_leaf_size: usize) -> KdTree {
    let mut tree = KdTree::new(TreeConfig::with_max_leaf_size(max_leaf_size).unwrap());
    tree.build(data).unwrap();
    tree
}

/// Exact k-nearest by full scan, tie-complete like the tree: everything
/// tied with the k-th best distance stays in. Returns rooted distances.
pub fn brute_force_k_nearest(
    data: &Dataset,
    target: &[f64],
    k: usize,
    exclude: Option<PointId>,
) -> Vec<(PointId, f64)> {
    let metric = EuclideanDistance::for_dataset(data);
    let target = Point::new(target.to_vec());
    let mut scored: Vec<(PointId, f64)> = data
        .iter()
        .filter(|(id, _)| Some(*id) != exclude)
        .map(|(id, point)| (id, metric.distance_sq(&target, point).unwrap()))
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
    if scored.len() > k {
        let bound = scored[k - 1].1;
        scored.retain(|&(_, d)| d <= bound);
    }
    scored.into_iter().map(|(id, d)| (id, d.sqrt())).collect()
}

/// Exact nearest-centre assignment, lowest centre position on ties.
pub fn brute_force_assignment(data: &Dataset, centers: &Dataset) -> Vec<usize> {
    let metric = EuclideanDistance::for_dataset(data);
    data.iter()
        .map(|(_, point)| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (cid, center) in centers.iter() {
                let d = metric.distance_sq(point, center).unwrap();
                if d < best_distance {
                    best_distance = d;
                    best = cid.index();
                }
            }
            best
        })
        .collect()
}

/// Asserts a tree result equals the oracle's, ignoring the order of
/// equal-distance entries (the tree orders ties by scan position, the
/// oracle by id).
pub fn assert_same_neighbors(
    ids: &[PointId],
    distances: &[f64],
    expected: &[(PointId, f64)],
) {
    assert_eq!(ids.len(), distances.len(), "ids and distances must be parallel");
    let mut got: Vec<(PointId, f64)> = ids
        .iter()
        .copied()
        .zip(distances.iter().copied())
        .collect();
    got.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
    let mut want = expected.to_vec();
    want.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)));
    assert_eq!(got, want);
}

/// Runs a query through the tree and checks it against the oracle.
pub fn check_against_brute_force(tree: &mut KdTree, data: &Dataset, target: &[f64], k: usize) {
    let ids = tree.k_nearest(crate::tree::Query::Values(target), k).unwrap();
    let distances = tree.distances().unwrap().to_vec();
    let expected = brute_force_k_nearest(data, target, k, None);
    assert_same_neighbors(&ids, &distances, &expected);
}

#[derive(Default)]
pub struct Events {
    pub splits: usize,
    pub leaves: Vec<(usize, LeafReason)>,
    pub searches: Vec<(usize, usize, usize)>,
    pub shortcut_points: usize,
}

/// Diagnostics sink that records events for assertions. Clone the handle
/// before boxing it into the tree; both see the same event log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Events>>,
}

impl RecordingSink {
    pub fn with<R>(&self, f: impl FnOnce(&Events) -> R) -> R {
        f(&self.events.borrow())
    }
}

impl DiagnosticsSink for RecordingSink {
    fn node_split(&self, _depth: usize, _dim: usize, _value: f64, _left: usize, _right: usize) {
        self.events.borrow_mut().splits += 1;
    }

    fn leaf_settled(&self, _depth: usize, count: usize, reason: LeafReason) {
        self.events.borrow_mut().leaves.push((count, reason));
    }

    fn search_finished(&self, leaves_visited: usize, points_scanned: usize, pruned: usize) {
        self.events
            .borrow_mut()
            .searches
            .push((leaves_visited, points_scanned, pruned));
    }

    fn assignment_shortcut(&self, points: usize, _center: usize) {
        self.events.borrow_mut().shortcut_points += points;
    }
}
