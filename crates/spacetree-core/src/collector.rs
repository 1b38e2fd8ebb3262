//! Bounded best-k neighbour collection with exact tie handling.
//!
//! The collector keeps candidates sorted by ascending distance and enforces
//! a soft bound `k`: entries strictly worse than the k-th best are dropped,
//! but entries tied with the k-th best are all kept, so the list can
//! legitimately hold more than `k` neighbours. That tie-completeness is
//! what makes downstream majority votes deterministic instead of dependent
//! on scan order.

use crate::dataset::PointId;
use crate::error::{TreeError, TreeResult};

/// One collected candidate. `distance` is squared while collection runs;
/// the tree roots distances only when handing results to the caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub id: PointId,
    pub distance: f64,
}

/// Sorted, bounded candidate list for nearest-neighbour queries.
#[derive(Clone, Debug)]
pub struct NeighborCollector {
    k: usize,
    entries: Vec<Neighbor>,
}

impl NeighborCollector {
    /// Creates a collector bounded by `k`.
    ///
    /// # Errors
    /// Returns [`TreeError::InvalidInput`] when `k` is zero.
    pub fn new(k: usize) -> TreeResult<Self> {
        if k == 0 {
            return Err(TreeError::invalid("neighbour count k must be at least 1"));
        }
        Ok(Self {
            k,
            entries: Vec::with_capacity(k + 1),
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True once `k` candidates have been collected. Further candidates
    /// must beat or tie [`Self::current_worst`] to get in.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.k
    }

    /// Distance of the current k-th best candidate, the pruning bound for
    /// the search. Infinite while the collector is not yet full, so that
    /// nothing gets pruned before `k` candidates exist.
    pub fn current_worst(&self) -> f64 {
        if self.is_full() {
            self.entries[self.entries.len() - 1].distance
        } else {
            f64::INFINITY
        }
    }

    /// Whether a candidate at `distance` would survive insertion.
    pub fn would_accept(&self, distance: f64) -> bool {
        !self.is_full() || distance <= self.current_worst()
    }

    /// Inserts a candidate at its sorted position, then drops entries that
    /// fell strictly behind the k-th best. Equal distances insert after
    /// existing ones, so earlier-scanned points win ties on order.
    pub fn insert_sorted(&mut self, distance: f64, id: PointId) {
        let pos = self.entries.partition_point(|n| n.distance <= distance);
        self.entries.insert(pos, Neighbor { id, distance });
        self.drop_beyond_bound();
    }

    /// Shrinks the bound to a smaller `k` and re-applies truncation.
    ///
    /// Lets one search serve several neighbour counts: collect with the
    /// largest k, then prune downwards. Growing the bound back is not
    /// supported because dropped candidates are gone.
    pub fn prune_to_k(&mut self, k: usize) -> TreeResult<()> {
        if k == 0 {
            return Err(TreeError::invalid("neighbour count k must be at least 1"));
        }
        if k > self.k {
            return Err(TreeError::invalid(format!(
                "cannot widen a collector from k={} to k={k}",
                self.k
            )));
        }
        self.k = k;
        self.drop_beyond_bound();
        Ok(())
    }

    fn drop_beyond_bound(&mut self) {
        if self.entries.len() <= self.k {
            return;
        }
        let bound = self.entries[self.k - 1].distance;
        while self.entries.len() > self.k {
            if self.entries[self.entries.len() - 1].distance > bound {
                self.entries.pop();
            } else {
                break;
            }
        }
    }

    /// Collected candidates in ascending distance order.
    pub fn entries(&self) -> &[Neighbor] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<PointId> {
        self.entries.iter().map(|n| n.id).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.entries.iter().map(|n| n.distance).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> PointId {
        PointId::new(index)
    }

    fn collect(k: usize, distances: &[f64]) -> NeighborCollector {
        let mut collector = NeighborCollector::new(k).unwrap();
        for (i, &d) in distances.iter().enumerate() {
            collector.insert_sorted(d, id(i));
        }
        collector
    }

    #[test]
    fn test_zero_k_is_rejected() {
        assert!(NeighborCollector::new(0).is_err());
    }

    #[test]
    fn test_entries_stay_sorted_regardless_of_insert_order() {
        let collector = collect(5, &[4.0, 1.0, 3.0, 0.5, 2.0]);
        let distances = collector.distances();
        let mut sorted = distances.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(distances, sorted);
        assert_eq!(collector.entries()[0].id, id(3));
    }

    #[test]
    fn test_worst_is_infinite_until_full() {
        let mut collector = NeighborCollector::new(3).unwrap();
        assert_eq!(collector.current_worst(), f64::INFINITY);
        collector.insert_sorted(1.0, id(0));
        collector.insert_sorted(2.0, id(1));
        assert_eq!(collector.current_worst(), f64::INFINITY);
        collector.insert_sorted(3.0, id(2));
        assert_eq!(collector.current_worst(), 3.0);
    }

    #[test]
    fn test_strictly_worse_entries_fall_off() {
        let collector = collect(2, &[5.0, 1.0, 3.0, 2.0]);
        assert_eq!(collector.len(), 2);
        assert_eq!(collector.distances(), vec![1.0, 2.0]);
        assert_eq!(collector.current_worst(), 2.0);
    }

    #[test]
    fn test_ties_with_the_kth_best_all_survive() {
        let collector = collect(2, &[1.0, 2.0, 2.0, 2.0, 5.0]);
        assert_eq!(collector.distances(), vec![1.0, 2.0, 2.0, 2.0]);
        assert_eq!(collector.len(), 4);
        // The bound is still the k-th best distance.
        assert_eq!(collector.current_worst(), 2.0);
    }

    #[test]
    fn test_tied_inserts_keep_scan_order() {
        let collector = collect(3, &[2.0, 2.0, 2.0]);
        let ids: Vec<_> = collector.ids();
        assert_eq!(ids, vec![id(0), id(1), id(2)]);
    }

    #[test]
    fn test_would_accept_matches_insertion_outcome() {
        let collector = collect(2, &[1.0, 2.0]);
        assert!(collector.would_accept(2.0));
        assert!(collector.would_accept(0.5));
        assert!(!collector.would_accept(2.1));
    }

    #[test]
    fn test_prune_to_smaller_k_reapplies_tie_rules() {
        let mut collector = collect(4, &[1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(collector.len(), 5);

        collector.prune_to_k(2).unwrap();
        // k=2 bound is 2.0; both 2.0 entries stay, the 3.0s go.
        assert_eq!(collector.distances(), vec![1.0, 2.0, 2.0]);

        collector.prune_to_k(1).unwrap();
        assert_eq!(collector.distances(), vec![1.0]);
    }

    #[test]
    fn test_prune_cannot_widen_or_zero_the_bound() {
        let mut collector = collect(2, &[1.0, 2.0]);
        assert!(collector.prune_to_k(0).is_err());
        assert!(collector.prune_to_k(3).is_err());
        assert!(collector.prune_to_k(2).is_ok());
    }
}
