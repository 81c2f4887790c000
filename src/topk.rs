//! Row-wise top-k kernel.
//!
//! Per query row, keep the `k` entries with the largest (or smallest) weight.
//! A bounded binary heap of size `k` holds the current best entries, so a row
//! of degree `d` costs O(d log k) rather than a full sort.
//!
//! Output per row is ordered best first; equal weights keep backing order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::KernelConfig;
use crate::error::Result;
use crate::rowwise::{check_rows, check_weights_cover, run_rows};
use crate::sparse::{Coo, Csr, RowView};
use crate::NodeId;

/// Top-`k` entries per query row of a CSR matrix by `weights[edge_id]`.
pub fn csr_rowwise_topk(
    mat: &Csr,
    rows: &[NodeId],
    k: usize,
    weights: &[f32],
    ascending: bool,
    config: &KernelConfig,
) -> Result<Coo> {
    let view = RowView::from_csr(mat);
    check_rows(&view, rows)?;
    check_weights_cover(weights, mat.data(), false)?;
    Ok(topk_view(&view, rows, k, weights, ascending, config))
}

/// COO flavor of [`csr_rowwise_topk`].
pub fn coo_rowwise_topk(
    mat: &Coo,
    rows: &[NodeId],
    k: usize,
    weights: &[f32],
    ascending: bool,
    config: &KernelConfig,
) -> Result<Coo> {
    let view = RowView::from_coo(mat);
    check_rows(&view, rows)?;
    check_weights_cover(weights, mat.data(), false)?;
    Ok(topk_view(&view, rows, k, weights, ascending, config))
}

/// An entry ranked for the heap: `Less` means "better".
#[derive(Debug, Clone, Copy)]
struct Ranked {
    weight: f32,
    rank: usize,
    ascending: bool,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_weight = if self.ascending {
            self.weight.partial_cmp(&other.weight)
        } else {
            other.weight.partial_cmp(&self.weight)
        };
        by_weight
            .unwrap_or(Ordering::Equal)
            .then(self.rank.cmp(&other.rank))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

#[derive(Debug, Default)]
struct Scratch {
    heap: BinaryHeap<Ranked>,
    best: Vec<Ranked>,
}

/// Weights are validated by the caller.
pub(crate) fn topk_view(
    view: &RowView<'_>,
    rows: &[NodeId],
    k: usize,
    weights: &[f32],
    ascending: bool,
    config: &KernelConfig,
) -> Coo {
    if k == 0 {
        return Coo::empty(view.num_rows(), view.num_cols());
    }
    run_rows(view, rows, config, Scratch::default, |s, row, _rng, picks| {
        let ranked = (0..view.degree(row)).map(|j| Ranked {
            weight: weights[view.edge_id(row, j)],
            rank: j,
            ascending,
        });

        s.best.clear();
        if view.degree(row) <= k {
            s.best.extend(ranked);
        } else {
            // Max-heap on "worse": the top is the weakest of the kept entries.
            s.heap.clear();
            for cand in ranked {
                if s.heap.len() < k {
                    s.heap.push(cand);
                } else if let Some(mut worst) = s.heap.peek_mut() {
                    if cand < *worst {
                        *worst = cand;
                    }
                }
            }
            s.best.extend(s.heap.drain());
        }
        s.best.sort_unstable();
        picks.extend(s.best.iter().map(|r| r.rank));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeId;

    /// Row 0 has 6 entries (ids 0..6), row 1 none, row 2 two entries (ids 6, 7).
    fn csr() -> Csr {
        Csr::new(3, 6, vec![0, 6, 6, 8], vec![0, 1, 2, 3, 4, 5, 0, 1], None).expect("valid csr")
    }

    const W: [f32; 8] = [0.5, 3.0, 1.0, 3.0, -2.0, 0.7, 9.0, 8.0];

    fn ids(coo: &Coo, row: usize) -> Vec<EdgeId> {
        coo.triples().filter(|t| t.0 == row).map(|t| t.2).collect()
    }

    #[test]
    fn descending_keeps_largest_with_stable_ties() {
        let cfg = KernelConfig::new(0);
        let out = csr_rowwise_topk(&csr(), &[0, 1, 2], 3, &W, false, &cfg).unwrap();
        // 3.0 (id 1) before 3.0 (id 3): backing order.
        assert_eq!(ids(&out, 0), vec![1, 3, 2]);
        assert!(ids(&out, 1).is_empty());
        assert_eq!(ids(&out, 2), vec![6, 7]);
    }

    #[test]
    fn ascending_keeps_smallest() {
        let out = csr_rowwise_topk(&csr(), &[0], 2, &W, true, &KernelConfig::new(0)).unwrap();
        assert_eq!(ids(&out, 0), vec![4, 0]);
    }

    #[test]
    fn tie_at_the_cut_prefers_earlier_entry() {
        let out = csr_rowwise_topk(&csr(), &[0], 1, &W, false, &KernelConfig::new(0)).unwrap();
        assert_eq!(ids(&out, 0), vec![1]);
    }

    #[test]
    fn k_zero_and_large_k() {
        let m = csr();
        let cfg = KernelConfig::new(0);
        assert_eq!(csr_rowwise_topk(&m, &[0, 2], 0, &W, false, &cfg).unwrap().nnz(), 0);
        let all = csr_rowwise_topk(&m, &[0], 100, &W, false, &cfg).unwrap();
        assert_eq!(ids(&all, 0), vec![1, 3, 2, 5, 0, 4]);
    }

    #[test]
    fn coo_matches_csr() {
        let m = csr();
        let cfg = KernelConfig::new(0);
        let a = csr_rowwise_topk(&m, &[2, 0], 4, &W, false, &cfg).unwrap();
        let b = coo_rowwise_topk(&m.to_coo(), &[2, 0], 4, &W, false, &cfg).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.row(), b.row());
    }

    #[test]
    fn rejects_non_finite_weights() {
        let mut w = W;
        w[2] = f32::INFINITY;
        assert!(csr_rowwise_topk(&csr(), &[0], 1, &w, false, &KernelConfig::new(0)).is_err());
    }
}
