//! Row-wise sampling kernel.
//!
//! For each query row, pick a bounded subset of that row's entries:
//!
//! | weights | replace | method                                   | picks per row            |
//! |---------|---------|------------------------------------------|--------------------------|
//! | no      | no      | reservoir (Algorithm L)                  | `min(f, degree)`         |
//! | no      | yes     | independent uniform draws                | `f`                      |
//! | yes     | no      | weighted reservoir (A-Res)               | `min(f, #{w > 0})`       |
//! | yes     | yes     | alias table                              | `f`, or 0 if all `w = 0` |
//!
//! Rows are emitted in query order (duplicates sampled independently); within
//! a row, entries come out in sampling order. Weights are indexed by edge id.
//!
//! This module also hosts the row driver shared with [`crate::topk`] and
//! [`crate::biased`]: per-row RNG derivation, per-worker scratch, optional
//! rayon fan-out and COO assembly.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::alias::AliasTable;
use crate::config::KernelConfig;
use crate::error::{Error, Result};
use crate::reservoir::{ReservoirSampler, WeightedReservoirSampler};
use crate::sparse::{Coo, Csr, RowView};
use crate::{EdgeId, NodeId};

/// Sample up to `fanout` entries per query row of a CSR matrix.
///
/// Output is a COO with the same shape as `mat`; its `data` holds the picked
/// edge ids.
pub fn csr_rowwise_sampling(
    mat: &Csr,
    rows: &[NodeId],
    fanout: usize,
    weights: Option<&[f32]>,
    replace: bool,
    config: &KernelConfig,
) -> Result<Coo> {
    let view = RowView::from_csr(mat);
    check_rows(&view, rows)?;
    if let Some(w) = weights {
        check_weights_cover(w, mat.data(), true)?;
    }
    Ok(sample_view(&view, rows, fanout, weights, replace, config))
}

/// COO flavor of [`csr_rowwise_sampling`]. A row index is built per call; `mat`
/// is not modified.
pub fn coo_rowwise_sampling(
    mat: &Coo,
    rows: &[NodeId],
    fanout: usize,
    weights: Option<&[f32]>,
    replace: bool,
    config: &KernelConfig,
) -> Result<Coo> {
    let view = RowView::from_coo(mat);
    check_rows(&view, rows)?;
    if let Some(w) = weights {
        check_weights_cover(w, mat.data(), true)?;
    }
    Ok(sample_view(&view, rows, fanout, weights, replace, config))
}

#[derive(Debug, Default)]
struct Scratch {
    reservoir: ReservoirSampler<usize>,
    weighted: WeightedReservoirSampler<usize>,
    alias: AliasTable,
}

/// Inputs are validated by the caller.
pub(crate) fn sample_view(
    view: &RowView<'_>,
    rows: &[NodeId],
    fanout: usize,
    weights: Option<&[f32]>,
    replace: bool,
    config: &KernelConfig,
) -> Coo {
    if fanout == 0 {
        return Coo::empty(view.num_rows(), view.num_cols());
    }
    run_rows(view, rows, config, Scratch::default, |s, row, rng, picks| {
        pick_row(s, view, row, fanout, weights, replace, rng, picks)
    })
}

#[allow(clippy::too_many_arguments)]
fn pick_row(
    s: &mut Scratch,
    view: &RowView<'_>,
    row: NodeId,
    fanout: usize,
    weights: Option<&[f32]>,
    replace: bool,
    rng: &mut ChaCha8Rng,
    picks: &mut Vec<usize>,
) {
    let deg = view.degree(row);
    match (weights, replace) {
        (None, false) if fanout >= deg => picks.extend(0..deg),
        (None, false) => {
            s.reservoir.reset(fanout);
            for j in 0..deg {
                s.reservoir.add_with_rng(j, rng);
            }
            picks.extend_from_slice(s.reservoir.samples());
        }
        (None, true) => picks.extend((0..fanout).map(|_| rng.random_range(0..deg))),
        (Some(w), false) => {
            s.weighted.reset(fanout);
            for j in 0..deg {
                let added = s
                    .weighted
                    .add_with_rng(j, f64::from(w[view.edge_id(row, j)]), rng);
                debug_assert!(added.is_ok());
            }
            picks.extend_from_slice(s.weighted.samples());
        }
        (Some(w), true) => {
            let row_weights = (0..deg).map(|j| f64::from(w[view.edge_id(row, j)]));
            if s.alias.rebuild(row_weights) {
                picks.extend((0..fanout).map(|_| s.alias.draw(rng)));
            }
        }
    }
}

/// Drive `pick` over every query row and assemble the picked entries.
///
/// `pick` receives the worker scratch, the row id, that row's RNG and an empty
/// buffer to fill with entry ranks (`0..degree`). Rows with no entries are
/// skipped.
pub(crate) fn run_rows<S, I, F>(
    view: &RowView<'_>,
    rows: &[NodeId],
    config: &KernelConfig,
    init: I,
    pick: F,
) -> Coo
where
    S: Send,
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, NodeId, &mut ChaCha8Rng, &mut Vec<usize>) + Sync + Send,
{
    let mut out = CooBuilder::default();

    #[cfg(feature = "parallel")]
    let per_row = config.use_parallel(rows.len()).then(|| {
        use rayon::prelude::*;

        rows.par_iter()
            .enumerate()
            .map_init(&init, |s, (i, &row)| {
                let mut picks = Vec::new();
                if view.degree(row) > 0 {
                    pick(s, row, &mut config.row_rng(i), &mut picks);
                }
                picks
            })
            .collect::<Vec<Vec<usize>>>()
    });
    #[cfg(not(feature = "parallel"))]
    let per_row: Option<Vec<Vec<usize>>> = None;

    if let Some(per_row) = per_row {
        for (&row, picks) in rows.iter().zip(&per_row) {
            out.push_row(view, row, picks);
        }
        return out.finish(view);
    }

    let mut scratch = init();
    let mut picks = Vec::new();
    for (i, &row) in rows.iter().enumerate() {
        if view.degree(row) == 0 {
            continue;
        }
        picks.clear();
        pick(&mut scratch, row, &mut config.row_rng(i), &mut picks);
        out.push_row(view, row, &picks);
    }
    out.finish(view)
}

#[derive(Default)]
struct CooBuilder {
    row: Vec<NodeId>,
    col: Vec<NodeId>,
    data: Vec<EdgeId>,
}

impl CooBuilder {
    fn push_row(&mut self, view: &RowView<'_>, row: NodeId, picks: &[usize]) {
        for &j in picks {
            let (c, e) = view.entry(row, j);
            self.row.push(row);
            self.col.push(c);
            self.data.push(e);
        }
    }

    fn finish(self, view: &RowView<'_>) -> Coo {
        Coo::from_parts(view.num_rows(), view.num_cols(), self.row, self.col, self.data)
    }
}

pub(crate) fn check_rows(view: &RowView<'_>, rows: &[NodeId]) -> Result<()> {
    let num_rows = view.num_rows();
    match rows.iter().find(|&&r| r >= num_rows) {
        Some(&row) => Err(Error::RowOutOfRange { row, num_rows }),
        None => Ok(()),
    }
}

/// First offending weight, if any.
pub(crate) fn check_weight_values(
    weights: &[f32],
    non_negative: bool,
) -> std::result::Result<(), String> {
    for (i, &w) in weights.iter().enumerate() {
        if !w.is_finite() {
            return Err(format!("weight[{i}] = {w} is not finite"));
        }
        if non_negative && w < 0.0 {
            return Err(format!("weight[{i}] = {w} is negative"));
        }
    }
    Ok(())
}

/// Values are valid and every edge id in `edge_ids` indexes into `weights`.
pub(crate) fn check_weights_cover(
    weights: &[f32],
    edge_ids: &[EdgeId],
    non_negative: bool,
) -> Result<()> {
    check_weight_values(weights, non_negative).map_err(Error::InvalidWeight)?;
    match edge_ids.iter().find(|&&e| e >= weights.len()) {
        Some(e) => Err(Error::InvalidWeight(format!(
            "edge id {e} has no weight ({} weights)",
            weights.len()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Row 0: 5 entries (ids 0..5), row 1: none, row 2: 3 entries (ids 5..8).
    fn csr() -> Csr {
        Csr::new(3, 4, vec![0, 5, 5, 8], vec![0, 1, 2, 3, 0, 1, 2, 3], None).expect("valid csr")
    }

    fn per_row(coo: &Coo, row: usize) -> Vec<EdgeId> {
        coo.triples().filter(|t| t.0 == row).map(|t| t.2).collect()
    }

    #[test]
    fn uniform_without_replacement_is_bounded_and_distinct() {
        let m = csr();
        let cfg = KernelConfig::new(1);
        let out = csr_rowwise_sampling(&m, &[0, 1, 2], 3, None, false, &cfg).unwrap();
        let r0 = per_row(&out, 0);
        assert_eq!(r0.len(), 3);
        assert_eq!(r0.iter().collect::<HashSet<_>>().len(), 3);
        assert!(r0.iter().all(|&e| e < 5));
        assert!(per_row(&out, 1).is_empty());
        assert_eq!(per_row(&out, 2), vec![5, 6, 7]);
        assert_eq!(out.num_rows(), 3);
        assert_eq!(out.num_cols(), 4);
    }

    #[test]
    fn uniform_with_replacement_takes_exactly_fanout() {
        let m = csr();
        let out = csr_rowwise_sampling(&m, &[2, 1], 10, None, true, &KernelConfig::new(2)).unwrap();
        assert_eq!(out.nnz(), 10);
        assert!(out.data().iter().all(|e| (5..8).contains(e)));
        assert!(out.row().iter().all(|&r| r == 2));
    }

    #[test]
    fn duplicate_rows_are_sampled_independently() {
        let m = csr();
        let out = csr_rowwise_sampling(&m, &[0, 0], 2, None, false, &KernelConfig::new(3)).unwrap();
        assert_eq!(out.nnz(), 4);
    }

    #[test]
    fn weighted_without_replacement_skips_zero_weights() {
        let m = csr();
        let w = [0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0];
        for seed in 0..50 {
            let cfg = KernelConfig::new(seed);
            let out = csr_rowwise_sampling(&m, &[0, 2], 3, Some(&w), false, &cfg).unwrap();
            let mut r0 = per_row(&out, 0);
            r0.sort_unstable();
            assert_eq!(r0, vec![1, 3]);
            assert!(per_row(&out, 2).is_empty());
        }
    }

    #[test]
    fn weighted_with_replacement_follows_weights() {
        let m = csr();
        let w = [1.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0];
        let cfg = KernelConfig::new(9);
        let out = csr_rowwise_sampling(&m, &[0, 2], 4000, Some(&w), true, &cfg).unwrap();
        let r0 = per_row(&out, 0);
        assert_eq!(r0.len(), 4000);
        assert!(per_row(&out, 2).is_empty());
        let threes = r0.iter().filter(|&&e| e == 3).count() as f64 / 4000.0;
        assert!((threes - 0.75).abs() < 0.03, "frac={threes}");
        assert!(r0.iter().all(|&e| e == 0 || e == 3));
    }

    #[test]
    fn uniform_rows_look_uniform() {
        let m = csr();
        let mut counts = [0usize; 5];
        let trials = 5_000;
        for seed in 0..trials {
            let cfg = KernelConfig::new(seed);
            let out = csr_rowwise_sampling(&m, &[0], 2, None, false, &cfg).unwrap();
            for &e in out.data() {
                counts[e] += 1;
            }
        }
        let expected = trials as f64 * 2.0 / 5.0;
        let chi2: f64 = counts
            .iter()
            .map(|&c| (c as f64 - expected).powi(2) / expected)
            .sum();
        // df = 4; p(chi2 > 25) is ~5e-5.
        assert!(chi2 < 25.0, "chi2={chi2:.2} counts={counts:?}");
    }

    #[test]
    fn coo_and_csr_agree() {
        let m = csr();
        let coo = m.to_coo();
        let cfg = KernelConfig::new(17);
        let a = csr_rowwise_sampling(&m, &[0, 2], 2, None, false, &cfg).unwrap();
        let b = coo_rowwise_sampling(&coo, &[0, 2], 2, None, false, &cfg).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.col(), b.col());
    }

    #[test]
    fn rejects_bad_inputs() {
        let m = csr();
        let cfg = KernelConfig::new(0);
        assert_eq!(
            csr_rowwise_sampling(&m, &[3], 1, None, false, &cfg).unwrap_err(),
            Error::RowOutOfRange { row: 3, num_rows: 3 }
        );
        let short = [1.0; 4];
        assert!(matches!(
            csr_rowwise_sampling(&m, &[0], 1, Some(&short), false, &cfg),
            Err(Error::InvalidWeight(_))
        ));
        let negative = [-1.0; 8];
        assert!(matches!(
            csr_rowwise_sampling(&m, &[0], 1, Some(&negative), false, &cfg),
            Err(Error::InvalidWeight(_))
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let m = csr();
        let rows: Vec<usize> = (0..3000).map(|i| [0, 1, 2][i % 3]).collect();
        let seq = KernelConfig::new(21);
        let par = KernelConfig {
            parallel: true,
            min_parallel_rows: 1,
            ..seq
        };
        let a = csr_rowwise_sampling(&m, &rows, 2, None, false, &seq).unwrap();
        let b = csr_rowwise_sampling(&m, &rows, 2, None, false, &par).unwrap();
        assert_eq!(a.row(), b.row());
        assert_eq!(a.data(), b.data());
    }
}
