//! Tag-biased (stratified) row-wise sampling.
//!
//! Each row's entries are laid out as contiguous tag buckets described by a
//! per-vertex offset table. A global bias per tag decides how a row's `fanout`
//! picks are split across buckets: tag `t` gets a share proportional to
//! `bias[t] * count[t]`, rounded by largest remainder and never more than
//! `count[t]`. Zero-bias tags only receive picks once every other tag is
//! full, so a row yields `min(fanout, degree)` entries. Inside a bucket the
//! picks are uniform.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::KernelConfig;
use crate::error::{Error, Result};
use crate::reservoir::ReservoirSampler;
use crate::rowwise::{check_rows, check_weight_values, run_rows};
use crate::sparse::{Coo, Csr, RowView};
use crate::NodeId;

/// Per-vertex tag boundaries, `[num_rows, num_tags + 1]`, row-major.
///
/// Row `v` holds offsets relative to the start of `v`'s entries: tag `t`
/// covers ranks `row(v)[t]..row(v)[t + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOffsets {
    num_rows: usize,
    num_tags: usize,
    offsets: Vec<usize>,
}

impl TagOffsets {
    pub fn new(num_rows: usize, num_tags: usize, offsets: Vec<usize>) -> Result<Self> {
        let width = num_tags + 1;
        if offsets.len() != num_rows * width {
            return Err(Error::InvalidTagOffsets(format!(
                "expected shape [{num_rows}, {width}] ({} values), got {}",
                num_rows * width,
                offsets.len()
            )));
        }
        if let Some(v) = offsets
            .chunks_exact(width)
            .position(|row| row.windows(2).any(|w| w[0] > w[1]))
        {
            return Err(Error::InvalidTagOffsets(format!(
                "offsets of vertex {v} are not non-decreasing"
            )));
        }
        Ok(Self {
            num_rows,
            num_tags,
            offsets,
        })
    }

    /// One offset vector per vertex; all must have the same length.
    pub fn from_rows(rows: Vec<Vec<usize>>) -> Result<Self> {
        let width = rows.first().map_or(1, Vec::len);
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(Error::InvalidTagOffsets(
                "every vertex needs num_tags + 1 offsets".into(),
            ));
        }
        let num_rows = rows.len();
        Self::new(num_rows, width - 1, rows.concat())
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_tags(&self) -> usize {
        self.num_tags
    }

    pub fn row(&self, v: NodeId) -> &[usize] {
        let width = self.num_tags + 1;
        &self.offsets[v * width..(v + 1) * width]
    }
}

/// Tag-stratified sampling over a CSR whose rows are grouped by tag.
pub fn csr_rowwise_sampling_biased(
    mat: &Csr,
    rows: &[NodeId],
    fanout: usize,
    tag_offsets: &TagOffsets,
    bias: &[f32],
    replace: bool,
    config: &KernelConfig,
) -> Result<Coo> {
    let view = RowView::from_csr(mat);
    check_rows(&view, rows)?;
    check_tags(&view, rows, tag_offsets, bias)?;
    Ok(biased_view(&view, rows, fanout, tag_offsets, bias, replace, config))
}

/// Shape of the offset table, bias values, and that each query row's offsets
/// span exactly its entries.
pub(crate) fn check_tags(
    view: &RowView<'_>,
    rows: &[NodeId],
    tags: &TagOffsets,
    bias: &[f32],
) -> Result<()> {
    if tags.num_tags() != bias.len() {
        return Err(Error::InvalidTagOffsets(format!(
            "the sizes of tag_offset ({} tags) and bias ({}) are inconsistent",
            tags.num_tags(),
            bias.len()
        )));
    }
    if tags.num_rows() != view.num_rows() {
        return Err(Error::InvalidTagOffsets(format!(
            "tag_offset has {} rows, expected {}",
            tags.num_rows(),
            view.num_rows()
        )));
    }
    check_weight_values(bias, true).map_err(|e| Error::InvalidWeight(format!("bias: {e}")))?;
    for &r in rows {
        let o = tags.row(r);
        let (first, last) = (o[0], o[tags.num_tags()]);
        if first != 0 || last != view.degree(r) {
            return Err(Error::InvalidTagOffsets(format!(
                "offsets of vertex {r} span {first}..{last}, expected 0..{}",
                view.degree(r)
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Scratch {
    counts: Vec<usize>,
    alloc: Vec<usize>,
    frac: Vec<f64>,
    order: Vec<usize>,
    reservoir: ReservoirSampler<usize>,
}

/// Inputs are validated by the caller.
pub(crate) fn biased_view(
    view: &RowView<'_>,
    rows: &[NodeId],
    fanout: usize,
    tags: &TagOffsets,
    bias: &[f32],
    replace: bool,
    config: &KernelConfig,
) -> Coo {
    if fanout == 0 {
        return Coo::empty(view.num_rows(), view.num_cols());
    }
    run_rows(view, rows, config, Scratch::default, |s, row, rng, picks| {
        let offsets = tags.row(row);
        s.counts.clear();
        s.counts.extend(offsets.windows(2).map(|w| w[1] - w[0]));
        allocate(fanout, &s.counts, bias, &mut s.alloc, &mut s.frac, &mut s.order);

        for (t, &n) in s.alloc.iter().enumerate() {
            if n > 0 {
                draw_bucket(&mut s.reservoir, offsets[t], s.counts[t], n, replace, rng, picks);
            }
        }
    })
}

/// `n` ranks from `start..start + count`, `n <= count`.
fn draw_bucket(
    reservoir: &mut ReservoirSampler<usize>,
    start: usize,
    count: usize,
    n: usize,
    replace: bool,
    rng: &mut ChaCha8Rng,
    picks: &mut Vec<usize>,
) {
    if replace {
        picks.extend((0..n).map(|_| start + rng.random_range(0..count)));
    } else if n >= count {
        picks.extend(start..start + count);
    } else {
        reservoir.reset(n);
        for j in start..start + count {
            reservoir.add_with_rng(j, rng);
        }
        picks.extend_from_slice(reservoir.samples());
    }
}

/// Split `fanout` picks across tags.
///
/// Writes one count per tag into `alloc`, never more than the tag's size.
/// Tags with positive bias share the picks in proportion to `bias * size`.
/// Picks left over once those tags are full go to the zero-bias tags in
/// proportion to their size, so the total is `min(fanout, sum of sizes)`.
pub(crate) fn allocate(
    fanout: usize,
    counts: &[usize],
    bias: &[f32],
    alloc: &mut Vec<usize>,
    frac: &mut Vec<f64>,
    order: &mut Vec<usize>,
) {
    debug_assert_eq!(counts.len(), bias.len());
    alloc.clear();
    alloc.resize(counts.len(), 0);

    let total: usize = counts.iter().sum();
    let remaining = fanout.min(total);
    let remaining = apportion(
        remaining,
        counts,
        |t| f64::from(bias[t]) * counts[t] as f64,
        alloc,
        frac,
        order,
    );
    if remaining > 0 {
        apportion(
            remaining,
            counts,
            |t| {
                if bias[t] > 0.0 {
                    0.0
                } else {
                    counts[t] as f64
                }
            },
            alloc,
            frac,
            order,
        );
    }
}

/// Largest-remainder split of `remaining` picks over tags with positive
/// `weight`, capped by what each tag has left. Returns the picks that did not
/// fit.
fn apportion(
    mut remaining: usize,
    counts: &[usize],
    weight: impl Fn(usize) -> f64,
    alloc: &mut [usize],
    frac: &mut Vec<f64>,
    order: &mut Vec<usize>,
) -> usize {
    let open = |t: usize, alloc: &[usize]| weight(t) > 0.0 && alloc[t] < counts[t];

    while remaining > 0 {
        let mass: f64 = (0..counts.len())
            .filter(|&t| open(t, &*alloc))
            .map(&weight)
            .sum();
        if !mass.is_finite() || mass <= 0.0 {
            break;
        }

        // A tag whose share reaches its room is filled, and the rest are
        // re-split without it.
        let mut filled = 0;
        for t in 0..counts.len() {
            if !open(t, &*alloc) {
                continue;
            }
            let room = counts[t] - alloc[t];
            if remaining as f64 * weight(t) / mass >= room as f64 {
                let give = room.min(remaining - filled);
                alloc[t] += give;
                filled += give;
            }
        }
        if filled > 0 {
            remaining -= filled;
            continue;
        }

        frac.clear();
        frac.resize(counts.len(), -1.0);
        let mut given = 0;
        for t in 0..counts.len() {
            if !open(t, &*alloc) {
                continue;
            }
            let share = remaining as f64 * weight(t) / mass;
            let take = (share.floor() as usize).min(remaining - given);
            alloc[t] += take;
            given += take;
            frac[t] = share - share.floor();
        }
        remaining -= given;

        order.clear();
        order.extend((0..counts.len()).filter(|&t| frac[t] >= 0.0 && alloc[t] < counts[t]));
        order.sort_by(|&a, &b| frac[b].total_cmp(&frac[a]).then(a.cmp(&b)));
        for &t in order.iter().take(remaining) {
            alloc[t] += 1;
        }
        remaining -= remaining.min(order.len());
    }
    remaining
}
