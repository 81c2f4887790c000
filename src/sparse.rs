//! Sparse adjacency layouts for a single relation.
//!
//! Three lossless encodings of the same multiset of `(src, dst, eid)` triples:
//!
//! - [`Coo`]: parallel `row` / `col` / `data` arrays, no ordering guarantee.
//! - [`Csr`]: row offsets (`indptr`) plus per-row column ids and edge ids.
//! - [`Csc`]: the column-major twin of [`Csr`], stored as the CSR of the
//!   transposed matrix.
//!
//! Buffers are held in `Arc<[_]>`, so transposes (`Coo::transpose`,
//! `Csr::transpose`, `Csc::transpose`) reinterpret the same buffers instead of
//! copying edge ids. Conversions between layouts (`to_csr`, `to_coo`, ...)
//! allocate.

use std::borrow::Cow;
use std::fmt;
use std::ops::{BitOr, Range};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::{EdgeId, NodeId};

/// Concrete sparse layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseFormat {
    Coo,
    Csr,
    Csc,
}

impl SparseFormat {
    const fn bit(self) -> u8 {
        match self {
            Self::Coo => 0b001,
            Self::Csr => 0b010,
            Self::Csc => 0b100,
        }
    }
}

/// Set of [`SparseFormat`]s, used for "created" and "allowed" bookkeeping.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FormatMask(u8);

impl FormatMask {
    pub const NONE: Self = Self(0);
    pub const COO: Self = Self(0b001);
    pub const CSR: Self = Self(0b010);
    pub const CSC: Self = Self(0b100);
    pub const ALL: Self = Self(0b111);

    pub const fn contains(self, format: SparseFormat) -> bool {
        self.0 & format.bit() != 0
    }

    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// First member in `COO, CSR, CSC` order.
    pub fn first(self) -> Option<SparseFormat> {
        self.iter().next()
    }

    pub fn iter(self) -> impl Iterator<Item = SparseFormat> {
        [SparseFormat::Coo, SparseFormat::Csr, SparseFormat::Csc]
            .into_iter()
            .filter(move |f| self.contains(*f))
    }
}

impl From<SparseFormat> for FormatMask {
    fn from(format: SparseFormat) -> Self {
        Self(format.bit())
    }
}

impl BitOr for FormatMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for FormatMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Coordinate list: one `(row, col, data)` triple per entry.
#[derive(Debug, Clone)]
pub struct Coo {
    num_rows: usize,
    num_cols: usize,
    row: Arc<[NodeId]>,
    col: Arc<[NodeId]>,
    data: Arc<[EdgeId]>,
}

impl Coo {
    /// Build from endpoint arrays; edge ids are assigned as `0..nnz`.
    pub fn new(
        num_rows: usize,
        num_cols: usize,
        row: Vec<NodeId>,
        col: Vec<NodeId>,
    ) -> Result<Self> {
        let data: Vec<EdgeId> = (0..row.len()).collect();
        Self::with_edge_ids(num_rows, num_cols, row, col, data)
    }

    /// Build from endpoint arrays with explicit edge ids.
    pub fn with_edge_ids(
        num_rows: usize,
        num_cols: usize,
        row: Vec<NodeId>,
        col: Vec<NodeId>,
        data: Vec<EdgeId>,
    ) -> Result<Self> {
        if row.len() != col.len() || row.len() != data.len() {
            return Err(Error::InvalidGraph(format!(
                "coo arrays differ in length (row={}, col={}, data={})",
                row.len(),
                col.len(),
                data.len()
            )));
        }
        if let Some(&r) = row.iter().find(|&&r| r >= num_rows) {
            return Err(Error::InvalidGraph(format!("row id {r} >= {num_rows}")));
        }
        if let Some(&c) = col.iter().find(|&&c| c >= num_cols) {
            return Err(Error::InvalidGraph(format!("column id {c} >= {num_cols}")));
        }
        Ok(Self::from_parts(num_rows, num_cols, row, col, data))
    }

    pub fn empty(num_rows: usize, num_cols: usize) -> Self {
        Self::from_parts(num_rows, num_cols, Vec::new(), Vec::new(), Vec::new())
    }

    /// Callers guarantee equal lengths and in-range ids.
    pub(crate) fn from_parts(
        num_rows: usize,
        num_cols: usize,
        row: Vec<NodeId>,
        col: Vec<NodeId>,
        data: Vec<EdgeId>,
    ) -> Self {
        debug_assert!(row.len() == col.len() && col.len() == data.len());
        Self {
            num_rows,
            num_cols,
            row: row.into(),
            col: col.into(),
            data: data.into(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn nnz(&self) -> usize {
        self.row.len()
    }

    pub fn row(&self) -> &[NodeId] {
        &self.row
    }

    pub fn col(&self) -> &[NodeId] {
        &self.col
    }

    pub fn data(&self) -> &[EdgeId] {
        &self.data
    }

    pub fn triples(&self) -> impl Iterator<Item = (NodeId, NodeId, EdgeId)> + '_ {
        (0..self.nnz()).map(move |i| (self.row[i], self.col[i], self.data[i]))
    }

    /// Swap rows and columns. Shares buffers with `self`.
    pub fn transpose(&self) -> Coo {
        Coo {
            num_rows: self.num_cols,
            num_cols: self.num_rows,
            row: Arc::clone(&self.col),
            col: Arc::clone(&self.row),
            data: Arc::clone(&self.data),
        }
    }

    /// Stable counting sort by row: entries of a row keep their COO order.
    pub fn to_csr(&self) -> Csr {
        let (indptr, perm) = group_by_row(self.num_rows, &self.row);
        let indices: Vec<NodeId> = perm.iter().map(|&p| self.col[p]).collect();
        let data: Vec<EdgeId> = perm.iter().map(|&p| self.data[p]).collect();
        Csr::from_parts(self.num_rows, self.num_cols, indptr, indices, data)
    }

    pub fn to_csc(&self) -> Csc {
        Csc {
            inner: self.transpose().to_csr(),
        }
    }
}

/// Compressed-row layout.
#[derive(Debug, Clone)]
pub struct Csr {
    num_rows: usize,
    num_cols: usize,
    indptr: Arc<[usize]>,
    indices: Arc<[NodeId]>,
    data: Arc<[EdgeId]>,
    sorted: bool,
}

impl Csr {
    /// Build from raw arrays. `data: None` assigns edge ids `0..nnz`.
    pub fn new(
        num_rows: usize,
        num_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<NodeId>,
        data: Option<Vec<EdgeId>>,
    ) -> Result<Self> {
        if indptr.len() != num_rows + 1 {
            return Err(Error::InvalidGraph(format!(
                "indptr has length {}, expected {}",
                indptr.len(),
                num_rows + 1
            )));
        }
        if indptr[0] != 0 || indptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidGraph("indptr must start at 0 and be non-decreasing".into()));
        }
        let nnz = indptr[num_rows];
        if indices.len() != nnz {
            return Err(Error::InvalidGraph(format!(
                "indices has length {}, indptr ends at {nnz}",
                indices.len()
            )));
        }
        if let Some(&c) = indices.iter().find(|&&c| c >= num_cols) {
            return Err(Error::InvalidGraph(format!("column id {c} >= {num_cols}")));
        }
        let data = match data {
            Some(d) if d.len() != nnz => {
                return Err(Error::InvalidGraph(format!(
                    "data has length {}, expected {nnz}",
                    d.len()
                )))
            }
            Some(d) => d,
            None => (0..nnz).collect(),
        };
        Ok(Self::from_parts(num_rows, num_cols, indptr, indices, data))
    }

    pub(crate) fn from_parts(
        num_rows: usize,
        num_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<NodeId>,
        data: Vec<EdgeId>,
    ) -> Self {
        let sorted = indptr
            .windows(2)
            .all(|w| indices[w[0]..w[1]].windows(2).all(|p| p[0] <= p[1]));
        Self {
            num_rows,
            num_cols,
            indptr: indptr.into(),
            indices: indices.into(),
            data: data.into(),
            sorted,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[NodeId] {
        &self.indices
    }

    pub fn data(&self) -> &[EdgeId] {
        &self.data
    }

    /// Whether column ids are ascending within every row.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    #[inline]
    pub fn row_range(&self, row: NodeId) -> Range<usize> {
        self.indptr[row]..self.indptr[row + 1]
    }

    #[inline]
    pub fn degree(&self, row: NodeId) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }

    /// The CSC of the transposed matrix. No buffer is copied.
    pub fn transpose(&self) -> Csc {
        Csc { inner: self.clone() }
    }

    pub fn to_coo(&self) -> Coo {
        let mut row = Vec::with_capacity(self.nnz());
        for r in 0..self.num_rows {
            row.extend(std::iter::repeat(r).take(self.degree(r)));
        }
        Coo {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            row: row.into(),
            col: Arc::clone(&self.indices),
            data: Arc::clone(&self.data),
        }
    }

    pub fn to_csc(&self) -> Csc {
        self.to_coo().to_csc()
    }
}

/// Compressed-column layout, stored as the CSR of the transposed matrix.
#[derive(Debug, Clone)]
pub struct Csc {
    inner: Csr,
}

impl Csc {
    /// `indptr` has one entry per column plus one; `indices` are row ids.
    pub fn new(
        num_rows: usize,
        num_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<NodeId>,
        data: Option<Vec<EdgeId>>,
    ) -> Result<Self> {
        Ok(Self {
            inner: Csr::new(num_cols, num_rows, indptr, indices, data)?,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.inner.num_cols
    }

    pub fn num_cols(&self) -> usize {
        self.inner.num_rows
    }

    pub fn nnz(&self) -> usize {
        self.inner.nnz()
    }

    /// Column-major adjacency viewed as rows: row `v` lists the entries of
    /// column `v`.
    pub fn as_transposed_csr(&self) -> &Csr {
        &self.inner
    }

    /// The CSR of the transposed matrix. No buffer is copied.
    pub fn transpose(&self) -> Csr {
        self.inner.clone()
    }

    pub fn to_coo(&self) -> Coo {
        self.inner.to_coo().transpose()
    }

    pub fn to_csr(&self) -> Csr {
        self.to_coo().to_csr()
    }
}

/// One relation's adjacency in whichever layout was requested.
#[derive(Debug, Clone)]
pub enum Adjacency {
    Coo(Arc<Coo>),
    Csr(Arc<Csr>),
    Csc(Arc<Csc>),
}

impl Adjacency {
    pub fn format(&self) -> SparseFormat {
        match self {
            Self::Coo(_) => SparseFormat::Coo,
            Self::Csr(_) => SparseFormat::Csr,
            Self::Csc(_) => SparseFormat::Csc,
        }
    }

    pub fn nnz(&self) -> usize {
        match self {
            Self::Coo(m) => m.nnz(),
            Self::Csr(m) => m.nnz(),
            Self::Csc(m) => m.nnz(),
        }
    }

    pub fn to_coo(&self) -> Coo {
        match self {
            Self::Coo(m) => Coo::clone(m),
            Self::Csr(m) => m.to_coo(),
            Self::Csc(m) => m.to_coo(),
        }
    }

    pub fn to_csr(&self) -> Csr {
        match self {
            Self::Coo(m) => m.to_csr(),
            Self::Csr(m) => Csr::clone(m),
            Self::Csc(m) => m.to_csr(),
        }
    }

    pub fn to_csc(&self) -> Csc {
        match self {
            Self::Coo(m) => m.to_csc(),
            Self::Csr(m) => m.to_csc(),
            Self::Csc(m) => Csc::clone(m),
        }
    }
}

/// Stable counting sort of entry positions by row.
///
/// Returns `(indptr, perm)`: the entries of row `r` are
/// `perm[indptr[r]..indptr[r + 1]]`, in their original order.
pub(crate) fn group_by_row(num_rows: usize, row: &[NodeId]) -> (Vec<usize>, Vec<usize>) {
    let mut indptr = vec![0usize; num_rows + 1];
    for &r in row {
        indptr[r + 1] += 1;
    }
    for i in 0..num_rows {
        indptr[i + 1] += indptr[i];
    }
    let mut next = indptr[..num_rows].to_vec();
    let mut perm = vec![0usize; row.len()];
    for (pos, &r) in row.iter().enumerate() {
        perm[next[r]] = pos;
        next[r] += 1;
    }
    (indptr, perm)
}

/// Row-major access to any layout: CSR directly, COO through a transient
/// row index. Entries of a row are addressed by their rank `j` in backing
/// order.
#[derive(Debug)]
pub(crate) struct RowView<'a> {
    num_rows: usize,
    num_cols: usize,
    indptr: Cow<'a, [usize]>,
    perm: Option<Vec<usize>>,
    cols: &'a [NodeId],
    data: &'a [EdgeId],
}

impl<'a> RowView<'a> {
    pub(crate) fn from_csr(m: &'a Csr) -> Self {
        Self {
            num_rows: m.num_rows,
            num_cols: m.num_cols,
            indptr: Cow::Borrowed(&m.indptr[..]),
            perm: None,
            cols: &m.indices,
            data: &m.data,
        }
    }

    /// Builds the row index in O(nnz); `m` itself is left untouched.
    pub(crate) fn from_coo(m: &'a Coo) -> Self {
        let (indptr, perm) = group_by_row(m.num_rows, &m.row);
        Self {
            num_rows: m.num_rows,
            num_cols: m.num_cols,
            indptr: Cow::Owned(indptr),
            perm: Some(perm),
            cols: &m.col,
            data: &m.data,
        }
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub(crate) fn num_cols(&self) -> usize {
        self.num_cols
    }

    #[inline]
    pub(crate) fn degree(&self, row: NodeId) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }

    #[inline]
    fn position(&self, row: NodeId, j: usize) -> usize {
        let p = self.indptr[row] + j;
        match &self.perm {
            Some(perm) => perm[p],
            None => p,
        }
    }

    /// `(col, eid)` of the `j`-th entry of `row`.
    #[inline]
    pub(crate) fn entry(&self, row: NodeId, j: usize) -> (NodeId, EdgeId) {
        let pos = self.position(row, j);
        (self.cols[pos], self.data[pos])
    }

    #[inline]
    pub(crate) fn edge_id(&self, row: NodeId, j: usize) -> EdgeId {
        self.data[self.position(row, j)]
    }

    /// Every entry of every query row, in query order.
    pub(crate) fn gather_all(&self, rows: &[NodeId]) -> Coo {
        let total: usize = rows.iter().map(|&r| self.degree(r)).sum();
        let mut out_row = Vec::with_capacity(total);
        let mut out_col = Vec::with_capacity(total);
        let mut out_data = Vec::with_capacity(total);
        for &r in rows {
            for j in 0..self.degree(r) {
                let (c, e) = self.entry(r, j);
                out_row.push(r);
                out_col.push(c);
                out_data.push(e);
            }
        }
        Coo::from_parts(self.num_rows, self.num_cols, out_row, out_col, out_data)
    }
}
