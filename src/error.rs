//! Error type shared by every sampling entry point.
//!
//! All of these are raised before any kernel runs: a call either produces a
//! complete subgraph or fails without partial output.

use crate::sparse::SparseFormat;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("{what}: expected one entry per {per} type ({expected}), got {got}")]
    ShapeMismatch {
        what: &'static str,
        per: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{what} is missing an entry for type {ty}")]
    MissingType { what: &'static str, ty: usize },
    #[error("invalid edge direction {0:?}: must be \"in\" or \"out\"")]
    InvalidDirection(String),
    #[error("invalid fanout {0}: must be -1, 0 or positive")]
    InvalidFanout(i64),
    #[error("vertex {id} out of range for vertex type {vtype} ({count} vertices)")]
    VertexOutOfRange {
        vtype: usize,
        id: usize,
        count: usize,
    },
    #[error("row {row} out of range ({num_rows} rows)")]
    RowOutOfRange { row: usize, num_rows: usize },
    #[error("invalid weights: {0}")]
    InvalidWeight(String),
    #[error("invalid tag offsets: {0}")]
    InvalidTagOffsets(String),
    #[error("sparse format unavailable for edge type {etype}: {reason}")]
    FormatUnavailable { etype: usize, reason: String },
    #[error("cannot sample {dir} edges on a {format:?} matrix")]
    IncompatibleFormat {
        dir: &'static str,
        format: SparseFormat,
    },
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}
