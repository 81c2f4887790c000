//! `tansaku`: neighbor sampling over heterogeneous sparse graphs.
//!
//! Given seed vertices, draw a bounded set of incident edges per seed and edge
//! type, and return them as an induced subgraph that keeps the source graph's
//! shape plus the original id of every sampled edge. This is the sampling step
//! of mini-batch GNN training.
//!
//! Exposed modules:
//! - `sparse`: COO / CSR / CSC adjacency layouts and conversions.
//! - `graph`: heterogeneous graph container with a lazily filled layout cache.
//! - `rowwise`: per-row uniform / weighted sampling kernels.
//! - `topk`: per-row top-k by weight.
//! - `biased`: tag-stratified sampling.
//! - `neighbor`: the [`NeighborSampler`] that runs a kernel over every edge type.
//! - `reservoir`, `alias`: the sampling primitives the kernels are built on.
//!
//! ```
//! use tansaku::{EdgeDir, Fanout, HeteroGraph, NeighborRequest, NeighborSampler};
//!
//! // 0 -> 1, 0 -> 2, 0 -> 3, 1 -> 2
//! let g = HeteroGraph::homogeneous(4, vec![0, 0, 0, 1], vec![1, 2, 3, 2])?;
//! let req = NeighborRequest::new(vec![vec![0]], vec![Fanout::Count(2)], EdgeDir::Out);
//! let sub = NeighborSampler::new().with_seed(7).sample_neighbors(&g, &req)?;
//! assert_eq!(sub.num_sampled_edges(), 2);
//! # Ok::<(), tansaku::Error>(())
//! ```

#![forbid(unsafe_code)]

pub mod alias;
pub mod biased;
pub mod config;
pub mod error;
pub mod graph;
pub mod neighbor;
pub mod reservoir;
pub mod rowwise;
pub mod sparse;
pub mod topk;
pub mod types;

/// Vertex id, local to its vertex type.
pub type NodeId = usize;
/// Edge id, local to its edge type.
pub type EdgeId = usize;

pub use biased::{csr_rowwise_sampling_biased, TagOffsets};
pub use config::{KernelConfig, SamplerConfig};
pub use error::{Error, Result};
pub use graph::{EdgeArray, HeteroGraph, HeteroSubgraph, MetaGraph};
pub use neighbor::{
    sample_neighbors, sample_neighbors_biased, sample_neighbors_topk, BiasedRequest,
    NeighborRequest, NeighborSampler, TopkRequest,
};
pub use reservoir::{ReservoirSampler, WeightedReservoirSampler};
pub use rowwise::{coo_rowwise_sampling, csr_rowwise_sampling};
pub use sparse::{Adjacency, Coo, Csc, Csr, FormatMask, SparseFormat};
pub use topk::{coo_rowwise_topk, csr_rowwise_topk};
pub use types::{EdgeDir, Fanout, PerType};
