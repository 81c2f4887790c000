//! Graph neighbor sampling.
//!
//! [`NeighborSampler`] runs one sampling policy over every edge type of a
//! [`HeteroGraph`] and returns the sampled edges as a [`HeteroSubgraph`] with
//! the source's shape. Useful for GNN mini-batch training (GraphSAGE-style
//! fan-out per layer).
//!
//! Every call works in three phases:
//! 1. validate all per-type parameters (shapes, seed ranges, weights, tags);
//! 2. plan each edge type: skip it, take all incident edges, or pick a layout
//!    oriented so that rows are the seed side;
//! 3. run the kernels and assemble the subgraph.
//!
//! Nothing is sampled unless phase 1 succeeds for every edge type.

use tracing::{debug, trace};

use crate::biased::{biased_view, check_tags, TagOffsets};
use crate::config::{KernelConfig, SamplerConfig};
use crate::error::{Error, Result};
use crate::graph::{HeteroGraph, HeteroSubgraph, Oriented};
use crate::rowwise::{check_weight_values, sample_view};
use crate::sparse::{Coo, RowView, SparseFormat};
use crate::topk::topk_view;
use crate::types::{EdgeDir, Fanout, PerType};
use crate::{EdgeId, NodeId};

/// Parameters of [`NeighborSampler::sample_neighbors`].
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborRequest {
    /// Seed vertices, one list per vertex type (empty lists allowed).
    pub seeds: PerType<Vec<NodeId>>,
    /// Fanout per edge type.
    pub fanouts: PerType<Fanout>,
    pub dir: EdgeDir,
    /// Per edge type, weights indexed by edge id. An empty vector samples that
    /// edge type uniformly; `None` samples every edge type uniformly.
    pub weights: Option<PerType<Vec<f32>>>,
    /// Per edge type, edge ids that must not be sampled.
    pub exclude: Option<PerType<Vec<EdgeId>>>,
    pub replace: bool,
}

impl NeighborRequest {
    pub fn new(
        seeds: impl Into<PerType<Vec<NodeId>>>,
        fanouts: impl Into<PerType<Fanout>>,
        dir: EdgeDir,
    ) -> Self {
        Self {
            seeds: seeds.into(),
            fanouts: fanouts.into(),
            dir,
            weights: None,
            exclude: None,
            replace: false,
        }
    }

    pub fn with_weights(mut self, weights: impl Into<PerType<Vec<f32>>>) -> Self {
        self.weights = Some(weights.into());
        self
    }

    pub fn with_exclude(mut self, exclude: impl Into<PerType<Vec<EdgeId>>>) -> Self {
        self.exclude = Some(exclude.into());
        self
    }

    pub fn with_replacement(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

/// Parameters of [`NeighborSampler::sample_neighbors_topk`].
#[derive(Debug, Clone, PartialEq)]
pub struct TopkRequest {
    pub seeds: PerType<Vec<NodeId>>,
    /// `k` per edge type.
    pub k: PerType<Fanout>,
    pub dir: EdgeDir,
    /// Per edge type, weights indexed by edge id. Required for every type.
    pub weights: PerType<Vec<f32>>,
    /// Keep the smallest weights instead of the largest.
    pub ascending: bool,
}

impl TopkRequest {
    pub fn new(
        seeds: impl Into<PerType<Vec<NodeId>>>,
        k: impl Into<PerType<Fanout>>,
        dir: EdgeDir,
        weights: impl Into<PerType<Vec<f32>>>,
    ) -> Self {
        Self {
            seeds: seeds.into(),
            k: k.into(),
            dir,
            weights: weights.into(),
            ascending: false,
        }
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }
}

/// Parameters of [`NeighborSampler::sample_neighbors_biased`].
///
/// The graph has a single edge type; `seeds` are vertices of its source type
/// (outgoing) or destination type (incoming), and `tag_offsets` has one row
/// per vertex of that type.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasedRequest {
    pub seeds: Vec<NodeId>,
    pub fanout: Fanout,
    pub dir: EdgeDir,
    pub tag_offsets: TagOffsets,
    pub bias: Vec<f32>,
    pub replace: bool,
}

impl BiasedRequest {
    pub fn new(
        seeds: Vec<NodeId>,
        fanout: Fanout,
        dir: EdgeDir,
        tag_offsets: TagOffsets,
        bias: Vec<f32>,
    ) -> Self {
        Self {
            seeds,
            fanout,
            dir,
            tag_offsets,
            bias,
            replace: false,
        }
    }

    pub fn with_replacement(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

/// What to do for one edge type.
#[derive(Debug)]
enum Work {
    /// Empty placeholder relation, null induced array.
    Skip,
    /// Every incident edge of the seeds.
    All(Oriented),
    /// Run a kernel with this fanout / k.
    Kernel(Oriented, usize),
}

#[derive(Debug)]
struct Job<'a> {
    etype: usize,
    seeds: &'a [NodeId],
    work: Work,
}

/// Sampler for graph neighborhoods.
#[derive(Debug, Clone, Default)]
pub struct NeighborSampler {
    config: SamplerConfig,
}

impl NeighborSampler {
    /// Create a new neighbor sampler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Toggle rayon fan-out (only has an effect with the `parallel` feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn with_config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample up to `fanout` incident edges per seed for every edge type.
    ///
    /// Excluded edges are removed first; the remaining edges keep their ids.
    pub fn sample_neighbors(
        &self,
        graph: &HeteroGraph,
        req: &NeighborRequest,
    ) -> Result<HeteroSubgraph> {
        let num_etypes = graph.num_edge_types();
        let seeds = dense_seeds(graph, &req.seeds)?;
        let fanouts = req.fanouts.complete(num_etypes, "fanouts", "edge")?;
        let weights = match &req.weights {
            Some(w) => {
                let dense = w.complete(num_etypes, "weights", "edge")?;
                for (etype, w) in dense.iter().enumerate().filter(|(_, w)| !w.is_empty()) {
                    check_edge_weights(graph, etype, w, true)?;
                }
                Some(dense)
            }
            None => None,
        };
        let exclude = match &req.exclude {
            Some(e) => Some(e.complete(num_etypes, "exclusion lists", "edge")?),
            None => None,
        };

        debug!(
            edge_types = num_etypes,
            seeds = seeds.iter().map(|s| s.len()).sum::<usize>(),
            dir = %req.dir,
            replace = req.replace,
            weighted = weights.is_some(),
            "sample_neighbors"
        );

        let filtered;
        let graph = match exclude {
            Some(lists) if lists.iter().any(|l| !l.is_empty()) => {
                let lists: Vec<&[EdgeId]> = lists.iter().map(|l| l.as_slice()).collect();
                filtered = graph.exclude_edges(&lists)?;
                &filtered
            }
            _ => graph,
        };

        let jobs = (0..num_etypes)
            .map(|etype| plan(graph, etype, &seeds, *fanouts[etype], req.dir))
            .collect::<Result<Vec<_>>>()?;

        self.run(graph, &jobs, |job, view, fanout, config| {
            let w = weights
                .as_ref()
                .map(|w| w[job.etype].as_slice())
                .filter(|w| !w.is_empty());
            sample_view(view, job.seeds, fanout, w, req.replace, config)
        })
    }

    /// Keep the `k` incident edges with the largest (or smallest) weight per
    /// seed for every edge type.
    pub fn sample_neighbors_topk(
        &self,
        graph: &HeteroGraph,
        req: &TopkRequest,
    ) -> Result<HeteroSubgraph> {
        let num_etypes = graph.num_edge_types();
        let seeds = dense_seeds(graph, &req.seeds)?;
        let ks = req.k.complete(num_etypes, "k", "edge")?;
        let weights = req.weights.complete(num_etypes, "weights", "edge")?;
        for (etype, w) in weights.iter().enumerate() {
            check_edge_weights(graph, etype, w, false)?;
        }

        debug!(
            edge_types = num_etypes,
            seeds = seeds.iter().map(|s| s.len()).sum::<usize>(),
            dir = %req.dir,
            ascending = req.ascending,
            "sample_neighbors_topk"
        );

        let jobs = (0..num_etypes)
            .map(|etype| plan(graph, etype, &seeds, *ks[etype], req.dir))
            .collect::<Result<Vec<_>>>()?;

        self.run(graph, &jobs, |job, view, k, config| {
            topk_view(view, job.seeds, k, &weights[job.etype], req.ascending, config)
        })
    }

    /// Tag-stratified sampling on a graph with exactly one edge type.
    ///
    /// A positive fanout needs the layout queried for the direction (CSR for
    /// outgoing, CSC for incoming) to already exist on the graph: it is never
    /// built here. Fanouts `0` and `-1` take the same shortcuts as
    /// [`sample_neighbors`](Self::sample_neighbors) and work on any layout.
    pub fn sample_neighbors_biased(
        &self,
        graph: &HeteroGraph,
        req: &BiasedRequest,
    ) -> Result<HeteroSubgraph> {
        if graph.num_edge_types() != 1 {
            return Err(Error::Unsupported(
                "biased sampling only supports graphs with a single edge type",
            ));
        }
        let etype = 0;
        let (src, dst) = graph.meta_graph().find_edge(etype);
        let vtype = match req.dir {
            EdgeDir::Out => src,
            EdgeDir::In => dst,
        };
        graph.check_seeds(vtype, &req.seeds)?;

        let work = match req.fanout {
            _ if req.seeds.is_empty() || req.fanout.is_none() => Work::Skip,
            Fanout::All => Work::All(graph.oriented(etype, req.dir)?.1),
            Fanout::Count(n) => Work::Kernel(sorted_layout(graph, etype, req.dir)?, n),
        };
        if let Work::All(oriented) | Work::Kernel(oriented, _) = &work {
            check_tags(&oriented.view(), &req.seeds, &req.tag_offsets, &req.bias)?;
        }

        debug!(
            seeds = req.seeds.len(),
            dir = %req.dir,
            tags = req.bias.len(),
            replace = req.replace,
            "sample_neighbors_biased"
        );

        let jobs = [Job {
            etype,
            seeds: &req.seeds,
            work,
        }];

        self.run(graph, &jobs, |job, view, fanout, config| {
            biased_view(
                view,
                job.seeds,
                fanout,
                &req.tag_offsets,
                &req.bias,
                req.replace,
                config,
            )
        })
    }

    /// Execute planned jobs (in edge-type order) and assemble the subgraph.
    fn run<F>(&self, graph: &HeteroGraph, jobs: &[Job<'_>], kernel: F) -> Result<HeteroSubgraph>
    where
        F: Fn(&Job<'_>, &RowView<'_>, usize, &KernelConfig) -> Coo + Sync,
    {
        let seed = self.config.call_seed();
        let one = |job: &Job| -> (Coo, Option<Vec<EdgeId>>) {
            let coo = match &job.work {
                Work::Skip => {
                    let (src, dst) = graph.meta_graph().find_edge(job.etype);
                    return (Coo::empty(graph.num_vertices(src), graph.num_vertices(dst)), None);
                }
                Work::All(oriented) => oriented.incident(job.seeds),
                Work::Kernel(oriented, n) => {
                    let config = KernelConfig::from_sampler(&self.config, seed, job.etype);
                    let picked = kernel(job, &oriented.view(), *n, &config);
                    if oriented.transposed() {
                        picked.transpose()
                    } else {
                        picked
                    }
                }
            };
            trace!(etype = job.etype, sampled = coo.nnz(), "edge type sampled");
            let induced = coo.data().to_vec();
            (coo, Some(induced))
        };

        #[cfg(feature = "parallel")]
        let results: Vec<_> = if self.config.parallel && jobs.len() > 1 {
            use rayon::prelude::*;
            jobs.par_iter().map(&one).collect()
        } else {
            jobs.iter().map(&one).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<_> = jobs.iter().map(&one).collect();

        let (coos, induced_edges): (Vec<Coo>, Vec<Option<Vec<EdgeId>>>) =
            results.into_iter().unzip();
        Ok(HeteroSubgraph {
            graph: graph.with_coo_relations(coos)?,
            induced_edges,
        })
    }
}

/// Seed lists for every vertex type, each within its vertex count.
fn dense_seeds<'r>(
    graph: &HeteroGraph,
    seeds: &'r PerType<Vec<NodeId>>,
) -> Result<Vec<&'r [NodeId]>> {
    let dense = seeds.complete(graph.num_vertex_types(), "seed lists", "node")?;
    for (vtype, s) in dense.iter().enumerate() {
        graph.check_seeds(vtype, s)?;
    }
    Ok(dense.into_iter().map(Vec::as_slice).collect())
}

fn plan<'a>(
    graph: &HeteroGraph,
    etype: usize,
    seeds: &[&'a [NodeId]],
    fanout: Fanout,
    dir: EdgeDir,
) -> Result<Job<'a>> {
    let (src, dst) = graph.meta_graph().find_edge(etype);
    let seeds = match dir {
        EdgeDir::Out => seeds[src],
        EdgeDir::In => seeds[dst],
    };
    let work = if seeds.is_empty() || fanout.is_none() {
        Work::Skip
    } else {
        let (format, oriented) = graph.oriented(etype, dir)?;
        trace!(etype, ?format, %dir, "selected layout");
        match fanout {
            Fanout::All => Work::All(oriented),
            Fanout::Count(n) => Work::Kernel(oriented, n),
        }
    };
    Ok(Job { etype, seeds, work })
}

/// Length must cover the edge type's id space; values must be finite (and
/// non-negative for probabilities).
fn check_edge_weights(
    graph: &HeteroGraph,
    etype: usize,
    weights: &[f32],
    non_negative: bool,
) -> Result<()> {
    let expected = graph.edge_id_space(etype);
    if weights.len() != expected {
        return Err(Error::InvalidWeight(format!(
            "edge type {etype}: expected {expected} weights, got {}",
            weights.len()
        )));
    }
    check_weight_values(weights, non_negative)
        .map_err(|e| Error::InvalidWeight(format!("edge type {etype}: {e}")))
}

/// The CSR (outgoing) or CSC (incoming) of `etype`, only if already created.
fn sorted_layout(graph: &HeteroGraph, etype: usize, dir: EdgeDir) -> Result<Oriented> {
    let required = match dir {
        EdgeDir::Out => SparseFormat::Csr,
        EdgeDir::In => SparseFormat::Csc,
    };
    if !graph.created_formats(etype)?.contains(required) {
        return Err(Error::FormatUnavailable {
            etype,
            reason: format!("a sorted {} matrix is required", format_name(required)),
        });
    }
    Ok(match dir {
        EdgeDir::Out => Oriented::Csr(graph.csr(etype)?),
        EdgeDir::In => Oriented::Csc(graph.csc(etype)?),
    })
}

fn format_name(format: SparseFormat) -> &'static str {
    match format {
        SparseFormat::Coo => "COO",
        SparseFormat::Csr => "CSR",
        SparseFormat::Csc => "CSC",
    }
}

/// [`NeighborSampler::sample_neighbors`] with a default sampler.
pub fn sample_neighbors(graph: &HeteroGraph, req: &NeighborRequest) -> Result<HeteroSubgraph> {
    NeighborSampler::new().sample_neighbors(graph, req)
}

/// [`NeighborSampler::sample_neighbors_topk`] with a default sampler.
pub fn sample_neighbors_topk(graph: &HeteroGraph, req: &TopkRequest) -> Result<HeteroSubgraph> {
    NeighborSampler::new().sample_neighbors_topk(graph, req)
}

/// [`NeighborSampler::sample_neighbors_biased`] with a default sampler.
pub fn sample_neighbors_biased(graph: &HeteroGraph, req: &BiasedRequest) -> Result<HeteroSubgraph> {
    NeighborSampler::new().sample_neighbors_biased(graph, req)
}
