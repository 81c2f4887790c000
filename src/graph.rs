//! Heterogeneous graph container and per-relation format accessor.
//!
//! A [`HeteroGraph`] owns one relation per edge type. Each relation caches up
//! to three layouts (COO / CSR / CSC) in `OnceLock` cells: a layout is built
//! from whichever one exists the first time it is requested, and the cache is
//! safe to fill from concurrent readers. Sampling never mutates a graph beyond
//! this cache.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::{Error, Result};
use crate::sparse::{Adjacency, Coo, Csc, Csr, FormatMask, RowView, SparseFormat};
use crate::types::EdgeDir;
use crate::{EdgeId, NodeId};

/// Vertex-type count plus the `(src_type, dst_type)` endpoints of each edge type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaGraph {
    num_vertex_types: usize,
    edge_types: Vec<(usize, usize)>,
}

impl MetaGraph {
    pub fn new(num_vertex_types: usize, edge_types: Vec<(usize, usize)>) -> Result<Self> {
        if let Some(&(s, d)) = edge_types
            .iter()
            .find(|(s, d)| *s >= num_vertex_types || *d >= num_vertex_types)
        {
            return Err(Error::InvalidGraph(format!(
                "edge type ({s}, {d}) references a vertex type >= {num_vertex_types}"
            )));
        }
        Ok(Self {
            num_vertex_types,
            edge_types,
        })
    }

    pub fn num_vertex_types(&self) -> usize {
        self.num_vertex_types
    }

    pub fn num_edge_types(&self) -> usize {
        self.edge_types.len()
    }

    /// `(src_type, dst_type)` of `etype`.
    pub fn find_edge(&self, etype: usize) -> (usize, usize) {
        self.edge_types[etype]
    }
}

#[derive(Debug, Clone)]
struct Relation {
    num_src: usize,
    num_dst: usize,
    num_edges: usize,
    id_space: usize,
    allowed: FormatMask,
    coo: OnceLock<Arc<Coo>>,
    csr: OnceLock<Arc<Csr>>,
    csc: OnceLock<Arc<Csc>>,
}

impl Relation {
    fn new(adj: Adjacency, id_space: usize) -> Self {
        let (num_src, num_dst) = match &adj {
            Adjacency::Coo(m) => (m.num_rows(), m.num_cols()),
            Adjacency::Csr(m) => (m.num_rows(), m.num_cols()),
            Adjacency::Csc(m) => (m.num_rows(), m.num_cols()),
        };
        let rel = Self {
            num_src,
            num_dst,
            num_edges: adj.nnz(),
            id_space,
            allowed: FormatMask::ALL,
            coo: OnceLock::new(),
            csr: OnceLock::new(),
            csc: OnceLock::new(),
        };
        match adj {
            Adjacency::Coo(m) => {
                rel.coo.get_or_init(|| m);
            }
            Adjacency::Csr(m) => {
                rel.csr.get_or_init(|| m);
            }
            Adjacency::Csc(m) => {
                rel.csc.get_or_init(|| m);
            }
        }
        rel
    }

    fn created(&self) -> FormatMask {
        let mut mask = FormatMask::NONE;
        if self.coo.get().is_some() {
            mask = mask | FormatMask::COO;
        }
        if self.csr.get().is_some() {
            mask = mask | FormatMask::CSR;
        }
        if self.csc.get().is_some() {
            mask = mask | FormatMask::CSC;
        }
        mask
    }

    /// Any created layout, preferring the one that converts most cheaply.
    fn any(&self) -> Adjacency {
        if let Some(m) = self.coo.get() {
            Adjacency::Coo(Arc::clone(m))
        } else if let Some(m) = self.csr.get() {
            Adjacency::Csr(Arc::clone(m))
        } else if let Some(m) = self.csc.get() {
            Adjacency::Csc(Arc::clone(m))
        } else {
            unreachable!("relation constructed without a layout")
        }
    }
}

/// `(src, dst, id)` triples of a set of edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeArray {
    pub src: Vec<NodeId>,
    pub dst: Vec<NodeId>,
    pub id: Vec<EdgeId>,
}

impl EdgeArray {
    fn from_coo(coo: &Coo) -> Self {
        Self {
            src: coo.row().to_vec(),
            dst: coo.col().to_vec(),
            id: coo.data().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// Adjacency of one edge type, oriented so that rows are the seed side.
#[derive(Debug)]
pub(crate) enum Oriented {
    /// Row-major relation; rows are sources.
    Csr(Arc<Csr>),
    /// Column-major relation; rows of the inner CSR are destinations.
    Csc(Arc<Csc>),
    /// COO, already transposed when `transposed` is set.
    Coo { coo: Coo, transposed: bool },
}

impl Oriented {
    pub(crate) fn transposed(&self) -> bool {
        match self {
            Self::Csr(_) => false,
            Self::Csc(_) => true,
            Self::Coo { transposed, .. } => *transposed,
        }
    }

    pub(crate) fn view(&self) -> RowView<'_> {
        match self {
            Self::Csr(m) => RowView::from_csr(m),
            Self::Csc(m) => RowView::from_csr(m.as_transposed_csr()),
            Self::Coo { coo, .. } => RowView::from_coo(coo),
        }
    }

    /// Every incident edge of `seeds`, in `(src, dst)` orientation.
    pub(crate) fn incident(&self, seeds: &[NodeId]) -> Coo {
        let coo = self.view().gather_all(seeds);
        if self.transposed() {
            coo.transpose()
        } else {
            coo
        }
    }
}

/// A graph with any number of vertex and edge types.
#[derive(Debug, Clone)]
pub struct HeteroGraph {
    meta: Arc<MetaGraph>,
    num_vertices: Vec<usize>,
    relations: Vec<Relation>,
}

impl HeteroGraph {
    /// One relation per edge type of `meta`, in edge-type order. Edge ids of
    /// each relation must lie in `0..nnz`.
    pub fn new(
        meta: Arc<MetaGraph>,
        num_vertices: Vec<usize>,
        relations: Vec<Adjacency>,
    ) -> Result<Self> {
        let mut rels = Vec::with_capacity(relations.len());
        for adj in relations {
            let nnz = adj.nnz();
            let ids_ok = match &adj {
                Adjacency::Coo(m) => m.data().iter().all(|&e| e < nnz),
                Adjacency::Csr(m) => m.data().iter().all(|&e| e < nnz),
                Adjacency::Csc(m) => m.as_transposed_csr().data().iter().all(|&e| e < nnz),
            };
            if !ids_ok {
                return Err(Error::InvalidGraph(format!(
                    "edge type {}: edge ids must be < {nnz}",
                    rels.len()
                )));
            }
            rels.push(Relation::new(adj, nnz));
        }
        Self::from_relations(meta, num_vertices, rels)
    }

    /// Single vertex type, single edge type, built from an edge list.
    pub fn homogeneous(num_nodes: usize, src: Vec<NodeId>, dst: Vec<NodeId>) -> Result<Self> {
        let meta = Arc::new(MetaGraph::new(1, vec![(0, 0)])?);
        let coo = Coo::new(num_nodes, num_nodes, src, dst)?;
        Self::new(meta, vec![num_nodes], vec![Adjacency::Coo(Arc::new(coo))])
    }

    /// Two vertex types and one edge type from the first to the second.
    pub fn bipartite(
        num_src: usize,
        num_dst: usize,
        src: Vec<NodeId>,
        dst: Vec<NodeId>,
    ) -> Result<Self> {
        let meta = Arc::new(MetaGraph::new(2, vec![(0, 1)])?);
        let coo = Coo::new(num_src, num_dst, src, dst)?;
        Self::new(meta, vec![num_src, num_dst], vec![Adjacency::Coo(Arc::new(coo))])
    }

    fn from_relations(
        meta: Arc<MetaGraph>,
        num_vertices: Vec<usize>,
        relations: Vec<Relation>,
    ) -> Result<Self> {
        if num_vertices.len() != meta.num_vertex_types() {
            return Err(Error::InvalidGraph(format!(
                "{} vertex counts for {} vertex types",
                num_vertices.len(),
                meta.num_vertex_types()
            )));
        }
        if relations.len() != meta.num_edge_types() {
            return Err(Error::InvalidGraph(format!(
                "{} relations for {} edge types",
                relations.len(),
                meta.num_edge_types()
            )));
        }
        for (etype, rel) in relations.iter().enumerate() {
            let (s, d) = meta.find_edge(etype);
            if rel.num_src != num_vertices[s] || rel.num_dst != num_vertices[d] {
                return Err(Error::InvalidGraph(format!(
                    "edge type {etype} is {}x{}, expected {}x{}",
                    rel.num_src, rel.num_dst, num_vertices[s], num_vertices[d]
                )));
            }
        }
        Ok(Self {
            meta,
            num_vertices,
            relations,
        })
    }

    /// Assemble a graph from per-type COO relations that share this graph's
    /// shape. Edge-id spaces are inherited, not recomputed.
    pub(crate) fn with_coo_relations(&self, coos: Vec<Coo>) -> Result<Self> {
        let relations = coos
            .into_iter()
            .zip(&self.relations)
            .map(|(coo, parent)| Relation::new(Adjacency::Coo(Arc::new(coo)), parent.id_space))
            .collect();
        Self::from_relations(Arc::clone(&self.meta), self.num_vertices.clone(), relations)
    }

    /// Restrict which layouts may be built on demand, for every edge type.
    /// Layouts that already exist stay usable.
    pub fn with_allowed_formats(mut self, allowed: FormatMask) -> Self {
        for rel in &mut self.relations {
            rel.allowed = allowed | rel.created();
        }
        self
    }

    pub fn meta_graph(&self) -> &Arc<MetaGraph> {
        &self.meta
    }

    pub fn num_vertex_types(&self) -> usize {
        self.meta.num_vertex_types()
    }

    pub fn num_edge_types(&self) -> usize {
        self.meta.num_edge_types()
    }

    pub fn num_vertices(&self, vtype: usize) -> usize {
        self.num_vertices[vtype]
    }

    pub fn num_vertices_per_type(&self) -> &[usize] {
        &self.num_vertices
    }

    pub fn num_edges(&self, etype: usize) -> usize {
        self.relations[etype].num_edges
    }

    /// Length that per-edge arrays (weights) indexed by edge id must have.
    /// Equals `num_edges` except on graphs derived by edge exclusion, which
    /// keep the original ids.
    pub fn edge_id_space(&self, etype: usize) -> usize {
        self.relations[etype].id_space
    }

    fn relation(&self, etype: usize) -> Result<&Relation> {
        self.relations
            .get(etype)
            .ok_or_else(|| Error::InvalidGraph(format!("edge type {etype} out of range")))
    }

    pub fn created_formats(&self, etype: usize) -> Result<FormatMask> {
        Ok(self.relation(etype)?.created())
    }

    pub fn allowed_formats(&self, etype: usize) -> Result<FormatMask> {
        Ok(self.relation(etype)?.allowed)
    }

    /// Pick the layout to query for `etype`:
    /// a created preferred layout, else a created COO, else a preferred layout
    /// that may be built, else whatever is created.
    pub fn select_format(&self, etype: usize, preferred: FormatMask) -> Result<SparseFormat> {
        let rel = self.relation(etype)?;
        let created = rel.created();
        let common = preferred.intersect(rel.allowed);
        common
            .intersect(created)
            .first()
            .or_else(|| created.contains(SparseFormat::Coo).then_some(SparseFormat::Coo))
            .or_else(|| common.first())
            .or_else(|| created.first())
            .ok_or_else(|| Error::FormatUnavailable {
                etype,
                reason: "no layout created".into(),
            })
    }

    fn check_allowed(&self, etype: usize, rel: &Relation, format: SparseFormat) -> Result<()> {
        if rel.allowed.contains(format) {
            Ok(())
        } else {
            Err(Error::FormatUnavailable {
                etype,
                reason: format!("{format:?} is neither created nor allowed"),
            })
        }
    }

    pub fn coo(&self, etype: usize) -> Result<Arc<Coo>> {
        let rel = self.relation(etype)?;
        if let Some(m) = rel.coo.get() {
            return Ok(Arc::clone(m));
        }
        self.check_allowed(etype, rel, SparseFormat::Coo)?;
        let built = rel.any().to_coo();
        debug!(etype, nnz = built.nnz(), "materialized COO");
        Ok(Arc::clone(rel.coo.get_or_init(|| Arc::new(built))))
    }

    pub fn csr(&self, etype: usize) -> Result<Arc<Csr>> {
        let rel = self.relation(etype)?;
        if let Some(m) = rel.csr.get() {
            return Ok(Arc::clone(m));
        }
        self.check_allowed(etype, rel, SparseFormat::Csr)?;
        let built = rel.any().to_csr();
        debug!(etype, nnz = built.nnz(), "materialized CSR");
        Ok(Arc::clone(rel.csr.get_or_init(|| Arc::new(built))))
    }

    pub fn csc(&self, etype: usize) -> Result<Arc<Csc>> {
        let rel = self.relation(etype)?;
        if let Some(m) = rel.csc.get() {
            return Ok(Arc::clone(m));
        }
        self.check_allowed(etype, rel, SparseFormat::Csc)?;
        let built = rel.any().to_csc();
        debug!(etype, nnz = built.nnz(), "materialized CSC");
        Ok(Arc::clone(rel.csc.get_or_init(|| Arc::new(built))))
    }

    pub fn adjacency(&self, etype: usize, format: SparseFormat) -> Result<Adjacency> {
        Ok(match format {
            SparseFormat::Coo => Adjacency::Coo(self.coo(etype)?),
            SparseFormat::Csr => Adjacency::Csr(self.csr(etype)?),
            SparseFormat::Csc => Adjacency::Csc(self.csc(etype)?),
        })
    }

    /// The layout of `etype` to query for seeds on the `dir` side.
    pub(crate) fn oriented(&self, etype: usize, dir: EdgeDir) -> Result<(SparseFormat, Oriented)> {
        let preferred = match dir {
            EdgeDir::Out => FormatMask::CSR,
            EdgeDir::In => FormatMask::CSC,
        };
        let format = self.select_format(etype, preferred)?;
        let oriented = match (format, dir) {
            (SparseFormat::Coo, EdgeDir::Out) => Oriented::Coo {
                coo: Coo::clone(&*self.coo(etype)?),
                transposed: false,
            },
            (SparseFormat::Coo, EdgeDir::In) => Oriented::Coo {
                coo: self.coo(etype)?.transpose(),
                transposed: true,
            },
            (SparseFormat::Csr, EdgeDir::Out) => Oriented::Csr(self.csr(etype)?),
            (SparseFormat::Csc, EdgeDir::In) => Oriented::Csc(self.csc(etype)?),
            (format, dir) => {
                return Err(Error::IncompatibleFormat {
                    dir: dir.as_str(),
                    format,
                })
            }
        };
        Ok((format, oriented))
    }

    pub(crate) fn check_seeds(&self, vtype: usize, seeds: &[NodeId]) -> Result<()> {
        let count = self.num_vertices[vtype];
        match seeds.iter().find(|&&v| v >= count) {
            Some(&id) => Err(Error::VertexOutOfRange { vtype, id, count }),
            None => Ok(()),
        }
    }

    /// All edges of `etype`.
    pub fn edges(&self, etype: usize) -> Result<EdgeArray> {
        Ok(EdgeArray::from_coo(&self.relation(etype)?.any().to_coo()))
    }

    /// Edges of `etype` leaving `seeds`, grouped by seed in query order.
    pub fn out_edges(&self, etype: usize, seeds: &[NodeId]) -> Result<EdgeArray> {
        self.incident_edges(etype, seeds, EdgeDir::Out)
    }

    /// Edges of `etype` entering `seeds`, grouped by seed in query order.
    pub fn in_edges(&self, etype: usize, seeds: &[NodeId]) -> Result<EdgeArray> {
        self.incident_edges(etype, seeds, EdgeDir::In)
    }

    fn incident_edges(&self, etype: usize, seeds: &[NodeId], dir: EdgeDir) -> Result<EdgeArray> {
        let (src, dst) = self.relation(etype).map(|_| self.meta.find_edge(etype))?;
        let vtype = match dir {
            EdgeDir::Out => src,
            EdgeDir::In => dst,
        };
        self.check_seeds(vtype, seeds)?;
        let (_, oriented) = self.oriented(etype, dir)?;
        Ok(EdgeArray::from_coo(&oriented.incident(seeds)))
    }

    /// A copy of this graph without the listed edges (one list per edge type).
    ///
    /// Vertex counts and the ids of the remaining edges are unchanged; ids not
    /// present in the graph are ignored.
    pub fn exclude_edges(&self, excluded: &[&[EdgeId]]) -> Result<Self> {
        if excluded.len() != self.num_edge_types() {
            return Err(Error::ShapeMismatch {
                what: "exclude_edges",
                per: "edge",
                expected: self.num_edge_types(),
                got: excluded.len(),
            });
        }
        let mut coos = Vec::with_capacity(self.relations.len());
        for (rel, ids) in self.relations.iter().zip(excluded) {
            let coo = rel.any().to_coo();
            if ids.is_empty() {
                coos.push(coo);
                continue;
            }
            let mut drop = vec![false; rel.id_space];
            for &e in ids.iter().filter(|&&e| e < rel.id_space) {
                drop[e] = true;
            }
            let (mut row, mut col, mut data) = (Vec::new(), Vec::new(), Vec::new());
            for (r, c, e) in coo.triples().filter(|&(_, _, e)| !drop[e]) {
                row.push(r);
                col.push(c);
                data.push(e);
            }
            coos.push(Coo::from_parts(coo.num_rows(), coo.num_cols(), row, col, data));
        }
        self.with_coo_relations(coos)
    }
}

/// Output of a sampling call.
#[derive(Debug, Clone)]
pub struct HeteroSubgraph {
    /// Same metagraph and vertex counts as the source; one COO relation per
    /// edge type holding exactly the sampled edges.
    pub graph: HeteroGraph,
    /// Per edge type, the original id of every sampled edge (aligned with the
    /// relation's COO order), or `None` when nothing was requested.
    pub induced_edges: Vec<Option<Vec<EdgeId>>>,
}

impl HeteroSubgraph {
    /// Total sampled edges across all edge types.
    pub fn num_sampled_edges(&self) -> usize {
        (0..self.graph.num_edge_types())
            .map(|et| self.graph.num_edges(et))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> HeteroGraph {
        // 0 -> {1,2,3}, 2 -> 3
        HeteroGraph::homogeneous(4, vec![0, 0, 0, 2], vec![1, 2, 3, 3]).expect("valid graph")
    }

    #[test]
    fn materializes_on_demand_and_caches() {
        let g = star();
        assert_eq!(g.created_formats(0).unwrap(), FormatMask::COO);
        let a = g.csr(0).unwrap();
        let b = g.csr(0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(g.created_formats(0).unwrap(), FormatMask::COO | FormatMask::CSR);
        assert_eq!(a.degree(0), 3);
    }

    #[test]
    fn select_format_order() {
        let g = star();
        // Only COO exists: served from COO regardless of preference.
        assert_eq!(g.select_format(0, FormatMask::CSR).unwrap(), SparseFormat::Coo);

        let csr = Arc::new(g.csr(0).unwrap().as_ref().clone());
        let meta = Arc::clone(g.meta_graph());
        let only_csr = HeteroGraph::new(meta, vec![4], vec![Adjacency::Csr(csr)]).unwrap();
        assert_eq!(only_csr.select_format(0, FormatMask::CSR).unwrap(), SparseFormat::Csr);
        // CSC preferred and allowed: will be built.
        assert_eq!(only_csr.select_format(0, FormatMask::CSC).unwrap(), SparseFormat::Csc);

        let locked = only_csr.with_allowed_formats(FormatMask::NONE);
        assert_eq!(locked.select_format(0, FormatMask::CSC).unwrap(), SparseFormat::Csr);
        assert!(matches!(locked.csc(0), Err(Error::FormatUnavailable { .. })));
        assert!(matches!(
            locked.oriented(0, EdgeDir::In),
            Err(Error::IncompatibleFormat { dir: "in", format: SparseFormat::Csr })
        ));
    }

    #[test]
    fn in_and_out_edges() {
        let g = star();
        let out = g.out_edges(0, &[0]).unwrap();
        assert_eq!(out.dst, vec![1, 2, 3]);
        assert_eq!(out.id, vec![0, 1, 2]);

        let inc = g.in_edges(0, &[3]).unwrap();
        assert_eq!(inc.src, vec![0, 2]);
        assert_eq!(inc.dst, vec![3, 3]);
        assert_eq!(inc.id, vec![2, 3]);

        assert!(matches!(
            g.out_edges(0, &[9]),
            Err(Error::VertexOutOfRange { id: 9, .. })
        ));
    }

    #[test]
    fn exclusion_keeps_ids_and_shape() {
        let g = star();
        let filtered = g.exclude_edges(&[&[1, 42]]).unwrap();
        assert_eq!(filtered.num_edges(0), 3);
        assert_eq!(filtered.edge_id_space(0), 4);
        assert_eq!(filtered.num_vertices(0), 4);
        assert_eq!(filtered.edges(0).unwrap().id, vec![0, 2, 3]);
    }

    #[test]
    fn rejects_inconsistent_shapes() {
        let meta = Arc::new(MetaGraph::new(2, vec![(0, 1)]).unwrap());
        let coo = Arc::new(Coo::new(3, 3, vec![0], vec![1]).unwrap());
        assert!(HeteroGraph::new(meta, vec![3, 2], vec![Adjacency::Coo(coo)]).is_err());
        assert!(MetaGraph::new(1, vec![(0, 1)]).is_err());
        let bad_ids = Arc::new(Coo::with_edge_ids(2, 2, vec![0], vec![1], vec![5]).unwrap());
        let meta = Arc::new(MetaGraph::new(1, vec![(0, 0)]).unwrap());
        assert!(HeteroGraph::new(meta, vec![2], vec![Adjacency::Coo(bad_ids)]).is_err());
    }
}
