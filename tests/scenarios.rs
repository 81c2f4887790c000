use std::collections::HashSet;
use std::sync::Arc;

use tansaku::{
    sample_neighbors, Adjacency, Coo, EdgeDir, Error, Fanout, HeteroGraph, MetaGraph,
    NeighborRequest, NeighborSampler, SamplerConfig,
};

/// One source vertex with out-degree 5 (edge ids 0..5).
fn fan() -> HeteroGraph {
    HeteroGraph::homogeneous(6, vec![0; 5], vec![1, 2, 3, 4, 5]).unwrap()
}

fn request(fanout: i64) -> NeighborRequest {
    NeighborRequest::new(vec![vec![0]], vec![Fanout::try_from(fanout).unwrap()], EdgeDir::Out)
}

#[test]
fn fanout_three_picks_three_distinct_edges() {
    let g = fan();
    for seed in 0..20 {
        let sub = NeighborSampler::new()
            .with_seed(seed)
            .sample_neighbors(&g, &request(3))
            .unwrap();
        let ids = sub.induced_edges[0].clone().unwrap();
        assert_eq!(ids.len(), 3);
        let distinct: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), 3);
        assert!(distinct.is_subset(&HashSet::from([0, 1, 2, 3, 4])));
    }
}

#[test]
fn fanout_minus_one_takes_every_edge() {
    let sub = sample_neighbors(&fan(), &request(-1)).unwrap();
    let mut ids = sub.induced_edges[0].clone().unwrap();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    let edges = sub.graph.edges(0).unwrap();
    assert!(edges.src.iter().all(|&s| s == 0));
    let mut dst = edges.dst;
    dst.sort_unstable();
    assert_eq!(dst, vec![1, 2, 3, 4, 5]);
}

#[test]
fn fanout_zero_keeps_shape_but_samples_nothing() {
    let g = fan();
    let sub = sample_neighbors(&g, &request(0)).unwrap();
    assert_eq!(sub.num_sampled_edges(), 0);
    assert_eq!(sub.induced_edges, vec![None]);
    assert_eq!(sub.graph.num_vertices_per_type(), g.num_vertices_per_type());
    assert_eq!(sub.graph.num_edge_types(), 1);
}

#[test]
fn direction_strings_parse_or_fail() {
    assert_eq!("outgoing".parse::<EdgeDir>().unwrap(), EdgeDir::Out);
    assert_eq!("in".parse::<EdgeDir>().unwrap(), EdgeDir::In);
    assert!(matches!(
        "sideways".parse::<EdgeDir>(),
        Err(Error::InvalidDirection(d)) if d == "sideways"
    ));
    assert!(matches!(Fanout::try_from(-3i64), Err(Error::InvalidFanout(-3))));
}

/// Authors (3) write papers (4); papers cite papers.
fn bibliography() -> HeteroGraph {
    let meta = Arc::new(MetaGraph::new(2, vec![(0, 1), (1, 1)]).unwrap());
    let writes = Coo::new(3, 4, vec![0, 0, 1, 2, 2], vec![0, 1, 1, 2, 3]).unwrap();
    let cites = Coo::new(4, 4, vec![1, 2, 3, 3], vec![0, 0, 1, 2]).unwrap();
    HeteroGraph::new(
        meta,
        vec![3, 4],
        vec![Adjacency::Coo(Arc::new(writes)), Adjacency::Coo(Arc::new(cites))],
    )
    .unwrap()
}

#[test]
fn incoming_sampling_on_a_heterogeneous_graph() {
    let g = bibliography();
    // Who wrote paper 1, and who cites papers 0 and 1?
    let req = NeighborRequest::new(
        vec![vec![], vec![0, 1]],
        vec![Fanout::All, Fanout::Count(1)],
        EdgeDir::In,
    );
    let sub = NeighborSampler::new().with_seed(3).sample_neighbors(&g, &req).unwrap();

    let writes = sub.graph.edges(0).unwrap();
    let mut authors = writes.src.clone();
    authors.sort_unstable();
    // Paper 0 by author 0, paper 1 by authors 0 and 1.
    assert_eq!(authors, vec![0, 0, 1]);
    assert!(writes.dst.iter().all(|&p| p == 0 || p == 1));

    let cites = sub.graph.edges(1).unwrap();
    assert_eq!(cites.len(), 2);
    let mut dst = cites.dst.clone();
    dst.sort_unstable();
    assert_eq!(dst, vec![0, 1]);
    assert_eq!(sub.graph.num_vertices_per_type(), &[3, 4]);
}

#[test]
fn seeds_are_per_vertex_type() {
    let g = bibliography();
    // Out from author 2 only: cites gets no paper seeds.
    let fanouts = vec![Fanout::All, Fanout::All];
    let req = NeighborRequest::new(vec![vec![2], vec![]], fanouts, EdgeDir::Out);
    let sub = sample_neighbors(&g, &req).unwrap();
    assert_eq!(sub.induced_edges, vec![Some(vec![3, 4]), None]);
}

#[test]
fn sequential_and_parallel_configs_agree() {
    let n = 2_000;
    let src: Vec<usize> = (0..n * 4).map(|i| i % n).collect();
    let dst: Vec<usize> = (0..n * 4).map(|i| (i * 7 + 3) % n).collect();
    let g = HeteroGraph::homogeneous(n, src, dst).unwrap();
    let seeds: Vec<usize> = (0..n).collect();
    let req = NeighborRequest::new(vec![seeds], vec![Fanout::Count(2)], EdgeDir::Out);

    let seq = SamplerConfig {
        seed: Some(11),
        parallel: false,
        ..SamplerConfig::default()
    };
    let par = SamplerConfig {
        parallel: true,
        min_parallel_rows: 1,
        ..seq
    };
    let a = NeighborSampler::new().with_config(seq).sample_neighbors(&g, &req).unwrap();
    let b = NeighborSampler::new().with_config(par).sample_neighbors(&g, &req).unwrap();
    assert_eq!(a.induced_edges, b.induced_edges);
    assert_eq!(a.num_sampled_edges(), 2 * n);
}
