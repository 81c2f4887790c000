//! Weighted sampling vs top-k on a small "who follows whom" graph.
//!
//! Weighted sampling without replacement (A-Res) prefers heavy edges but still
//! gives light ones a chance; top-k always returns the same heaviest edges.

use tansaku::{EdgeDir, Fanout, HeteroGraph, NeighborRequest, NeighborSampler, TopkRequest};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Vertex 0 follows 1..=10; edge weights decay like interaction counts do.
    let n = 11;
    let src = vec![0; 10];
    let dst: Vec<usize> = (1..=10).collect();
    let weights: Vec<f32> = (0..10).map(|i| 1.0 / (1.0 + i as f32).powf(1.3)).collect();
    let g = HeteroGraph::homogeneous(n, src, dst)?;

    let k = 3;
    let seeds = vec![vec![0]];

    let fanouts = vec![Fanout::Count(k)];
    let topk =
        TopkRequest::new(seeds.clone(), fanouts.clone(), EdgeDir::Out, vec![weights.clone()]);
    let top = NeighborSampler::new().sample_neighbors_topk(&g, &topk)?;

    println!("weights:");
    for (e, w) in weights.iter().enumerate() {
        println!("  edge {e:2}  w={w:.4}");
    }
    println!();
    println!("top-{k} edges:          {:?}", top.induced_edges[0]);

    let req = NeighborRequest::new(seeds, fanouts, EdgeDir::Out).with_weights(vec![weights]);
    for seed in 0..5 {
        let sub = NeighborSampler::new().with_seed(seed).sample_neighbors(&g, &req)?;
        println!("weighted (seed {seed}):    {:?}", sub.induced_edges[0]);
    }

    Ok(())
}
