use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tansaku::reservoir::{ReservoirSampler, WeightedReservoirSampler};
use tansaku::{
    coo_rowwise_sampling, csr_rowwise_sampling, csr_rowwise_topk, Csr, EdgeDir, Fanout, HeteroGraph,
    KernelConfig, NeighborRequest, NeighborSampler,
};

/// `n` vertices, each with `deg` out-edges to pseudo-random targets.
fn random_graph(n: usize, deg: usize) -> HeteroGraph {
    let src: Vec<usize> = (0..n * deg).map(|i| i / deg).collect();
    let dst: Vec<usize> = (0..n * deg).map(|i| (i.wrapping_mul(2654435761) >> 7) % n).collect();
    HeteroGraph::homogeneous(n, src, dst).expect("valid graph")
}

fn bench_reservoir_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("reservoir");

    // Algorithm L should be fast even for large N
    let sizes = [1_000, 10_000, 100_000];
    let k = 100;

    for &size in &sizes {
        group.bench_function(format!("alg_l_n{}_k{}", size, k), |b| {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let mut sampler = ReservoirSampler::new(k);
            b.iter(|| {
                sampler.reset(k);
                for i in 0..size {
                    sampler.add_with_rng(black_box(i), &mut rng);
                }
                black_box(sampler.samples());
            })
        });
    }
    group.finish();
}

fn bench_weighted_reservoir(c: &mut Criterion) {
    let mut group = c.benchmark_group("weighted_reservoir");

    let sizes = [1_000, 10_000, 100_000];
    let k = 100;

    for &size in &sizes {
        group.bench_function(format!("a_res_n{}_k{}", size, k), |b| {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let mut sampler = WeightedReservoirSampler::new(k);
            b.iter(|| {
                sampler.reset(k);
                for i in 0..size {
                    if sampler.add_with_rng(black_box(i), 1.0, &mut rng).is_err() {
                        return;
                    }
                }
                black_box(sampler.samples());
            })
        });
    }
    group.finish();
}

fn bench_rowwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("rowwise");
    let g = random_graph(10_000, 32);
    let csr: Csr = g.csr(0).expect("csr").as_ref().clone();
    let coo = g.coo(0).expect("coo");
    let rows: Vec<usize> = (0..10_000).step_by(3).collect();
    let weights: Vec<f32> = (0..csr.nnz()).map(|e| (e % 7) as f32 + 0.5).collect();
    let cfg = KernelConfig::new(5);

    for &fanout in &[5usize, 25] {
        group.bench_function(format!("csr_uniform_f{}", fanout), |b| {
            b.iter(|| csr_rowwise_sampling(&csr, black_box(&rows), fanout, None, false, &cfg))
        });
        group.bench_function(format!("csr_uniform_replace_f{}", fanout), |b| {
            b.iter(|| csr_rowwise_sampling(&csr, black_box(&rows), fanout, None, true, &cfg))
        });
        group.bench_function(format!("csr_weighted_f{}", fanout), |b| {
            b.iter(|| {
                csr_rowwise_sampling(&csr, black_box(&rows), fanout, Some(&weights), false, &cfg)
            })
        });
        group.bench_function(format!("csr_alias_f{}", fanout), |b| {
            b.iter(|| {
                csr_rowwise_sampling(&csr, black_box(&rows), fanout, Some(&weights), true, &cfg)
            })
        });
        group.bench_function(format!("coo_uniform_f{}", fanout), |b| {
            b.iter(|| coo_rowwise_sampling(&coo, black_box(&rows), fanout, None, false, &cfg))
        });
        group.bench_function(format!("csr_topk_k{}", fanout), |b| {
            b.iter(|| csr_rowwise_topk(&csr, black_box(&rows), fanout, &weights, false, &cfg))
        });
    }
    group.finish();
}

fn bench_sample_neighbors(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_neighbors");
    let g = random_graph(50_000, 16);
    let seeds: Vec<usize> = (0..50_000).step_by(5).collect();
    let sampler = NeighborSampler::new().with_seed(1);
    // Build both compressed layouts up front so the loop measures sampling only.
    g.csr(0).expect("csr");
    g.csc(0).expect("csc");

    for dir in [EdgeDir::Out, EdgeDir::In] {
        let req = NeighborRequest::new(vec![seeds.clone()], vec![Fanout::Count(10)], dir);
        group.bench_function(format!("homogeneous_{}", dir), |b| {
            b.iter(|| sampler.sample_neighbors(&g, black_box(&req)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_reservoir_sampling,
    bench_weighted_reservoir,
    bench_rowwise,
    bench_sample_neighbors
);
criterion_main!(benches);
