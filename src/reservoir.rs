//! Reservoir sampling.
//!
//! Maintains a uniform sample of size `k` from a stream of unknown length.
//! The row-wise kernels stream a row's entry ranks through these samplers to
//! pick entries without replacement.
//!
//! Uses **Algorithm L** (Li, 1994) for the uniform case.
//! Instead of generating a random number for every item (Algorithm R),
//! we compute the number of items to *skip* before the next replacement.
//! This reduces complexity from O(N) RNG calls to O(k * (1 + log(N/k))).
//!
//! ## References
//!
//! - Vitter (1985): reservoir sampling “Algorithm R”.
//! - Li (1994): reservoir sampling “Algorithm L” (skip-based).
//! - Efraimidis & Spirakis (2006): weighted reservoir sampling (A-Res).
//!
//! Notes:
//! - Samplers are reusable: `reset` clears state but keeps allocations, so a
//!   kernel can keep one per worker and feed it row after row.

use rand::prelude::*;

/// A reservoir sampler that maintains a uniform sample of size `k` from a stream.
///
/// Uses **Algorithm L** (Li, 1994) for O(k(1 + log(N/k))) complexity.
#[derive(Debug, Clone)]
pub struct ReservoirSampler<T> {
    k: usize,
    seen: usize,
    samples: Vec<T>,
    skip_counter: usize,
    w: f64,
}

impl<T> ReservoirSampler<T> {
    /// Create a new sampler that keeps at most `k` samples.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seen: 0,
            samples: Vec::with_capacity(k),
            skip_counter: 0,
            w: 0.0, // Initialized when reservoir fills
        }
    }

    /// Start a new stream with capacity `k`, keeping the buffer.
    pub fn reset(&mut self, k: usize) {
        self.k = k;
        self.seen = 0;
        self.samples.clear();
        self.skip_counter = 0;
        self.w = 0.0;
    }

    /// Add an item from the stream.
    ///
    /// If `k == 0`, this discards all items.
    #[inline]
    pub fn add_with_rng<R: Rng + ?Sized>(&mut self, item: T, rng: &mut R) {
        self.seen += 1;

        if self.k == 0 {
            return;
        }

        // Phase 1: Filling the reservoir
        if self.samples.len() < self.k {
            self.samples.push(item);

            if self.samples.len() == self.k {
                // Initial weight for Algorithm L: W = exp(log(u) / k)
                self.w = (rng.random::<f64>().ln() / self.k as f64).exp();
                self.update_skip(rng);
            }
            return;
        }

        // Phase 2: Algorithm L (skip items)
        if self.skip_counter > 0 {
            self.skip_counter -= 1;
            return;
        }

        let replace_idx = rng.random_range(0..self.k);
        self.samples[replace_idx] = item;

        self.w *= (rng.random::<f64>().ln() / self.k as f64).exp();
        self.update_skip(rng);
    }

    /// Update the skip counter using Li's formula.
    ///
    /// S = floor(log(U) / log(1 - W)), U ~ Uniform(0,1).
    fn update_skip<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let u = rng.random::<f64>();
        // Avoid log(0) if w=1 (unlikely) or u=0
        let denom = (1.0 - self.w).max(1e-10).ln();
        let num = u.max(1e-10).ln();
        let skip = (num / denom).floor();
        self.skip_counter = skip as usize;
    }

    /// Get the current sample (size ≤ k).
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Number of items observed so far.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl<T> Default for ReservoirSampler<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Errors for weighted reservoir sampling.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightedReservoirError {
    #[error("weight must be finite (got {0})")]
    NonFiniteWeight(f64),
    #[error("weight must be >= 0 (got {0})")]
    NegativeWeight(f64),
}

/// A weighted reservoir sampler (Efraimidis–Spirakis, A-Res).
///
/// Each item with weight `w_i` gets a key `u^(1/w_i)` where `u ~ Uniform(0,1)`;
/// the top-k keys are kept. Keys are compared in log space (`ln(u) / w_i`),
/// which preserves the order and does not underflow for tiny weights.
///
/// Zero-weight items are counted as seen but can never enter the sample.
#[derive(Debug, Clone)]
pub struct WeightedReservoirSampler<T> {
    k: usize,
    seen: usize,
    items: Vec<T>,
    keys: Vec<f64>,
    min_idx: usize,
}

impl<T> WeightedReservoirSampler<T> {
    /// Create a new sampler that keeps at most `k` items.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seen: 0,
            items: Vec::with_capacity(k),
            keys: Vec::with_capacity(k),
            min_idx: 0,
        }
    }

    /// Start a new stream with capacity `k`, keeping the buffers.
    pub fn reset(&mut self, k: usize) {
        self.k = k;
        self.seen = 0;
        self.items.clear();
        self.keys.clear();
        self.min_idx = 0;
    }

    /// Add a weighted item using a caller-supplied RNG.
    #[inline]
    pub fn add_with_rng<R: Rng + ?Sized>(
        &mut self,
        item: T,
        weight: f64,
        rng: &mut R,
    ) -> Result<(), WeightedReservoirError> {
        self.seen += 1;

        if !weight.is_finite() {
            return Err(WeightedReservoirError::NonFiniteWeight(weight));
        }
        if weight < 0.0 {
            return Err(WeightedReservoirError::NegativeWeight(weight));
        }
        if self.k == 0 || weight == 0.0 {
            return Ok(());
        }

        let u = rng.random::<f64>().max(f64::MIN_POSITIVE);
        let key = u.ln() / weight;

        if self.items.len() < self.k {
            self.items.push(item);
            self.keys.push(key);
            if self.items.len() == self.k {
                self.refresh_min();
            }
            return Ok(());
        }

        if key > self.keys[self.min_idx] {
            self.items[self.min_idx] = item;
            self.keys[self.min_idx] = key;
            self.refresh_min();
        }

        Ok(())
    }

    fn refresh_min(&mut self) {
        let mut min_idx = 0usize;
        let mut min_key = self.keys[0];
        for (i, &k_i) in self.keys.iter().enumerate().skip(1) {
            if k_i < min_key {
                min_key = k_i;
                min_idx = i;
            }
        }
        self.min_idx = min_idx;
    }

    /// Get the current sample (size ≤ k).
    pub fn samples(&self) -> &[T] {
        &self.items
    }

    /// Keys for diagnostics/benchmarking.
    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    /// Number of items observed so far.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

impl<T> Default for WeightedReservoirSampler<T> {
    fn default() -> Self {
        Self::new(0)
    }
}
