//! Walker/Vose alias tables for O(1) categorical draws with replacement.
//!
//! References:
//! - Walker (1974): An efficient method for generating discrete random variables
//!   with general distributions.
//! - Vose (1991): A linear algorithm for generating random numbers with a given distribution.
//!
//! The table is rebuilt in place for every row, so one instance per worker
//! serves a whole kernel call without reallocating.

use rand::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    q: Vec<f64>,
    j: Vec<u32>,
    smaller: Vec<u32>,
    larger: Vec<u32>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild for the given non-negative weights.
    ///
    /// Returns `false` (and leaves the table empty) when the weights sum to
    /// zero: there is nothing to draw.
    pub fn rebuild(&mut self, weights: impl ExactSizeIterator<Item = f64>) -> bool {
        let k = weights.len();
        self.q.clear();
        self.j.clear();
        self.smaller.clear();
        self.larger.clear();

        self.q.extend(weights);
        let sum: f64 = self.q.iter().sum();
        if !sum.is_finite() || sum <= 0.0 {
            self.q.clear();
            return false;
        }

        let scale = k as f64 / sum;
        self.j.resize(k, 0);
        for (i, qi) in self.q.iter_mut().enumerate() {
            *qi *= scale;
            self.j[i] = i as u32;
            if *qi < 1.0 {
                self.smaller.push(i as u32);
            } else {
                self.larger.push(i as u32);
            }
        }

        // j[i] = i, so an entry popped without a partner still draws itself.
        loop {
            let (Some(small), Some(large)) = (self.smaller.pop(), self.larger.pop()) else {
                break;
            };
            self.j[small as usize] = large;
            let ql = self.q[large as usize] + self.q[small as usize] - 1.0;
            self.q[large as usize] = ql;
            if ql < 1.0 {
                self.smaller.push(large);
            } else {
                self.larger.push(large);
            }
        }
        // Leftovers are 1.0 up to rounding.
        for &i in self.smaller.iter().chain(&self.larger) {
            self.q[i as usize] = 1.0;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Draw one index. The table must be non-empty.
    #[inline]
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        debug_assert!(!self.is_empty());
        let kk = rng.random_range(0..self.q.len());
        if rng.random::<f64>() < self.q[kk] {
            kk
        } else {
            self.j[kk] as usize
        }
    }
}
