//! Multiscale entropy: H = (Σ_k H_k) / K
//!
//! For every chunk size `k` the snapshot is cut into consecutive,
//! non-overlapping `k`-byte chunks (a trailing partial chunk is dropped) and
//! `H_k` is the Shannon entropy, in bits, of the empirical distribution of
//! distinct chunk values. Two snapshots with the same byte histogram can
//! therefore score differently once their structure diverges at a larger scale.
//!
//! Cost is O(N²) in the snapshot length when every scale is scanned, so
//! large save files should set a chunk-size cap. A cap `K` keeps the same
//! aggregation over `k = 1..=min(K, N)`.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Scores a byte snapshot by its multiscale entropy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntropyEstimator {
    /// Largest chunk size scanned; `None` scans every scale up to the length
    max_chunk_size: Option<usize>,
}

impl EntropyEstimator {
    /// Estimator scanning every chunk size
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimator scanning chunk sizes `1..=max_chunk_size` (a cap of 0 means no cap)
    pub fn with_max_chunk_size(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: (max_chunk_size > 0).then_some(max_chunk_size),
        }
    }

    pub fn max_chunk_size(&self) -> Option<usize> {
        self.max_chunk_size
    }

    /// Number of scales aggregated for a snapshot of `len` bytes
    pub fn scales(&self, len: usize) -> usize {
        match self.max_chunk_size {
            Some(cap) => cap.min(len),
            None => len,
        }
    }

    /// Fitness score of a snapshot. Empty input scores 0.
    pub fn score(&self, data: &[u8]) -> f64 {
        let scales = self.scales(data.len());
        if scales == 0 {
            return 0.0;
        }

        // Scales run in parallel; the sum is taken in scale order so the
        // result does not depend on scheduling.
        let per_scale: Vec<f64> = (1..=scales)
            .into_par_iter()
            .map(|k| chunk_entropy(data, k))
            .collect();

        per_scale.iter().sum::<f64>() / scales as f64
    }
}

/// Shannon entropy (bits) of the distinct `k`-byte chunks of `data`.
///
/// Returns 0 when no complete chunk fits.
pub fn chunk_entropy(data: &[u8], k: usize) -> f64 {
    if k == 0 || data.len() < k {
        return 0.0;
    }

    let mut counts: HashMap<&[u8], usize> = HashMap::new();
    for chunk in data.chunks_exact(k) {
        *counts.entry(chunk).or_insert(0) += 1;
    }

    let total = (data.len() / k) as f64;
    let mut frequencies: Vec<usize> = counts.into_values().collect();
    frequencies.sort_unstable();

    frequencies
        .into_iter()
        .map(|count| {
            let p = count as f64 / total;
            p * (1.0 / p).log2()
        })
        .sum()
}
