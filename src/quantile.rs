//! # Streaming Quantile Estimator
//!
//! A merging t-digest: observations land in a fixed-size buffer which is
//! periodically folded into a sorted list of weighted centroids. Centroid
//! sizes follow the arcsine scale function `k(q) = δ/2π · asin(2q - 1)`: a
//! centroid may only span one unit of `k`, so centroids near the tails stay
//! small (often singletons) and the interior compresses hard. The centroid
//! count is at most about `δ` and the buffer is `5δ`, independent of stream
//! length.
//!
//! ```text
//! update(v) ──► buffer ──(full)──► sort + merge ──► centroids [(mean, weight)]
//!                                                     │
//! quantile(p) ◄── interpolate between centroid centers ┘
//! ```
//!
//! Accuracy: exact for the extreme quantiles (`p = 0`, `p = 1` return the
//! observed min and max), and within a few percent of rank in the interior.

use std::borrow::Cow;
use std::f64::consts::PI;

use crate::{Error, Result};

/// Default compression (δ). Larger keeps more centroids and more accuracy.
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// Buffered observations per centroid budget before a merge is forced.
const BUFFER_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Centroid {
    mean: f64,
    weight: f64,
}

impl Centroid {
    fn absorb(&mut self, other: Centroid) {
        let total = self.weight + other.weight;
        self.mean += (other.mean - self.mean) * other.weight / total;
        self.weight = total;
    }
}

/// Bounded-memory approximate percentile estimator.
#[derive(Debug, Clone)]
pub struct QuantileEstimator {
    compression: f64,
    centroids: Vec<Centroid>,
    buffer: Vec<f64>,
    buffer_cap: usize,
    count: u64,
    min: f64,
    max: f64,
}

impl Default for QuantileEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantileEstimator {
    pub fn new() -> Self {
        Self::with_compression(DEFAULT_COMPRESSION)
    }

    /// Compression below 10 is raised to 10.
    pub fn with_compression(compression: f64) -> Self {
        let compression = if compression.is_finite() { compression.max(10.0) } else { DEFAULT_COMPRESSION };
        let buffer_cap = (compression * BUFFER_FACTOR).ceil() as usize;
        Self {
            compression,
            centroids: Vec::new(),
            buffer: Vec::with_capacity(buffer_cap),
            buffer_cap,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Ingest one observation. Non-finite values are ignored.
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.buffer.push(value);
        if self.buffer.len() >= self.buffer_cap {
            self.centroids = merge(&self.centroids, &self.buffer, self.count, self.compression);
            self.buffer.clear();
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    /// Number of centroids currently held (after folding the buffer).
    pub fn centroid_count(&self) -> usize {
        self.folded().len()
    }

    /// Estimate the `p`-th quantile, `p` in `[0, 1]`.
    pub fn quantile(&self, p: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidPercentile(p * 100.0));
        }
        if self.is_empty() {
            return Err(Error::EmptyQuantileQuery);
        }
        if p == 0.0 {
            return Ok(self.min);
        }
        if p == 1.0 {
            return Ok(self.max);
        }

        let centroids = self.folded();
        if centroids.len() == 1 {
            return Ok(centroids[0].mean);
        }

        let total = self.count as f64;
        let target = p * total;

        // Centers sit at cumulative weight + half of own weight.
        let first = centroids[0];
        if target < first.weight / 2.0 {
            return Ok(lerp(self.min, first.mean, target / (first.weight / 2.0)));
        }

        let mut cumulative = 0.0;
        for pair in centroids.windows(2) {
            let (left, right) = (pair[0], pair[1]);
            let left_center = cumulative + left.weight / 2.0;
            let right_center = cumulative + left.weight + right.weight / 2.0;
            if target < right_center {
                let t = (target - left_center) / (right_center - left_center);
                return Ok(lerp(left.mean, right.mean, t.clamp(0.0, 1.0)));
            }
            cumulative += left.weight;
        }

        let last = centroids[centroids.len() - 1];
        let last_center = total - last.weight / 2.0;
        let t = (target - last_center) / (last.weight / 2.0);
        Ok(lerp(last.mean, self.max, t.clamp(0.0, 1.0)))
    }

    /// Centroids with any pending buffer folded in.
    fn folded(&self) -> Cow<'_, [Centroid]> {
        if self.buffer.is_empty() {
            Cow::Borrowed(&self.centroids)
        } else {
            Cow::Owned(merge(&self.centroids, &self.buffer, self.count, self.compression))
        }
    }
}

/// Linear interpolation, never leaving `[a, b]` to rounding.
#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (a + (b - a) * t).clamp(a.min(b), a.max(b))
}

fn merge(existing: &[Centroid], pending: &[f64], count: u64, compression: f64) -> Vec<Centroid> {
    let mut all: Vec<Centroid> = Vec::with_capacity(existing.len() + pending.len());
    all.extend_from_slice(existing);
    all.extend(pending.iter().map(|&mean| Centroid { mean, weight: 1.0 }));
    all.sort_by(|a, b| a.mean.total_cmp(&b.mean));

    let total = count as f64;
    let mut merged = Vec::with_capacity(compression as usize + 1);
    let mut iter = all.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };
    let mut weight_before = 0.0;
    let mut k_left = scale(0.0, compression);

    for next in iter {
        let proposed = current.weight + next.weight;
        let q_right = (weight_before + proposed) / total;
        if scale(q_right, compression) - k_left <= 1.0 {
            current.absorb(next);
        } else {
            weight_before += current.weight;
            k_left = scale(weight_before / total, compression);
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);
    merged
}

/// Arcsine scale function: maps rank `q` to centroid-index space.
#[inline]
fn scale(q: f64, compression: f64) -> f64 {
    compression / (2.0 * PI) * (2.0 * q - 1.0).clamp(-1.0, 1.0).asin()
}
