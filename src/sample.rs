//! Categorical draws over a node's neighbor list.

use rand::Rng;

/// How a [`TransitionTable`](crate::TransitionTable) stores each distribution for drawing.
///
/// Both methods draw from the same distribution; they differ in cost and therefore
/// in which random numbers are consumed, so walks are only reproducible for a fixed
/// method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SamplingMethod {
    /// Cumulative distribution + binary search: O(log d) per draw.
    #[default]
    Cdf,
    /// Walker/Vose alias table: O(1) per draw, two random numbers.
    Alias,
}

/// A prepared categorical distribution.
#[derive(Debug, Clone)]
pub(crate) enum Draw {
    Cdf(Box<[f64]>),
    Alias { j: Box<[u32]>, q: Box<[f64]> },
}

impl Draw {
    /// `probs` must be non-empty, non-negative, and sum to 1.
    pub(crate) fn new(probs: &[f64], method: SamplingMethod) -> Self {
        match method {
            SamplingMethod::Cdf => Draw::Cdf(cdf_setup(probs)),
            SamplingMethod::Alias => {
                let (j, q) = alias_setup(probs);
                Draw::Alias { j, q }
            }
        }
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self {
            Draw::Cdf(cdf) => cdf_draw(cdf, rng),
            Draw::Alias { j, q } => alias_draw(j, q, rng),
        }
    }
}

/// Uniform index in `0..n`. `n` must be non-zero.
pub(crate) fn uniform_index<R: Rng + ?Sized>(n: usize, rng: &mut R) -> usize {
    debug_assert!(n > 0);
    if n == 1 {
        return 0;
    }
    rng.random_range(0..n)
}

fn cdf_setup(probs: &[f64]) -> Box<[f64]> {
    let mut acc = 0.0;
    let mut cdf: Vec<f64> = probs
        .iter()
        .map(|&p| {
            acc += p;
            acc
        })
        .collect();
    // Pin everything from the last non-empty bucket on, so rounding can never leave a
    // draw past it and trailing zero-weight buckets stay empty.
    if let Some(last) = probs.iter().rposition(|&p| p > 0.0) {
        cdf[last..].fill(1.0);
    }
    cdf.into_boxed_slice()
}

fn cdf_draw<R: Rng + ?Sized>(cdf: &[f64], rng: &mut R) -> usize {
    debug_assert!(!cdf.is_empty());
    if cdf.len() == 1 {
        return 0;
    }
    cdf_index(cdf, rng.random())
}

/// First bucket whose upper edge is above `r`; zero-width buckets are never chosen.
fn cdf_index(cdf: &[f64], r: f64) -> usize {
    cdf.partition_point(|&c| c <= r).min(cdf.len() - 1)
}

fn alias_setup(probs: &[f64]) -> (Box<[u32]>, Box<[f64]>) {
    // Walker (1974) / Vose (1991) alias construction, O(k).
    let k = probs.len();
    let mut q = vec![0.0f64; k];
    let mut j = vec![0u32; k];

    let mut smaller: Vec<usize> = Vec::with_capacity(k);
    let mut larger: Vec<usize> = Vec::with_capacity(k);

    for kk in 0..k {
        q[kk] = (k as f64) * probs[kk];
        if q[kk] < 1.0 {
            smaller.push(kk);
        } else {
            larger.push(kk);
        }
    }

    while let (Some(&small), Some(&large)) = (smaller.last(), larger.last()) {
        smaller.pop();
        larger.pop();
        j[small] = large as u32;
        q[large] = q[large] + q[small] - 1.0;
        if q[large] < 1.0 {
            smaller.push(large);
        } else {
            larger.push(large);
        }
    }

    // Leftovers are full buckets up to rounding error.
    for kk in smaller.into_iter().chain(larger) {
        q[kk] = 1.0;
        j[kk] = kk as u32;
    }

    (j.into_boxed_slice(), q.into_boxed_slice())
}

fn alias_draw<R: Rng + ?Sized>(j: &[u32], q: &[f64], rng: &mut R) -> usize {
    debug_assert_eq!(j.len(), q.len());
    let k = j.len();
    if k == 1 {
        return 0;
    }
    let kk = rng.random_range(0..k);
    if rng.random::<f64>() < q[kk] {
        kk
    } else {
        j[kk] as usize
    }
}
