//! X-means: split clusters when two centroids explain the members better than one.
//!
//! # The Algorithm (Pelleg & Moore, 2000)
//!
//! Each cluster is modeled as a spherical Gaussian. A candidate bisection yields a
//! two-component model of the same points; the cluster splits when the Bayesian
//! information criterion of the two-component model is higher:
//!
//! ```text
//! σ²  = SSE / (M (R - K))                       pooled per-dimension variance
//! ℓ   = Σ_k R_k ln(R_k / R) - (R M / 2) ln(2π σ²) - M (R - K) / 2
//! p   = (K - 1) + M K + 1                       free parameters
//! BIC = ℓ - (p / 2) ln R
//! ```
//!
//! with `R` points in `M` dimensions and `K ∈ {1, 2}` components. The mixing term
//! `Σ R_k ln(R_k / R)` costs an even split `R ln 2`.
//!
//! BIC needs no significance level; the value passed in is ignored.
//!
//! ## References
//!
//! Pelleg, D., Moore, A. (2000). "X-means: Extending K-means with Efficient
//! Estimation of the Number of Clusters." ICML 2000.

use std::f64::consts::PI;

use super::adaptive::{AdaptiveCentroids, AdaptiveParams};
use super::bisect::{bisect, Bisection};
use super::fit::CentroidFit;
use super::kmeans::Lloyd;
use super::traits::{Clusterer, SplitTest};
use super::util;
use crate::error::Result;

/// BIC comparison between one and two spherical Gaussians.
#[derive(Debug, Clone)]
pub struct Bic {
    max_iter: usize,
    tol: f32,
}

impl Bic {
    /// Create the criterion with a 100-iteration, `1e-4` tolerance candidate bisection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Lloyd iteration cap of the candidate bisection.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the centroid-shift tolerance of the candidate bisection.
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }
}

impl Default for Bic {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

impl Bic {
    /// Whether the two-centroid model of `split` has the higher BIC.
    pub fn prefers_split(&self, points: &[&[f32]], split: &Bisection) -> bool {
        let r = points.len();
        if r < 3 || split.labels.len() != r || split.labels.iter().any(|&l| l > 1) {
            return false;
        }
        let dim = points[0].len();

        let parent = util::mean(points, dim);
        let parent_sse: f64 = points.iter().map(|p| sse(p, &parent)).sum();

        let children = [
            split.left.iter().map(|&x| f64::from(x)).collect::<Vec<_>>(),
            split.right.iter().map(|&x| f64::from(x)).collect::<Vec<_>>(),
        ];
        let mut sizes = [0usize; 2];
        let mut child_sse = 0.0;
        for (p, &l) in points.iter().zip(split.labels.iter()) {
            sizes[l] += 1;
            child_sse += sse(p, &children[l]);
        }

        if parent_sse <= 0.0 {
            return false;
        }
        if child_sse <= 0.0 {
            // Two exact point masses.
            return true;
        }

        let one = bic(&[r], parent_sse, dim);
        let two = bic(&sizes, child_sse, dim);
        matches!((one, two), (Some(one), Some(two)) if two > one)
    }
}

impl SplitTest for Bic {
    fn should_split(&self, points: &[&[f32]], _significance_level: f64) -> Result<bool> {
        if points.len() < 3 {
            return Ok(false);
        }
        Ok(bisect(points, self.max_iter, self.tol).is_some_and(|b| self.prefers_split(points, &b)))
    }

    fn should_split_into(
        &self,
        points: &[&[f32]],
        candidate: Option<&Bisection>,
        _significance_level: f64,
    ) -> Result<bool> {
        Ok(candidate.is_some_and(|b| self.prefers_split(points, b)))
    }
}

fn sse(p: &[f32], c: &[f64]) -> f64 {
    p.iter()
        .zip(c.iter())
        .map(|(&x, m)| (f64::from(x) - m).powi(2))
        .sum()
}

/// BIC of `sizes.len()` spherical Gaussians sharing one variance.
///
/// `None` when there are not enough points to estimate the variance.
fn bic(sizes: &[usize], sse: f64, dim: usize) -> Option<f64> {
    let k = sizes.len();
    let r: usize = sizes.iter().sum();
    if r <= k || sse <= 0.0 {
        return None;
    }
    let (rf, kf, mf) = (r as f64, k as f64, dim as f64);
    let variance = sse / (mf * (rf - kf));

    let mixing: f64 = sizes
        .iter()
        .filter(|&&n| n > 0)
        .map(|&n| {
            let n = n as f64;
            n * (n / rf).ln()
        })
        .sum();
    let log_likelihood =
        mixing - 0.5 * rf * mf * (2.0 * PI * variance).ln() - 0.5 * mf * (rf - kf);
    let params = (kf - 1.0) + mf * kf + 1.0;
    Some(log_likelihood - 0.5 * params * rf.ln())
}

/// X-means: adaptive centroid clustering with the BIC split criterion.
///
/// Clusters with fewer than 8 members are not tested.
#[derive(Clone, Debug)]
pub struct XMeans {
    inner: AdaptiveCentroids<Lloyd, Bic>,
}

impl XMeans {
    /// Create an X-means clusterer with default [`AdaptiveParams`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all parameters.
    pub fn with_params(mut self, params: AdaptiveParams) -> Self {
        self.inner = self.inner.with_params(params);
        self
    }

    /// Set the upper bound on the number of clusters.
    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.inner = self.inner.with_max_clusters(max_clusters);
        self
    }

    /// Set the upper bound on the number of rounds.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.inner = self.inner.with_max_rounds(max_rounds);
        self
    }

    /// Current parameters.
    pub fn params(&self) -> &AdaptiveParams {
        self.inner.params()
    }
}

impl Default for XMeans {
    fn default() -> Self {
        Self {
            inner: AdaptiveCentroids::new(Lloyd::new(), Bic::new()).with_min_split_size(8),
        }
    }
}

impl Clusterer for XMeans {
    fn fit(&self, data: &[Vec<f32>]) -> Result<CentroidFit> {
        self.inner.fit(data)
    }

    fn max_clusters(&self) -> usize {
        self.inner.max_clusters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_points(data: &[Vec<f32>]) -> Vec<&[f32]> {
        data.iter().map(Vec::as_slice).collect()
    }

    #[test]
    fn splits_two_groups() {
        let data: Vec<Vec<f32>> = (0..60)
            .map(|i| {
                let offset = if i % 2 == 0 { 0.0 } else { 15.0 };
                vec![offset + (i % 7) as f32 * 0.2, offset + (i % 3) as f32 * 0.2]
            })
            .collect();
        assert!(Bic::new().should_split(&as_points(&data), 0.5).unwrap());
    }

    #[test]
    fn keeps_uniform_square() {
        let data: Vec<Vec<f32>> = (0..100)
            .map(|i| vec![(i % 10) as f32, (i / 10) as f32])
            .collect();
        assert!(!Bic::new().should_split(&as_points(&data), 0.5).unwrap());
    }

    #[test]
    fn degenerate_inputs() {
        let same = vec![vec![4.0f32, 4.0]; 12];
        assert!(!Bic::new().should_split(&as_points(&same), 0.5).unwrap());

        let mut masses = vec![vec![0.0f32, 0.0]; 6];
        masses.extend(vec![vec![1.0f32, 1.0]; 6]);
        assert!(Bic::new().should_split(&as_points(&masses), 0.5).unwrap());

        assert!(!Bic::new().should_split(&as_points(&same[..2]), 0.5).unwrap());
    }

    #[test]
    fn judges_the_given_candidate() {
        let data: Vec<Vec<f32>> = (0..60)
            .map(|i| {
                let offset = if i % 2 == 0 { 0.0 } else { 15.0 };
                vec![offset + (i % 7) as f32 * 0.2, offset + (i % 3) as f32 * 0.2]
            })
            .collect();
        let points = as_points(&data);
        let b = bisect(&points, 100, 1e-4).unwrap();

        assert!(Bic::new().should_split_into(&points, Some(&b), 0.5).unwrap());
        assert!(!Bic::new().should_split_into(&points, None, 0.5).unwrap());
        assert_eq!(XMeans::new().params().min_split_size, 8);
    }

    #[test]
    fn bic_requires_degrees_of_freedom() {
        assert!(bic(&[2, 0], 1.0, 2).is_none());
        assert!(bic(&[1], 1.0, 2).is_none());
        assert!(bic(&[10], 0.0, 2).is_none());
        assert!(bic(&[10], 5.0, 2).is_some());
    }
}
