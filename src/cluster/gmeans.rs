//! G-means: split clusters whose members do not look Gaussian.
//!
//! # The Algorithm (Hamerly & Elkan, 2003)
//!
//! G-means grows `k` by testing each cluster for normality. A candidate bisection
//! gives two child centroids `c1`, `c2`; every member is projected onto
//! `v = c1 - c2`, and the one-dimensional projections are checked with the
//! Anderson–Darling test. If normality is rejected at the significance level, the
//! cluster is split.
//!
//! ## Statistic
//!
//! With `z_(1) ≤ … ≤ z_(n)` the standardized projections and `Φ` the standard
//! normal CDF:
//!
//! ```text
//! A² = -n - (1/n) Σ (2i - 1) [ln Φ(z_(i)) + ln(1 - Φ(z_(n+1-i)))]
//! A*² = A² (1 + 0.75/n + 2.25/n²)
//! ```
//!
//! `A*²` is turned into a p-value with the piecewise approximation of
//! D'Agostino & Stephens (1986) for the case where mean and variance are estimated.
//!
//! ## References
//!
//! Hamerly, G., Elkan, C. (2003). "Learning the k in k-means." NIPS 16.

use super::adaptive::{AdaptiveCentroids, AdaptiveParams};
use super::bisect::{bisect, Bisection};
use super::fit::CentroidFit;
use super::kmeans::Lloyd;
use super::traits::{Clusterer, SplitTest};
use super::util;
use crate::error::Result;

/// Anderson–Darling normality test on the projection of a cluster onto its split axis.
#[derive(Debug, Clone)]
pub struct AndersonDarling {
    max_iter: usize,
    tol: f32,
}

impl AndersonDarling {
    /// Create the test with a 100-iteration, `1e-4` tolerance candidate bisection.
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

    /// p-value of the normality test for `points`, or `None` if it is undefined
    /// (fewer than three points, or no spread along the split axis).
    pub fn p_value(&self, points: &[&[f32]]) -> Option<f64> {
        if points.len() < 3 {
            return None;
        }
        let b = bisect(points, self.max_iter, self.tol)?;
        self.p_value_along(points, &b)
    }

    /// p-value of the normality test for `points` projected onto the axis
    /// between the two centroids of `split`.
    pub fn p_value_along(&self, points: &[&[f32]], split: &Bisection) -> Option<f64> {
        if points.len() < 3 {
            return None;
        }
        let axis: Vec<f64> = split
            .left
            .iter()
            .zip(split.right.iter())
            .map(|(l, r)| f64::from(*l) - f64::from(*r))
            .collect();
        let norm2 = util::dot(&axis, &axis);
        if norm2 <= 0.0 {
            return None;
        }

        let mut projected: Vec<f64> = points
            .iter()
            .map(|p| {
                p.iter()
                    .zip(axis.iter())
                    .map(|(&x, a)| f64::from(x) * a)
                    .sum::<f64>()
                    / norm2
            })
            .collect();
        let a2 = anderson_darling(&mut projected)?;
        Some(anderson_darling_p_value(a2))
    }
}

impl Default for AndersonDarling {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

impl SplitTest for AndersonDarling {
    fn should_split(&self, points: &[&[f32]], significance_level: f64) -> Result<bool> {
        Ok(self
            .p_value(points)
            .is_some_and(|p| p < significance_level))
    }

    fn should_split_into(
        &self,
        points: &[&[f32]],
        candidate: Option<&Bisection>,
        significance_level: f64,
    ) -> Result<bool> {
        Ok(candidate
            .and_then(|b| self.p_value_along(points, b))
            .is_some_and(|p| p < significance_level))
    }
}

/// Corrected Anderson–Darling statistic `A*²` against a normal with estimated
/// mean and variance. Sorts `values` in place.
///
/// Returns `None` for fewer than three values or zero variance.
pub(crate) fn anderson_darling(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n < 3 {
        return None;
    }
    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (nf - 1.0);
    if var <= 0.0 || !var.is_finite() {
        return None;
    }
    let sd = var.sqrt();
    for v in values.iter_mut() {
        *v = (*v - mean) / sd;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mut s = 0.0;
    for i in 0..n {
        let lower = normal_cdf(values[i]).max(f64::MIN_POSITIVE).ln();
        // 1 - Φ(z) = Φ(-z), evaluated directly to keep precision in the upper tail.
        let upper = normal_cdf(-values[n - 1 - i]).max(f64::MIN_POSITIVE).ln();
        s += (2 * i + 1) as f64 * (lower + upper);
    }
    let a2 = -nf - s / nf;
    Some(a2 * (1.0 + 0.75 / nf + 2.25 / (nf * nf)))
}

/// Upper-tail p-value for the corrected statistic `A*²`.
pub(crate) fn anderson_darling_p_value(a: f64) -> f64 {
    let p = if a >= 0.6 {
        // The fitted quadratic turns back up past its minimum near 153.
        let a = a.min(153.0);
        (1.2937 - 5.709 * a + 0.0186 * a * a).exp()
    } else if a >= 0.34 {
        (0.9177 - 4.279 * a - 1.38 * a * a).exp()
    } else if a >= 0.2 {
        1.0 - (-8.318 + 42.796 * a - 59.938 * a * a).exp()
    } else {
        1.0 - (-13.436 + 101.14 * a - 223.73 * a * a).exp()
    };
    p.clamp(0.0, 1.0)
}

/// Standard normal CDF.
pub(crate) fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Complementary error function (Chebyshev fit, relative error < 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// G-means: adaptive centroid clustering with the Anderson–Darling split test.
///
/// Defaults follow Hamerly & Elkan: significance level `1e-4`. Clusters with fewer
/// than 8 members are not tested.
#[derive(Clone, Debug)]
pub struct GMeans {
    inner: AdaptiveCentroids<Lloyd, AndersonDarling>,
}

impl GMeans {
    /// Create a G-means clusterer with default [`AdaptiveParams`].
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

    /// Set the significance level of the normality test.
    pub fn with_significance_level(mut self, significance_level: f64) -> Self {
        self.inner = self.inner.with_significance_level(significance_level);
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

impl Default for GMeans {
    fn default() -> Self {
        Self {
            inner: AdaptiveCentroids::new(Lloyd::new(), AndersonDarling::new())
                .with_min_split_size(8),
        }
    }
}

impl Clusterer for GMeans {
    fn fit(&self, data: &[Vec<f32>]) -> Result<CentroidFit> {
        self.inner.fit(data)
    }

    fn max_clusters(&self) -> usize {
        self.inner.max_clusters()
    }
}
