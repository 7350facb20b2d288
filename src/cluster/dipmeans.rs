//! Dip-means: split clusters that look multimodal from their members' viewpoints.
//!
//! # The Algorithm (Kalogeratos & Likas, 2012)
//!
//! Every member of a cluster acts as a *viewer* and looks at the distribution of its
//! distances to the other members. A single dense group gives a unimodal distance
//! distribution from every viewpoint; two groups give viewers one mode for their
//! own group and another for the rest.
//!
//! Unimodality is checked with Hartigan's dip test. The dip is the largest gap
//! between the empirical CDF and the closest unimodal CDF, so it lies in
//! `[1/(2n), 1/4]`. Its p-value is estimated from the dips of uniform samples of
//! the same size, the uniform being the least favourable unimodal null. A viewer
//! whose p-value falls below the significance level is a *split viewer*, and the
//! cluster splits when the share of split viewers exceeds
//! `split_viewers_threshold`.
//!
//! The test is quadratic in the cluster size.
//!
//! ## References
//!
//! Kalogeratos, A., Likas, A. (2012). "Dip-means: an incremental clustering method
//! for estimating the number of clusters." NIPS 25.
//!
//! Hartigan, J. A., Hartigan, P. M. (1985). "The Dip Test of Unimodality."
//! Annals of Statistics 13(1), 70-84.

use rand::prelude::*;

use super::adaptive::{AdaptiveCentroids, AdaptiveParams};
use super::fit::CentroidFit;
use super::kmeans::Lloyd;
use super::traits::{Clusterer, SplitTest};
use super::util;
use crate::error::{Error, Result};

/// Fewer members than this never split.
const MIN_VIEWERS: usize = 4;

/// Hartigan dip test applied from every member's viewpoint.
#[derive(Debug, Clone)]
pub struct Dip {
    split_viewers_threshold: f64,
    n_boots: usize,
    seed: u64,
}

impl Dip {
    /// Create the test with `split_viewers_threshold = 0.01`, 1000 bootstrap
    /// samples, and seed `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of split viewers above which a cluster splits, in `[0, 1)`.
    pub fn with_split_viewers_threshold(mut self, threshold: f64) -> Self {
        self.split_viewers_threshold = threshold;
        self
    }

    /// Number of uniform samples used to estimate p-values.
    pub fn with_n_boots(mut self, n_boots: usize) -> Self {
        self.n_boots = n_boots;
        self
    }

    /// Seed of the bootstrap sampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.split_viewers_threshold) {
            return Err(Error::InvalidParameter {
                name: "split_viewers_threshold",
                message: "must lie in [0, 1)",
            });
        }
        if self.n_boots == 0 {
            return Err(Error::InvalidParameter {
                name: "n_boots",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Fraction of `points` whose distance distribution fails the dip test.
    pub fn split_viewer_share(&self, points: &[&[f32]], significance_level: f64) -> Result<f64> {
        self.validate()?;
        let n = points.len();
        if n < MIN_VIEWERS {
            return Ok(0.0);
        }

        let null = self.null_dips(n - 1);
        let mut distances = Vec::with_capacity(n - 1);
        let mut split_viewers = 0usize;
        for (i, viewer) in points.iter().enumerate() {
            distances.clear();
            distances.extend(
                points
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, p)| util::squared_euclidean(viewer, p).sqrt()),
            );
            let dip = dip_statistic(&mut distances);
            if bootstrap_p_value(&null, dip) < significance_level {
                split_viewers += 1;
            }
        }
        Ok(split_viewers as f64 / n as f64)
    }

    /// Sorted dips of `n_boots` uniform samples of size `m`.
    fn null_dips(&self, m: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut sample = vec![0.0f64; m];
        let mut dips: Vec<f64> = (0..self.n_boots)
            .map(|_| {
                for v in sample.iter_mut() {
                    *v = rng.random::<f64>();
                }
                dip_statistic(&mut sample)
            })
            .collect();
        dips.sort_by(|a, b| a.total_cmp(b));
        dips
    }
}

impl Default for Dip {
    fn default() -> Self {
        Self {
            split_viewers_threshold: 0.01,
            n_boots: 1000,
            seed: 0,
        }
    }
}

impl SplitTest for Dip {
    fn should_split(&self, points: &[&[f32]], significance_level: f64) -> Result<bool> {
        let share = self.split_viewer_share(points, significance_level)?;
        Ok(share > self.split_viewers_threshold)
    }
}

/// Share of `null` (sorted) at least as large as `dip`.
fn bootstrap_p_value(null: &[f64], dip: f64) -> f64 {
    let below = null.partition_point(|&d| d < dip);
    (null.len() - below) as f64 / null.len() as f64
}

/// Hartigan's dip statistic of `values`. Sorts `values` in place.
///
/// Alternates between the greatest convex minorant and the least concave majorant
/// of the empirical CDF on a shrinking modal interval `[low, high]`, as in
/// Hartigan & Hartigan's AS 217. Indices below are 1-based to follow the
/// published recurrences.
pub(crate) fn dip_statistic(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let nf = n as f64;
    if n < 2 || values[0] == values[n - 1] {
        return 1.0 / (2.0 * nf);
    }

    let mut x = Vec::with_capacity(n + 1);
    x.push(0.0);
    x.extend_from_slice(values);
    let f = |i: usize| i as f64;

    // Predecessors on the convex minorant.
    let mut mn = vec![0usize; n + 1];
    mn[1] = 1;
    for j in 2..=n {
        mn[j] = j - 1;
        loop {
            let mnj = mn[j];
            let mnmnj = mn[mnj];
            if mnj == 1
                || (x[j] - x[mnj]) * (f(mnj) - f(mnmnj)) < (x[mnj] - x[mnmnj]) * (f(j) - f(mnj))
            {
                break;
            }
            mn[j] = mnmnj;
        }
    }

    // Successors on the concave majorant.
    let mut mj = vec![0usize; n + 1];
    mj[n] = n;
    for k in (1..n).rev() {
        mj[k] = k + 1;
        loop {
            let mjk = mj[k];
            let mjmjk = mj[mjk];
            if mjk == n
                || (x[k] - x[mjk]) * (f(mjk) - f(mjmjk)) < (x[mjk] - x[mjmjk]) * (f(k) - f(mjk))
            {
                break;
            }
            mj[k] = mjmjk;
        }
    }

    let mut gcm = vec![0usize; n + 2];
    let mut lcm = vec![0usize; n + 2];
    let (mut low, mut high) = (1usize, n);
    // Measured in counts until the final division.
    let mut dip = 1.0f64;

    while low < high {
        gcm[1] = high;
        let mut i = 1;
        while gcm[i] > low {
            gcm[i + 1] = mn[gcm[i]];
            i += 1;
        }
        let l_gcm = i;
        let mut ig = l_gcm;
        let mut ix = ig - 1;

        lcm[1] = low;
        let mut i = 1;
        while lcm[i] < high {
            lcm[i + 1] = mj[lcm[i]];
            i += 1;
        }
        let l_lcm = i;
        let mut ih = l_lcm;
        let mut iv = 2;

        // Largest distance between the minorant and the majorant on [low, high].
        let mut d = 0.0f64;
        if l_gcm != 2 || l_lcm != 2 {
            loop {
                let gcmix = gcm[ix];
                let lcmiv = lcm[iv];
                if gcmix > lcmiv {
                    let gcmi1 = gcm[ix + 1];
                    let dx = (f(lcmiv) - f(gcmi1) + 1.0)
                        - (x[lcmiv] - x[gcmi1]) * (f(gcmix) - f(gcmi1)) / (x[gcmix] - x[gcmi1]);
                    iv += 1;
                    if dx >= d {
                        d = dx;
                        ig = ix + 1;
                        ih = iv - 1;
                    }
                } else {
                    let lcmiv1 = lcm[iv - 1];
                    let dx = (x[gcmix] - x[lcmiv1]) * (f(lcmiv) - f(lcmiv1))
                        / (x[lcmiv] - x[lcmiv1])
                        - (f(gcmix) - f(lcmiv1) - 1.0);
                    ix -= 1;
                    if dx >= d {
                        d = dx;
                        ig = ix + 1;
                        ih = iv;
                    }
                }
                ix = ix.max(1);
                iv = iv.min(l_lcm);
                if gcm[ix] == lcm[iv] {
                    break;
                }
            }
        } else {
            d = 1.0;
        }

        if d < dip {
            break;
        }

        let mut dip_l = 0.0f64;
        for j in ig..l_gcm {
            let (jb, je) = (gcm[j + 1], gcm[j]);
            let mut max_t = 1.0f64;
            if je - jb > 1 && x[je] != x[jb] {
                let c = f(je - jb) / (x[je] - x[jb]);
                for jj in jb..=je {
                    max_t = max_t.max(f(jj - jb + 1) - (x[jj] - x[jb]) * c);
                }
            }
            dip_l = dip_l.max(max_t);
        }

        let mut dip_u = 0.0f64;
        for j in ih..l_lcm {
            let (jb, je) = (lcm[j], lcm[j + 1]);
            let mut max_t = 1.0f64;
            if je - jb > 1 && x[je] != x[jb] {
                let c = f(je - jb) / (x[je] - x[jb]);
                for jj in jb..=je {
                    max_t = max_t.max((x[jj] - x[jb]) * c - (f(jj) - f(jb) - 1.0));
                }
            }
            dip_u = dip_u.max(max_t);
        }

        dip = dip.max(dip_l.max(dip_u));

        if low == gcm[ig] && high == lcm[ih] {
            break;
        }
        low = gcm[ig];
        high = lcm[ih];
    }

    dip / (2.0 * nf)
}

/// Dip-means: adaptive centroid clustering with the viewer-based dip test.
///
/// Defaults follow Kalogeratos & Likas: significance level `1e-3` and a 1% split
/// viewer threshold. Clusters with fewer than 8 members are not tested.
#[derive(Clone, Debug)]
pub struct DipMeans {
    inner: AdaptiveCentroids<Lloyd, Dip>,
}

impl DipMeans {
    /// Create a Dip-means clusterer with the defaults above.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dip test configuration.
    pub fn with_test(mut self, test: Dip) -> Self {
        let params = self.inner.params().clone();
        self.inner = AdaptiveCentroids::new(Lloyd::new(), test).with_params(params);
        self
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

    /// Set the significance level of each viewer's dip test.
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

impl Default for DipMeans {
    fn default() -> Self {
        Self {
            inner: AdaptiveCentroids::new(Lloyd::new(), Dip::new())
                .with_significance_level(1e-3)
                .with_min_split_size(8),
        }
    }
}

impl Clusterer for DipMeans {
    fn fit(&self, data: &[Vec<f32>]) -> Result<CentroidFit> {
        self.inner.fit(data)
    }

    fn max_clusters(&self) -> usize {
        self.inner.max_clusters()
    }
}
