//! K-means: k-means++ seeding followed by Lloyd iterations.
//!
//! Besides the fixed-k [`Kmeans`] estimator, this module owns the Lloyd routine that
//! the adaptive clusterers reuse: the [`Lloyd`] refiner runs it on a single cluster,
//! and bisection runs it with two centroids to polish a split.

use rand::prelude::*;
use tracing::debug;

use super::fit::CentroidFit;
use super::traits::{Clusterer, Refiner};
use super::util;
use crate::error::{Error, Result};

/// K-means clustering with a fixed number of clusters.
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    max_iter: usize,
    tol: f32,
    seed: Option<u64>,
}

impl Kmeans {
    /// Create a k-means clusterer for `k` clusters.
    ///
    /// Defaults: `max_iter = 300`, `tol = 1e-4`, unseeded.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            seed: None,
        }
    }

    /// Set the maximum number of Lloyd iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Stop once no centroid moves farther than `tol`.
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }

    /// Seed the k-means++ initialization for reproducible fits.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Clusterer for Kmeans {
    fn fit(&self, data: &[Vec<f32>]) -> Result<CentroidFit> {
        util::validate_data(data)?;
        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be at least 1",
            });
        }
        if self.k > data.len() {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: data.len(),
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1",
            });
        }

        let points: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let init = kmeans_plus_plus(&points, self.k, rng.as_mut());
        let run = lloyd(&points, init, self.max_iter, self.tol);

        debug!(
            k = self.k,
            iterations = run.iterations,
            converged = run.converged,
            "kmeans fit complete"
        );

        Ok(CentroidFit {
            labels: run.labels,
            centers: run.centers,
            rounds: run.iterations,
            converged: run.converged,
            history: vec![self.k; run.iterations],
        })
    }

    fn max_clusters(&self) -> usize {
        self.k
    }
}

/// Lloyd refinement of a single cluster's centroid.
///
/// With one centroid Lloyd's update is the member mean; the iteration cap and
/// tolerance bound the work independently of the outer round count.
#[derive(Debug, Clone)]
pub struct Lloyd {
    max_iter: usize,
    tol: f32,
}

impl Lloyd {
    /// Create a refiner with `max_iter = 100` and `tol = 1e-4`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of Lloyd iterations per refinement.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the centroid-shift tolerance.
    pub fn with_tol(mut self, tol: f32) -> Self {
        self.tol = tol;
        self
    }
}

impl Default for Lloyd {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-4,
        }
    }
}

impl Refiner for Lloyd {
    fn refine(&self, points: &[&[f32]], initial: &[f32]) -> Result<Vec<f32>> {
        if points.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iter",
                message: "must be at least 1",
            });
        }
        let run = lloyd(points, vec![initial.to_vec()], self.max_iter, self.tol);
        Ok(run.centers.into_iter().next().unwrap_or_else(|| initial.to_vec()))
    }
}

pub(crate) struct LloydRun {
    pub(crate) centers: Vec<Vec<f32>>,
    pub(crate) labels: Vec<usize>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

/// Lloyd iterations from `centers` until the largest shift is at most `tol`.
///
/// Empty clusters keep their previous centroid. The returned labels are the
/// assignment against the returned centers.
pub(crate) fn lloyd(
    points: &[&[f32]],
    mut centers: Vec<Vec<f32>>,
    max_iter: usize,
    tol: f32,
) -> LloydRun {
    let k = centers.len();
    let dim = centers.first().map_or(0, Vec::len);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        iterations += 1;
        let labels = util::assign(points, &centers);

        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];
        for (p, &l) in points.iter().zip(labels.iter()) {
            counts[l] += 1;
            for (s, &x) in sums[l].iter_mut().zip(p.iter()) {
                *s += f64::from(x);
            }
        }

        let mut max_shift = 0.0f64;
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let n = counts[c] as f64;
            let updated: Vec<f32> = sums[c].iter().map(|s| (s / n) as f32).collect();
            max_shift = max_shift.max(util::squared_euclidean(&updated, &centers[c]).sqrt());
            centers[c] = updated;
        }

        if max_shift <= f64::from(tol) {
            converged = true;
            break;
        }
    }

    let labels = util::assign(points, &centers);
    LloydRun {
        centers,
        labels,
        iterations,
        converged,
    }
}

/// k-means++ seeding: first center uniformly, then proportional to squared distance.
fn kmeans_plus_plus(points: &[&[f32]], k: usize, rng: &mut dyn RngCore) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut centers: Vec<Vec<f32>> = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..n)].to_vec());

    let mut d2: Vec<f64> = points
        .iter()
        .map(|p| util::squared_euclidean(p, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total <= 0.0 {
            // Every point coincides with a chosen center.
            rng.random_range(0..n)
        } else {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &w) in d2.iter().enumerate() {
                if target < w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        };

        let c = points[next].to_vec();
        for (w, p) in d2.iter_mut().zip(points.iter()) {
            *w = w.min(util::squared_euclidean(p, &c));
        }
        centers.push(c);
    }
    centers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_groups() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.2, 0.0],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
            vec![9.9, 10.2],
        ]
    }

    #[test]
    fn kmeans_two_clusters() {
        let data = two_groups();
        let fit = Kmeans::new(2).with_seed(42).fit(&data).unwrap();

        assert_eq!(fit.labels.len(), 6);
        assert_eq!(fit.labels[0], fit.labels[1]);
        assert_eq!(fit.labels[0], fit.labels[2]);
        assert_eq!(fit.labels[3], fit.labels[4]);
        assert_ne!(fit.labels[0], fit.labels[3]);
        assert!(fit.converged);
    }

    #[test]
    fn kmeans_seed_is_reproducible() {
        let data = two_groups();
        let a = Kmeans::new(3).with_seed(7).fit(&data).unwrap();
        let b = Kmeans::new(3).with_seed(7).fit(&data).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.centers, b.centers);
    }

    #[test]
    fn kmeans_invalid_params() {
        let data = two_groups();
        assert!(Kmeans::new(0).fit(&data).is_err());
        assert!(matches!(
            Kmeans::new(7).fit(&data),
            Err(Error::InvalidClusterCount {
                requested: 7,
                n_items: 6
            })
        ));
        assert!(Kmeans::new(2).with_max_iter(0).fit(&data).is_err());
        assert!(Kmeans::new(1).fit(&[]).is_err());
    }

    #[test]
    fn kmeans_identical_points() {
        let data = vec![vec![1.0, 1.0]; 5];
        let fit = Kmeans::new(3).with_seed(1).fit(&data).unwrap();
        assert!(fit.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn kmeans_separates_extreme_magnitudes() {
        let data: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let sign = if i < 20 { 1.0 } else { -1.0 };
                vec![sign * 1e30 * (1.0 + (i % 20) as f32 * 1e-3), 0.0]
            })
            .collect();
        let fit = Kmeans::new(2).with_seed(3).fit(&data).unwrap();

        assert!(fit.labels[..20].iter().all(|&l| l == fit.labels[0]));
        assert!(fit.labels[20..].iter().all(|&l| l == fit.labels[20]));
        assert_ne!(fit.labels[0], fit.labels[20]);
    }

    #[test]
    fn lloyd_refiner_moves_to_mean() {
        let data = [vec![0.0f32, 0.0], vec![2.0, 0.0], vec![0.0, 2.0], vec![2.0, 2.0]];
        let points: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let c = Lloyd::new().refine(&points, &[5.0, -3.0]).unwrap();
        assert!((c[0] - 1.0).abs() < 1e-6);
        assert!((c[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn lloyd_refiner_rejects_empty() {
        assert!(Lloyd::new().refine(&[], &[0.0]).is_err());
    }

    #[test]
    fn lloyd_labels_match_centers() {
        let data = two_groups();
        let points: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let run = lloyd(&points, vec![data[0].clone(), data[1].clone()], 50, 1e-6);
        assert_eq!(run.labels, util::assign(&points, &run.centers));
        assert_ne!(run.labels[0], run.labels[3]);
    }
}
