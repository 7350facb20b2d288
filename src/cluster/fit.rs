use super::util;
use crate::error::{Error, Result};

/// Outcome of a clustering fit.
#[derive(Clone, Debug)]
pub struct CentroidFit {
    /// Cluster id per input point, in `[0, centers.len())`.
    pub labels: Vec<usize>,

    /// Final centroids, indexed by cluster id.
    pub centers: Vec<Vec<f32>>,

    /// Number of rounds (or Lloyd iterations, for fixed-k fits) that ran.
    pub rounds: usize,

    /// `false` when the fit stopped because it ran out of rounds.
    pub converged: bool,

    /// Number of clusters after each round. Never decreases.
    pub history: Vec<usize>,
}

impl CentroidFit {
    /// Number of clusters in the final partition.
    pub fn n_clusters(&self) -> usize {
        self.centers.len()
    }

    /// Number of points assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centers.len()];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    /// Dimensionality of the centers (`0` for an empty fit).
    pub fn dim(&self) -> usize {
        self.centers.first().map_or(0, Vec::len)
    }

    /// Nearest center for a new point (ties go to the lowest cluster id).
    ///
    /// Applied to the training points, this reproduces `labels`.
    pub fn predict(&self, point: &[f32]) -> Result<usize> {
        self.check_point(point)?;
        Ok(util::nearest(point, &self.centers))
    }

    /// Within-cluster sum of squared distances for the training `data` under `labels`.
    pub fn inertia(&self, data: &[Vec<f32>]) -> Result<f64> {
        if data.len() != self.labels.len() {
            return Err(Error::LengthMismatch {
                expected: self.labels.len(),
                found: data.len(),
            });
        }
        let mut total = 0.0;
        for (p, &l) in data.iter().zip(self.labels.iter()) {
            self.check_point(p)?;
            total += util::squared_euclidean(p, &self.centers[l]);
        }
        Ok(total)
    }

    fn check_point(&self, point: &[f32]) -> Result<()> {
        if self.centers.is_empty() {
            return Err(Error::EmptyInput);
        }
        if point.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                found: point.len(),
            });
        }
        Ok(())
    }
}
