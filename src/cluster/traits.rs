use super::bisect::Bisection;
use super::fit::CentroidFit;
use crate::error::Result;

/// Common interface for centroid-based clustering estimators.
pub trait Clusterer {
    /// Fit the model and return the final partition together with its centers.
    fn fit(&self, data: &[Vec<f32>]) -> Result<CentroidFit>;

    /// Fit the model and return one cluster label per input point.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    /// Upper bound on the number of clusters a fit can produce.
    ///
    /// For fixed-k algorithms this is exactly `k`.
    fn max_clusters(&self) -> usize;
}

/// Tightens the centroid of a single cluster.
///
/// `points` are the cluster's current members and `initial` its current centroid.
/// Implementations must return a finite vector of the same dimensionality; anything
/// else aborts the enclosing fit.
pub trait Refiner: Send + Sync {
    /// Return the refined centroid.
    fn refine(&self, points: &[&[f32]], initial: &[f32]) -> Result<Vec<f32>>;
}

/// Decides whether a cluster is better modeled as two sub-clusters than one.
pub trait SplitTest: Send + Sync {
    /// Return `true` when `points` should be split at the given significance level.
    fn should_split(&self, points: &[&[f32]], significance_level: f64) -> Result<bool>;

    /// Decide given the bisection the clusterer will apply on a `true` verdict.
    ///
    /// `candidate` is `None` when the points have no spread to split along. Tests
    /// that judge a specific split override this to look at `candidate` instead of
    /// bisecting again; the default ignores it and calls [`SplitTest::should_split`].
    fn should_split_into(
        &self,
        points: &[&[f32]],
        candidate: Option<&Bisection>,
        significance_level: f64,
    ) -> Result<bool> {
        let _ = candidate;
        self.should_split(points, significance_level)
    }
}
