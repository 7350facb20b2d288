//! Adaptive centroid clustering: discover `k` by splitting clusters that fail a test.
//!
//! # The Algorithm
//!
//! Start from a single centroid at the dataset mean and run rounds of:
//!
//! 1. **Assignment**: every point goes to its nearest centroid (ties to the lowest id).
//! 2. **Refinement**: each cluster's centroid is tightened by a [`Refiner`] that only
//!    sees that cluster's members.
//! 3. **Split test**: each still-active cluster is bisected along its dominant
//!    direction of variance and handed, with that candidate, to a [`SplitTest`]. A
//!    cluster that should split takes the candidate: the first child keeps the
//!    parent's id and the second is appended. A cluster that should not split
//!    becomes terminal and is never tested again.
//!
//! The fit stops once a round produces no split or `k` reaches `max_clusters`.
//! Running out of rounds is a soft stop: the current state is returned with
//! [`CentroidFit::converged`] set to `false`.
//!
//! Clusters are only ever split, so `k` is non-decreasing over a fit.
//!
//! ## Per-cluster state
//!
//! ```text
//! Active --test: no split--------------------> Terminal
//! Active --test: split, room left------------> two Active children
//! Active --test: split, k == max_clusters----> Terminal
//! ```
//!
//! # Parallelism
//!
//! With the `parallel` feature, steps 2 and 3 run across clusters on the rayon pool.
//! Workers only read the round's frozen partition and return their own cluster's
//! candidate; results are merged in cluster-id order, so the outcome is identical
//! to the sequential run.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, trace};

use super::bisect::bisect;
use super::fit::CentroidFit;
use super::traits::{Clusterer, Refiner, SplitTest};
use super::util;
use crate::error::{Error, Result};

/// Parameters shared by every adaptive clusterer.
#[derive(Clone, Debug)]
pub struct AdaptiveParams {
    /// Upper bound on the number of clusters. Must be at least 1.
    pub max_clusters: usize,

    /// Significance level handed to the split test, in the open interval `(0, 1)`.
    pub significance_level: f64,

    /// Upper bound on the number of rounds. Must be at least 1.
    pub max_rounds: usize,

    /// Clusters with fewer members become terminal without being tested.
    ///
    /// The default of `1` hands every non-empty active cluster to the split test.
    pub min_split_size: usize,

    /// Lloyd iteration cap used when polishing a candidate bisection.
    pub refine_max_iter: usize,

    /// Centroid-shift tolerance used when polishing a candidate bisection.
    pub refine_tol: f32,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            max_clusters: 32,
            significance_level: 1e-4,
            max_rounds: 32,
            min_split_size: 1,
            refine_max_iter: 100,
            refine_tol: 1e-4,
        }
    }
}

impl AdaptiveParams {
    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.max_clusters == 0 {
            return Err(Error::InvalidParameter {
                name: "max_clusters",
                message: "must be at least 1",
            });
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(Error::InvalidParameter {
                name: "significance_level",
                message: "must lie strictly between 0 and 1",
            });
        }
        if self.max_rounds == 0 {
            return Err(Error::InvalidParameter {
                name: "max_rounds",
                message: "must be at least 1",
            });
        }
        if self.refine_max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "refine_max_iter",
                message: "must be at least 1",
            });
        }
        if !(self.refine_tol >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "refine_tol",
                message: "must be non-negative",
            });
        }
        Ok(())
    }
}

/// Lifecycle of one cluster within a fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterState {
    /// Will be handed to the split test next round.
    Active,
    /// Excluded from further split tests.
    Terminal,
}

/// Adaptive centroid clusterer over a pluggable refiner and split test.
///
/// ```rust
/// use splitmeans::cluster::{AdaptiveCentroids, AndersonDarling, Clusterer, Lloyd};
///
/// let mut data = Vec::new();
/// for i in 0..20 {
///     let t = i as f32 * 0.05;
///     data.push(vec![t, 0.5 - t]);
///     data.push(vec![20.0 + t, 20.5 - t]);
/// }
///
/// let model = AdaptiveCentroids::new(Lloyd::new(), AndersonDarling::new()).with_max_clusters(4);
/// let fit = model.fit(&data).unwrap();
/// assert!(fit.n_clusters() >= 2);
/// assert_ne!(fit.labels[0], fit.labels[1]);
/// ```
#[derive(Clone, Debug)]
pub struct AdaptiveCentroids<R, T> {
    params: AdaptiveParams,
    refiner: R,
    test: T,
}

enum Verdict {
    Keep,
    Terminal,
    Split(Vec<f32>, Vec<f32>),
}

struct ClusterStep {
    center: Vec<f32>,
    verdict: Verdict,
}

impl<R: Refiner, T: SplitTest> AdaptiveCentroids<R, T> {
    /// Create a clusterer with default [`AdaptiveParams`].
    ///
    /// Every non-empty active cluster is tested; use
    /// [`with_min_split_size`](Self::with_min_split_size) to skip small ones.
    pub fn new(refiner: R, test: T) -> Self {
        Self {
            params: AdaptiveParams::default(),
            refiner,
            test,
        }
    }

    /// Replace all parameters.
    pub fn with_params(mut self, params: AdaptiveParams) -> Self {
        self.params = params;
        self
    }

    /// Set the upper bound on the number of clusters.
    pub fn with_max_clusters(mut self, max_clusters: usize) -> Self {
        self.params.max_clusters = max_clusters;
        self
    }

    /// Set the significance level passed to the split test.
    pub fn with_significance_level(mut self, significance_level: f64) -> Self {
        self.params.significance_level = significance_level;
        self
    }

    /// Set the upper bound on the number of rounds.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.params.max_rounds = max_rounds;
        self
    }

    /// Set the minimum cluster size eligible for a split test.
    pub fn with_min_split_size(mut self, min_split_size: usize) -> Self {
        self.params.min_split_size = min_split_size;
        self
    }

    /// Current parameters.
    pub fn params(&self) -> &AdaptiveParams {
        &self.params
    }

    /// Refine one cluster and, if still active, decide whether it splits.
    fn step_cluster(
        &self,
        id: usize,
        points: &[&[f32]],
        members: &[usize],
        center: &[f32],
        state: ClusterState,
    ) -> Result<ClusterStep> {
        if members.is_empty() {
            trace!(cluster = id, "empty cluster, marking terminal");
            return Ok(ClusterStep {
                center: center.to_vec(),
                verdict: Verdict::Terminal,
            });
        }

        let subset: Vec<&[f32]> = members.iter().map(|&i| points[i]).collect();
        let refined = self
            .refiner
            .refine(&subset, center)
            .map_err(|e| Error::subroutine("refine", e))?;
        if refined.len() != center.len() {
            return Err(Error::subroutine(
                "refine",
                Error::DimensionMismatch {
                    expected: center.len(),
                    found: refined.len(),
                },
            ));
        }
        if refined.iter().any(|x| !x.is_finite()) {
            return Err(Error::subroutine(
                "refine",
                Error::Other("centroid has non-finite components".to_string()),
            ));
        }

        let verdict = if state == ClusterState::Terminal {
            Verdict::Keep
        } else if subset.len() < self.params.min_split_size {
            trace!(cluster = id, size = subset.len(), "too small to test");
            Verdict::Terminal
        } else {
            let candidate = bisect(&subset, self.params.refine_max_iter, self.params.refine_tol);
            let split = self
                .test
                .should_split_into(&subset, candidate.as_ref(), self.params.significance_level)
                .map_err(|e| Error::subroutine("split_test", e))?;
            trace!(cluster = id, size = subset.len(), split, "split test");
            match (split, candidate) {
                (true, Some(b)) => Verdict::Split(b.left, b.right),
                (true, None) => {
                    trace!(cluster = id, "bisection found no spread");
                    Verdict::Terminal
                }
                (false, _) => Verdict::Terminal,
            }
        };

        Ok(ClusterStep {
            center: refined,
            verdict,
        })
    }
}

impl<R: Refiner, T: SplitTest> Clusterer for AdaptiveCentroids<R, T> {
    fn fit(&self, data: &[Vec<f32>]) -> Result<CentroidFit> {
        let dim = util::validate_data(data)?;
        self.params.validate()?;
        let max_clusters = self.params.max_clusters;

        let points: Vec<&[f32]> = data.iter().map(Vec::as_slice).collect();
        let mut centers = vec![util::to_f32(&util::mean(&points, dim))];
        let mut states = vec![ClusterState::Active];
        let mut history = Vec::new();
        let mut rounds = 0;
        let mut converged = false;

        while rounds < self.params.max_rounds {
            rounds += 1;
            let labels = util::assign(&points, &centers);
            let members = util::members(&labels, centers.len());

            #[cfg(feature = "parallel")]
            let steps: Vec<ClusterStep> = (0..centers.len())
                .into_par_iter()
                .map(|id| self.step_cluster(id, &points, &members[id], &centers[id], states[id]))
                .collect::<Result<_>>()?;
            #[cfg(not(feature = "parallel"))]
            let steps: Vec<ClusterStep> = (0..centers.len())
                .map(|id| self.step_cluster(id, &points, &members[id], &centers[id], states[id]))
                .collect::<Result<_>>()?;

            let mut splits = 0;
            for (id, step) in steps.into_iter().enumerate() {
                centers[id] = step.center;
                match step.verdict {
                    Verdict::Keep => {}
                    Verdict::Terminal => states[id] = ClusterState::Terminal,
                    Verdict::Split(left, right) => {
                        if centers.len() >= max_clusters {
                            trace!(cluster = id, "split would exceed max_clusters");
                            states[id] = ClusterState::Terminal;
                            continue;
                        }
                        centers[id] = left;
                        centers.push(right);
                        states.push(ClusterState::Active);
                        splits += 1;
                    }
                }
            }
            history.push(centers.len());

            let terminal = states
                .iter()
                .filter(|&&s| s == ClusterState::Terminal)
                .count();
            debug!(round = rounds, k = centers.len(), splits, terminal, "round complete");

            if splits == 0 || centers.len() == max_clusters {
                converged = true;
                break;
            }
        }

        let labels = util::assign(&points, &centers);
        if converged {
            info!(rounds, k = centers.len(), "adaptive fit converged");
        } else {
            info!(rounds, k = centers.len(), "adaptive fit stopped at round limit");
        }

        Ok(CentroidFit {
            labels,
            centers,
            rounds,
            converged,
            history,
        })
    }

    fn max_clusters(&self) -> usize {
        self.params.max_clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::bisect::Bisection;
    use crate::cluster::kmeans::Lloyd;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Split every cluster larger than `threshold`, counting calls.
    struct SizeTest {
        threshold: usize,
        calls: AtomicUsize,
    }

    impl SizeTest {
        fn new(threshold: usize) -> Self {
            Self {
                threshold,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SplitTest for SizeTest {
        fn should_split(&self, points: &[&[f32]], _significance_level: f64) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(points.len() > self.threshold)
        }
    }

    /// Split whenever a candidate exists, remembering every candidate seen.
    #[derive(Default)]
    struct RecordingTest {
        seen: Mutex<Vec<(Vec<f32>, Vec<f32>)>>,
    }

    impl SplitTest for RecordingTest {
        fn should_split(&self, _points: &[&[f32]], _significance_level: f64) -> Result<bool> {
            Ok(true)
        }

        fn should_split_into(
            &self,
            _points: &[&[f32]],
            candidate: Option<&Bisection>,
            _significance_level: f64,
        ) -> Result<bool> {
            let Some(b) = candidate else {
                return Ok(false);
            };
            self.seen
                .lock()
                .unwrap()
                .push((b.left.clone(), b.right.clone()));
            Ok(true)
        }
    }

    struct FailingTest;

    impl SplitTest for FailingTest {
        fn should_split(&self, _points: &[&[f32]], _significance_level: f64) -> Result<bool> {
            Err(Error::Other("test exploded".into()))
        }
    }

    struct FailingRefiner;

    impl Refiner for FailingRefiner {
        fn refine(&self, _points: &[&[f32]], _initial: &[f32]) -> Result<Vec<f32>> {
            Err(Error::Other("refiner exploded".into()))
        }
    }

    struct NanRefiner;

    impl Refiner for NanRefiner {
        fn refine(&self, _points: &[&[f32]], initial: &[f32]) -> Result<Vec<f32>> {
            Ok(vec![f32::NAN; initial.len()])
        }
    }

    struct ShortRefiner;

    impl Refiner for ShortRefiner {
        fn refine(&self, _points: &[&[f32]], _initial: &[f32]) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }
    }

    /// Two groups of 50 points on small grids around (0, 0) and (20, 20).
    fn two_groups() -> Vec<Vec<f32>> {
        let mut data = Vec::new();
        for base in [0.0f32, 20.0] {
            for i in 0..50 {
                data.push(vec![base + (i % 10) as f32 * 0.1, base + (i / 10) as f32 * 0.1]);
            }
        }
        data
    }

    #[test]
    fn splits_then_stops() {
        let data = two_groups();
        let test = SizeTest::new(60);
        let model = AdaptiveCentroids::new(Lloyd::new(), test).with_max_clusters(10);
        let fit = model.fit(&data).unwrap();

        assert_eq!(fit.n_clusters(), 2);
        assert!(fit.converged);
        assert_eq!(fit.rounds, 2);
        assert_eq!(fit.history, vec![2, 2]);
        assert_eq!(fit.cluster_sizes(), vec![50, 50]);
        // Root once, then each child once; terminal children are not re-tested.
        assert_eq!(model.test.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn never_split_gives_one_cluster() {
        let data = two_groups();
        let model = AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(usize::MAX));
        let fit = model.fit(&data).unwrap();

        assert_eq!(fit.n_clusters(), 1);
        assert!(fit.labels.iter().all(|&l| l == 0));
        assert_eq!(fit.rounds, 1);
        assert!(fit.converged);
    }

    #[test]
    fn max_clusters_caps_splits() {
        let data = two_groups();
        let model = AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(0))
            .with_min_split_size(2)
            .with_max_clusters(5);
        let fit = model.fit(&data).unwrap();

        assert_eq!(fit.n_clusters(), 5);
        assert!(fit.converged);
        assert!(fit.history.windows(2).all(|w| w[0] <= w[1]));
        assert!(fit.labels.iter().all(|&l| l < 5));
    }

    #[test]
    fn max_clusters_one_never_splits() {
        let data = two_groups();
        let model =
            AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(0)).with_max_clusters(1);
        let fit = model.fit(&data).unwrap();
        assert_eq!(fit.n_clusters(), 1);
        assert!(fit.converged);
    }

    #[test]
    fn round_limit_is_soft() {
        let data = two_groups();
        let model = AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(0))
            .with_min_split_size(2)
            .with_max_clusters(50)
            .with_max_rounds(2);
        let fit = model.fit(&data).unwrap();

        assert!(!fit.converged);
        assert_eq!(fit.rounds, 2);
        assert_eq!(fit.history, vec![2, 4]);
    }

    #[test]
    fn small_clusters_are_not_tested() {
        let data = two_groups();
        let test = SizeTest::new(0);
        let model = AdaptiveCentroids::new(Lloyd::new(), test).with_min_split_size(1000);
        let fit = model.fit(&data).unwrap();

        assert_eq!(fit.n_clusters(), 1);
        assert_eq!(model.test.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_params_test_small_clusters() {
        let data: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32, 0.0]).collect();
        let model = AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(usize::MAX));
        let fit = model.fit(&data).unwrap();

        assert_eq!(fit.n_clusters(), 1);
        assert_eq!(model.test.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn applies_the_tested_bisection() {
        let data = two_groups();
        let model = AdaptiveCentroids::new(Lloyd::new(), RecordingTest::default())
            .with_max_clusters(2);
        let fit = model.fit(&data).unwrap();

        let seen = model.test.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(fit.centers, vec![seen[0].0.clone(), seen[0].1.clone()]);
    }

    #[test]
    fn identical_points_cannot_split() {
        let data = vec![vec![2.0, 2.0]; 20];
        let model = AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(0));
        let fit = model.fit(&data).unwrap();
        assert_eq!(fit.n_clusters(), 1);
        assert!(fit.converged);
    }

    #[test]
    fn split_test_failure_aborts() {
        let model = AdaptiveCentroids::new(Lloyd::new(), FailingTest);
        let err = model.fit(&two_groups()).unwrap_err();
        assert!(err.is_subroutine());
        assert!(matches!(
            err,
            Error::Subroutine {
                stage: "split_test",
                ..
            }
        ));
    }

    #[test]
    fn refiner_failure_aborts() {
        let model = AdaptiveCentroids::new(FailingRefiner, SizeTest::new(0));
        let err = model.fit(&two_groups()).unwrap_err();
        match err {
            Error::Subroutine { stage, source } => {
                assert_eq!(stage, "refine");
                assert!(matches!(*source, Error::Other(ref msg) if msg == "refiner exploded"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_refiner_output_aborts() {
        let data = two_groups();
        let nan = AdaptiveCentroids::new(NanRefiner, SizeTest::new(0));
        assert!(nan.fit(&data).unwrap_err().is_subroutine());

        let short = AdaptiveCentroids::new(ShortRefiner, SizeTest::new(0));
        assert!(matches!(
            short.fit(&data),
            Err(Error::Subroutine { source, .. })
                if matches!(*source, Error::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn invalid_parameters() {
        let data = two_groups();
        let base = || AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(0));

        for model in [
            base().with_max_clusters(0),
            base().with_max_rounds(0),
            base().with_significance_level(0.0),
            base().with_significance_level(1.0),
            base().with_significance_level(f64::NAN),
        ] {
            let err = model.fit(&data).unwrap_err();
            assert!(err.is_invalid_input(), "unexpected error: {err}");
        }
    }

    #[test]
    fn invalid_data() {
        let model = AdaptiveCentroids::new(Lloyd::new(), SizeTest::new(0));
        assert!(matches!(model.fit(&[]), Err(Error::EmptyInput)));
        assert!(matches!(
            model.fit(&[vec![0.0, 0.0], vec![1.0]]),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
