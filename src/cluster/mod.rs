//! Centroid clustering that discovers the number of clusters.
//!
//! ## Fixed k vs. adaptive k
//!
//! **K-means** needs `k` up front: assign each point to the nearest centroid,
//! move each centroid to the mean of its points, repeat. It minimizes the
//! within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! J always drops when `k` grows, so it cannot choose `k` by itself.
//!
//! **Adaptive** clusterers start from one centroid and keep splitting clusters
//! that a statistical test says are really two. They stop when every cluster
//! passes its test, when `max_clusters` is reached, or after `max_rounds`.
//! The test is pluggable ([`SplitTest`]), as is the per-cluster centroid update
//! ([`Refiner`]); [`AdaptiveCentroids`] is generic over both.
//!
//! ## Algorithms (implemented)
//!
//! ### G-means
//!
//! Splits a cluster when its members, projected onto the candidate split axis,
//! fail an Anderson–Darling normality test. Good default when clusters are
//! roughly Gaussian but not necessarily spherical.
//!
//! ### X-means
//!
//! Splits a cluster when a two-centroid spherical Gaussian model has a better BIC
//! than a single one. No significance level to tune.
//!
//! ### Dip-means
//!
//! Splits a cluster when enough of its members see a multimodal distribution of
//! distances to the others, judged by Hartigan's dip test. Makes no Gaussian
//! assumption about cluster shape.
//!
//! ### K-means
//!
//! Fixed-k Lloyd iterations with k-means++ seeding, for when `k` is known.
//!
//! ## Usage
//!
//! ```rust
//! use splitmeans::cluster::{Clusterer, GMeans, Kmeans, XMeans};
//!
//! let mut data = Vec::new();
//! for i in 0..30 {
//!     let t = (i % 6) as f32 * 0.1;
//!     let s = (i / 6) as f32 * 0.1;
//!     data.push(vec![t, s]);
//!     data.push(vec![10.0 + t, 10.0 + s]);
//! }
//!
//! // Fixed k.
//! let labels = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
//! assert_ne!(labels[0], labels[1]);
//!
//! // k discovered from the data.
//! let fit = GMeans::new().with_max_clusters(8).fit(&data).unwrap();
//! assert!(fit.n_clusters() >= 2);
//! assert_ne!(fit.labels[0], fit.labels[1]);
//!
//! let fit = XMeans::new().with_max_clusters(8).fit(&data).unwrap();
//! assert_eq!(fit.labels.len(), data.len());
//! ```

mod adaptive;
mod bisect;
mod dipmeans;
mod fit;
mod gmeans;
mod kmeans;
mod traits;
mod util;
mod xmeans;

pub use adaptive::{AdaptiveCentroids, AdaptiveParams, ClusterState};
pub use bisect::Bisection;
pub use dipmeans::{Dip, DipMeans};
pub use fit::CentroidFit;
pub use gmeans::{AndersonDarling, GMeans};
pub use kmeans::{Kmeans, Lloyd};
pub use traits::{Clusterer, Refiner, SplitTest};
pub use xmeans::{Bic, XMeans};
