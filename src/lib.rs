//! Adaptive centroid clustering.
//!
//! `splitmeans` is a small library of centroid-based clustering estimators for dense
//! vectors that do not need the number of clusters in advance.
//!
//! The primary public API is under [`cluster`], which provides:
//! - G-means (split while clusters fail an Anderson–Darling normality test)
//! - X-means (split while BIC improves)
//! - Dip-means (split while members see multimodal distance distributions)
//! - a generic adaptive clusterer over pluggable refiners and split tests
//! - k-means (k-means++ seeding, Lloyd iterations) for a fixed `k`

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;

pub use cluster::{
    AdaptiveCentroids, AdaptiveParams, AndersonDarling, Bic, Bisection, CentroidFit,
    ClusterState, Clusterer, Dip, DipMeans, GMeans, Kmeans, Lloyd, Refiner, SplitTest, XMeans,
};
pub use error::{Error, Result};
