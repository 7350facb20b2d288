//! Deterministic two-way split of one cluster.
//!
//! Points are projected onto the cluster's dominant direction of variance and cut at
//! the mean; the two halves seed a 2-means Lloyd run that polishes the children.

use super::kmeans::lloyd;
use super::util;

/// Two child centroids and the member assignment that produced them.
#[derive(Clone, Debug)]
pub struct Bisection {
    /// Centroid that keeps the parent's cluster id.
    pub left: Vec<f32>,
    /// Centroid appended as a new cluster.
    pub right: Vec<f32>,
    /// `0` for `left`, `1` for `right`, per input point.
    pub labels: Vec<usize>,
}

/// Split `points` into two non-empty halves, or `None` if they have no spread.
pub(crate) fn bisect(points: &[&[f32]], max_iter: usize, tol: f32) -> Option<Bisection> {
    if points.len() < 2 {
        return None;
    }
    let dim = points[0].len();
    let center = util::mean(points, dim);
    let direction = util::principal_direction(points, &center)?;

    let mut halves: [Vec<&[f32]>; 2] = [Vec::new(), Vec::new()];
    let mut diff = vec![0.0f64; dim];
    for &p in points {
        for (j, d) in diff.iter_mut().enumerate() {
            *d = f64::from(p[j]) - center[j];
        }
        let side = usize::from(util::dot(&diff, &direction) >= 0.0);
        halves[side].push(p);
    }
    if halves.iter().any(Vec::is_empty) {
        return None;
    }

    let seeds = vec![
        util::to_f32(&util::mean(&halves[0], dim)),
        util::to_f32(&util::mean(&halves[1], dim)),
    ];
    let run = lloyd(points, seeds, max_iter.max(1), tol);

    let mut counts = [0usize; 2];
    for &l in &run.labels {
        counts[l] += 1;
    }
    if counts.contains(&0) {
        return None;
    }

    let mut centers = run.centers.into_iter();
    let left = centers.next()?;
    let right = centers.next()?;
    Some(Bisection {
        left,
        right,
        labels: run.labels,
    })
}
