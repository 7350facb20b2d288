use crate::error::{Error, Result};

/// Power iterations used when estimating the dominant direction of variance.
const POWER_ITERATIONS: usize = 100;
const POWER_TOLERANCE: f64 = 1e-10;

/// Check that `data` is a non-empty matrix of finite, equal-length rows.
///
/// Returns the dimensionality.
pub(crate) fn validate_data(data: &[Vec<f32>]) -> Result<usize> {
    let first = data.first().ok_or(Error::EmptyInput)?;
    let d = first.len();
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "dimension",
            message: "must be at least 1",
        });
    }
    for point in data.iter().skip(1) {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
    }
    if data.iter().flatten().any(|x| !x.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "data",
            message: "must contain only finite values",
        });
    }
    Ok(d)
}

/// Squared distance, accumulated in `f64` so that any pair of finite `f32`
/// vectors has a finite result.
#[inline]
pub(crate) fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum()
}

/// Index of the centroid closest to `point`. Ties go to the lowest index.
pub(crate) fn nearest(point: &[f32], centers: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let d = squared_euclidean(point, c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Assign every point to its nearest centroid.
pub(crate) fn assign(points: &[&[f32]], centers: &[Vec<f32>]) -> Vec<usize> {
    points.iter().map(|p| nearest(p, centers)).collect()
}

/// Group point indices by label (`k` groups, possibly empty).
pub(crate) fn members(labels: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); k];
    for (i, &l) in labels.iter().enumerate() {
        groups[l].push(i);
    }
    groups
}

/// Mean of `points`, accumulated in `f64`.
pub(crate) fn mean(points: &[&[f32]], dim: usize) -> Vec<f64> {
    let mut acc = vec![0.0f64; dim];
    for p in points {
        for (a, &x) in acc.iter_mut().zip(p.iter()) {
            *a += f64::from(x);
        }
    }
    let n = points.len().max(1) as f64;
    for a in &mut acc {
        *a /= n;
    }
    acc
}

pub(crate) fn to_f32(v: &[f64]) -> Vec<f32> {
    v.iter().map(|&x| x as f32).collect()
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Unit vector along the dominant direction of variance of `points` around `center`.
///
/// Power iteration on the (implicit) scatter matrix, started from the axis with the
/// largest variance so the result is deterministic. Returns `None` when the points
/// have no spread.
pub(crate) fn principal_direction(points: &[&[f32]], center: &[f64]) -> Option<Vec<f64>> {
    let dim = center.len();
    let mut var = vec![0.0f64; dim];
    for p in points {
        for (j, v) in var.iter_mut().enumerate() {
            let d = f64::from(p[j]) - center[j];
            *v += d * d;
        }
    }
    let (axis, &max_var) = var
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))?;
    if max_var <= 0.0 {
        return None;
    }

    let mut v = vec![0.0f64; dim];
    v[axis] = 1.0;
    let mut diff = vec![0.0f64; dim];
    for _ in 0..POWER_ITERATIONS {
        let mut w = vec![0.0f64; dim];
        for p in points {
            for (j, d) in diff.iter_mut().enumerate() {
                *d = f64::from(p[j]) - center[j];
            }
            let s = dot(&diff, &v);
            for (wj, dj) in w.iter_mut().zip(diff.iter()) {
                *wj += s * dj;
            }
        }
        let norm = dot(&w, &w).sqrt();
        if norm <= f64::EPSILON {
            return None;
        }
        for wj in &mut w {
            *wj /= norm;
        }
        let delta: f64 = w.iter().zip(v.iter()).map(|(a, b)| (a - b).abs()).sum();
        v = w;
        if delta < POWER_TOLERANCE {
            break;
        }
    }
    Some(v)
}
