//! NaN-aware summary statistics used by the windowed tests and the
//! expression aggregates.

/// `max - min` over the slice; `None` when it is empty.
pub fn value_range<T: Copy + PartialOrd + std::ops::Sub<Output = T>>(values: &[T]) -> Option<T> {
    let (&first, rest) = values.split_first()?;
    let mut min = first;
    let mut max = first;
    for &v in rest {
        if v < min {
            min = v;
        } else if v > max {
            max = v;
        }
    }
    Some(max - min)
}

fn finite_values(values: &[f64]) -> impl Iterator<Item = f64> + '_ {
    values.iter().copied().filter(|v| !v.is_nan())
}

/// Median ignoring NaN; NaN when no valid values remain.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut valid: Vec<f64> = finite_values(values).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    valid.sort_by(|a, b| a.total_cmp(b));
    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    }
}

/// Sum ignoring NaN (0.0 for no valid values).
pub fn nan_sum(values: &[f64]) -> f64 {
    finite_values(values).sum()
}

/// Mean ignoring NaN; NaN when no valid values remain.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = finite_values(values).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count > 0 {
        sum / count as f64
    } else {
        f64::NAN
    }
}

/// Population standard deviation ignoring NaN.
pub fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    let (sq, count) = finite_values(values)
        .fold((0.0, 0usize), |(s, c), v| (s + (v - mean).powi(2), c + 1));
    (sq / count as f64).sqrt()
}

pub fn nan_min(values: &[f64]) -> f64 {
    finite_values(values).fold(f64::NAN, f64::min)
}

pub fn nan_max(values: &[f64]) -> f64 {
    finite_values(values).fold(f64::NAN, f64::max)
}

/// Median absolute deviation around `median`, ignoring NaN.
pub fn nan_mad(values: &[f64], median: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    nan_median(&deviations)
}
