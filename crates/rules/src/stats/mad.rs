//! Median-absolute-deviation outlier detection over sliding windows.

use tsqc_core::is_missing;

use super::math::{nan_mad, nan_median};
use crate::error::Result;
use crate::scanner::scan;

/// Scales the MAD to a standard-deviation equivalent under normality.
pub const MAD_NORMALIZER: f64 = 0.6745;

/// Apply `order` successive first differences in place. Each pass leaves
/// the leading position undefined (NaN).
pub fn difference_in_place(values: &mut [f64], order: usize) {
    for i in 0..order.min(values.len()) {
        for j in (i + 1..values.len()).rev() {
            values[j] -= values[j - 1];
        }
        values[i] = f64::NAN;
    }
}

/// Flag samples outside `median ± mad * z / 0.6745` of their window.
///
/// Each window is evaluated on its own copy of the values. Samples marked in
/// `excluded` (already flagged) and missing samples are set to NaN before
/// differencing, so they neither shape the statistic nor get flagged again.
#[allow(clippy::too_many_arguments)]
pub fn mad_mask(
    dates: &[i64],
    values: &[f64],
    excluded: &[bool],
    window: i64,
    step: Option<i64>,
    z: f64,
    deriv: usize,
    nodata: f64,
) -> Result<Vec<bool>> {
    let mut mask = vec![false; values.len()];

    for (start, end) in scan(dates, window, step)? {
        let mut chunk: Vec<f64> = (start..end)
            .map(|i| {
                if excluded[i] || is_missing(values[i], nodata) {
                    f64::NAN
                } else {
                    values[i]
                }
            })
            .collect();
        difference_in_place(&mut chunk, deriv);

        let median = nan_median(&chunk);
        if median.is_nan() {
            continue;
        }
        let thresh = nan_mad(&chunk, median) * (z / MAD_NORMALIZER);

        for (offset, &v) in chunk.iter().enumerate() {
            if v < median - thresh || v > median + thresh {
                mask[start + offset] = true;
            }
        }
    }

    Ok(mask)
}
