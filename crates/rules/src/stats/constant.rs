//! Constant-run detection: windows whose values vary less than `eps`.

use tsqc_core::is_missing;

use super::math::value_range;
use crate::error::Result;
use crate::scanner::scan;

/// Flag every sample of each `duration`-long window whose value range is
/// below `eps`.
///
/// Missing samples and samples below `value_floor` are dropped before the
/// range is taken. A window is skipped when no samples survive, or when the
/// survivors no longer reach both edges of the window (the run would be
/// shorter than `duration`).
pub fn constant_mask(
    dates: &[i64],
    values: &[f64],
    eps: f64,
    duration: i64,
    value_floor: Option<f64>,
    nodata: f64,
) -> Result<Vec<bool>> {
    let mut mask = vec![false; values.len()];

    let keep: Vec<bool> = values
        .iter()
        .map(|&v| !is_missing(v, nodata) && value_floor.map_or(true, |floor| v >= floor))
        .collect();

    for (start, end) in scan(dates, duration, None)? {
        if end <= start {
            continue;
        }
        let window_span = dates[end - 1] - dates[start];

        let survivors: Vec<usize> = (start..end).filter(|&i| keep[i]).collect();
        let (first, last) = match (survivors.first(), survivors.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => continue,
        };
        if dates[last] - dates[first] < window_span {
            continue;
        }

        let chunk: Vec<f64> = survivors.iter().map(|&i| values[i]).collect();
        if value_range(&chunk).is_some_and(|r| r < eps) {
            mask[start..end].iter_mut().for_each(|m| *m = true);
        }
    }

    Ok(mask)
}
