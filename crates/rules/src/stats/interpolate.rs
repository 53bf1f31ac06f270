//! Linear gap filling for short runs of missing samples.

use tsqc_core::is_missing;

/// Linearly interpolate runs of missing samples shorter than `limit`.
///
/// Only runs bounded by valid samples on both sides are filled; leading and
/// trailing gaps stay missing. Returns the number of filled samples.
pub fn interpolate_gaps(values: &mut [f64], limit: usize, nodata: f64) -> usize {
    let mut filled = 0;
    let mut i = 0;
    while i < values.len() {
        if !is_missing(values[i], nodata) {
            i += 1;
            continue;
        }
        let gap_start = i;
        while i < values.len() && is_missing(values[i], nodata) {
            i += 1;
        }
        let gap_len = i - gap_start;
        if gap_start == 0 || i == values.len() || gap_len >= limit {
            continue;
        }

        let left = values[gap_start - 1];
        let right = values[i];
        let slope = (right - left) / (gap_len + 1) as f64;
        for (k, v) in values[gap_start..i].iter_mut().enumerate() {
            *v = left + slope * (k + 1) as f64;
        }
        filled += gap_len;
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_single_gap() {
        let mut v = vec![0.0, 1.0, f64::NAN, 3.0];
        assert_eq!(interpolate_gaps(&mut v, 2, f64::NAN), 1);
        assert_eq!(v, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn limit_bounds_the_run_length() {
        let base = vec![0.0, 1.0, 2.0, 3.0, 4.0, f64::NAN, f64::NAN, f64::NAN, 8.0, 9.0];

        for limit in [2, 3] {
            let mut v = base.clone();
            assert_eq!(interpolate_gaps(&mut v, limit, f64::NAN), 0);
            assert!(v[5..8].iter().all(|x| x.is_nan()));
        }

        let mut v = base.clone();
        assert_eq!(interpolate_gaps(&mut v, 4, f64::NAN), 3);
        assert_eq!(&v[5..8], &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn edges_and_sentinels() {
        let mut v = vec![-9999.0, 1.0, -9999.0, 3.0, -9999.0];
        assert_eq!(interpolate_gaps(&mut v, 5, -9999.0), 1);
        assert_eq!(v, vec![-9999.0, 1.0, 2.0, 3.0, -9999.0]);
    }
}
