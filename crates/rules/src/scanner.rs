//! Monotonic window index scanner.
//!
//! Produces successive `(start, end)` index pairs over a strictly increasing
//! timestamp sequence, each covering `[t[start], t[start] + window)`. The end
//! search resumes from the previous end, so a full scan is amortized O(n).

use chrono::{DateTime, Duration, Utc};
use tsqc_core::check_strictly_increasing;

use crate::error::{QcError, Result};

/// Convert a frame index into the scanner's time unit (milliseconds).
pub fn frame_millis(index: &[DateTime<Utc>]) -> Vec<i64> {
    index.iter().map(|t| t.timestamp_millis()).collect()
}

/// Convert a period into the scanner's time unit (milliseconds).
pub fn duration_millis(d: Duration) -> i64 {
    d.num_milliseconds()
}

/// Iterator over window index pairs. Built with [`scan`].
#[derive(Debug, Clone)]
pub struct WindowScanner<'a> {
    dates: &'a [i64],
    window: i64,
    step: Option<i64>,
    start_idx: usize,
    end_idx: usize,
    done: bool,
}

/// Start a window scan over `dates`.
///
/// `window` and `step` share the unit of `dates`. Without `step` the window
/// start advances one sample at a time; with `step` it jumps to the first
/// timestamp at or after `t[start] + step`.
pub fn scan(dates: &[i64], window: i64, step: Option<i64>) -> Result<WindowScanner<'_>> {
    check_strictly_increasing(dates).map_err(|position| QcError::NonMonotonicInput { position })?;
    if window < 0 {
        return Err(QcError::invalid("scan", "window", "must not be negative"));
    }
    if let Some(s) = step {
        if s <= 0 {
            return Err(QcError::invalid("scan", "step", "must be positive"));
        }
    }
    Ok(WindowScanner {
        dates,
        window,
        step,
        start_idx: 0,
        end_idx: 0,
        done: dates.is_empty(),
    })
}

/// First index at or after `from` whose timestamp is `>= value`.
fn find_index(dates: &[i64], value: i64, from: usize) -> Option<usize> {
    dates[from.min(dates.len())..]
        .iter()
        .position(|&d| d >= value)
        .map(|offset| from + offset)
}

impl Iterator for WindowScanner<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let last_date = self.dates[self.dates.len() - 1];
        let start_date = self.dates[self.start_idx];
        let end_date = start_date + self.window;
        if end_date > last_date {
            self.done = true;
            return None;
        }

        let from = self.end_idx.max(self.start_idx);
        let end_idx = match find_index(self.dates, end_date, from) {
            Some(i) => i,
            None => {
                self.done = true;
                return None;
            }
        };
        self.end_idx = end_idx;
        let item = (self.start_idx, end_idx);

        let next_start = match self.step {
            Some(step) => find_index(self.dates, start_date + step, self.start_idx),
            None => Some(self.start_idx + 1).filter(|&i| i < self.dates.len()),
        };
        match next_start {
            Some(i) => self.start_idx = i,
            None => self.done = true,
        }

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequences() -> Vec<Vec<i64>> {
        vec![
            (0..50).map(|i| i * 10).collect(),
            vec![0, 1, 2, 5, 9, 10, 30, 31, 32, 60, 61, 100],
            (0..30).map(|i| i * i).collect(),
            vec![-40, -20, -5, 0, 3, 7, 8, 100],
        ]
    }

    #[test]
    fn pairs_are_ordered_and_starts_strictly_increase() {
        for dates in sequences() {
            for window in [0, 1, 5, 10, 25, 60] {
                for step in [None, Some(1), Some(7), Some(30)] {
                    let pairs: Vec<_> = scan(&dates, window, step).unwrap().collect();
                    for &(s, e) in &pairs {
                        assert!(e >= s, "end {} < start {} (window {})", e, s, window);
                    }
                    for w in pairs.windows(2) {
                        assert!(w[1].0 > w[0].0, "starts not increasing: {:?}", w);
                    }
                }
            }
        }
    }

    #[test]
    fn end_is_first_index_at_or_after_bound() {
        let dates: Vec<i64> = (0..10).map(|i| i * 10).collect();
        let pairs: Vec<_> = scan(&dates, 25, None).unwrap().collect();
        // 0 + 25 -> first >= 25 is 30 at index 3
        assert_eq!(pairs[0], (0, 3));
        assert_eq!(pairs[1], (1, 4));
        // last window must end at or before the last timestamp (90)
        assert_eq!(*pairs.last().unwrap(), (6, 9));
        assert_eq!(pairs.len(), 7);
    }

    #[test]
    fn step_jumps_to_next_bound() {
        let dates: Vec<i64> = (0..10).map(|i| i * 10).collect();
        let pairs: Vec<_> = scan(&dates, 30, Some(30)).unwrap().collect();
        assert_eq!(pairs, vec![(0, 3), (3, 6), (6, 9)]);
    }

    #[test]
    fn window_longer_than_series_yields_nothing() {
        let dates = vec![0, 10, 20];
        assert_eq!(scan(&dates, 100, None).unwrap().count(), 0);
        assert_eq!(scan(&[], 10, None).unwrap().count(), 0);
    }

    #[test]
    fn non_monotonic_input_is_rejected() {
        let cases: Vec<Vec<i64>> = vec![
            vec![0, 0],
            vec![1, 0],
            vec![0, 10, 5, 20],
            vec![0, 10, 20, 20],
            vec![5, 4, 3, 2, 1],
        ];
        for dates in cases {
            let err = scan(&dates, 1, None).unwrap_err();
            assert!(
                matches!(err, QcError::NonMonotonicInput { .. }),
                "expected NonMonotonicInput for {:?}",
                dates
            );
        }
    }

    #[test]
    fn invalid_step_is_rejected() {
        let dates = vec![0, 1, 2];
        assert!(scan(&dates, 1, Some(0)).is_err());
        assert!(scan(&dates, -1, None).is_err());
    }
}
