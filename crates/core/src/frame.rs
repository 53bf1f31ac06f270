//! Time-indexed multivariate data table.
//!
//! A [`TimeSeriesFrame`] owns a strictly increasing timestamp index and one
//! `f64` column per variable. Missing samples are NaN (or the configured
//! nodata sentinel, see [`is_missing`]).

use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Whether a sample counts as missing: NaN or equal to the nodata sentinel.
pub fn is_missing(value: f64, nodata: f64) -> bool {
    value.is_nan() || value == nodata
}

/// Check that `index` is strictly increasing; returns the first offending
/// position on failure.
pub fn check_strictly_increasing<T: PartialOrd>(index: &[T]) -> std::result::Result<(), usize> {
    match index.windows(2).position(|w| w[1] <= w[0]) {
        Some(pos) => Err(pos + 1),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesFrame {
    index: Vec<DateTime<Utc>>,
    columns: IndexMap<String, Vec<f64>>,
}

impl TimeSeriesFrame {
    /// Create an empty-columned frame over `index`.
    pub fn new(index: Vec<DateTime<Utc>>) -> Result<Self> {
        check_strictly_increasing(&index)
            .map_err(|position| CoreError::NonMonotonicIndex { position })?;
        Ok(Self {
            index,
            columns: IndexMap::new(),
        })
    }

    /// Regular index of `periods` samples starting at `start`.
    pub fn with_regular_index(start: DateTime<Utc>, freq: Duration, periods: usize) -> Result<Self> {
        if freq <= Duration::zero() {
            return Err(CoreError::MissingFrequency);
        }
        let index = (0..periods)
            .map(|i| {
                i32::try_from(i)
                    .ok()
                    .and_then(|i| freq.checked_mul(i))
                    .and_then(|offset| start.checked_add_signed(offset))
                    .ok_or_else(|| {
                        CoreError::InvalidDuration(format!(
                            "sample {} of a {} index starting {} is out of range",
                            i, freq, start
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(index)
    }

    /// Add or replace a column.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(CoreError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Builder-style variant of [`insert_column`](Self::insert_column).
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.columns.get_mut(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &IndexMap<String, Vec<f64>> {
        &self.columns
    }

    /// Index timestamps as milliseconds since the epoch.
    pub fn index_millis(&self) -> Vec<i64> {
        self.index.iter().map(|t| t.timestamp_millis()).collect()
    }

    /// The fixed sampling period, if every consecutive gap is identical.
    pub fn frequency(&self) -> Option<Duration> {
        let first = match self.index.as_slice() {
            [a, b, ..] => *b - *a,
            _ => return None,
        };
        self.index
            .windows(2)
            .all(|w| w[1] - w[0] == first)
            .then_some(first)
    }

    /// Row range covering the inclusive label interval `[start, end]`.
    ///
    /// Open bounds default to the first/last timestamp. The range is empty
    /// when no timestamp falls inside the interval.
    pub fn range_between(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Range<usize> {
        let lo = match start {
            Some(s) => self.index.partition_point(|t| *t < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.index.partition_point(|t| *t <= e),
            None => self.index.len(),
        };
        if hi < lo {
            lo..lo
        } else {
            lo..hi
        }
    }

    /// Copy of the rows in `range`, all columns.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            index: self.index[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), v[range.clone()].to_vec()))
                .collect(),
        }
    }

    /// Replace the rows in `range` with the rows of `chunk`.
    ///
    /// Only columns present in both frames are written; nothing outside
    /// `range` changes.
    pub fn write_back(&mut self, range: Range<usize>, chunk: &TimeSeriesFrame) -> Result<()> {
        if chunk.len() != range.len() {
            return Err(CoreError::LengthMismatch {
                column: "<index>".to_string(),
                expected: range.len(),
                actual: chunk.len(),
            });
        }
        for (name, values) in self.columns.iter_mut() {
            if let Some(src) = chunk.columns.get(name) {
                values[range.clone()].copy_from_slice(src);
            }
        }
        Ok(())
    }

    /// Parse the JSON interchange form (`null` samples become NaN).
    pub fn from_json_str(s: &str) -> Result<Self> {
        let record: FrameRecord = serde_json::from_str(s)?;
        Self::try_from(record)
    }

    /// Serialize to the JSON interchange form (NaN samples become `null`).
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&FrameRecord::from(self))?)
    }
}

// ── JSON interchange ────────────────────────────────────────────────

/// Serializable shape of a frame: `{"index": [...], "columns": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub columns: IndexMap<String, Vec<Option<f64>>>,
}

impl TryFrom<FrameRecord> for TimeSeriesFrame {
    type Error = CoreError;

    fn try_from(record: FrameRecord) -> Result<Self> {
        let mut frame = TimeSeriesFrame::new(record.index)?;
        for (name, values) in record.columns {
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            frame.insert_column(name, values)?;
        }
        Ok(frame)
    }
}

impl From<&TimeSeriesFrame> for FrameRecord {
    fn from(frame: &TimeSeriesFrame) -> Self {
        Self {
            index: frame.index.clone(),
            columns: frame
                .columns
                .iter()
                .map(|(k, v)| {
                    let values = v.iter().map(|x| (!x.is_nan()).then_some(*x)).collect();
                    (k.clone(), values)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap()
    }

    fn hourly(n: usize) -> TimeSeriesFrame {
        TimeSeriesFrame::with_regular_index(start(), Duration::hours(1), n)
            .unwrap()
            .with_column("var1", (0..n).map(|i| i as f64).collect())
            .unwrap()
    }

    #[test]
    fn rejects_non_monotonic_index() {
        let t = start();
        let err = TimeSeriesFrame::new(vec![t, t + Duration::hours(1), t + Duration::hours(1)])
            .unwrap_err();
        assert!(matches!(err, CoreError::NonMonotonicIndex { position: 2 }));

        let err = TimeSeriesFrame::new(vec![t + Duration::hours(1), t]).unwrap_err();
        assert!(matches!(err, CoreError::NonMonotonicIndex { position: 1 }));
    }

    #[test]
    fn column_length_is_checked() {
        let mut frame = hourly(3);
        let err = frame.insert_column("short", vec![1.0]).unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn frequency_of_regular_and_irregular_index() {
        assert_eq!(hourly(5).frequency(), Some(Duration::hours(1)));
        assert_eq!(hourly(1).frequency(), None);

        let t = start();
        let irregular =
            TimeSeriesFrame::new(vec![t, t + Duration::hours(1), t + Duration::hours(3)]).unwrap();
        assert_eq!(irregular.frequency(), None);
    }

    #[test]
    fn regular_index_past_the_calendar_is_an_error() {
        let far = Duration::days(365 * 200_000);
        assert_eq!(TimeSeriesFrame::with_regular_index(start(), far, 2).unwrap().len(), 2);
        assert!(matches!(
            TimeSeriesFrame::with_regular_index(start(), far, 3),
            Err(CoreError::InvalidDuration(_))
        ));
    }

    #[test]
    fn range_between_is_inclusive() {
        let frame = hourly(10);
        let t = start();
        assert_eq!(
            frame.range_between(Some(t + Duration::hours(2)), Some(t + Duration::hours(5))),
            2..6
        );
        assert_eq!(frame.range_between(None, None), 0..10);
        // between samples
        assert_eq!(
            frame.range_between(Some(t + Duration::minutes(90)), Some(t + Duration::minutes(150))),
            2..3
        );
        // outside the data
        assert!(frame
            .range_between(Some(t + Duration::days(3)), None)
            .is_empty());
        assert!(frame
            .range_between(Some(t + Duration::hours(5)), Some(t + Duration::hours(2)))
            .is_empty());
    }

    #[test]
    fn slice_and_write_back_touch_only_the_range() {
        let mut frame = hourly(6);
        let mut chunk = frame.slice(2..4);
        chunk.column_mut("var1").unwrap().iter_mut().for_each(|v| *v = -1.0);
        frame.write_back(2..4, &chunk).unwrap();
        assert_eq!(frame.column("var1").unwrap(), &[0.0, 1.0, -1.0, -1.0, 4.0, 5.0]);
    }

    #[test]
    fn json_round_trip_maps_null_to_nan() {
        let json = r#"{
            "index": ["2017-01-01T00:00:00Z", "2017-01-01T01:00:00Z"],
            "columns": {"var1": [1.5, null]}
        }"#;
        let frame = TimeSeriesFrame::from_json_str(json).unwrap();
        let col = frame.column("var1").unwrap();
        assert_eq!(col[0], 1.5);
        assert!(col[1].is_nan());

        let out = frame.to_json_string().unwrap();
        assert!(out.contains("null"));
    }

    #[test]
    fn missing_respects_sentinel() {
        assert!(is_missing(f64::NAN, f64::NAN));
        assert!(is_missing(-9999.0, -9999.0));
        assert!(!is_missing(0.0, -9999.0));
    }
}
