use serde::Serialize;
use tsqc_core::TimeSeriesFrame;
use uuid::Uuid;

use crate::flagger::FlagTable;

/// A cell skipped in continue mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedCell {
    pub variable: String,
    /// 1-based configuration row.
    pub row: usize,
    /// 0-based test column.
    pub column: usize,
    pub error: String,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub columns_run: usize,
    pub cells_evaluated: usize,
    /// Empty cells, absent variables and windows without samples.
    pub cells_not_applicable: usize,
    pub skipped: Vec<SkippedCell>,
}

impl RunReport {
    pub(crate) fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            columns_run: 0,
            cells_evaluated: 0,
            cells_not_applicable: 0,
            skipped: Vec::new(),
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct QcOutput {
    pub data: TimeSeriesFrame,
    pub flags: FlagTable,
    pub report: RunReport,
}
