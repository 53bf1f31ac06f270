//! [`QcRunner`]: executes a configuration table against one data frame.

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};
use tsqc_core::config::ErrorMode;
use tsqc_core::{period_to_ticks, QcSettings, TimeSeriesFrame};
use uuid::Uuid;

use crate::error::{QcError, Result};
use crate::evaluator::{evaluate_call, CompiledTest, EvalContext, Propagation};
use crate::flagger::{flagger_from_settings, FlagTable, Flagger};
use crate::schema::{ConfigTable, TestSpec};

use super::plan::TestPlan;
use super::propagate::extend;
use super::report::{QcOutput, RunReport, SkippedCell};

/// Settings the runner needs beyond the flagger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerSettings {
    pub nodata: f64,
    pub error_mode: ErrorMode,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            nodata: f64::NAN,
            error_mode: ErrorMode::default(),
        }
    }
}

impl From<&QcSettings> for RunnerSettings {
    fn from(s: &QcSettings) -> Self {
        Self {
            nodata: s.nodata,
            error_mode: s.error_mode,
        }
    }
}

/// Lifecycle of the most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initializing,
    ExecutingTests,
    Finalized,
}

#[derive(Debug)]
pub struct QcRunner {
    flagger: Box<dyn Flagger>,
    settings: RunnerSettings,
    state: RunState,
}

impl QcRunner {
    pub fn new(flagger: Box<dyn Flagger>, settings: RunnerSettings) -> Self {
        Self {
            flagger,
            settings,
            state: RunState::Initializing,
        }
    }

    /// Runner with the flagger and settings selected by `settings`.
    pub fn from_settings(settings: &QcSettings) -> Self {
        Self::new(flagger_from_settings(settings), settings.into())
    }

    pub fn flagger(&self) -> &dyn Flagger {
        self.flagger.as_ref()
    }

    pub fn settings(&self) -> RunnerSettings {
        self.settings
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every test of `config` on `data`.
    ///
    /// `prior` flags are aligned to the data index and merged under the
    /// fresh table before the first test runs.
    pub fn run(
        &mut self,
        config: &ConfigTable,
        mut data: TimeSeriesFrame,
        prior: Option<FlagTable>,
    ) -> Result<QcOutput> {
        self.state = RunState::Initializing;
        let run_id = Uuid::new_v4();
        let flagger = self.flagger.as_ref();

        let frequency = data.frequency().ok_or(QcError::MissingFrequency)?;
        let mut flags = FlagTable::untouched(flagger, data.index(), data.column_names())?;
        if let Some(prior) = prior {
            let aligned = prior.align_to(data.index());
            flags = aligned.merge(&flags, flagger)?;
            debug!(run_id = %run_id, columns = prior.columns().len(), "merged prior flags");
        }
        let plan = TestPlan::compile(config, flagger)?;

        info!(
            run_id = %run_id,
            samples = data.len(),
            variables = data.columns().len(),
            rows = config.len(),
            columns = plan.column_count(),
            tests = plan.test_count(),
            flagger = flagger.layout(),
            "starting QC run"
        );

        self.state = RunState::ExecutingTests;
        let mut report = RunReport::new(run_id);

        for column in 0..plan.column_count() {
            for (row, spec) in config.rows().iter().enumerate() {
                let test = match plan.cell(column, row) {
                    Some(t) => t,
                    None => {
                        report.cells_not_applicable += 1;
                        continue;
                    }
                };
                let cell = CellRun {
                    spec,
                    row: row + 1,
                    column,
                    test,
                };
                match cell.execute(flagger, &self.settings, frequency, &mut data, &mut flags) {
                    Ok(true) => report.cells_evaluated += 1,
                    Ok(false) => report.cells_not_applicable += 1,
                    Err(e)
                        if self.settings.error_mode == ErrorMode::Continue
                            && e.is_cell_local() =>
                    {
                        warn!(
                            run_id = %run_id,
                            variable = %spec.variable,
                            row = row + 1,
                            column,
                            test = test.name(),
                            error = %e,
                            "skipping test cell"
                        );
                        report.skipped.push(SkippedCell {
                            variable: spec.variable.clone(),
                            row: row + 1,
                            column,
                            error: e.to_string(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            report.columns_run += 1;
        }

        self.state = RunState::Finalized;
        info!(
            run_id = %run_id,
            columns = report.columns_run,
            evaluated = report.cells_evaluated,
            not_applicable = report.cells_not_applicable,
            skipped = report.skipped.len(),
            "QC run finished"
        );
        Ok(QcOutput {
            data,
            flags,
            report,
        })
    }
}

// ── Single cell ─────────────────────────────────────────────────────

struct CellRun<'a> {
    spec: &'a TestSpec,
    /// 1-based configuration row.
    row: usize,
    column: usize,
    test: &'a CompiledTest,
}

impl CellRun<'_> {
    /// Evaluate the cell on its window and write the results back.
    /// Returns `false` when the cell does not apply to the data.
    fn execute(
        &self,
        flagger: &dyn Flagger,
        settings: &RunnerSettings,
        frequency: Duration,
        data: &mut TimeSeriesFrame,
        flags: &mut FlagTable,
    ) -> Result<bool> {
        let variable = self.spec.variable.as_str();
        if !data.has_column(variable) {
            debug!(variable, row = self.row, column = self.column, "variable not in data, skipping");
            return Ok(false);
        }
        let range = data.range_between(self.spec.start, self.spec.end);
        if range.is_empty() {
            debug!(variable, row = self.row, column = self.column, "no samples in window, skipping");
            return Ok(false);
        }

        let data_chunk = data.slice(range.clone());
        let mut flag_chunk = flags.slice(range.clone());
        if let Some(col) = flag_chunk.column_mut(variable) {
            flagger.init_untouched(col)?;
        }

        let ctx = EvalContext {
            field: variable,
            flagger,
            nodata: settings.nodata,
            test_seq: self.column,
        };
        let (data_chunk, mut flag_chunk) = evaluate_call(self.test, data_chunk, flag_chunk, &ctx)?;

        let ticks = match self.test.propagation {
            Some(Propagation::Period(period)) => period_to_ticks(period, frequency)?,
            Some(Propagation::Values(n)) => n,
            None => 0,
        };
        if ticks > 0 {
            if let Some(col) = flag_chunk.column_mut(variable) {
                extend(flagger, col, ticks)?;
            }
        }

        data.write_back(range.clone(), &data_chunk)?;
        flags.write_back(range.clone(), &flag_chunk)?;
        debug!(
            variable,
            row = self.row,
            column = self.column,
            test = self.test.name(),
            start = range.start,
            end = range.end,
            "evaluated test cell"
        );
        Ok(true)
    }
}
