//! Test cell compilation and evaluation.
//!
//! A configuration cell is parsed once into a [`CompiledTest`]: the function
//! is resolved against the closed [`TestFunction`] registry, its parameters
//! are type-checked and the common flag parameters are extracted. Evaluation
//! then runs the test on one data/flag window and returns both, updated.
//!
//! `flag_values` / `flag_period` are compiled into [`Propagation`] but not
//! applied here; the scheduler extends flags after the window is evaluated.

mod functions;
pub(crate) mod fuzzy;
mod params;
mod registry;

use chrono::Duration;
use tracing::trace;
use tsqc_core::TimeSeriesFrame;

use crate::dsl::parse_test_call;
use crate::error::{QcError, Result};
use crate::flagger::{FlagExtra, FlagTable, Flagger, Severity};

pub use functions::{Season, TestKind};
pub use registry::{TestFunction, COMMON_PARAMS};

use functions::run_test;
use fuzzy::fuzzy_match;
use params::Params;

/// How far a test's flags are carried forward after evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// A fixed number of subsequent samples.
    Values(usize),
    /// A time span, converted to samples with the data's sampling period.
    Period(Duration),
}

/// A parsed, validated test cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTest {
    pub function: TestFunction,
    pub kind: TestKind,
    pub flag: Severity,
    pub comment: Option<String>,
    pub cause: Option<String>,
    pub commit: Option<String>,
    pub force: bool,
    pub propagation: Option<Propagation>,
    /// The cell as written in the configuration.
    pub source: String,
}

impl CompiledTest {
    /// Compile one configuration cell.
    ///
    /// `variable` and the 1-based `row` are only used for diagnostics.
    pub fn compile(cell: &str, variable: &str, row: usize, flagger: &dyn Flagger) -> Result<Self> {
        let call = parse_test_call(cell)?;
        let function = TestFunction::from_name(&call.name).ok_or_else(|| {
            QcError::UndefinedTest {
                name: call.name.clone(),
                variable: variable.to_string(),
                row,
                suggestion: fuzzy_match(&call.name, &TestFunction::names()).map(str::to_string),
            }
        })?;

        let name = function.name();
        for key in call.params.keys() {
            if !function.accepts_param(key) {
                let mut reason = "unknown parameter".to_string();
                if let Some(s) = fuzzy_match(key, &function.all_params()) {
                    reason.push_str(&format!(", did you mean '{}'?", s));
                }
                return Err(QcError::invalid(name, key, reason));
            }
        }

        let params = Params::new(name, &call.params);
        let kind = TestKind::from_params(function, &params)?;

        // flag_period takes precedence over flag_values
        let propagation = match (params.duration("flag_period")?, params.count("flag_values")?) {
            (Some(period), _) => Some(Propagation::Period(period)),
            (None, Some(n)) => Some(Propagation::Values(n)),
            (None, None) => None,
        };

        let compiled = Self {
            function,
            kind,
            flag: params
                .severity("flag", flagger)?
                .unwrap_or_else(|| flagger.scale().bad()),
            comment: params.text("comment")?,
            cause: params.text("cause")?,
            commit: params.text("commit")?,
            force: params.boolean("force")?.unwrap_or(false),
            propagation,
            source: cell.trim().to_string(),
        };
        trace!(test = name, variable, row, "compiled test cell");
        Ok(compiled)
    }

    pub fn name(&self) -> &'static str {
        self.function.name()
    }

    /// Provenance recorded with flags this test writes.
    pub(crate) fn extra(&self, test_seq: usize, force: bool) -> FlagExtra {
        FlagExtra {
            comment: self.comment.clone(),
            cause: self.cause.clone(),
            commit: self.commit.clone(),
            test: self.function.name().to_string(),
            test_seq,
            force,
        }
    }
}

/// Per-call evaluation settings.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The variable under test.
    pub field: &'a str,
    pub flagger: &'a dyn Flagger,
    pub nodata: f64,
    /// Sequence number of the test column being executed.
    pub test_seq: usize,
}

/// Evaluate a compiled test on a data/flag window.
pub fn evaluate_call(
    test: &CompiledTest,
    mut data: TimeSeriesFrame,
    mut flags: FlagTable,
    ctx: &EvalContext<'_>,
) -> Result<(TimeSeriesFrame, FlagTable)> {
    run_test(test, &mut data, &mut flags, ctx)?;
    Ok((data, flags))
}

/// Compile and evaluate a single test cell against `variable`.
pub fn evaluate(
    expression: &str,
    data: TimeSeriesFrame,
    flags: FlagTable,
    variable: &str,
    flagger: &dyn Flagger,
    nodata: f64,
) -> Result<(TimeSeriesFrame, FlagTable)> {
    let test = CompiledTest::compile(expression, variable, 0, flagger)?;
    let ctx = EvalContext {
        field: variable,
        flagger,
        nodata,
        test_seq: 0,
    };
    evaluate_call(&test, data, flags, &ctx)
}
