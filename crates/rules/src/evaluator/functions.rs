//! Built-in test implementations.

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;
use tsqc_core::{is_missing, TimeSeriesFrame};

use super::params::Params;
use super::registry::TestFunction;
use super::{CompiledTest, EvalContext};
use crate::dsl::{eval_condition, parse_expression, Expr, Scope};
use crate::error::{QcError, Result};
use crate::flagger::{FlagTable, Severity};
use crate::scanner::{duration_millis, frame_millis};
use crate::stats::{constant_mask, interpolate_gaps, mad_mask};

/// Default advance of the MAD window.
const MAD_STEP_DAYS: i64 = 1;

/// Function-specific parameters after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum TestKind {
    Generic {
        expr: Expr,
        source: String,
    },
    Range {
        min: f64,
        max: f64,
    },
    SeasonalRange {
        min: f64,
        max: f64,
        season: Season,
    },
    Constant {
        eps: f64,
        length: Duration,
        thmin: Option<f64>,
    },
    Mad {
        length: Duration,
        z: f64,
        deriv: usize,
        step: Duration,
    },
    Missing,
    Interpolate {
        limit: usize,
    },
    Propagate,
    Clear,
    Force,
    Manual,
}

/// A recurring calendar interval, inclusive at both ends. Wraps over the
/// year end when the start lies after the end (e.g. Dec 16 to Jan 15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub start: (u32, u32),
    pub end: (u32, u32),
}

impl Season {
    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        let day = (t.month(), t.day());
        if self.start <= self.end {
            self.start <= day && day <= self.end
        } else {
            day >= self.start || day <= self.end
        }
    }
}

impl TestKind {
    pub(crate) fn from_params(function: TestFunction, params: &Params<'_>) -> Result<Self> {
        Ok(match function {
            TestFunction::Generic => {
                let func = params.expr("func").ok_or_else(|| QcError::MissingParameter {
                    test: function.name().to_string(),
                    param: "func".to_string(),
                })?;
                match func {
                    // quoted conditions are parsed here; bare ones already are
                    Expr::Str(text) => TestKind::Generic {
                        expr: parse_expression(text)?,
                        source: text.clone(),
                    },
                    expr => TestKind::Generic {
                        expr: expr.clone(),
                        source: expr.to_string(),
                    },
                }
            }
            TestFunction::Range => TestKind::Range {
                min: params.require_number("min")?,
                max: params.require_number("max")?,
            },
            TestFunction::SeasonalRange => TestKind::SeasonalRange {
                min: params.require_number("min")?,
                max: params.require_number("max")?,
                season: Season {
                    start: (
                        params.bounded("startmonth", 1, 12, 1)?,
                        params.bounded("startday", 1, 31, 1)?,
                    ),
                    end: (
                        params.bounded("endmonth", 1, 12, 12)?,
                        params.bounded("endday", 1, 31, 31)?,
                    ),
                },
            },
            TestFunction::Constant => TestKind::Constant {
                eps: params.require_number("eps")?,
                length: params.require_duration("length")?,
                thmin: params.number("thmin")?,
            },
            TestFunction::Mad => TestKind::Mad {
                length: params.require_duration("length")?,
                z: params.require_number("z")?,
                deriv: params.count("deriv")?.unwrap_or(0),
                step: params
                    .duration("step")?
                    .unwrap_or_else(|| Duration::days(MAD_STEP_DAYS)),
            },
            TestFunction::Missing => TestKind::Missing,
            TestFunction::Interpolate => TestKind::Interpolate {
                limit: params.count("limit")?.unwrap_or(2),
            },
            TestFunction::Propagate => TestKind::Propagate,
            TestFunction::Clear => TestKind::Clear,
            TestFunction::Force => TestKind::Force,
            TestFunction::Manual => TestKind::Manual,
        })
    }
}

/// Run `test` on one data/flag window, writing flags and data in place.
pub(crate) fn run_test(
    test: &CompiledTest,
    data: &mut TimeSeriesFrame,
    flags: &mut FlagTable,
    ctx: &EvalContext<'_>,
) -> Result<()> {
    let field = ctx.field;
    let nodata = ctx.nodata;
    let values = data
        .column(field)
        .ok_or_else(|| QcError::UnknownVariable(field.to_string()))?
        .to_vec();
    if flags.column(field).is_none() {
        return Err(QcError::UnknownVariable(field.to_string()));
    }

    let mask = match &test.kind {
        TestKind::Generic { expr, source } => {
            let scope = Scope {
                data: &*data,
                flags: &*flags,
                field,
                flagger: ctx.flagger,
                nodata,
            };
            Some(eval_condition(expr, source, &scope)?)
        }
        TestKind::Range { min, max } => Some(
            values
                .iter()
                .map(|&v| !is_missing(v, nodata) && (v < *min || v > *max))
                .collect(),
        ),
        TestKind::SeasonalRange { min, max, season } => Some(
            data.index()
                .iter()
                .zip(&values)
                .map(|(t, &v)| {
                    season.contains(t) && !is_missing(v, nodata) && (v < *min || v > *max)
                })
                .collect(),
        ),
        TestKind::Constant { eps, length, thmin } => Some(constant_mask(
            &frame_millis(data.index()),
            &values,
            *eps,
            duration_millis(*length),
            *thmin,
            nodata,
        )?),
        TestKind::Mad {
            length,
            z,
            deriv,
            step,
        } => {
            let excluded = flags
                .column(field)
                .map(|c| ctx.flagger.is_flagged_default(c))
                .transpose()?
                .unwrap_or_else(|| vec![false; values.len()]);
            Some(mad_mask(
                &frame_millis(data.index()),
                &values,
                &excluded,
                duration_millis(*length),
                Some(duration_millis(*step)),
                *z,
                *deriv,
                nodata,
            )?)
        }
        TestKind::Missing => Some(values.iter().map(|&v| is_missing(v, nodata)).collect()),
        TestKind::Interpolate { limit } => {
            if let Some(column) = data.column_mut(field) {
                let filled = interpolate_gaps(column, *limit, nodata);
                debug!(variable = %field, filled, "interpolated missing samples");
            }
            None
        }
        TestKind::Clear => {
            let unflagged = ctx.flagger.scale().unflagged();
            write_flags(test, flags, ctx, &vec![true; values.len()], unflagged, true)?;
            None
        }
        TestKind::Force => {
            write_flags(test, flags, ctx, &vec![true; values.len()], test.flag, true)?;
            None
        }
        TestKind::Propagate | TestKind::Manual => None,
    };

    if let Some(mask) = mask {
        debug!(
            test = test.function.name(),
            variable = %field,
            flagged = mask.iter().filter(|m| **m).count(),
            "test evaluated"
        );
        write_flags(test, flags, ctx, &mask, test.flag, test.force)?;
    }
    Ok(())
}

fn write_flags(
    test: &CompiledTest,
    flags: &mut FlagTable,
    ctx: &EvalContext<'_>,
    mask: &[bool],
    severity: Severity,
    force: bool,
) -> Result<()> {
    let column = flags
        .column_mut(ctx.field)
        .ok_or_else(|| QcError::UnknownVariable(ctx.field.to_string()))?;
    let extra = test.extra(ctx.test_seq, force);
    ctx.flagger.set_flag(column, mask, severity, &extra)
}
