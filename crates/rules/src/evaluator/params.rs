//! Typed access to the keyword parameters of a parsed test cell.

use chrono::Duration;
use indexmap::IndexMap;
use tsqc_core::parse_duration;

use crate::dsl::{eval_constant, Expr, Value};
use crate::error::{QcError, Result};
use crate::flagger::{Flagger, Severity};

pub(crate) struct Params<'a> {
    test: &'static str,
    map: &'a IndexMap<String, Expr>,
}

impl<'a> Params<'a> {
    pub fn new(test: &'static str, map: &'a IndexMap<String, Expr>) -> Self {
        Self { test, map }
    }

    pub fn expr(&self, key: &str) -> Option<&'a Expr> {
        self.map.get(key)
    }

    fn missing(&self, key: &str) -> QcError {
        QcError::MissingParameter {
            test: self.test.to_string(),
            param: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, reason: impl Into<String>) -> QcError {
        QcError::invalid(self.test, key, reason)
    }

    pub fn number(&self, key: &str) -> Result<Option<f64>> {
        let Some(expr) = self.expr(key) else {
            return Ok(None);
        };
        match eval_constant(expr) {
            Ok(Value::Scalar(x)) => Ok(Some(x)),
            Ok(other) => Err(self.invalid(key, format!("expected a number, got a {}", other.kind()))),
            Err(_) => Err(self.invalid(key, format!("'{}' is not a constant number", expr))),
        }
    }

    pub fn require_number(&self, key: &str) -> Result<f64> {
        self.number(key)?.ok_or_else(|| self.missing(key))
    }

    /// A non-negative whole number.
    pub fn count(&self, key: &str) -> Result<Option<usize>> {
        match self.number(key)? {
            None => Ok(None),
            Some(x) if x >= 0.0 && x.fract() == 0.0 && x <= u32::MAX as f64 => Ok(Some(x as usize)),
            Some(x) => Err(self.invalid(key, format!("expected a non-negative integer, got {}", x))),
        }
    }

    /// A calendar field within `lo..=hi`.
    pub fn bounded(&self, key: &str, lo: u32, hi: u32, default: u32) -> Result<u32> {
        match self.count(key)? {
            None => Ok(default),
            Some(v) if (lo as usize..=hi as usize).contains(&v) => Ok(v as u32),
            Some(v) => Err(self.invalid(key, format!("expected {}..={}, got {}", lo, hi, v))),
        }
    }

    /// A duration literal (`10min`) or a quoted duration string (`'10min'`).
    pub fn duration(&self, key: &str) -> Result<Option<Duration>> {
        let parsed = match self.expr(key) {
            None => return Ok(None),
            Some(Expr::Duration { value, .. }) => *value,
            Some(Expr::Str(s)) => parse_duration(s)?,
            Some(other) => {
                return Err(self.invalid(key, format!("expected a duration, got '{}'", other)))
            }
        };
        if parsed <= Duration::zero() {
            return Err(self.invalid(key, "duration must be positive"));
        }
        Ok(Some(parsed))
    }

    pub fn require_duration(&self, key: &str) -> Result<Duration> {
        self.duration(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn boolean(&self, key: &str) -> Result<Option<bool>> {
        let Some(expr) = self.expr(key) else {
            return Ok(None);
        };
        match eval_constant(expr) {
            Ok(Value::Bool(b)) => Ok(Some(b)),
            _ => Err(self.invalid(key, format!("expected True or False, got '{}'", expr))),
        }
    }

    /// Free text; bare identifiers and numbers are taken as written.
    pub fn text(&self, key: &str) -> Result<Option<String>> {
        match self.expr(key) {
            None => Ok(None),
            Some(Expr::Str(s)) | Some(Expr::Ident(s)) => Ok(Some(s.clone())),
            Some(e @ Expr::Number(_)) => Ok(Some(e.to_string())),
            Some(other) => Err(self.invalid(key, format!("expected text, got '{}'", other))),
        }
    }

    /// A level of the flagger's scale, by name (`BAD`, `'BAD'`) or position.
    pub fn severity(&self, key: &str, flagger: &dyn Flagger) -> Result<Option<Severity>> {
        match self.expr(key) {
            None => Ok(None),
            Some(Expr::Ident(name)) | Some(Expr::Str(name)) => flagger.severity(name).map(Some),
            Some(Expr::Number(n)) if *n >= 0.0 && n.fract() == 0.0 && *n <= 255.0 => {
                flagger.scale().check(Severity(*n as u8)).map(Some)
            }
            Some(other) => Err(QcError::UnknownSeverity(other.to_string())),
        }
    }
}
