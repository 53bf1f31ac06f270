//! Ordered severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QcError, Result};

/// Label rendered for cells no test has touched yet. Orders below every level.
pub const NIL_LABEL: &str = "NIL";

/// A position in a [`FlagScale`]; higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Severity(pub u8);

/// A totally ordered, named set of severities.
///
/// The first level means "unflagged", the second "good" (or the first if the
/// scale has a single level), the last "bad".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagScale {
    levels: Vec<String>,
}

impl FlagScale {
    pub fn new<I, S>(levels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        if levels.is_empty() || levels.len() > u8::MAX as usize {
            return Err(QcError::invalid(
                "flagger",
                "levels",
                format!("expected 1..=255 levels, got {}", levels.len()),
            ));
        }
        for (i, level) in levels.iter().enumerate() {
            if level.eq_ignore_ascii_case(NIL_LABEL) && i != 0 {
                return Err(QcError::invalid("flagger", "levels", "NIL may only be the lowest level"));
            }
            if levels[..i].iter().any(|l| l.eq_ignore_ascii_case(level)) {
                return Err(QcError::invalid(
                    "flagger",
                    "levels",
                    format!("duplicate level '{}'", level),
                ));
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn unflagged(&self) -> Severity {
        Severity(0)
    }

    pub fn good(&self) -> Severity {
        Severity(self.levels.len().min(2) as u8 - 1)
    }

    pub fn bad(&self) -> Severity {
        Severity(self.levels.len() as u8 - 1)
    }

    /// Look a level up by name (case-insensitive).
    pub fn resolve(&self, name: &str) -> Result<Severity> {
        self.levels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(name.trim()))
            .map(|i| Severity(i as u8))
            .ok_or_else(|| QcError::UnknownSeverity(name.to_string()))
    }

    /// Confirm `severity` belongs to this scale.
    pub fn check(&self, severity: Severity) -> Result<Severity> {
        if (severity.0 as usize) < self.levels.len() {
            Ok(severity)
        } else {
            Err(QcError::UnknownSeverity(format!("#{}", severity.0)))
        }
    }

    pub fn name(&self, severity: Severity) -> Result<&str> {
        self.check(severity)?;
        Ok(&self.levels[severity.0 as usize])
    }

    /// Label for a possibly untouched cell.
    pub fn label(&self, cell: Option<Severity>) -> String {
        match cell {
            Some(s) => self
                .levels
                .get(s.0 as usize)
                .cloned()
                .unwrap_or_else(|| format!("#{}", s.0)),
            None => NIL_LABEL.to_string(),
        }
    }
}

impl Default for FlagScale {
    fn default() -> Self {
        Self {
            levels: ["UNFLAGGED", "GOOD", "DOUBTFUL", "BAD"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ── Comparators ─────────────────────────────────────────────────────

/// Comparison applied between a cell's severity and a reference severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Comparator {
    pub fn apply(self, value: Severity, reference: Severity) -> bool {
        match self {
            Comparator::Eq => value == reference,
            Comparator::Ne => value != reference,
            Comparator::Gt => value > reference,
            Comparator::Ge => value >= reference,
            Comparator::Lt => value < reference,
            Comparator::Le => value <= reference,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = QcError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "==" => Ok(Comparator::Eq),
            "!=" => Ok(Comparator::Ne),
            ">" => Ok(Comparator::Gt),
            ">=" => Ok(Comparator::Ge),
            "<" => Ok(Comparator::Lt),
            "<=" => Ok(Comparator::Le),
            other => Err(QcError::invalid(
                "isflagged",
                "comparator",
                format!("unknown comparator '{}'", other),
            )),
        }
    }
}
