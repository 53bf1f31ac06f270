use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{QcError, Result};

/// One configuration row: a variable, an optional time window and its
/// test cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    pub variable: String,
    /// Defaults to the first timestamp of the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// Defaults to the last timestamp of the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tests: Vec<Option<String>>,
}

impl TestSpec {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            start: None,
            end: None,
            tests: Vec::new(),
        }
    }

    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Append a cell; `None` leaves the test column empty for this row.
    pub fn test(mut self, cell: Option<&str>) -> Self {
        self.tests.push(cell.map(str::to_string));
        self
    }

    /// The trimmed cell of test column `column`, if it holds anything.
    pub fn cell(&self, column: usize) -> Option<&str> {
        self.tests
            .get(column)?
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Ordered configuration rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigTable {
    rows: Vec<TestSpec>,
}

impl ConfigTable {
    pub fn new(rows: Vec<TestSpec>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[TestSpec] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of test columns: the longest `tests` list.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.tests.len()).max().unwrap_or(0)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let table: ConfigTable = serde_yaml::from_str(s)?;
        for (i, row) in table.rows.iter().enumerate() {
            if row.variable.trim().is_empty() {
                return Err(QcError::invalid(
                    "config",
                    "variable",
                    format!("row {} has an empty variable name", i + 1),
                ));
            }
        }
        Ok(table)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let table = Self::from_yaml_str(&content)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            columns = table.column_count(),
            "loaded test configuration"
        );
        Ok(table)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
