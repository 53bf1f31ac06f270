//! Per-variable flag storage for both flag layouts.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::scale::Severity;
use crate::error::{QcError, Result};

/// One flag-setting event in a categorical history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub severity: Severity,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub commit: String,
    /// Name of the test that wrote the entry.
    #[serde(default)]
    pub test: String,
    /// Sequence number of the test column that wrote the entry.
    #[serde(default)]
    pub test_seq: usize,
}

impl FlagEntry {
    pub fn bare(severity: Severity) -> Self {
        Self {
            severity,
            comment: String::new(),
            cause: String::new(),
            commit: String::new(),
            test: String::new(),
            test_seq: 0,
        }
    }
}

/// Provenance and policy overrides supplied with a flag-setting call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagExtra {
    pub comment: Option<String>,
    pub cause: Option<String>,
    pub commit: Option<String>,
    pub test: String,
    pub test_seq: usize,
    /// Bypass the flagger's set policy.
    pub force: bool,
}

/// Flags of one variable, aligned with its data column.
///
/// `None` / an empty history marks a cell no test has touched yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", content = "cells", rename_all = "lowercase")]
pub enum FlagColumn {
    Ordinal(Vec<Option<Severity>>),
    Categorical(Vec<Vec<FlagEntry>>),
}

impl FlagColumn {
    pub fn len(&self) -> usize {
        match self {
            FlagColumn::Ordinal(cells) => cells.len(),
            FlagColumn::Categorical(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn layout(&self) -> &'static str {
        match self {
            FlagColumn::Ordinal(_) => "ordinal",
            FlagColumn::Categorical(_) => "categorical",
        }
    }

    /// Current severity of cell `i`.
    pub fn current(&self, i: usize) -> Option<Severity> {
        match self {
            FlagColumn::Ordinal(cells) => cells.get(i).copied().flatten(),
            FlagColumn::Categorical(cells) => cells.get(i).and_then(|h| h.last()).map(|e| e.severity),
        }
    }

    pub fn currents(&self) -> Vec<Option<Severity>> {
        (0..self.len()).map(|i| self.current(i)).collect()
    }

    pub fn slice(&self, range: Range<usize>) -> FlagColumn {
        match self {
            FlagColumn::Ordinal(cells) => FlagColumn::Ordinal(cells[range].to_vec()),
            FlagColumn::Categorical(cells) => FlagColumn::Categorical(cells[range].to_vec()),
        }
    }

    /// Replace the cells in `range` with `chunk`.
    pub fn splice(&mut self, range: Range<usize>, chunk: &FlagColumn) -> Result<()> {
        if chunk.len() != range.len() {
            return Err(QcError::invalid(
                "flags",
                "write_back",
                format!("chunk has {} cells, range has {}", chunk.len(), range.len()),
            ));
        }
        match (self, chunk) {
            (FlagColumn::Ordinal(dst), FlagColumn::Ordinal(src)) => {
                dst[range].copy_from_slice(src);
            }
            (FlagColumn::Categorical(dst), FlagColumn::Categorical(src)) => {
                dst[range].clone_from_slice(src);
            }
            (dst, src) => {
                return Err(QcError::FlagLayoutMismatch {
                    expected: dst.layout(),
                    found: src.layout(),
                })
            }
        }
        Ok(())
    }

    /// Copy the current value of `original[src]` onto cell `dst`.
    ///
    /// Categorical histories receive the source's latest entry appended.
    pub(crate) fn copy_cell_from(&mut self, original: &FlagColumn, src: usize, dst: usize) {
        match (self, original) {
            (FlagColumn::Ordinal(cells), FlagColumn::Ordinal(orig)) => {
                cells[dst] = orig[src];
            }
            (FlagColumn::Categorical(cells), FlagColumn::Categorical(orig)) => {
                if let Some(entry) = orig[src].last() {
                    cells[dst].push(entry.clone());
                }
            }
            _ => {}
        }
    }

    /// Cells picked by position; `None` positions become untouched cells.
    pub(crate) fn gather(&self, positions: &[Option<usize>]) -> FlagColumn {
        match self {
            FlagColumn::Ordinal(cells) => FlagColumn::Ordinal(
                positions.iter().map(|p| p.and_then(|i| cells[i])).collect(),
            ),
            FlagColumn::Categorical(cells) => FlagColumn::Categorical(
                positions
                    .iter()
                    .map(|p| p.map(|i| cells[i].clone()).unwrap_or_default())
                    .collect(),
            ),
        }
    }
}

/// Serializable view of one flag column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnExport {
    Ordinal {
        flag: Vec<String>,
    },
    Categorical {
        flag: Vec<String>,
        comment: Vec<String>,
        cause: Vec<String>,
        commit: Vec<String>,
    },
}
