//! Flags of every variable, aligned with the data frame's index.

use std::ops::Range;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tsqc_core::{check_strictly_increasing, CoreError};

use super::{ColumnExport, FlagColumn, Flagger};
use crate::error::{QcError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagTable {
    index: Vec<DateTime<Utc>>,
    columns: IndexMap<String, FlagColumn>,
}

/// Serializable view of a whole flag table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableExport {
    pub index: Vec<DateTime<Utc>>,
    pub columns: IndexMap<String, ColumnExport>,
}

impl FlagTable {
    pub fn new(index: Vec<DateTime<Utc>>) -> Result<Self> {
        check_strictly_increasing(&index)
            .map_err(|position| QcError::NonMonotonicInput { position })?;
        Ok(Self {
            index,
            columns: IndexMap::new(),
        })
    }

    /// A table with an untouched column for each name.
    pub fn untouched<'a>(
        flagger: &dyn Flagger,
        index: &[DateTime<Utc>],
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let mut table = Self::new(index.to_vec())?;
        for name in names {
            table.columns.insert(name.to_string(), flagger.untouched(index.len()));
        }
        Ok(table)
    }

    pub fn insert(&mut self, name: impl Into<String>, column: FlagColumn) -> Result<()> {
        let name = name.into();
        if column.len() != self.index.len() {
            return Err(CoreError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                actual: column.len(),
            }
            .into());
        }
        self.columns.insert(name, column);
        Ok(())
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

    pub fn column(&self, name: &str) -> Option<&FlagColumn> {
        self.columns.get(name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut FlagColumn> {
        self.columns.get_mut(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn columns(&self) -> &IndexMap<String, FlagColumn> {
        &self.columns
    }

    /// Copy of the rows in `range`, all columns.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            index: self.index[range.clone()].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, c)| (k.clone(), c.slice(range.clone())))
                .collect(),
        }
    }

    /// Replace the rows in `range` with the rows of `chunk`. Columns only
    /// present in `chunk` are ignored; nothing outside `range` changes.
    pub fn write_back(&mut self, range: Range<usize>, chunk: &FlagTable) -> Result<()> {
        if chunk.len() != range.len() {
            return Err(CoreError::LengthMismatch {
                column: "<index>".to_string(),
                expected: range.len(),
                actual: chunk.len(),
            }
            .into());
        }
        for (name, column) in self.columns.iter_mut() {
            if let Some(src) = chunk.columns.get(name) {
                column.splice(range.clone(), src)?;
            }
        }
        Ok(())
    }

    /// Union of two tables keyed by timestamp.
    ///
    /// The result's index is the sorted union of both indices. Cells
    /// present on one side only merge against an untouched cell; `self`
    /// counts as the older state.
    pub fn merge(&self, other: &FlagTable, flagger: &dyn Flagger) -> Result<FlagTable> {
        let mut index: Vec<DateTime<Utc>> =
            self.index.iter().chain(&other.index).copied().collect();
        index.sort_unstable();
        index.dedup();

        let left = self.align_to(&index);
        let right = other.align_to(&index);

        let mut merged = FlagTable::new(index)?;
        for name in self.column_names().chain(other.column_names()) {
            if merged.columns.contains_key(name) {
                continue;
            }
            let untouched = flagger.untouched(merged.len());
            let a = left.column(name).unwrap_or(&untouched);
            let b = right.column(name).unwrap_or(&untouched);
            merged.columns.insert(name.to_string(), flagger.merge(a, b)?);
        }
        Ok(merged)
    }

    /// Restrict or extend the table to `index`. Timestamps missing from
    /// this table come back untouched.
    pub fn align_to(&self, index: &[DateTime<Utc>]) -> FlagTable {
        let positions: Vec<Option<usize>> = index
            .iter()
            .map(|t| self.index.binary_search(t).ok())
            .collect();
        FlagTable {
            index: index.to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, c)| (k.clone(), c.gather(&positions)))
                .collect(),
        }
    }

    pub fn export(&self, flagger: &dyn Flagger) -> Result<TableExport> {
        let columns = self
            .columns
            .iter()
            .map(|(k, c)| Ok((k.clone(), flagger.export(c)?)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(TableExport {
            index: self.index.clone(),
            columns,
        })
    }
    // ── JSON state ──────────────────────────────────────────────────

    /// Read a table written by [`FlagTable::to_json_string`], checking the
    /// index order and every column length.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: FlagTable = serde_json::from_str(s).map_err(CoreError::from)?;
        let mut table = Self::new(raw.index)?;
        for (name, column) in raw.columns {
            table.insert(name, column)?;
        }
        Ok(table)
    }

    /// Full flag state, including categorical history, as JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self).map_err(CoreError::from)?)
    }
}
