use tsqc_core::config::{FlaggerKind, SetPolicy};

use super::{
    check_mask, ColumnExport, FlagColumn, FlagEntry, FlagExtra, FlagScale, Flagger, Severity,
};
use crate::error::{QcError, Result};

/// Severity plus provenance; setting a flag appends to the cell's history.
#[derive(Debug, Clone)]
pub struct CategoricalFlagger {
    scale: FlagScale,
    policy: SetPolicy,
    /// Commit id recorded when a test supplies none.
    commit: String,
}

impl CategoricalFlagger {
    pub fn new(scale: FlagScale, policy: SetPolicy, commit: impl Into<String>) -> Self {
        Self {
            scale,
            policy,
            commit: commit.into(),
        }
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    fn histories<'a>(&self, column: &'a FlagColumn) -> Result<&'a [Vec<FlagEntry>]> {
        match column {
            FlagColumn::Categorical(cells) => Ok(cells),
            other => Err(QcError::FlagLayoutMismatch {
                expected: "categorical",
                found: other.layout(),
            }),
        }
    }

    fn unflagged_entry(&self) -> FlagEntry {
        FlagEntry {
            commit: self.commit.clone(),
            ..FlagEntry::bare(self.scale.unflagged())
        }
    }
}

impl Flagger for CategoricalFlagger {
    fn kind(&self) -> FlaggerKind {
        FlaggerKind::Categorical
    }

    fn scale(&self) -> &FlagScale {
        &self.scale
    }

    fn policy(&self) -> SetPolicy {
        self.policy
    }

    fn empty(&self, len: usize) -> FlagColumn {
        FlagColumn::Categorical(vec![vec![self.unflagged_entry()]; len])
    }

    fn untouched(&self, len: usize) -> FlagColumn {
        FlagColumn::Categorical(vec![Vec::new(); len])
    }

    fn init_untouched(&self, column: &mut FlagColumn) -> Result<()> {
        self.check_layout(column)?;
        if let FlagColumn::Categorical(cells) = column {
            for history in cells.iter_mut().filter(|h| h.is_empty()) {
                history.push(self.unflagged_entry());
            }
        }
        Ok(())
    }

    fn set_flag(
        &self,
        column: &mut FlagColumn,
        mask: &[bool],
        severity: Severity,
        extra: &FlagExtra,
    ) -> Result<()> {
        self.check_layout(column)?;
        check_mask(column, mask)?;
        self.scale.check(severity)?;

        let entry = FlagEntry {
            severity,
            comment: extra.comment.clone().unwrap_or_default(),
            cause: extra.cause.clone().unwrap_or_default(),
            commit: extra.commit.clone().unwrap_or_else(|| self.commit.clone()),
            test: extra.test.clone(),
            test_seq: extra.test_seq,
        };
        if let FlagColumn::Categorical(cells) = column {
            for (history, &hit) in cells.iter_mut().zip(mask) {
                let current = history.last().map(|e| e.severity);
                if hit && self.accepts(current, severity, extra.force) {
                    history.push(entry.clone());
                }
            }
        }
        Ok(())
    }

    fn merge(&self, a: &FlagColumn, b: &FlagColumn) -> Result<FlagColumn> {
        let (a, b) = (self.histories(a)?, self.histories(b)?);
        if a.len() != b.len() {
            return Err(QcError::invalid(
                "merge",
                "flags",
                format!("columns differ in length ({} vs {})", a.len(), b.len()),
            ));
        }
        Ok(FlagColumn::Categorical(
            a.iter()
                .zip(b)
                .map(|(older, newer)| older.iter().chain(newer).cloned().collect())
                .collect(),
        ))
    }

    fn export(&self, column: &FlagColumn) -> Result<ColumnExport> {
        let cells = self.histories(column)?;
        let latest = |f: fn(&FlagEntry) -> &str| -> Vec<String> {
            cells
                .iter()
                .map(|h| h.last().map(|e| f(e).to_string()).unwrap_or_default())
                .collect()
        };
        Ok(ColumnExport::Categorical {
            flag: cells
                .iter()
                .map(|h| self.scale.label(h.last().map(|e| e.severity)))
                .collect(),
            comment: latest(|e| e.comment.as_str()),
            cause: latest(|e| e.cause.as_str()),
            commit: latest(|e| e.commit.as_str()),
        })
    }
}
