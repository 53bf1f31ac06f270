//! Flag state abstraction.
//!
//! A [`Flagger`] owns the severity scale and the set policy and knows how to
//! read, write, merge and export one [`FlagColumn`] layout. Callers hold a
//! `Box<dyn Flagger>` and never depend on the concrete variant:
//!
//! - [`OrdinalFlagger`]: one severity per cell, overwritten in place.
//! - [`CategoricalFlagger`]: an append-only history of entries carrying
//!   comment, cause and commit id; the last entry is the current flag.

mod categorical;
mod column;
mod ordinal;
mod scale;
mod table;

#[cfg(test)]
mod tests;

use std::fmt;

use tsqc_core::config::{FlaggerKind, SetPolicy};
use tsqc_core::QcSettings;

use crate::error::{QcError, Result};

pub use categorical::CategoricalFlagger;
pub use column::{ColumnExport, FlagColumn, FlagEntry, FlagExtra};
pub use ordinal::OrdinalFlagger;
pub use scale::{Comparator, FlagScale, Severity, NIL_LABEL};
pub use table::{FlagTable, TableExport};

/// Reads and writes flag columns of one layout.
pub trait Flagger: fmt::Debug + Send + Sync {
    fn kind(&self) -> FlaggerKind;

    fn scale(&self) -> &FlagScale;

    fn policy(&self) -> SetPolicy;

    /// A column of `len` cells, all set to the scale's unflagged level.
    fn empty(&self, len: usize) -> FlagColumn;

    /// A column of `len` cells no test has touched (rendered `NIL`).
    fn untouched(&self, len: usize) -> FlagColumn;

    /// Initialize every untouched cell to unflagged. Touched cells keep
    /// their value.
    fn init_untouched(&self, column: &mut FlagColumn) -> Result<()>;

    /// Write `severity` at every position where `mask` is set, subject to
    /// the set policy unless `extra.force` is given.
    fn set_flag(
        &self,
        column: &mut FlagColumn,
        mask: &[bool],
        severity: Severity,
        extra: &FlagExtra,
    ) -> Result<()>;

    /// Combine two equally long columns cell by cell; `a` is the older state.
    fn merge(&self, a: &FlagColumn, b: &FlagColumn) -> Result<FlagColumn>;

    fn export(&self, column: &FlagColumn) -> Result<ColumnExport>;

    fn layout(&self) -> &'static str {
        match self.kind() {
            FlaggerKind::Ordinal => "ordinal",
            FlaggerKind::Categorical => "categorical",
        }
    }

    fn check_layout(&self, column: &FlagColumn) -> Result<()> {
        if column.layout() == self.layout() {
            Ok(())
        } else {
            Err(QcError::FlagLayoutMismatch {
                expected: self.layout(),
                found: column.layout(),
            })
        }
    }

    /// Cells whose current severity satisfies `current <cmp> reference`.
    /// Untouched cells never match.
    fn is_flagged(
        &self,
        column: &FlagColumn,
        cmp: Comparator,
        reference: Severity,
    ) -> Result<Vec<bool>> {
        self.check_layout(column)?;
        self.scale().check(reference)?;
        Ok(column
            .currents()
            .into_iter()
            .map(|cell| cell.is_some_and(|s| cmp.apply(s, reference)))
            .collect())
    }

    /// Cells flagged worse than the scale's good level.
    fn is_flagged_default(&self, column: &FlagColumn) -> Result<Vec<bool>> {
        self.is_flagged(column, Comparator::Gt, self.scale().good())
    }

    fn severity(&self, name: &str) -> Result<Severity> {
        self.scale().resolve(name)
    }

    /// Whether a write of `new` over `current` passes the set policy.
    fn accepts(&self, current: Option<Severity>, new: Severity, force: bool) -> bool {
        if force {
            return true;
        }
        match (self.policy(), current) {
            (SetPolicy::Overwrite, _) | (SetPolicy::Escalate, None) => true,
            (SetPolicy::Escalate, Some(current)) => new >= current,
        }
    }
}

pub(crate) fn check_mask(column: &FlagColumn, mask: &[bool]) -> Result<()> {
    if mask.len() == column.len() {
        Ok(())
    } else {
        Err(QcError::invalid(
            "set_flag",
            "mask",
            format!("mask has {} cells, column has {}", mask.len(), column.len()),
        ))
    }
}

/// Build the flagger selected by the runtime settings with the default scale.
pub fn flagger_from_settings(settings: &QcSettings) -> Box<dyn Flagger> {
    let scale = FlagScale::default();
    match settings.flagger {
        FlaggerKind::Ordinal => Box::new(OrdinalFlagger::new(scale, settings.set_policy)),
        FlaggerKind::Categorical => Box::new(CategoricalFlagger::new(
            scale,
            settings.set_policy,
            settings.commit.clone(),
        )),
    }
}
