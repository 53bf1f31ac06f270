use tsqc_core::config::{FlaggerKind, SetPolicy};

use super::{check_mask, ColumnExport, FlagColumn, FlagExtra, FlagScale, Flagger, Severity};
use crate::error::{QcError, Result};

/// One severity per cell; setting a flag overwrites the cell.
#[derive(Debug, Clone, Default)]
pub struct OrdinalFlagger {
    scale: FlagScale,
    policy: SetPolicy,
}

impl OrdinalFlagger {
    pub fn new(scale: FlagScale, policy: SetPolicy) -> Self {
        Self { scale, policy }
    }

    fn cells<'a>(&self, column: &'a FlagColumn) -> Result<&'a [Option<Severity>]> {
        match column {
            FlagColumn::Ordinal(cells) => Ok(cells),
            other => Err(QcError::FlagLayoutMismatch {
                expected: "ordinal",
                found: other.layout(),
            }),
        }
    }
}

impl Flagger for OrdinalFlagger {
    fn kind(&self) -> FlaggerKind {
        FlaggerKind::Ordinal
    }

    fn scale(&self) -> &FlagScale {
        &self.scale
    }

    fn policy(&self) -> SetPolicy {
        self.policy
    }

    fn empty(&self, len: usize) -> FlagColumn {
        FlagColumn::Ordinal(vec![Some(self.scale.unflagged()); len])
    }

    fn untouched(&self, len: usize) -> FlagColumn {
        FlagColumn::Ordinal(vec![None; len])
    }

    fn init_untouched(&self, column: &mut FlagColumn) -> Result<()> {
        self.check_layout(column)?;
        if let FlagColumn::Ordinal(cells) = column {
            let unflagged = self.scale.unflagged();
            cells
                .iter_mut()
                .filter(|c| c.is_none())
                .for_each(|c| *c = Some(unflagged));
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
        if let FlagColumn::Ordinal(cells) = column {
            for (cell, &hit) in cells.iter_mut().zip(mask) {
                if hit && self.accepts(*cell, severity, extra.force) {
                    *cell = Some(severity);
                }
            }
        }
        Ok(())
    }

    fn merge(&self, a: &FlagColumn, b: &FlagColumn) -> Result<FlagColumn> {
        let (a, b) = (self.cells(a)?, self.cells(b)?);
        if a.len() != b.len() {
            return Err(QcError::invalid(
                "merge",
                "flags",
                format!("columns differ in length ({} vs {})", a.len(), b.len()),
            ));
        }
        // None orders below Some, so untouched cells always lose.
        Ok(FlagColumn::Ordinal(
            a.iter().zip(b).map(|(x, y)| (*x).max(*y)).collect(),
        ))
    }

    fn export(&self, column: &FlagColumn) -> Result<ColumnExport> {
        let cells = self.cells(column)?;
        Ok(ColumnExport::Ordinal {
            flag: cells.iter().map(|c| self.scale.label(*c)).collect(),
        })
    }
}
