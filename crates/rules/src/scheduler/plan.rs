//! [`TestPlan`]: every configuration cell compiled up front.

use tracing::debug;

use crate::error::Result;
use crate::evaluator::CompiledTest;
use crate::flagger::Flagger;
use crate::schema::ConfigTable;

/// Compiled cells indexed by test column, then configuration row.
#[derive(Debug, Clone, Default)]
pub struct TestPlan {
    columns: Vec<Vec<Option<CompiledTest>>>,
}

impl TestPlan {
    /// Compile every non-empty cell. The first failure aborts, so a bad
    /// function name is reported before any test runs.
    pub fn compile(config: &ConfigTable, flagger: &dyn Flagger) -> Result<Self> {
        let mut columns = Vec::with_capacity(config.column_count());
        for column in 0..config.column_count() {
            let cells = config
                .rows()
                .iter()
                .enumerate()
                .map(|(row, spec)| {
                    spec.cell(column)
                        .map(|cell| CompiledTest::compile(cell, &spec.variable, row + 1, flagger))
                        .transpose()
                })
                .collect::<Result<Vec<_>>>()?;
            columns.push(cells);
        }

        let plan = Self { columns };
        debug!(
            columns = plan.column_count(),
            tests = plan.test_count(),
            "compiled test plan"
        );
        Ok(plan)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of non-empty cells.
    pub fn test_count(&self) -> usize {
        self.columns.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<&CompiledTest> {
        self.columns.get(column)?.get(row)?.as_ref()
    }
}
