//! QC run execution.
//!
//! The [`QcRunner`] walks a [`ConfigTable`](crate::schema::ConfigTable)
//! column by column: every row of test column `k` runs before any row of
//! column `k + 1`. Each cell sees only its row's time window, and the flags
//! it writes are carried forward by [`extend`] before being written back.

mod core;
mod plan;
mod propagate;
mod report;


pub use self::core::{QcRunner, RunState, RunnerSettings};
pub use self::plan::TestPlan;
pub use self::propagate::extend;
pub use self::report::{QcOutput, RunReport, SkippedCell};
