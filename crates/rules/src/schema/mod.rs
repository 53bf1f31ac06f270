//! The test configuration table.
//!
//! A YAML list of rows, one per variable and time window. Position `k` of a
//! row's `tests` list belongs to test column `k`; `~` (or a blank string)
//! leaves that cell empty.
//!
//! ```yaml
//! - variable: var1
//!   start: 2017-01-01T00:00:00Z
//!   tests:
//!     - "range(min=10, max=20)"
//!     - ~
//! ```

mod table;

pub use table::{ConfigTable, TestSpec};

#[cfg(test)]
mod tests;
