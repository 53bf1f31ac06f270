//! Configuration-driven quality control for time series.
//!
//! This crate provides:
//! - YAML test configuration tables ([`schema`])
//! - A restricted expression language for test cells ([`dsl`])
//! - The closed registry of built-in tests ([`evaluator`])
//! - Ordinal and categorical flag storage behind one trait ([`flagger`])
//! - Windowed statistics and the index scanner they share ([`stats`], [`scanner`])
//! - The column-major runner with forward flag propagation ([`scheduler`])

pub mod dsl;
pub mod error;
pub mod evaluator;
pub mod flagger;
pub mod scanner;
pub mod scheduler;
pub mod schema;
pub mod stats;

pub use error::{QcError, Result};
pub use evaluator::{evaluate, evaluate_call, CompiledTest, EvalContext, TestFunction};
pub use flagger::{
    flagger_from_settings, CategoricalFlagger, FlagColumn, FlagScale, FlagTable, Flagger,
    OrdinalFlagger, Severity,
};
pub use scheduler::{extend, QcOutput, QcRunner, RunReport, RunState, RunnerSettings};
pub use schema::{ConfigTable, TestSpec};
