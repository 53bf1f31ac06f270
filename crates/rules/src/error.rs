//! Error type shared by every stage of a QC run.

use tsqc_core::CoreError;

/// Errors that can occur while compiling or executing a QC run.
#[derive(Debug, thiserror::Error)]
pub enum QcError {
    /// Timestamps handed to a windowed test are not strictly increasing.
    #[error("timestamps are not strictly increasing at position {position}")]
    NonMonotonicInput { position: usize },

    /// The data index has no fixed sampling period.
    #[error("no fixed sampling frequency deducible from the data index")]
    MissingFrequency,

    /// A test cell names a function outside the registry.
    #[error("{}", undefined_test_message(.name, .variable, .row, .suggestion))]
    UndefinedTest {
        name: String,
        variable: String,
        /// 1-based configuration row.
        row: usize,
        suggestion: Option<String>,
    },

    /// A free-form expression evaluated to a scalar or a wrongly sized array.
    #[error("expression '{expression}' does not yield an array matching the window")]
    NonArrayResult { expression: String },

    /// A free-form expression evaluated to a non-boolean array.
    #[error("expression '{expression}' does not yield a boolean result")]
    NonBooleanResult { expression: String },

    /// A flag value outside the configured severity scale.
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    /// Expression syntax error.
    #[error("parse error in '{input}' at position {position}: {message}")]
    Parse {
        input: String,
        position: usize,
        message: String,
    },

    #[error("invalid parameter '{param}' for test '{test}': {reason}")]
    InvalidParameter {
        test: String,
        param: String,
        reason: String,
    },

    #[error("test '{test}' requires parameter '{param}'")]
    MissingParameter { test: String, param: String },

    /// An expression references a name that is neither a variable nor a builtin.
    #[error("unknown variable or name: {0}")]
    UnknownVariable(String),

    /// A flag column does not have the layout the flagger expects.
    #[error("flag layout mismatch: flagger expects {expected} columns, found {found}")]
    FlagLayoutMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl QcError {
    /// Errors confined to a single test cell; these may be skipped in
    /// continue mode instead of failing the run.
    pub fn is_cell_local(&self) -> bool {
        matches!(
            self,
            QcError::NonArrayResult { .. } | QcError::NonBooleanResult { .. }
        )
    }

    pub(crate) fn parse(input: &str, position: usize, message: impl Into<String>) -> Self {
        QcError::Parse {
            input: input.to_string(),
            position,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(test: &str, param: &str, reason: impl Into<String>) -> Self {
        QcError::InvalidParameter {
            test: test.to_string(),
            param: param.to_string(),
            reason: reason.into(),
        }
    }
}

fn undefined_test_message(
    name: &str,
    variable: &str,
    row: &usize,
    suggestion: &Option<String>,
) -> String {
    let mut msg = format!(
        "function name '{}' is not defined (variable '{}', line: {})",
        name, variable, row
    );
    if let Some(s) = suggestion {
        msg.push_str(&format!(". Did you mean '{}'?", s));
    }
    msg
}

/// Result alias for QC operations.
pub type Result<T> = std::result::Result<T, QcError>;
