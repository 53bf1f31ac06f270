//! The closed set of test functions a configuration cell may name.

use std::fmt;

/// Parameters every test function accepts.
pub const COMMON_PARAMS: &[&str] = &[
    "flag",
    "comment",
    "cause",
    "commit",
    "force",
    "flag_period",
    "flag_values",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestFunction {
    /// Free-form boolean condition (`func=`).
    Generic,
    /// Values outside `[min, max]`.
    Range,
    /// Values outside `[min, max]` within a recurring calendar season.
    SeasonalRange,
    /// Runs of near-constant values lasting at least `length`.
    Constant,
    /// Median-absolute-deviation outliers.
    Mad,
    /// Missing samples.
    Missing,
    /// Fills short gaps in the data; sets no flags.
    Interpolate,
    /// Sets no flags itself; carries `flag_values`/`flag_period`.
    Propagate,
    /// Resets flags to unflagged.
    Clear,
    /// Sets `flag` on every sample regardless of the set policy.
    Force,
    /// No-op placeholder for manually maintained flags.
    Manual,
}

impl TestFunction {
    pub const ALL: [TestFunction; 11] = [
        TestFunction::Generic,
        TestFunction::Range,
        TestFunction::SeasonalRange,
        TestFunction::Constant,
        TestFunction::Mad,
        TestFunction::Missing,
        TestFunction::Interpolate,
        TestFunction::Propagate,
        TestFunction::Clear,
        TestFunction::Force,
        TestFunction::Manual,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TestFunction::Generic => "generic",
            TestFunction::Range => "range",
            TestFunction::SeasonalRange => "seasonal_range",
            TestFunction::Constant => "constant",
            TestFunction::Mad => "mad",
            TestFunction::Missing => "missing",
            TestFunction::Interpolate => "interpolate",
            TestFunction::Propagate => "propagate",
            TestFunction::Clear => "clear",
            TestFunction::Force => "force",
            TestFunction::Manual => "manual",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.name()).collect()
    }

    /// Function-specific parameters, in addition to [`COMMON_PARAMS`].
    pub fn params(self) -> &'static [&'static str] {
        match self {
            TestFunction::Generic => &["func"],
            TestFunction::Range => &["min", "max"],
            TestFunction::SeasonalRange => &[
                "min",
                "max",
                "startmonth",
                "startday",
                "endmonth",
                "endday",
            ],
            TestFunction::Constant => &["eps", "length", "thmin"],
            TestFunction::Mad => &["length", "z", "deriv", "step"],
            TestFunction::Interpolate => &["limit"],
            TestFunction::Missing
            | TestFunction::Propagate
            | TestFunction::Clear
            | TestFunction::Force
            | TestFunction::Manual => &[],
        }
    }

    pub fn accepts_param(self, param: &str) -> bool {
        self.params().contains(&param) || COMMON_PARAMS.contains(&param)
    }

    pub fn all_params(self) -> Vec<&'static str> {
        self.params().iter().chain(COMMON_PARAMS).copied().collect()
    }
}

impl fmt::Display for TestFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
