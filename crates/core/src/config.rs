use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key = %key, value = %v, "unparseable setting, using default");
                default
            }
        },
        None => default,
    }
}

// ── Setting enums ─────────────────────────────────────────────

/// What the runner does when a single test cell produces a wrongly shaped
/// or typed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Skip the offending cell with a warning and keep going.
    #[default]
    Continue,
    /// Fail the whole run.
    Abort,
}

/// Which flag representation a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlaggerKind {
    #[default]
    Ordinal,
    Categorical,
}

/// Whether setting a flag may lower an existing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SetPolicy {
    /// Write unconditionally.
    #[default]
    Overwrite,
    /// Only write when the new severity is at least the current one.
    Escalate,
}

macro_rules! str_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => write!(f, $name),)+
                }
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(format!("unknown {}: '{}'", stringify!($ty), other)),
                }
            }
        }
    };
}

str_enum!(ErrorMode { Continue => "continue", Abort => "abort" });
str_enum!(FlaggerKind { Ordinal => "ordinal", Categorical => "categorical" });
str_enum!(SetPolicy { Overwrite => "overwrite", Escalate => "escalate" });

// ── Top-level settings ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcSettings {
    /// Sentinel marking missing samples in addition to NaN.
    pub nodata: f64,
    pub error_mode: ErrorMode,
    pub flagger: FlaggerKind,
    pub set_policy: SetPolicy,
    /// Commit id recorded with categorical flags.
    pub commit: String,
}

impl Default for QcSettings {
    fn default() -> Self {
        Self {
            nodata: f64::NAN,
            error_mode: ErrorMode::default(),
            flagger: FlaggerKind::default(),
            set_policy: SetPolicy::default(),
            commit: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl QcSettings {
    /// Build settings from `QC_*` environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            nodata: env_parse("QC_NODATA", defaults.nodata),
            error_mode: env_parse("QC_ERROR_MODE", defaults.error_mode),
            flagger: env_parse("QC_FLAGGER", defaults.flagger),
            set_policy: env_parse("QC_SET_POLICY", defaults.set_policy),
            commit: env_opt("QC_COMMIT").unwrap_or(defaults.commit),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("QC settings loaded:");
        tracing::info!("  nodata:      {}", self.nodata);
        tracing::info!("  error_mode:  {}", self.error_mode);
        tracing::info!("  flagger:     {}", self.flagger);
        tracing::info!("  set_policy:  {}", self.set_policy);
        tracing::info!("  commit:      {}", self.commit);
    }
}
