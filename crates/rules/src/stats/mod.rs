//! Windowed statistical primitives the built-in tests are made of.
//!
//! - constant-run detection ([`constant_mask`])
//! - median-absolute-deviation outliers ([`mad_mask`])
//! - short-gap interpolation ([`interpolate_gaps`])
//! - NaN-aware summary statistics ([`math`])

mod constant;
mod interpolate;
mod mad;
pub mod math;

pub use constant::constant_mask;
pub use interpolate::interpolate_gaps;
pub use mad::{difference_in_place, mad_mask, MAD_NORMALIZER};
