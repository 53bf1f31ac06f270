pub mod config;
pub mod duration;
pub mod error;
pub mod frame;

pub use config::QcSettings;
pub use duration::*;
pub use error::*;
pub use frame::*;
