//! Utility functions and types for the VWAP engine.

pub mod error;
mod logging;
pub mod types;

pub use error::{Error, Result};
pub use logging::init_logging;
pub use types::*;

