//! Engine loop that owns every symbol's VWAP counter.

pub mod vwap_engine;

pub use vwap_engine::{format_vwap_line, EngineState, VwapEngine};
