//! Sliding-window VWAP accumulation: the bounded window and the per-symbol counter.

pub mod counter;
pub mod window;

pub use counter::{VwapCalculator, VwapCounter, VWAP_SCALE};
pub use window::{BoundedQueue, FixedWindow};
