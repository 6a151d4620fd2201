//! # Coinbase VWAP
//! Streams trades from the Coinbase Exchange websocket feed and keeps a
//! volume-weighted average price per trading pair over a sliding window of
//! the most recent trades.
//!
//! Data flow: [`market_data::WsClient`] → [`market_data::ChannelFeed`] →
//! [`engine::VwapEngine`] → [`vwap::VwapCounter`] → output sink.

pub use crate::utils::error::{Error, Result};

pub mod config;
pub mod engine;
pub mod market_data;
pub mod metrics;
pub mod utils;
pub mod vwap;
