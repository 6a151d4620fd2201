use once_cell::sync::OnceCell;
use std::error::Error;
use std::net::SocketAddr;

use metrics::{describe_counter, increment_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const TRADES_PROCESSED: &str = "vwap_trades_processed_total";
pub const PARSE_ERRORS: &str = "vwap_parse_errors_total";
pub const UNKNOWN_SYMBOL: &str = "vwap_unknown_symbol_total";
pub const MESSAGES_SKIPPED: &str = "vwap_messages_skipped_total";
pub const DECODE_ERRORS: &str = "vwap_decode_errors_total";

static LISTEN_ADDR: OnceCell<SocketAddr> = OnceCell::new();

/// Install the global Prometheus recorder with an HTTP scrape endpoint on
/// `listen_addr`.
///
/// Must run inside a Tokio runtime. Without an address nothing is installed
/// and the counters below are no-ops. Calling it again after a success is a
/// no-op.
pub fn init(listen_addr: Option<SocketAddr>) -> Result<(), Box<dyn Error + Send + Sync>> {
    let Some(addr) = listen_addr else {
        return Ok(());
    };
    if LISTEN_ADDR.get().is_some() {
        return Ok(()); // already initialised
    }

    PrometheusBuilder::new().with_http_listener(addr).install()?;
    let _ = LISTEN_ADDR.set(addr);
    describe();
    log::info!("Prometheus metrics listening on http://{}/metrics", addr);
    Ok(())
}

fn describe() {
    describe_counter!(TRADES_PROCESSED, "Trades applied to a VWAP window");
    describe_counter!(PARSE_ERRORS, "Trades rejected for malformed price or size");
    describe_counter!(UNKNOWN_SYMBOL, "Trades for symbols that are not configured");
    describe_counter!(MESSAGES_SKIPPED, "Feed messages that are not trades");
    describe_counter!(DECODE_ERRORS, "Feed messages that were not valid JSON");
}

pub(crate) fn trade_processed(symbol: &str) {
    increment_counter!(TRADES_PROCESSED, "symbol" => symbol.to_string());
}

pub(crate) fn parse_error(symbol: &str) {
    increment_counter!(PARSE_ERRORS, "symbol" => symbol.to_string());
}

pub(crate) fn unknown_symbol() {
    increment_counter!(UNKNOWN_SYMBOL);
}

pub(crate) fn message_skipped(kind: &str) {
    increment_counter!(MESSAGES_SKIPPED, "kind" => kind.to_string());
}

pub(crate) fn decode_error() {
    increment_counter!(DECODE_ERRORS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_without_address_is_noop() {
        init(None).unwrap();
        assert!(LISTEN_ADDR.get().is_none());
        // counters without a recorder must not panic
        trade_processed("BTC-USD");
        unknown_symbol();
    }
}
