//! Error handling for the VWAP engine.

use thiserror::Error;

/// Main error type for the VWAP engine
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range price/volume numeral
    #[error("Parse error: {field} {value:?}: {reason}")]
    Parse {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Eviction or peek attempted on an empty window
    #[error("Window is empty")]
    EmptyWindow,

    /// Trade for a symbol that was not configured
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// VWAP requested while the window holds no volume
    #[error("No VWAP data for {0}: window volume is zero")]
    NoData(String),

    /// Connection lost, handshake failure or feed closed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine has already been run
    #[error("Engine is not in the starting state")]
    EngineStopped,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Websocket protocol errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Endpoint URL errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub(crate) fn parse(field: &'static str, value: &str, reason: impl ToString) -> Self {
        Error::Parse {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the engine loop may log this error and carry on with the next message.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::UnknownSymbol(_) | Error::NoData(_)
        )
    }
}

/// Result type for the VWAP engine
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_error = Error::Config("missing field".to_string());
        assert_eq!(config_error.to_string(), "Configuration error: missing field");

        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let wrapped_io_error = Error::from(io_error);
        assert!(wrapped_io_error.to_string().contains("I/O error"));

        let parse_error = Error::parse("price", "abc", "invalid decimal");
        assert_eq!(parse_error.to_string(), "Parse error: price \"abc\": invalid decimal");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::parse("size", "", "empty").is_recoverable());
        assert!(Error::UnknownSymbol("DOGE-USD".into()).is_recoverable());
        assert!(Error::NoData("BTC-USD".into()).is_recoverable());

        assert!(!Error::EmptyWindow.is_recoverable());
        assert!(!Error::Transport("closed".into()).is_recoverable());
        assert!(!Error::EngineStopped.is_recoverable());
    }
}
