//! Coinbase Exchange websocket codec.
//!
//! Only the handful of fields the VWAP engine needs are decoded; everything
//! else in the feed payload is ignored by serde.

use serde::{Deserialize, Serialize};

use crate::utils::error::{Error, Result};

/// Public Coinbase Exchange market data feed.
pub const DEFAULT_COINBASE_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// Feed `type` of an executed trade.
pub const MATCH: &str = "match";
/// Feed `type` of a subscription acknowledgement.
pub const SUBSCRIPTIONS: &str = "subscriptions";
/// Feed `type` of a server-side error report.
pub const ERROR: &str = "error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelName {
    Matches,
    Heartbeat,
    Status,
    Ticker,
    Level2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: ChannelName,
    pub product_ids: Vec<String>,
}

/// Subscribe/unsubscribe request, e.g.
/// `{"type":"subscribe","channels":[{"name":"matches","product_ids":["BTC-USD"]}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub kind: RequestType,
    pub channels: Vec<Channel>,
}

impl Subscription {
    pub fn subscribe(name: ChannelName, product_ids: &[String]) -> Self {
        Self::single(RequestType::Subscribe, name, product_ids)
    }

    pub fn unsubscribe(name: ChannelName, product_ids: &[String]) -> Self {
        Self::single(RequestType::Unsubscribe, name, product_ids)
    }

    fn single(kind: RequestType, name: ChannelName, product_ids: &[String]) -> Self {
        Self {
            kind,
            channels: vec![Channel { name, product_ids: product_ids.to_vec() }],
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Channel entry of a `subscriptions` acknowledgement. Names are kept as
/// plain strings since the server may report channels we never request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscribedChannel {
    pub name: String,
    #[serde(default)]
    pub product_ids: Vec<String>,
}

/// Any inbound feed message, reduced to the fields we look at.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub product_id: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub channels: Option<Vec<SubscribedChannel>>,
    pub message: Option<String>,
    pub reason: Option<String>,
}

impl FeedMessage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A trade ready to be routed: symbol plus the raw decimal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchMessage {
    pub product_id: String,
    pub price: String,
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Trade(MatchMessage),
    SubscriptionAck(Vec<SubscribedChannel>),
    FeedError(String),
    Ignored(String),
}

/// Decides which message kinds count as trades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    trade_kinds: Vec<String>,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self { trade_kinds: vec![MATCH.to_string()] }
    }
}

impl MessageFilter {
    pub fn new<I, S>(trade_kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { trade_kinds: trade_kinds.into_iter().map(Into::into).collect() }
    }

    pub fn is_trade(&self, kind: &str) -> bool {
        self.trade_kinds.iter().any(|k| k == kind)
    }

    /// Sort a decoded message. A trade missing one of its fields is a parse error.
    pub fn classify(&self, msg: FeedMessage) -> Result<Classified> {
        if self.is_trade(&msg.kind) {
            let product_id = required("product_id", msg.product_id)?;
            let price = required("price", msg.price)?;
            let size = required("size", msg.size)?;
            return Ok(Classified::Trade(MatchMessage { product_id, price, size }));
        }
        Ok(match msg.kind.as_str() {
            | SUBSCRIPTIONS => Classified::SubscriptionAck(msg.channels.unwrap_or_default()),
            | ERROR => {
                let mut text = msg.message.unwrap_or_else(|| "unspecified".to_string());
                if let Some(reason) = msg.reason {
                    text = format!("{}: {}", text, reason);
                }
                Classified::FeedError(text)
            }
            | _ => Classified::Ignored(msg.kind),
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| Error::parse(field, "", "missing from trade message"))
}
