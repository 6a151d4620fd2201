//! Market data plumbing: the Coinbase codec, the engine/transport channel
//! pair and the websocket transport.

pub mod coinbase;
pub mod feed;
pub mod ws;

pub use coinbase::{
    ChannelName, Classified, FeedMessage, MatchMessage, MessageFilter, Subscription,
    DEFAULT_COINBASE_URL,
};
pub use feed::{channel_pair, ChannelFeed, MarketFeed, TransportChannels};
pub use ws::WsClient;
