//! Duplex message channels between the engine and a transport.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::utils::error::Result;

/// Engine-side view of a market data transport.
#[async_trait]
pub trait MarketFeed: Send {
    /// Handle for outbound requests. Cloneable so a request can be sent
    /// from a detached task without blocking the caller.
    fn publisher(&self) -> Sender<Vec<u8>>;

    /// Next raw inbound message, or a transport failure. `None` once the
    /// transport has gone away.
    async fn next_message(&mut self) -> Option<Result<Vec<u8>>>;
}

/// `mpsc`-backed [`MarketFeed`].
pub struct ChannelFeed {
    outbound: Sender<Vec<u8>>,
    inbound: Receiver<Result<Vec<u8>>>,
}

/// Transport-side ends of a [`ChannelFeed`].
pub struct TransportChannels {
    /// Requests the engine wants written to the wire.
    pub outbound: Receiver<Vec<u8>>,
    /// Where the transport delivers inbound messages and failures.
    pub inbound: Sender<Result<Vec<u8>>>,
}

/// Create a connected feed/transport pair.
///
/// `capacity` bounds each direction; a full inbound channel stalls the
/// transport's reads until the engine catches up.
pub fn channel_pair(capacity: usize) -> (ChannelFeed, TransportChannels) {
    let capacity = capacity.max(1);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let (in_tx, in_rx) = mpsc::channel(capacity);
    (
        ChannelFeed { outbound: out_tx, inbound: in_rx },
        TransportChannels { outbound: out_rx, inbound: in_tx },
    )
}

#[async_trait]
impl MarketFeed for ChannelFeed {
    fn publisher(&self) -> Sender<Vec<u8>> {
        self.outbound.clone()
    }

    async fn next_message(&mut self) -> Option<Result<Vec<u8>>> {
        self.inbound.recv().await
    }
}
