//! VwapEngine: routes trades from a market feed to per-symbol VWAP counters
//! and writes one line per processed trade to an output sink.

use std::collections::HashMap;

use log::{debug, info, trace, warn};
use rust_decimal::Decimal;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::market_data::coinbase::{ChannelName, Classified, FeedMessage, MatchMessage, MessageFilter, Subscription};
use crate::market_data::feed::MarketFeed;
use crate::metrics;
use crate::utils::error::{Error, Result};
use crate::vwap::{VwapCalculator, VwapCounter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Starting,
    Running,
    Stopped,
}

/// Single-task owner of every symbol's counter.
///
/// Messages are handled one at a time in arrival order, so the output sink
/// never sees a counter halfway through an update.
#[derive(Debug)]
pub struct VwapEngine<W, C = VwapCounter> {
    symbols: Vec<String>,
    counters: HashMap<String, C>,
    filter: MessageFilter,
    writer: W,
    state: EngineState,
}

impl<W> VwapEngine<W, VwapCounter>
where
    W: AsyncWrite + Unpin + Send,
{
    /// One [`VwapCounter`] of `window_size` trades per symbol.
    pub fn new(window_size: usize, symbols: &[String], writer: W) -> Result<Self> {
        Self::with_calculators(symbols, writer, |symbol| VwapCounter::new(symbol, window_size))
    }
}

impl<W, C> VwapEngine<W, C>
where
    W: AsyncWrite + Unpin + Send,
    C: VwapCalculator,
{
    /// Build the engine with a custom calculator per symbol.
    pub fn with_calculators<F>(symbols: &[String], writer: W, mut make: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<C>,
    {
        if symbols.is_empty() {
            return Err(Error::InvalidArgument("at least one symbol is required".into()));
        }
        let mut counters = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            counters.insert(symbol.clone(), make(symbol.as_str())?);
        }
        Ok(Self {
            symbols: symbols.to_vec(),
            counters,
            filter: MessageFilter::default(),
            writer,
            state: EngineState::Starting,
        })
    }

    pub fn with_filter(mut self, filter: MessageFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn counter(&self, symbol: &str) -> Option<&C> {
        self.counters.get(symbol)
    }

    /// Current VWAP of a configured symbol.
    pub fn vwap(&self, symbol: &str) -> Result<Decimal> {
        self.counters
            .get(symbol)
            .ok_or_else(|| Error::UnknownSymbol(symbol.to_string()))?
            .vwap()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Subscribe, then process feed messages until `cancel` fires or the
    /// transport fails.
    ///
    /// Cancellation is observed between messages only; a message being
    /// handled always finishes first.
    pub async fn run<F>(&mut self, cancel: CancellationToken, feed: &mut F) -> Result<()>
    where
        F: MarketFeed + ?Sized,
    {
        if self.state != EngineState::Starting {
            return Err(Error::EngineStopped);
        }

        let request = Subscription::subscribe(ChannelName::Matches, &self.symbols).to_bytes()?;
        let publisher = feed.publisher();
        let symbols = self.symbols.join(",");
        tokio::spawn(async move {
            match publisher.send(request).await {
                | Ok(()) => info!("Subscription sent for {}", symbols),
                | Err(_) => warn!("Transport closed before the subscription was sent"),
            }
        });

        self.state = EngineState::Running;
        let res = self.event_loop(&cancel, feed).await;
        self.state = EngineState::Stopped;
        res
    }

    async fn event_loop<F>(&mut self, cancel: &CancellationToken, feed: &mut F) -> Result<()>
    where
        F: MarketFeed + ?Sized,
    {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Engine cancelled");
                    return Ok(());
                }
                msg = feed.next_message() => msg,
            };

            match next {
                | Some(Ok(bytes)) => self.handle_message(&bytes).await?,
                | Some(Err(e)) => {
                    warn!("Transport failed: {}", e);
                    return Err(e);
                }
                | None => return Err(Error::Transport("inbound feed closed".into())),
            }
        }
    }

    /// Decode, filter and route one raw feed message.
    ///
    /// Only unrecoverable errors are returned; bad or foreign messages are
    /// logged and dropped.
    pub async fn handle_message(&mut self, bytes: &[u8]) -> Result<()> {
        trace!("recv: {}", String::from_utf8_lossy(bytes));

        let msg = match FeedMessage::decode(bytes) {
            | Ok(msg) => msg,
            | Err(e) => {
                warn!("Undecodable feed message: {}", e);
                metrics::decode_error();
                return Ok(());
            }
        };

        match self.filter.classify(msg) {
            | Ok(Classified::Trade(trade)) => self.handle_trade(trade).await,
            | Ok(Classified::SubscriptionAck(channels)) => {
                for ch in channels {
                    info!("Subscribed to {} for {}", ch.name, ch.product_ids.join(","));
                }
                Ok(())
            }
            | Ok(Classified::FeedError(reason)) => {
                warn!("Feed reported an error: {}", reason);
                Ok(())
            }
            | Ok(Classified::Ignored(kind)) => {
                trace!("Skipping {} message", kind);
                metrics::message_skipped(&kind);
                Ok(())
            }
            | Err(e) => {
                warn!("Malformed trade message: {}", e);
                metrics::decode_error();
                Ok(())
            }
        }
    }

    async fn handle_trade(&mut self, trade: MatchMessage) -> Result<()> {
        let Some(counter) = self.counters.get_mut(&trade.product_id) else {
            warn!("{}", Error::UnknownSymbol(trade.product_id.clone()));
            metrics::unknown_symbol();
            return Ok(());
        };

        if let Err(e) = counter.update(&trade.price, &trade.size) {
            if e.is_recoverable() {
                warn!("Skipping trade for {}: {}", trade.product_id, e);
                metrics::parse_error(&trade.product_id);
                return Ok(());
            }
            return Err(e);
        }
        metrics::trade_processed(&trade.product_id);

        let vwap = match counter.vwap() {
            | Ok(vwap) => vwap,
            | Err(e) if e.is_recoverable() => {
                debug!("{}", e);
                return Ok(());
            }
            | Err(e) => return Err(e),
        };

        let line = format_vwap_line(&trade.product_id, vwap);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// `"vwap <symbol>: <value>\n"` with trailing zeros stripped from the value.
pub fn format_vwap_line(symbol: &str, vwap: Decimal) -> String {
    format!("vwap {}: {}\n", symbol, vwap.normalize())
}
