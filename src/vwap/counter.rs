//! Per-symbol VWAP accumulator over a sliding trade-count window.

use rust_decimal::{Decimal, RoundingStrategy};

use super::window::{BoundedQueue, FixedWindow};
use crate::utils::error::{Error, Result};
use crate::utils::types::{exact_add, exact_sub, TradeEvent};

/// Fractional digits kept when dividing for the reported VWAP.
pub const VWAP_SCALE: u32 = 8;

/// Incremental VWAP calculation.
pub trait VwapCalculator: Send {
    /// Feed one trade given as decimal strings. On error nothing changes.
    fn update(&mut self, price: &str, volume: &str) -> Result<()>;

    /// Current VWAP, rounded to [`VWAP_SCALE`] digits.
    fn vwap(&self) -> Result<Decimal>;
}

/// Running Σ(price·volume) and Σ(volume) over the last `W` trades of one symbol.
#[derive(Debug, Clone)]
pub struct VwapCounter {
    symbol: String,
    sum_price_volume: Decimal,
    sum_volume: Decimal,
    window: FixedWindow<TradeEvent>,
}

impl VwapCounter {
    pub fn new(symbol: impl Into<String>, window_size: usize) -> Result<Self> {
        Ok(Self {
            symbol: symbol.into(),
            sum_price_volume: Decimal::ZERO,
            sum_volume: Decimal::ZERO,
            window: FixedWindow::new(window_size)?,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Add an already-parsed trade, evicting the oldest one when full.
    ///
    /// New totals are computed before anything is touched; a trade that would
    /// push either total past exact decimal range is rejected with the
    /// counter unchanged.
    pub fn push_trade(&mut self, trade: TradeEvent) -> Result<()> {
        let notional = trade.notional()?;
        let (mut sum_price_volume, mut sum_volume) = (self.sum_price_volume, self.sum_volume);
        if self.window.is_full() {
            let evicted = self.window.head()?;
            sum_price_volume = exact_sub(sum_price_volume, evicted.notional()?)
                .ok_or_else(|| self.out_of_range(&trade))?;
            sum_volume = exact_sub(sum_volume, evicted.volume).ok_or_else(|| self.out_of_range(&trade))?;
        }
        let sum_price_volume =
            exact_add(sum_price_volume, notional).ok_or_else(|| self.out_of_range(&trade))?;
        let sum_volume = exact_add(sum_volume, trade.volume).ok_or_else(|| self.out_of_range(&trade))?;

        self.window.push(trade);
        self.sum_price_volume = sum_price_volume;
        self.sum_volume = sum_volume;

        debug_assert!(self.is_consistent(), "running totals drifted for {}", self.symbol);
        Ok(())
    }

    fn out_of_range(&self, trade: &TradeEvent) -> Error {
        Error::parse(
            "volume",
            &trade.volume.to_string(),
            format!("window totals for {} would exceed exact decimal range", self.symbol),
        )
    }

    pub fn sum_price_volume(&self) -> Decimal {
        self.sum_price_volume
    }

    pub fn sum_volume(&self) -> Decimal {
        self.sum_volume
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window.capacity()
    }

    /// Oldest trade still counted.
    pub fn head(&self) -> Result<&TradeEvent> {
        self.window.head()
    }

    /// Recompute both sums from the window and compare with the running totals.
    pub fn is_consistent(&self) -> bool {
        let totals = self.window.iter().try_fold((Decimal::ZERO, Decimal::ZERO), |(pv, v), t| {
            Some((exact_add(pv, t.notional().ok()?)?, exact_add(v, t.volume)?))
        });
        totals == Some((self.sum_price_volume, self.sum_volume))
    }
}

impl VwapCalculator for VwapCounter {
    fn update(&mut self, price: &str, volume: &str) -> Result<()> {
        let trade = TradeEvent::parse(price, volume)?;
        self.push_trade(trade)
    }

    fn vwap(&self) -> Result<Decimal> {
        if self.sum_volume.is_zero() {
            return Err(Error::NoData(self.symbol.clone()));
        }
        let vwap = self
            .sum_price_volume
            .checked_div(self.sum_volume)
            .ok_or_else(|| Error::InvalidArgument(format!("VWAP overflow for {}", self.symbol)))?;
        Ok(vwap.round_dp_with_strategy(VWAP_SCALE, RoundingStrategy::MidpointAwayFromZero))
    }
}
