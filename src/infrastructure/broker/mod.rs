//! Broker adapters. The paper broker fills everything at the quoted
//! price through the market-data provider; real adapters live behind the
//! same trait.

use crate::domain::errors::UpstreamError;
use crate::domain::market::ticker::Ticker;
use crate::domain::ports::{BrokerAdapter, BrokerPosition, MarketDataProvider, OrderFill, TradeMode};
use crate::infrastructure::market_data::MarketCalendar;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Simulated broker: quotes from the data provider, immediate full fills,
/// no balance tracking (the trading memory owns position state).
/// Market-hours gating is enforced here, matching a real adapter's
/// behavior: out-of-hours orders surface as `MarketClosed`.
pub struct PaperBroker {
    market: Arc<dyn MarketDataProvider>,
    calendar: MarketCalendar,
    /// Fill out-of-hours orders anyway; used by demo sessions that run
    /// after the close by design.
    pub after_hours: bool,
}

impl PaperBroker {
    pub fn new(market: Arc<dyn MarketDataProvider>, calendar: MarketCalendar) -> Self {
        Self {
            market,
            calendar,
            after_hours: true,
        }
    }

    fn check_hours(&self, ticker: &Ticker) -> Result<(), UpstreamError> {
        if self.after_hours {
            return Ok(());
        }
        let realm = ticker.realm;
        let now = Utc::now();
        let today = now.with_timezone(&realm.timezone()).date_naive();
        if !self.calendar.is_trading_day(realm, today) || self.calendar.is_after_close(realm, now)
        {
            return Err(UpstreamError::MarketClosed(realm.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrokerAdapter for PaperBroker {
    async fn quote(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError> {
        self.market.quote(ticker).await
    }

    async fn buy(
        &self,
        ticker: &Ticker,
        amount: Decimal,
        mode: TradeMode,
    ) -> Result<OrderFill, UpstreamError> {
        self.check_hours(ticker)?;
        let price = self.market.quote(ticker).await?;
        if price <= Decimal::ZERO {
            return Err(UpstreamError::Permanent(format!(
                "no quotable price for {}",
                ticker
            )));
        }
        let quantity = (amount / price).trunc();
        info!("Paper {:?} buy: {} x{} @ {}", mode, ticker, quantity, price);
        Ok(OrderFill {
            success: quantity > Decimal::ZERO,
            fill_price: price,
            quantity,
            ts: Utc::now(),
        })
    }

    async fn sell(
        &self,
        ticker: &Ticker,
        quantity: Decimal,
        mode: TradeMode,
    ) -> Result<OrderFill, UpstreamError> {
        self.check_hours(ticker)?;
        let price = self.market.quote(ticker).await?;
        info!("Paper {:?} sell: {} x{} @ {}", mode, ticker, quantity, price);
        Ok(OrderFill {
            success: true,
            fill_price: price,
            quantity,
            ts: Utc::now(),
        })
    }

    async fn portfolio(&self) -> Result<Vec<BrokerPosition>, UpstreamError> {
        // Position state lives in the trading memory; the paper broker
        // carries none of its own.
        Ok(Vec::new())
    }
}
