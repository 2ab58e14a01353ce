//! US market data over an Alpaca-style REST API.
//!
//! The S&P 500 ETF bar series stands in for the index feed; snapshots come
//! from the vendor's whole-market daily endpoint, already floored to the
//! realm's liquidity minimum.

use crate::domain::errors::UpstreamError;
use crate::domain::market::candle::{CompanyMeta, DailyBar, HolderRow};
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::market_data::{classify_transport, decode_json};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest_middleware::ClientWithMiddleware;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

const INDEX_PROXY: &str = "SPY";

pub struct UsDataProvider {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl UsDataProvider {
    pub fn new(base_url: String, api_key: String, timeout_secs: u64) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout_secs),
            base_url,
            api_key,
        }
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> reqwest_middleware::RequestBuilder {
        let url = build_url_with_query(&format!("{}{}", self.base_url, path), params);
        self.client.get(url).header("APCA-API-KEY-ID", &self.api_key)
    }

    async fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        let response = self
            .get(
                &format!("/v2/stocks/{}/bars", symbol),
                &[
                    ("timeframe", "1Day".to_string()),
                    ("start", start.to_string()),
                    ("end", end.to_string()),
                    ("adjustment", "split".to_string()),
                ],
            )
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let payload: BarsResponse = decode_json(response).await?;
        let mut bars: Vec<DailyBar> = payload
            .bars
            .into_iter()
            .map(|b| DailyBar {
                date: b.t,
                open: b.o,
                high: b.h,
                low: b.l,
                close: b.c,
                volume: b.v,
            })
            .collect();
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Vec<BarRow>,
}

#[derive(Debug, Deserialize)]
struct BarRow {
    t: NaiveDate,
    o: Decimal,
    h: Decimal,
    l: Decimal,
    c: Decimal,
    v: u64,
}

#[derive(Debug, Deserialize)]
struct MarketDailyResponse {
    #[serde(default)]
    rows: Vec<MarketDailyRow>,
}

#[derive(Debug, Deserialize)]
struct MarketDailyRow {
    symbol: String,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    prev_close: Decimal,
    volume: u64,
    traded_value: Decimal,
    market_cap: Decimal,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    symbol: String,
    name: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    industry: String,
    #[serde(default)]
    market_cap: Decimal,
    #[serde(default)]
    exchange: String,
}

#[derive(Debug, Deserialize)]
struct HoldersResponse {
    #[serde(default)]
    holders: Vec<HolderRowDto>,
}

#[derive(Debug, Deserialize)]
struct HolderRowDto {
    holder: String,
    pct_held: f64,
    shares: u64,
}

#[derive(Debug, Deserialize)]
struct LatestTradeResponse {
    trade: LatestTrade,
}

#[derive(Debug, Deserialize)]
struct LatestTrade {
    p: Decimal,
}

#[async_trait]
impl MarketDataProvider for UsDataProvider {
    fn realm(&self) -> Realm {
        Realm::Us
    }

    async fn snapshot(&self, day: NaiveDate) -> Result<HashMap<Ticker, Snapshot>, UpstreamError> {
        debug!("Fetching US market snapshot for {}", day);
        let response = self
            .get("/v2/stocks/market/daily", &[("date", day.to_string())])
            .send()
            .await
            .map_err(classify_transport)?;

        let payload: MarketDailyResponse = decode_json(response).await?;
        Ok(payload
            .rows
            .into_iter()
            .map(|row| {
                let ticker = Ticker::us(row.symbol);
                let snapshot = Snapshot {
                    ticker: ticker.clone(),
                    trading_day: day,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    prev_close: row.prev_close,
                    volume: row.volume,
                    traded_value: row.traded_value,
                    market_cap: row.market_cap,
                };
                (ticker, snapshot)
            })
            .collect())
    }

    async fn ohlcv(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        self.fetch_bars(&ticker.code, start, end).await
    }

    async fn company_meta(&self, ticker: &Ticker) -> Result<CompanyMeta, UpstreamError> {
        let response = self
            .get(&format!("/v2/assets/{}", ticker.code), &[])
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::UnknownTicker(ticker.to_string()));
        }

        let asset: AssetResponse = decode_json(response).await?;
        Ok(CompanyMeta {
            ticker: Ticker::us(asset.symbol),
            name: asset.name,
            sector: asset.sector,
            industry: asset.industry,
            market_cap: asset.market_cap,
            listing_exchange: asset.exchange,
        })
    }

    async fn institutional_holders(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<HolderRow>, UpstreamError> {
        let response = self
            .get(&format!("/v2/stocks/{}/holders", ticker.code), &[])
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let payload: HoldersResponse = decode_json(response).await?;
        Ok(payload
            .holders
            .into_iter()
            .map(|h| HolderRow {
                holder: h.holder,
                pct_held: h.pct_held,
                shares: h.shares,
            })
            .collect())
    }

    async fn index_ohlcv(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        self.fetch_bars(INDEX_PROXY, start, end).await
    }

    async fn quote(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError> {
        let response = self
            .get(&format!("/v2/stocks/{}/trades/latest", ticker.code), &[])
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::UnknownTicker(ticker.to_string()));
        }

        let payload: LatestTradeResponse = decode_json(response).await?;
        Ok(payload.trade.p)
    }
}
