//! KR market data over a KRX-style JSON API.
//!
//! Whole-market daily quotations, per-issue candles and investor data.
//! The KOSPI composite is the index feed. Payload fields arrive as the
//! vendor ships them (numbers as strings with the odd comma), so parsing
//! is defensive about formatting but never about presence.

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
use std::str::FromStr;
use tracing::debug;

pub struct KrxDataProvider {
    client: ClientWithMiddleware,
    base_url: String,
}

impl KrxDataProvider {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            client: HttpClientFactory::create_client(timeout_secs),
            base_url,
        }
    }

    fn get(&self, path: &str, params: &[(&str, String)]) -> reqwest_middleware::RequestBuilder {
        let url = build_url_with_query(&format!("{}{}", self.base_url, path), params);
        self.client.get(url)
    }

    async fn fetch_candles(
        &self,
        path: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        let response = self
            .get(
                path,
                &[("from", compact_date(start)), ("to", compact_date(end))],
            )
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let payload: CandlesResponse = decode_json(response).await?;
        let mut bars = payload
            .candles
            .into_iter()
            .map(|c| {
                Ok(DailyBar {
                    date: parse_compact_date(&c.trade_date)?,
                    open: parse_krw(&c.open)?,
                    high: parse_krw(&c.high)?,
                    low: parse_krw(&c.low)?,
                    close: parse_krw(&c.close)?,
                    volume: c.volume,
                })
            })
            .collect::<Result<Vec<_>, UpstreamError>>()?;
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

/// "20250602" as the vendor formats dates.
fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn parse_compact_date(s: &str) -> Result<NaiveDate, UpstreamError> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .map_err(|e| UpstreamError::Permanent(format!("bad date '{}': {}", s, e)))
}

/// Whole-won amounts, sometimes comma-grouped.
fn parse_krw(s: &str) -> Result<Decimal, UpstreamError> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned)
        .map_err(|e| UpstreamError::Permanent(format!("bad amount '{}': {}", s, e)))
}

#[derive(Debug, Deserialize)]
struct MarketDailyResponse {
    #[serde(default)]
    issues: Vec<IssueRow>,
}

#[derive(Debug, Deserialize)]
struct IssueRow {
    code: String,
    open: String,
    high: String,
    low: String,
    close: String,
    prev_close: String,
    volume: u64,
    traded_value: String,
    market_cap: String,
}

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<CandleRow>,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    trade_date: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: u64,
}

#[derive(Debug, Deserialize)]
struct IssueInfoResponse {
    code: String,
    name: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    industry: String,
    #[serde(default)]
    market_cap: String,
    #[serde(default)]
    board: String,
}

#[derive(Debug, Deserialize)]
struct InstitutionsResponse {
    #[serde(default)]
    institutions: Vec<InstitutionRow>,
}

#[derive(Debug, Deserialize)]
struct InstitutionRow {
    name: String,
    pct_held: f64,
    shares: u64,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: String,
}

#[async_trait]
impl MarketDataProvider for KrxDataProvider {
    fn realm(&self) -> Realm {
        Realm::Kr
    }

    async fn snapshot(&self, day: NaiveDate) -> Result<HashMap<Ticker, Snapshot>, UpstreamError> {
        debug!("Fetching KRX market snapshot for {}", day);
        let response = self
            .get("/v1/market/daily", &[("date", compact_date(day))])
            .send()
            .await
            .map_err(classify_transport)?;

        let payload: MarketDailyResponse = decode_json(response).await?;
        payload
            .issues
            .into_iter()
            .map(|row| {
                let ticker = Ticker::kr(row.code);
                let snapshot = Snapshot {
                    ticker: ticker.clone(),
                    trading_day: day,
                    open: parse_krw(&row.open)?,
                    high: parse_krw(&row.high)?,
                    low: parse_krw(&row.low)?,
                    close: parse_krw(&row.close)?,
                    prev_close: parse_krw(&row.prev_close)?,
                    volume: row.volume,
                    traded_value: parse_krw(&row.traded_value)?,
                    market_cap: parse_krw(&row.market_cap)?,
                };
                Ok((ticker, snapshot))
            })
            .collect()
    }

    async fn ohlcv(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        self.fetch_candles(&format!("/v1/stocks/{}/candles", ticker.code), start, end)
            .await
    }

    async fn company_meta(&self, ticker: &Ticker) -> Result<CompanyMeta, UpstreamError> {
        let response = self
            .get(&format!("/v1/stocks/{}", ticker.code), &[])
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::UnknownTicker(ticker.to_string()));
        }

        let info: IssueInfoResponse = decode_json(response).await?;
        let market_cap = if info.market_cap.is_empty() {
            Decimal::ZERO
        } else {
            parse_krw(&info.market_cap)?
        };
        Ok(CompanyMeta {
            ticker: Ticker::kr(info.code),
            name: info.name,
            sector: info.sector,
            industry: info.industry,
            market_cap,
            listing_exchange: if info.board.is_empty() {
                "KRX".to_string()
            } else {
                info.board
            },
        })
    }

    async fn institutional_holders(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<HolderRow>, UpstreamError> {
        let response = self
            .get(&format!("/v1/stocks/{}/institutions", ticker.code), &[])
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let payload: InstitutionsResponse = decode_json(response).await?;
        Ok(payload
            .institutions
            .into_iter()
            .map(|row| HolderRow {
                holder: row.name,
                pct_held: row.pct_held,
                shares: row.shares,
            })
            .collect())
    }

    async fn index_ohlcv(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        self.fetch_candles("/v1/indices/kospi/candles", start, end)
            .await
    }

    async fn quote(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError> {
        let response = self
            .get(&format!("/v1/stocks/{}/quote", ticker.code), &[])
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::UnknownTicker(ticker.to_string()));
        }

        let payload: QuoteResponse = decode_json(response).await?;
        parse_krw(&payload.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_date_round_trip() {
        let d = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(compact_date(d), "20250602");
        assert_eq!(parse_compact_date("20250602").unwrap(), d);
        assert!(parse_compact_date("2025-06-02").is_err());
    }

    #[test]
    fn test_parse_krw_handles_grouping() {
        assert_eq!(parse_krw("71,300").unwrap(), Decimal::from(71_300));
        assert_eq!(parse_krw("500").unwrap(), Decimal::from(500));
        assert!(parse_krw("abc").is_err());
    }
}
