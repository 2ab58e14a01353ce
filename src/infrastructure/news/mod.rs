//! One-shot RSS headline retrieval, scored by the local sentiment
//! analyzer before reaching the news-analysis agent.

pub mod sentiment;

pub use sentiment::SentimentAnalyzer;

use crate::domain::errors::UpstreamError;
use crate::domain::ports::{HeadlineSource, ScoredHeadline};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rss::Channel;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

pub struct RssHeadlineSource {
    client: Client,
    feed_url: String,
    analyzer: SentimentAnalyzer,
}

impl RssHeadlineSource {
    pub fn new(feed_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            feed_url,
            analyzer: SentimentAnalyzer::new(),
        }
    }
}

#[async_trait]
impl HeadlineSource for RssHeadlineSource {
    async fn recent_headlines(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredHeadline>, UpstreamError> {
        let response = self
            .client
            .get(&self.feed_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    UpstreamError::Transient(e.to_string())
                } else {
                    UpstreamError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(UpstreamError::Transient(format!("HTTP {}", status)));
        }
        if status.is_client_error() {
            return Err(UpstreamError::Permanent(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transient(e.to_string()))?;
        let channel = Channel::read_from(Cursor::new(bytes))
            .map_err(|e| UpstreamError::Permanent(format!("feed parse: {}", e)))?;

        let query_lower = query.to_lowercase();
        let mut headlines: Vec<ScoredHeadline> = channel
            .items()
            .iter()
            .filter_map(|item| {
                let title = item.title()?.to_string();
                // Keep items mentioning the query; generic feeds carry the
                // whole market's news.
                if !query_lower.is_empty() && !title.to_lowercase().contains(&query_lower) {
                    return None;
                }
                let published_at = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now);
                let sentiment = self.analyzer.analyze(&title);
                Some(ScoredHeadline {
                    title,
                    source: channel.title().to_string(),
                    published_at,
                    sentiment,
                })
            })
            .collect();

        headlines.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        headlines.truncate(limit);
        debug!("{} headlines retained for '{}'", headlines.len(), query);
        Ok(headlines)
    }
}
