//! Realm market-data providers.
//!
//! Each realm is a self-contained module; shared plumbing (status
//! classification, JSON decoding) lives here. The session-level snapshot
//! cache is owned by `SessionContext`, not by the providers.

pub mod calendar;
pub mod krx;
pub mod us;

pub use calendar::MarketCalendar;
pub use krx::KrxDataProvider;
pub use us::UsDataProvider;

use crate::domain::errors::UpstreamError;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

/// Map transport-level failures surfacing through the middleware stack:
/// timeouts and connection errors are retryable, everything else is not.
/// A middleware-layer error means the retry policy already gave up, so it
/// stays transient for the caller's own (slower) retry schedule.
pub(crate) fn classify_transport(e: reqwest_middleware::Error) -> UpstreamError {
    match e {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() || e.is_connect() => {
            UpstreamError::Transient(e.to_string())
        }
        reqwest_middleware::Error::Reqwest(e) => UpstreamError::Permanent(e.to_string()),
        reqwest_middleware::Error::Middleware(e) => UpstreamError::Transient(e.to_string()),
    }
}

/// Decode a JSON response, classifying HTTP status codes per the upstream
/// contract: 429/5xx transient, other 4xx permanent.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: Response,
) -> Result<T, UpstreamError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(UpstreamError::Transient(format!("HTTP {}", status)));
    }
    if status.is_client_error() {
        return Err(UpstreamError::Permanent(format!("HTTP {}", status)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| UpstreamError::Permanent(format!("payload decode: {}", e)))
}
