use thiserror::Error;

/// Failures coming back from external collaborators (data providers, LLMs,
/// messaging, brokers), classified by how the caller should react.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network hiccup, rate limit, 5xx. Retryable with backoff.
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// Non-rate-limit 4xx, malformed payload. Not retryable.
    #[error("permanent upstream failure: {0}")]
    Permanent(String),

    /// The provider cannot resolve the symbol at all.
    #[error("unknown ticker: {0}")]
    UnknownTicker(String),

    /// Out-of-hours order attempt. Soft failure, yields a pending signal.
    #[error("market closed for {0}")]
    MarketClosed(String),
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpstreamError::Transient(_))
    }
}

/// Failures of a single agent invocation within the report pipeline.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The model's output failed structural validation even after the
    /// corrective-prompt retry.
    #[error("schema violation in {agent}: {detail}")]
    SchemaViolation { agent: String, detail: String },

    /// Retries exhausted; the section degrades to a placeholder.
    #[error("agent {agent} exhausted {attempts} attempts: {last_error}")]
    Exhausted {
        agent: String,
        attempts: u32,
        last_error: String,
    },
}

/// A decision that would break a portfolio invariant. Buys are refused
/// before any persistence write; never propagated as a panic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PortfolioViolation {
    #[error("portfolio full: {current}/{max} holdings")]
    SlotCap { current: usize, max: usize },

    #[error("sector cap: {sector} already holds {current}/{max} positions")]
    SectorCount {
        sector: String,
        current: usize,
        max: usize,
    },

    #[error("sector weight cap: {sector} would reach {would_be_pct:.1}% > {max_pct:.1}%")]
    SectorWeight {
        sector: String,
        would_be_pct: f64,
        max_pct: f64,
    },

    #[error("duplicate holding: {ticker}")]
    Duplicate { ticker: String },
}

/// A scenario whose price levels violate the acceptance invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScenarioViolation {
    #[error("price ordering violated: stop {stop} / entry {entry} / target {target}")]
    PriceOrdering {
        stop: String,
        entry: String,
        target: String,
    },

    #[error("stop distance {actual_pct:.2}% exceeds trigger maximum {max_pct:.2}%")]
    StopTooWide { actual_pct: f64, max_pct: f64 },

    #[error("risk/reward {actual:.2} below trigger target {target:.2}")]
    RiskRewardTooLow { actual: f64, target: f64 },
}
