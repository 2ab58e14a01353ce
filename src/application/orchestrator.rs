//! The session entry point: screen → report → decide → sell sweep →
//! summarize, with per-ticker failure isolation throughout.

use crate::application::agents::ReportPipeline;
use crate::application::agents::translator;
use crate::application::decision::{BuyDecision, BuyEngine, SellEngine, SellOutcome};
use crate::application::memory::TradingMemory;
use crate::application::screener::{ScoredCandidate, ScreenResult, Screener};
use crate::application::session::SessionContext;
use crate::config::TradingConfig;
use crate::domain::errors::UpstreamError;
use crate::domain::market::regime::Regime;
use crate::domain::market::ticker::Realm;
use crate::domain::memory::journal::PerformanceRow;
use crate::domain::ports::{
    BrokerAdapter, LlmProvider, MarketDataProvider, MessagingSink, TokenUsage, TradeMode,
};
use crate::domain::trading::trigger::SessionMode;
use crate::infrastructure::market_data::calendar::MarketCalendar;
use crate::infrastructure::reporting::ArtifactWriter;
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: SessionMode,
    pub realm: Realm,
    pub language: String,
    pub broadcast_languages: Vec<String>,
    pub messaging_enabled: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TickerOutcome {
    Bought,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerResult {
    pub ticker: String,
    pub trigger: String,
    #[serde(flatten)]
    pub outcome: TickerOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellResult {
    pub ticker: String,
    pub outcome: String,
    pub detail: Option<String>,
}

/// What one session did, persisted as the session-summary artifact and
/// reflected in the process exit code.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub realm: Realm,
    pub mode: SessionMode,
    pub trading_day: Option<NaiveDate>,
    pub no_op: bool,
    pub regime: Option<Regime>,
    pub selected: Vec<String>,
    pub tickers: Vec<TickerResult>,
    pub sells: Vec<SellResult>,
    pub pending_signals: Vec<String>,
    pub messaging_failures: Vec<String>,
    pub errors: Vec<String>,
    pub usage: TokenUsage,
}

impl SessionSummary {
    fn no_op(realm: Realm, mode: SessionMode) -> Self {
        Self {
            realm,
            mode,
            trading_day: None,
            no_op: true,
            regime: None,
            selected: vec![],
            tickers: vec![],
            sells: vec![],
            pending_signals: vec![],
            messaging_failures: vec![],
            errors: vec![],
            usage: TokenUsage::default(),
        }
    }

    /// 0 = clean (including no-op), 2 = completed with partial failures.
    pub fn exit_code(&self) -> i32 {
        let partial = self
            .tickers
            .iter()
            .any(|t| matches!(t.outcome, TickerOutcome::Failed { .. }))
            || !self.errors.is_empty();
        if partial { 2 } else { 0 }
    }
}

pub struct SessionRunner {
    market: Arc<dyn MarketDataProvider>,
    llm: Arc<dyn LlmProvider>,
    calendar: MarketCalendar,
    screener: Screener,
    pipeline: ReportPipeline,
    buy_engine: BuyEngine,
    sell_engine: SellEngine,
    memory: Arc<TradingMemory>,
    sink: Option<Arc<dyn MessagingSink>>,
    broker: Option<Arc<dyn BrokerAdapter>>,
    artifacts: ArtifactWriter,
    trading: TradingConfig,
    trade_mode: TradeMode,
    messaging_channel: String,
}

impl SessionRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        llm: Arc<dyn LlmProvider>,
        calendar: MarketCalendar,
        screener: Screener,
        pipeline: ReportPipeline,
        buy_engine: BuyEngine,
        sell_engine: SellEngine,
        memory: Arc<TradingMemory>,
        sink: Option<Arc<dyn MessagingSink>>,
        broker: Option<Arc<dyn BrokerAdapter>>,
        artifacts: ArtifactWriter,
        trading: TradingConfig,
        trade_mode: TradeMode,
        messaging_channel: String,
    ) -> Self {
        Self {
            market,
            llm,
            calendar,
            screener,
            pipeline,
            buy_engine,
            sell_engine,
            memory,
            sink,
            broker,
            artifacts,
            trading,
            trade_mode,
            messaging_channel,
        }
    }

    /// Thread one session end-to-end. Per-ticker work is isolated: any
    /// failure there is recorded and the session carries on. Partial
    /// success is the norm and is reported explicitly.
    pub async fn run_session(&self, options: &SessionOptions) -> Result<SessionSummary> {
        let realm = options.realm;
        let now = Utc::now();
        let today = now.with_timezone(&realm.timezone()).date_naive();

        if !self.calendar.is_trading_day(realm, today) {
            info!("{} {}: not a trading day, nothing to do", realm, today);
            return Ok(SessionSummary::no_op(realm, options.mode));
        }

        let reference_date = self.calendar.reference_date(realm, now);
        info!(
            "Session start: {} {} (reference date {})",
            realm, options.mode, reference_date
        );

        let session = SessionContext::new(realm, options.mode, reference_date);
        let mut summary = SessionSummary {
            realm,
            mode: options.mode,
            trading_day: Some(reference_date),
            no_op: false,
            regime: None,
            selected: vec![],
            tickers: vec![],
            sells: vec![],
            pending_signals: vec![],
            messaging_failures: vec![],
            errors: vec![],
            usage: TokenUsage::default(),
        };

        // 1. Screen
        let screen = match self.screen(&session, reference_date).await {
            Ok(result) => result,
            Err(e) => {
                error!("Screener failed: {:#}", e);
                summary.errors.push(format!("screener: {:#}", e));
                // The sell sweep still runs over existing holdings
                self.sell_sweep(&session, Regime::Sideways, options, &mut summary).await;
                self.finish(options, &mut summary).await;
                return Ok(summary);
            }
        };
        summary.selected = screen.selected.iter().map(|c| c.ticker().to_string()).collect();

        if options.messaging_enabled {
            self.send_screen_alert(&screen, &mut summary).await;
        }

        // 2. Per-ticker report → decision
        for scored in &screen.selected {
            let result = self.process_ticker(scored, &session, options, &mut summary).await;
            summary.tickers.push(result);
        }

        let regime = session
            .market_overview()
            .await
            .map(|o| o.regime)
            .unwrap_or(Regime::Sideways);
        summary.regime = Some(regime);

        // 3. Sell sweep over existing holdings
        self.sell_sweep(&session, regime, options, &mut summary).await;

        // 4. Summary artifact + closing message
        self.finish(options, &mut summary).await;

        info!(
            "Session done: {} analyzed, {} sells, exit code {}",
            summary.tickers.len(),
            summary.sells.len(),
            summary.exit_code()
        );
        Ok(summary)
    }

    async fn screen(
        &self,
        session: &SessionContext,
        reference_date: NaiveDate,
    ) -> Result<ScreenResult> {
        let prev_day = self
            .calendar
            .previous_trading_day(session.realm, reference_date);
        let snapshot = session.snapshot(self.market.as_ref(), reference_date).await?;
        let prev_snapshot = session.snapshot(self.market.as_ref(), prev_day).await?;
        self.screener
            .run(session.mode, reference_date, &snapshot, &prev_snapshot)
            .await
    }

    /// Report, persist artifacts, track, decide. Everything in here is
    /// per-ticker scope: failures convert to a `Failed` outcome.
    async fn process_ticker(
        &self,
        scored: &ScoredCandidate,
        session: &SessionContext,
        options: &SessionOptions,
        summary: &mut SessionSummary,
    ) -> TickerResult {
        let ticker = scored.ticker().clone();
        let trigger = scored.hit.trigger;

        let report = match self
            .pipeline
            .generate(&ticker, session, &options.language)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!("{}: report generation failed: {}", ticker, e);
                return TickerResult {
                    ticker: ticker.to_string(),
                    trigger: trigger.to_string(),
                    outcome: TickerOutcome::Failed {
                        reason: e.to_string(),
                    },
                };
            }
        };
        summary.usage += report.usage;

        if !options.dry_run {
            if let Err(e) = self.artifacts.write_report(&report).await {
                warn!("{}: report artifact write failed: {:#}", ticker, e);
                summary.errors.push(format!("{}: artifact: {:#}", ticker, e));
            }
            if let Err(e) = self
                .memory
                .track_analysis(&PerformanceRow {
                    ticker: ticker.clone(),
                    analyzed_date: session.trading_day,
                    trigger,
                    price_t0: scored.levels.current_price,
                    price_7d: None,
                    price_14d: None,
                    price_30d: None,
                })
                .await
            {
                warn!("{}: tracker insert failed: {:#}", ticker, e);
            }
        }

        if options.messaging_enabled {
            self.broadcast_summary(&report, options, summary).await;
        }

        if options.dry_run {
            return TickerResult {
                ticker: ticker.to_string(),
                trigger: trigger.to_string(),
                outcome: TickerOutcome::Skipped {
                    reason: "dry run".to_string(),
                },
            };
        }

        let regime = session
            .market_overview()
            .await
            .map(|o| o.regime)
            .unwrap_or(Regime::Sideways);

        let mut usage = TokenUsage::default();
        let outcome = match self
            .buy_engine
            .decide(&report, scored, session, regime, &mut usage)
            .await
        {
            Ok(BuyDecision::Bought(holding)) => {
                self.place_buy_order(&holding, summary).await;
                TickerOutcome::Bought
            }
            Ok(BuyDecision::Skipped { reason }) => TickerOutcome::Skipped { reason },
            Err(e) => {
                error!("{}: decision layer error: {:#}", ticker, e);
                TickerOutcome::Failed {
                    reason: format!("decision: {:#}", e),
                }
            }
        };
        summary.usage += usage;

        TickerResult {
            ticker: ticker.to_string(),
            trigger: trigger.to_string(),
            outcome,
        }
    }

    async fn place_buy_order(
        &self,
        holding: &crate::domain::trading::types::Holding,
        summary: &mut SessionSummary,
    ) {
        let Some(broker) = &self.broker else {
            return;
        };
        let amount = holding.buy_price * holding.quantity;
        match broker.buy(&holding.ticker, amount, self.trade_mode).await {
            Ok(fill) => info!(
                "{}: broker fill {} x{}",
                holding.ticker, fill.fill_price, fill.quantity
            ),
            Err(UpstreamError::MarketClosed(detail)) => {
                info!("{}: market closed, signal pending", holding.ticker);
                summary
                    .pending_signals
                    .push(format!("buy {}: {}", holding.ticker, detail));
            }
            Err(e) => {
                warn!("{}: broker buy failed: {}", holding.ticker, e);
                summary
                    .errors
                    .push(format!("broker buy {}: {}", holding.ticker, e));
            }
        }
    }

    async fn sell_sweep(
        &self,
        session: &SessionContext,
        regime: Regime,
        options: &SessionOptions,
        summary: &mut SessionSummary,
    ) {
        if options.dry_run {
            return;
        }
        let capital_base = self.trading.capital_base(session.realm);
        let mut usage = TokenUsage::default();
        match self
            .sell_engine
            .sweep(session, regime, capital_base, &mut usage)
            .await
        {
            Ok(outcomes) => {
                for outcome in outcomes {
                    let result = match outcome {
                        SellOutcome::Sold(trade) => {
                            if let Some(broker) = &self.broker {
                                match broker
                                    .sell(&trade.ticker, trade.quantity, self.trade_mode)
                                    .await
                                {
                                    Ok(_) => {}
                                    Err(UpstreamError::MarketClosed(detail)) => {
                                        summary
                                            .pending_signals
                                            .push(format!("sell {}: {}", trade.ticker, detail));
                                    }
                                    Err(e) => summary
                                        .errors
                                        .push(format!("broker sell {}: {}", trade.ticker, e)),
                                }
                            }
                            SellResult {
                                ticker: trade.ticker.to_string(),
                                outcome: "sold".to_string(),
                                detail: Some(format!(
                                    "{} {:+.2}%",
                                    trade.sell_reason,
                                    trade.profit_rate * 100.0
                                )),
                            }
                        }
                        SellOutcome::Held { ticker } => SellResult {
                            ticker,
                            outcome: "held".to_string(),
                            detail: None,
                        },
                        SellOutcome::Adjusted { ticker } => SellResult {
                            ticker,
                            outcome: "adjusted".to_string(),
                            detail: None,
                        },
                        SellOutcome::Failed { ticker, reason } => SellResult {
                            ticker,
                            outcome: "failed".to_string(),
                            detail: Some(reason),
                        },
                    };
                    summary.sells.push(result);
                }
            }
            Err(e) => {
                error!("Sell sweep failed: {:#}", e);
                summary.errors.push(format!("sell sweep: {:#}", e));
            }
        }
        summary.usage += usage;
    }

    async fn send_screen_alert(&self, screen: &ScreenResult, summary: &mut SessionSummary) {
        let Some(sink) = &self.sink else { return };

        let mut lines = vec![format!(
            "[{} {}] screening {}: {} selected",
            screen.realm,
            screen.session,
            screen.trading_day,
            screen.selected.len()
        )];
        for (trigger, candidates) in &screen.ranked {
            if let Some(best) = candidates.first() {
                lines.push(format!(
                    "{}: {} (final {:.2}, R/R {:.1})",
                    trigger,
                    best.ticker(),
                    best.final_score,
                    best.levels.risk_reward
                ));
            }
        }

        if let Err(e) = sink
            .send_text(&self.messaging_channel, &lines.join("\n"))
            .await
        {
            warn!("Screen alert failed: {}", e);
            summary.messaging_failures.push(format!("screen alert: {}", e));
        }
    }

    async fn broadcast_summary(
        &self,
        report: &crate::application::agents::TickerReport,
        options: &SessionOptions,
        summary: &mut SessionSummary,
    ) {
        let Some(sink) = &self.sink else { return };
        let Some(broadcast) = &report.summary else {
            return;
        };

        let mut languages = vec![options.language.clone()];
        for lang in &options.broadcast_languages {
            if !languages.iter().any(|l| l.eq_ignore_ascii_case(lang)) {
                languages.push(lang.clone());
            }
        }

        for lang in languages {
            let text = if lang.eq_ignore_ascii_case(&options.language) {
                broadcast.text.clone()
            } else {
                let mut usage = TokenUsage::default();
                match translator::translate(
                    self.llm.as_ref(),
                    &broadcast.text,
                    &options.language,
                    &lang,
                    &mut usage,
                )
                .await
                {
                    Ok(text) => {
                        summary.usage += usage;
                        text
                    }
                    Err(e) => {
                        warn!("Translation to {} failed: {}", lang, e);
                        summary
                            .messaging_failures
                            .push(format!("translate {}: {}", lang, e));
                        continue;
                    }
                }
            };

            if let Err(e) = sink.send_text(&self.messaging_channel, &text).await {
                warn!("Broadcast ({}) failed: {}", lang, e);
                summary
                    .messaging_failures
                    .push(format!("broadcast {} {}: {}", report.ticker, lang, e));
            }
        }
    }

    async fn finish(&self, options: &SessionOptions, summary: &mut SessionSummary) {
        if !options.dry_run {
            if let Err(e) = self.artifacts.write_session_summary(summary).await {
                warn!("Session summary artifact failed: {:#}", e);
                summary.errors.push(format!("summary artifact: {:#}", e));
            }
        }

        if options.messaging_enabled
            && let Some(sink) = &self.sink
        {
            let text = render_closing_message(summary);
            if let Err(e) = sink.send_text(&self.messaging_channel, &text).await {
                summary
                    .messaging_failures
                    .push(format!("closing message: {}", e));
            }
        }
    }
}


fn render_closing_message(summary: &SessionSummary) -> String {
    let mut lines = vec![format!(
        "[{} {}] session complete: {} analyzed, {} sells, {} tokens",
        summary.realm,
        summary.mode,
        summary.tickers.len(),
        summary.sells.len(),
        summary.usage.total()
    )];
    for t in &summary.tickers {
        let outcome = match &t.outcome {
            TickerOutcome::Bought => "bought".to_string(),
            TickerOutcome::Skipped { reason } => format!("skipped ({})", reason),
            TickerOutcome::Failed { reason } => format!("failed ({})", reason),
        };
        lines.push(format!("{} [{}]: {}", t.ticker, t.trigger, outcome));
    }
    for s in &summary.sells {
        match &s.detail {
            Some(detail) => lines.push(format!("{}: {} ({})", s.ticker, s.outcome, detail)),
            None => lines.push(format!("{}: {}", s.ticker, s.outcome)),
        }
    }
    lines.join("\n")
}
