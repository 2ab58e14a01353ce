//! Sagetrade CLI: daily analysis sessions, standalone screening, and
//! trading-memory maintenance.
//!
//! Exit codes: 0 success (including "no trading day"), 1 configuration
//! error, 2 partial failure with the session completed, 3 fatal.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use sagetrade::application::agents::pipeline::{PipelineConfig, ReportPipeline};
use sagetrade::application::decision::{BuyEngine, SellEngine};
use sagetrade::application::memory::TradingMemory;
use sagetrade::application::orchestrator::{SessionOptions, SessionRunner};
use sagetrade::application::screener::Screener;
use sagetrade::application::session::SessionContext;
use sagetrade::config::Config;
use sagetrade::domain::market::ticker::Realm;
use sagetrade::domain::ports::{LlmProvider, MarketDataProvider, MessagingSink};
use sagetrade::domain::trading::trigger::SessionMode;
use sagetrade::infrastructure::broker::PaperBroker;
use sagetrade::infrastructure::llm::OpenAiClient;
use sagetrade::infrastructure::market_data::{KrxDataProvider, MarketCalendar, UsDataProvider};
use sagetrade::infrastructure::messaging::TelegramSink;
use sagetrade::infrastructure::news::RssHeadlineSource;
use sagetrade::infrastructure::persistence::Database;
use sagetrade::infrastructure::persistence::repositories::{
    SqliteHoldingRepository, SqliteJournalRepository, SqliteKnowledgeRepository,
    SqliteTrackerRepository, SqliteTradeRepository, SqliteWatchlistRepository,
};
use sagetrade::infrastructure::reporting::ArtifactWriter;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "sagetrade", version, about = "Daily stock analysis and trading pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run analysis sessions
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Run the screener only and print the result
    Screen(ScreenArgs),
    /// Trading-memory maintenance
    Memory {
        #[command(subcommand)]
        command: MemoryCommand,
    },
    /// Inspect the simulated portfolio
    Portfolio {
        #[command(subcommand)]
        command: PortfolioCommand,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Run one full session end-to-end
    Run(SessionArgs),
}

#[derive(Args)]
struct SessionArgs {
    /// morning | afternoon | both
    #[arg(long, default_value = "morning")]
    mode: String,
    /// kr | us
    #[arg(long)]
    realm: Option<String>,
    #[arg(long)]
    language: Option<String>,
    /// Extra broadcast languages, comma separated
    #[arg(long, value_delimiter = ',')]
    broadcast_languages: Vec<String>,
    /// Disable all messaging emission
    #[arg(long)]
    no_messaging: bool,
    /// Analyze without persisting or ordering
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct ScreenArgs {
    /// morning | afternoon
    #[arg(long, default_value = "morning")]
    mode: String,
    #[arg(long)]
    realm: Option<String>,
    /// Write the JSON result here instead of stdout
    #[arg(long)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum MemoryCommand {
    /// Promote aged journals up the compression ladder
    Compress {
        #[arg(long)]
        realm: Option<String>,
        #[arg(long)]
        layer1_age: Option<i64>,
        #[arg(long)]
        layer2_age: Option<i64>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Deactivate thin knowledge and delete archived journals
    Cleanup {
        #[arg(long)]
        realm: Option<String>,
        #[arg(long)]
        max_principles: Option<usize>,
        #[arg(long)]
        max_intuitions: Option<usize>,
        #[arg(long)]
        stale_days: Option<i64>,
        #[arg(long)]
        archive_days: Option<i64>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Fill elapsed 7/14/30-day tracker prices
    TrackUpdate {
        #[arg(long)]
        realm: Option<String>,
    },
}

#[derive(Subcommand)]
enum PortfolioCommand {
    /// Print holdings and the recent watchlist
    Show {
        #[arg(long)]
        realm: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    match run(cli, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("Fatal: {:#}", e);
            ExitCode::from(3)
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<u8> {
    match cli.command {
        Command::Session {
            command: SessionCommand::Run(args),
        } => run_sessions(&config, args).await,
        Command::Screen(args) => run_screen(&config, args).await,
        Command::Memory { command } => run_memory(&config, command).await,
        Command::Portfolio {
            command: PortfolioCommand::Show { realm },
        } => show_portfolio(&config, realm).await,
    }
}

fn resolve_realm(config: &Config, flag: Option<String>) -> Result<Realm> {
    match flag {
        Some(r) => Realm::from_str(&r),
        None => Ok(config.default_realm),
    }
}

fn build_provider(config: &Config, realm: Realm) -> Arc<dyn MarketDataProvider> {
    match realm {
        Realm::Kr => Arc::new(KrxDataProvider::new(
            config.kr_data_base_url.clone(),
            config.market_data_timeout_secs,
        )),
        Realm::Us => Arc::new(UsDataProvider::new(
            config.us_data_base_url.clone(),
            config.us_data_api_key.clone(),
            config.market_data_timeout_secs,
        )),
    }
}

async fn build_memory(config: &Config, llm: Arc<dyn LlmProvider>) -> Result<Arc<TradingMemory>> {
    let db = Database::new(&config.database_url).await?;
    Ok(Arc::new(TradingMemory::new(
        Arc::new(SqliteHoldingRepository::new(db.pool.clone())),
        Arc::new(SqliteTradeRepository::new(db.pool.clone())),
        Arc::new(SqliteWatchlistRepository::new(db.pool.clone())),
        Arc::new(SqliteJournalRepository::new(db.pool.clone())),
        Arc::new(SqliteKnowledgeRepository::new(db.pool.clone())),
        Arc::new(SqliteTrackerRepository::new(db.pool.clone())),
        llm,
        config.memory.clone(),
    )))
}

async fn run_sessions(config: &Config, args: SessionArgs) -> Result<u8> {
    let realm = resolve_realm(config, args.realm)?;
    let language = args
        .language
        .clone()
        .unwrap_or_else(|| config.default_language.clone());

    let modes: Vec<SessionMode> = match args.mode.as_str() {
        "both" => vec![SessionMode::Morning, SessionMode::Afternoon],
        other => vec![SessionMode::from_str(other)?],
    };

    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiClient::new(&config.llm));
    let market = build_provider(config, realm);
    let memory = build_memory(config, llm.clone()).await?;
    let calendar = MarketCalendar;

    let headlines = Arc::new(RssHeadlineSource::new(config.news_feed_url.clone()));
    let pipeline = ReportPipeline::new(
        llm.clone(),
        market.clone(),
        headlines,
        PipelineConfig {
            section_pause: std::time::Duration::from_secs(config.llm.section_pause_secs),
            ..PipelineConfig::default()
        },
    );

    let screener = Screener::new(market.clone(), config.screener.clone());
    let buy_engine = BuyEngine::new(llm.clone(), memory.clone(), config.trading.clone());
    let sell_engine = SellEngine::new(llm.clone(), memory.clone(), market.clone());
    let broker = Arc::new(PaperBroker::new(market.clone(), calendar));

    let sink: Option<Arc<dyn MessagingSink>> =
        if config.messaging.is_configured() && !args.no_messaging {
            Some(Arc::new(TelegramSink::new(&config.messaging)))
        } else {
            None
        };

    let runner = SessionRunner::new(
        market,
        llm,
        calendar,
        screener,
        pipeline,
        buy_engine,
        sell_engine,
        memory,
        sink,
        Some(broker),
        ArtifactWriter::new(config.artifacts_dir.clone()),
        config.trading.clone(),
        config.broker.mode,
        config.messaging.chat_id.clone(),
    );

    let mut exit = 0u8;
    for mode in modes {
        let options = SessionOptions {
            mode,
            realm,
            language: language.clone(),
            broadcast_languages: args.broadcast_languages.clone(),
            messaging_enabled: !args.no_messaging,
            dry_run: args.dry_run,
        };
        let summary = runner.run_session(&options).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        exit = exit.max(summary.exit_code() as u8);
    }
    Ok(exit)
}

async fn run_screen(config: &Config, args: ScreenArgs) -> Result<u8> {
    let realm = resolve_realm(config, args.realm)?;
    let mode = SessionMode::from_str(&args.mode)?;
    let market = build_provider(config, realm);
    let calendar = MarketCalendar;

    let now = chrono::Utc::now();
    let today = now.with_timezone(&realm.timezone()).date_naive();
    if !calendar.is_trading_day(realm, today) {
        info!("{} {}: not a trading day", realm, today);
        return Ok(0);
    }

    let reference_date = calendar.reference_date(realm, now);
    let prev_day = calendar.previous_trading_day(realm, reference_date);
    let session = SessionContext::new(realm, mode, reference_date);

    let snapshot = session.snapshot(market.as_ref(), reference_date).await?;
    let prev_snapshot = session.snapshot(market.as_ref(), prev_day).await?;

    let screener = Screener::new(market.clone(), config.screener.clone());
    let result = screener
        .run(mode, reference_date, &snapshot, &prev_snapshot)
        .await?;

    let json = serde_json::to_string_pretty(&result)?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &json).await?;
            info!("Screen result written to {}", path);
        }
        None => println!("{}", json),
    }
    Ok(0)
}

async fn run_memory(config: &Config, command: MemoryCommand) -> Result<u8> {
    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiClient::new(&config.llm));

    match command {
        MemoryCommand::Compress {
            realm,
            layer1_age,
            layer2_age,
            dry_run,
        } => {
            let realm = resolve_realm(config, realm)?;
            let mut overridden = config.clone();
            if let Some(days) = layer1_age {
                overridden.memory.layer1_age_days = days;
            }
            if let Some(days) = layer2_age {
                overridden.memory.layer2_age_days = days;
            }
            let memory = build_memory(&overridden, llm).await?;
            let report = memory.compress(realm, chrono::Utc::now(), dry_run).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        MemoryCommand::Cleanup {
            realm,
            max_principles,
            max_intuitions,
            stale_days,
            archive_days,
            dry_run,
        } => {
            let realm = resolve_realm(config, realm)?;
            let mut overridden = config.clone();
            if let Some(n) = max_principles {
                overridden.memory.max_principles = n;
            }
            if let Some(n) = max_intuitions {
                overridden.memory.max_intuitions = n;
            }
            if let Some(d) = stale_days {
                overridden.memory.stale_days = d;
            }
            if let Some(d) = archive_days {
                overridden.memory.archive_days = d;
            }
            let memory = build_memory(&overridden, llm).await?;
            let report = memory.cleanup(realm, chrono::Utc::now(), dry_run).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        MemoryCommand::TrackUpdate { realm } => {
            let realm = resolve_realm(config, realm)?;
            let memory = build_memory(config, llm).await?;
            let market = build_provider(config, realm);
            let today = chrono::Utc::now()
                .with_timezone(&realm.timezone())
                .date_naive();
            let filled = memory
                .backfill_tracker(market.as_ref(), realm, today)
                .await?;
            info!("Tracker backfill complete: {} cells", filled);
        }
    }
    Ok(0)
}

async fn show_portfolio(config: &Config, realm: Option<String>) -> Result<u8> {
    let realm = resolve_realm(config, realm)?;
    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiClient::new(&config.llm));
    let memory = build_memory(config, llm).await?;

    let portfolio = memory
        .portfolio(realm, config.trading.capital_base(realm))
        .await?;
    println!(
        "Holdings ({}/{}):",
        portfolio.holdings.len(),
        sagetrade::domain::trading::portfolio::MAX_HOLDINGS
    );
    for h in &portfolio.holdings {
        println!(
            "  {} [{}] x{} @ {} → {} ({:+.2}%), target {}, stop {}",
            h.ticker,
            h.sector,
            h.quantity,
            h.buy_price,
            h.current_price,
            h.profit_rate() * 100.0,
            h.scenario.target_price,
            h.scenario.stop_loss_price,
        );
    }

    let watchlist = memory.recent_watchlist(realm, 10).await?;
    if !watchlist.is_empty() {
        println!("\nRecent watchlist:");
        for entry in watchlist {
            println!(
                "  {} {} score {}: {}",
                entry.analyzed_date, entry.ticker, entry.buy_score, entry.skip_reason
            );
        }
    }
    Ok(0)
}
