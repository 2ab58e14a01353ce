//! Prompt builders for every agent in the pipeline.
//!
//! Each builder returns the system prompt; user payloads are assembled by
//! the callers from the gathered market data. All prompts pin the output
//! language so translated reports stay structurally identical.

use crate::application::agents::sections::AnalysisSection;

pub fn section_system_prompt(section: AnalysisSection, language: &str) -> String {
    let role = match section {
        AnalysisSection::PriceVolume => {
            "You are an equity technical analyst. Analyze the OHLCV history and the indicator \
             digest (moving averages, RSI, MACD, Bollinger bands). Cover trend, momentum, \
             volume behavior and notable support/resistance levels. Quote concrete numbers \
             from the data; never invent values."
        }
        AnalysisSection::InstitutionalHoldings => {
            "You are an ownership-structure analyst. Analyze the institutional holder list: \
             concentration, notable holders, and what the ownership profile implies for \
             liquidity and conviction. If the list is empty, say so plainly."
        }
        AnalysisSection::CompanyStatus => {
            "You are a fundamental analyst. Assess valuation posture, analyst consensus and \
             price targets for the company, grounded strictly in the supplied metadata and \
             market figures. Flag what is unknown rather than guessing."
        }
        AnalysisSection::CompanyOverview => {
            "You are an industry analyst. Describe the company's business model, competitive \
             position and growth drivers, grounded in the supplied sector/industry metadata."
        }
        AnalysisSection::News => {
            "You are a news and catalysts analyst. Review the scored headlines and identify \
             recent catalysts, disclosures and macro ties relevant to the ticker. Weigh \
             headline sentiment scores but judge relevance yourself."
        }
        AnalysisSection::MarketIndex => {
            "You are a market strategist. Analyze the index bar history and the detected \
             regime label. Describe the broad market trend, volatility posture and what the \
             regime implies for new entries."
        }
    };

    format!(
        "{}\n\nWrite 2-4 tight markdown paragraphs, no headline of your own. \
         Respond in {}.",
        role, language
    )
}

pub fn strategy_system_prompt(language: &str) -> String {
    format!(
        "You are the lead strategist synthesizing the specialist sections of an equity \
         report into one integrated trading strategy. Segment the strategy by investor \
         horizon: short-term (days), mid-term (weeks), long-term (months). For each horizon \
         give a stance, key levels to watch, and the main risk. Base every claim on the \
         supplied sections; sections marked unavailable must not be fabricated. \
         Respond in {}.",
        language
    )
}

pub fn optimizer_system_prompt(language: &str) -> String {
    format!(
        "You condense an equity analysis report into a broadcast message of AT MOST 400 \
         characters. Fixed structure, one line each:\n\
         [ticker | company | date]\n\
         [core thesis, one sentence]\n\
         [key levels: entry / target / stop]\n\
         [main risk]\n\
         Preserve all numbers exactly. No markdown, no emoji. Respond in {}.",
        language
    )
}

pub fn evaluator_system_prompt() -> String {
    "You grade a broadcast summary against the full report it was condensed from. \
     Check: factual accuracy against the report, clarity, absence of hallucinated \
     numbers or claims, and adherence to the four-line format within 400 characters.\n\
     Respond with ONLY this JSON object:\n\
     {\"rating\": \"excellent\" | \"good\" | \"poor\", \"issues\": [\"...\"]}"
        .to_string()
}

pub fn translator_system_prompt(target_language: &str) -> String {
    format!(
        "Translate the given market summary into {}. Preserve every number, ticker symbol \
         and proper noun exactly as written, and keep the line structure unchanged. \
         Output only the translation.",
        target_language
    )
}

pub fn buy_system_prompt() -> String {
    "You are the entry decision agent of a disciplined daily trading system. Given the \
     analysis report, current portfolio status, trigger metadata, market regime and the \
     trading-memory context, decide whether to buy the ticker and construct the trade \
     scenario.\n\
     Hard rules: stop_loss_price < entry_price < target_price; respect the trigger's \
     maximum stop distance; do not exceed the risk appetite implied by the regime.\n\
     Respond with ONLY this JSON object:\n\
     {\n\
       \"decision\": \"buy\" | \"skip\",\n\
       \"buy_score\": 0-10,\n\
       \"entry_price\": number,\n\
       \"target_price\": number,\n\
       \"stop_loss_price\": number,\n\
       \"investment_period\": \"short\" | \"mid\" | \"long\",\n\
       \"rationale\": \"...\",\n\
       \"key_levels\": [\"...\"],\n\
       \"sell_triggers\": [\"...\"],\n\
       \"hold_conditions\": [\"...\"],\n\
       \"skip_reason\": \"...\" (only when skipping)\n\
     }"
        .to_string()
}

pub fn sell_system_prompt() -> String {
    "You are the exit decision agent for an open position. Given the holding, its active \
     scenario, the current price, holding duration and the market regime, decide whether \
     to sell now, keep holding, or adjust the scenario levels.\n\
     Respond with ONLY this JSON object:\n\
     {\n\
       \"should_sell\": true | false,\n\
       \"sell_reason\": \"...\",\n\
       \"confidence\": 0.0-1.0,\n\
       \"adjustment\": {\"target_price\": number, \"stop_loss_price\": number} | null\n\
     }"
        .to_string()
}

pub fn journal_system_prompt() -> String {
    "You are the trade retrospective writer. Given a closed trade (entry context, exit \
     context, scenario, outcome), write a structured journal entry that future decisions \
     can learn from. Be specific about what was judged correctly and what was not.\n\
     Respond with ONLY this JSON object:\n\
     {\n\
       \"situation_analysis\": \"...\",\n\
       \"judgment_evaluation\": \"...\",\n\
       \"lessons\": [\"...\"],\n\
       \"pattern_tags\": [\"...\"],\n\
       \"one_line_summary\": \"...\",\n\
       \"confidence\": 0.0-1.0,\n\
       \"principle\": {\"condition\": \"...\", \"action\": \"...\", \"reason\": \"...\", \
\"scope\": \"universal\" | \"sector\" | \"market\"} | null\n\
     }"
        .to_string()
}
