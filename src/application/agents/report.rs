//! The structured report object and its markdown rendering.

use crate::application::agents::sections::SectionOutput;
use crate::domain::market::ticker::Ticker;
use crate::domain::ports::TokenUsage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the evaluator graded a broadcast summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryRating {
    Excellent,
    Good,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSummary {
    pub text: String,
    pub rating: SummaryRating,
    pub iterations: u32,
}

/// One ticker's full analytical report: six sections in fixed order, the
/// integrated strategy, and an optional broadcast summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerReport {
    pub ticker: Ticker,
    pub company_name: String,
    pub sector: String,
    pub reference_date: NaiveDate,
    pub language: String,
    pub sections: Vec<SectionOutput>,
    pub strategy: String,
    pub strategy_degraded: bool,
    pub summary: Option<BroadcastSummary>,
    pub usage: TokenUsage,
}

impl TickerReport {
    pub fn degraded_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.degraded).count()
    }

    /// Render the report with its fixed section ordering and headers.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# {} ({}) - {}\n\n",
            self.company_name, self.ticker, self.reference_date
        ));
        out.push_str(&format!("Sector: {}\n\n", self.sector));

        for section in &self.sections {
            out.push_str(&format!("## {}\n\n{}\n\n", section.section.title(), section.content));
        }

        out.push_str(&format!("## Integrated Strategy\n\n{}\n", self.strategy));

        if let Some(summary) = &self.summary {
            out.push_str(&format!("\n## Summary\n\n{}\n", summary.text));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agents::sections::AnalysisSection;

    #[test]
    fn test_markdown_has_fixed_headers_in_order() {
        let report = TickerReport {
            ticker: Ticker::us("WMT"),
            company_name: "Walmart".to_string(),
            sector: "Retail".to_string(),
            reference_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            language: "en".to_string(),
            sections: AnalysisSection::ORDER
                .iter()
                .map(|s| SectionOutput {
                    section: *s,
                    content: format!("content for {}", s),
                    degraded: false,
                })
                .collect(),
            strategy: "strategy text".to_string(),
            strategy_degraded: false,
            summary: None,
            usage: TokenUsage::default(),
        };

        let md = report.to_markdown();
        let price_pos = md.find("## Price & Volume Analysis").unwrap();
        let index_pos = md.find("## Market Index & Regime").unwrap();
        let strategy_pos = md.find("## Integrated Strategy").unwrap();
        assert!(price_pos < index_pos && index_pos < strategy_pos);
    }

    #[test]
    fn test_degraded_count() {
        let report = TickerReport {
            ticker: Ticker::us("WMT"),
            company_name: "Walmart".to_string(),
            sector: "Retail".to_string(),
            reference_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            language: "en".to_string(),
            sections: vec![
                SectionOutput {
                    section: AnalysisSection::News,
                    content: AnalysisSection::News.placeholder(),
                    degraded: true,
                },
                SectionOutput {
                    section: AnalysisSection::PriceVolume,
                    content: "fine".to_string(),
                    degraded: false,
                },
            ],
            strategy: String::new(),
            strategy_degraded: false,
            summary: None,
            usage: TokenUsage::default(),
        };
        assert_eq!(report.degraded_sections(), 1);
    }
}
