use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed list of analytical sections, in report order.
///
/// Ordering and headers are deterministic; only the content within each
/// section is model-generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisSection {
    PriceVolume,
    InstitutionalHoldings,
    CompanyStatus,
    CompanyOverview,
    News,
    MarketIndex,
}

impl AnalysisSection {
    pub const ORDER: [AnalysisSection; 6] = [
        AnalysisSection::PriceVolume,
        AnalysisSection::InstitutionalHoldings,
        AnalysisSection::CompanyStatus,
        AnalysisSection::CompanyOverview,
        AnalysisSection::News,
        AnalysisSection::MarketIndex,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AnalysisSection::PriceVolume => "price_volume_analysis",
            AnalysisSection::InstitutionalHoldings => "institutional_holdings_analysis",
            AnalysisSection::CompanyStatus => "company_status",
            AnalysisSection::CompanyOverview => "company_overview",
            AnalysisSection::News => "news_analysis",
            AnalysisSection::MarketIndex => "market_index_analysis",
        }
    }

    /// Markdown header used in the assembled report.
    pub fn title(&self) -> &'static str {
        match self {
            AnalysisSection::PriceVolume => "Price & Volume Analysis",
            AnalysisSection::InstitutionalHoldings => "Institutional Holdings",
            AnalysisSection::CompanyStatus => "Company Status",
            AnalysisSection::CompanyOverview => "Company Overview",
            AnalysisSection::News => "News & Catalysts",
            AnalysisSection::MarketIndex => "Market Index & Regime",
        }
    }

    pub fn placeholder(&self) -> String {
        format!("Analysis unavailable: {}", self.id())
    }
}

impl fmt::Display for AnalysisSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// One section's output inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionOutput {
    pub section: AnalysisSection,
    pub content: String,
    /// True when the content is a placeholder after exhausted retries.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_complete_and_stable() {
        assert_eq!(AnalysisSection::ORDER.len(), 6);
        assert_eq!(AnalysisSection::ORDER[0], AnalysisSection::PriceVolume);
        assert_eq!(AnalysisSection::ORDER[5], AnalysisSection::MarketIndex);
    }

    #[test]
    fn test_placeholder_names_the_section() {
        assert_eq!(
            AnalysisSection::News.placeholder(),
            "Analysis unavailable: news_analysis"
        );
    }
}
