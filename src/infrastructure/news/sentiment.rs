//! Local VADER sentiment scoring for news headlines, with financial
//! keyword boosting for jargon the general lexicon misses.

use vader_sentiment::SentimentIntensityAnalyzer;

const BULLISH_KEYWORDS: &[(&str, f64)] = &[
    ("surge", 0.4),
    ("surges", 0.4),
    ("rally", 0.4),
    ("rallies", 0.4),
    ("soar", 0.5),
    ("soars", 0.5),
    ("record high", 0.4),
    ("all-time high", 0.5),
    ("beats estimates", 0.5),
    ("raises guidance", 0.5),
    ("upgrade", 0.3),
    ("upgraded", 0.3),
    ("buyback", 0.3),
    ("dividend hike", 0.3),
    ("breakout", 0.3),
    ("contract win", 0.3),
    ("approval", 0.2),
    ("partnership", 0.2),
];

const BEARISH_KEYWORDS: &[(&str, f64)] = &[
    ("plunge", -0.5),
    ("plunges", -0.5),
    ("crash", -0.5),
    ("crashes", -0.5),
    ("misses estimates", -0.5),
    ("cuts guidance", -0.5),
    ("downgrade", -0.3),
    ("downgraded", -0.3),
    ("lawsuit", -0.4),
    ("probe", -0.3),
    ("investigation", -0.3),
    ("recall", -0.4),
    ("sell-off", -0.4),
    ("selloff", -0.4),
    ("bankruptcy", -0.6),
    ("default", -0.5),
    ("layoffs", -0.3),
    ("halted", -0.4),
];

pub struct SentimentAnalyzer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    fn financial_boost(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let mut boost = 0.0;

        for (keyword, score) in BULLISH_KEYWORDS {
            if text_lower.contains(keyword) {
                boost += score;
            }
        }
        for (keyword, score) in BEARISH_KEYWORDS {
            if text_lower.contains(keyword) {
                boost += score;
            }
        }
        boost
    }

    /// Score text into [-1.0, 1.0]; VADER compound plus keyword boost.
    pub fn analyze(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(text);
        let vader_score = scores["compound"];
        let combined = vader_score + self.financial_boost(text) * 0.5;
        combined.clamp(-1.0, 1.0)
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bullish_headlines_score_positive() {
        let analyzer = SentimentAnalyzer::new();
        for headline in [
            "Shares surge to record high after earnings beat",
            "Company beats estimates and raises guidance",
            "Stock rallies on major contract win",
        ] {
            assert!(
                analyzer.analyze(headline) > 0.0,
                "expected bullish: {}",
                headline
            );
        }
    }

    #[test]
    fn test_bearish_headlines_score_negative() {
        let analyzer = SentimentAnalyzer::new();
        for headline in [
            "Stock plunges after company cuts guidance",
            "Shares crash amid bankruptcy fears and layoffs",
            "Regulator opens investigation, shares halted",
        ] {
            assert!(
                analyzer.analyze(headline) < 0.0,
                "expected bearish: {}",
                headline
            );
        }
    }

    #[test]
    fn test_empty_text_is_neutral() {
        let analyzer = SentimentAnalyzer::new();
        assert_eq!(analyzer.analyze(""), 0.0);
        assert_eq!(analyzer.analyze("   "), 0.0);
    }
}
