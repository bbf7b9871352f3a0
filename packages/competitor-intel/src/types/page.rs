//! Discovered pages and their scoring annotations.

use serde::{Deserialize, Serialize};

use crate::types::config::ScorePreference;

/// How a page's relevance score was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Rule-based heuristics (the initial score, and the fallback when
    /// the AI scorer cannot handle a page)
    Rules,
    /// AI model score with confidence and reasoning attached
    Ai,
}

/// Coarse page classification assigned by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageCategory {
    Product,
    Pricing,
    Docs,
    Blog,
    About,
    Careers,
    Legal,
    #[serde(other)]
    Other,
}

/// One page found by the discovery crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub url: String,
    pub title: Option<String>,

    /// Relevance score in [0, 100]
    pub score: f32,
    pub category: Option<PageCategory>,
    pub scoring_method: ScoringMethod,

    /// Model confidence, only present for AI-scored pages
    pub ai_confidence: Option<f32>,
    /// Model reasoning, only present for AI-scored pages
    pub ai_reasoning: Option<String>,
}

impl DiscoveredPage {
    /// Create a page with a rules-based starter score.
    pub fn new(url: impl Into<String>, score: f32) -> Self {
        Self {
            url: url.into(),
            title: None,
            score,
            category: None,
            scoring_method: ScoringMethod::Rules,
            ai_confidence: None,
            ai_reasoning: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: PageCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Attach an AI score, replacing the rules-based one.
    pub fn with_ai_score(mut self, score: f32, confidence: f32, reasoning: impl Into<String>) -> Self {
        self.score = score;
        self.scoring_method = ScoringMethod::Ai;
        self.ai_confidence = Some(confidence);
        self.ai_reasoning = Some(reasoning.into());
        self
    }

    /// Take the scorer's annotations onto this page, keeping the URL and
    /// title identity. Pages the scorer marked `rules` keep whatever
    /// fallback score the scorer assigned.
    pub fn merge_scoring(&mut self, scored: &DiscoveredPage) {
        self.score = scored.score;
        self.category = scored.category;
        self.scoring_method = scored.scoring_method;
        self.ai_confidence = scored.ai_confidence;
        self.ai_reasoning = scored.ai_reasoning.clone();
    }

    /// Whether this page's scoring method matches the configured
    /// preference (tie-break input for review ranking).
    fn preferred_by(&self, preference: ScorePreference) -> bool {
        match preference {
            ScorePreference::PreferAi => self.scoring_method == ScoringMethod::Ai,
            ScorePreference::PreferRules => self.scoring_method == ScoringMethod::Rules,
        }
    }
}

/// Sort pages for review: descending score, preferred scoring method
/// first on equal scores, stable otherwise.
pub fn rank_pages(pages: &mut [DiscoveredPage], preference: ScorePreference) {
    pages.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.preferred_by(preference).cmp(&a.preferred_by(preference)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_scoring_replaces_annotations_only() {
        let mut page = DiscoveredPage::new("https://acme.com/pricing", 40.0)
            .with_title("Pricing");
        let scored = DiscoveredPage::new("https://acme.com/pricing", 92.0)
            .with_category(PageCategory::Pricing)
            .with_ai_score(92.0, 0.87, "pricing table present");

        page.merge_scoring(&scored);

        assert_eq!(page.title.as_deref(), Some("Pricing"));
        assert_eq!(page.score, 92.0);
        assert_eq!(page.scoring_method, ScoringMethod::Ai);
        assert_eq!(page.ai_confidence, Some(0.87));
        assert_eq!(page.category, Some(PageCategory::Pricing));
    }

    #[test]
    fn rank_pages_orders_by_score_then_preference() {
        let mut pages = vec![
            DiscoveredPage::new("https://acme.com/rules", 80.0),
            DiscoveredPage::new("https://acme.com/ai", 80.0).with_ai_score(80.0, 0.9, "r"),
            DiscoveredPage::new("https://acme.com/top", 95.0),
        ];

        rank_pages(&mut pages, ScorePreference::PreferAi);
        assert_eq!(pages[0].url, "https://acme.com/top");
        assert_eq!(pages[1].url, "https://acme.com/ai");
        assert_eq!(pages[2].url, "https://acme.com/rules");

        rank_pages(&mut pages, ScorePreference::PreferRules);
        assert_eq!(pages[1].url, "https://acme.com/rules");
    }

    #[test]
    fn unknown_categories_deserialize_as_other() {
        let page: DiscoveredPage = serde_json::from_str(
            r#"{"url":"https://acme.com/x","title":null,"score":10.0,
                "category":"press_kit","scoring_method":"rules",
                "ai_confidence":null,"ai_reasoning":null}"#,
        )
        .unwrap();
        assert_eq!(page.category, Some(PageCategory::Other));
    }
}
