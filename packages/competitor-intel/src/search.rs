//! Ranked multi-entity search.
//!
//! Scores companies, products, signals, and releases against a free-text
//! query. Each bucket is scored independently; typed prefixes
//! (`company:`, `product:`, `signal:`, `release:`) restrict the search
//! to one bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::entity::{Company, Product, Release, Signal};

const EXACT_SCORE: u32 = 100;
const PREFIX_SCORE: u32 = 80;
const CONTAINS_SCORE: u32 = 60;
const SECONDARY_SCORE: u32 = 40;

/// Entity type of a search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Company,
    Product,
    Signal,
    Release,
}

/// One ranked hit, shaped for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub kind: EntityKind,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub score: u32,
}

/// Ranked results, one bucket per entity type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub companies: Vec<SearchResult>,
    pub products: Vec<SearchResult>,
    pub signals: Vec<SearchResult>,
    pub releases: Vec<SearchResult>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
            && self.products.is_empty()
            && self.signals.is_empty()
            && self.releases.is_empty()
    }
}

/// Which buckets a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Companies,
    Products,
    Signals,
    Releases,
}

/// In-memory entity collections the search runs over.
///
/// Computed fresh per query against whatever snapshot the caller loads;
/// nothing here is persisted.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    companies: Vec<Company>,
    products: Vec<Product>,
    signals: Vec<Signal>,
    releases: Vec<Release>,
    limit: usize,
}

impl SearchIndex {
    /// Create an empty index with the default per-bucket cap.
    pub fn new() -> Self {
        Self {
            limit: 5,
            ..Default::default()
        }
    }

    /// Set the per-bucket result cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Load companies.
    pub fn with_companies(mut self, companies: impl IntoIterator<Item = Company>) -> Self {
        self.companies = companies.into_iter().collect();
        self
    }

    /// Load products.
    pub fn with_products(mut self, products: impl IntoIterator<Item = Product>) -> Self {
        self.products = products.into_iter().collect();
        self
    }

    /// Load signals.
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.signals = signals.into_iter().collect();
        self
    }

    /// Load releases.
    pub fn with_releases(mut self, releases: impl IntoIterator<Item = Release>) -> Self {
        self.releases = releases.into_iter().collect();
        self
    }

    /// Run a query. Empty (or whitespace-only) queries return empty
    /// buckets for every type.
    pub fn search(&self, query: &str) -> SearchResults {
        let (scope, term) = parse_query(query);
        if term.is_empty() {
            return SearchResults::default();
        }

        let mut results = SearchResults::default();
        if matches!(scope, Scope::All | Scope::Companies) {
            results.companies = self.search_companies(&term);
        }
        if matches!(scope, Scope::All | Scope::Products) {
            results.products = self.search_products(&term);
        }
        if matches!(scope, Scope::All | Scope::Signals) {
            results.signals = self.search_signals(&term);
        }
        if matches!(scope, Scope::All | Scope::Releases) {
            results.releases = self.search_releases(&term);
        }
        results
    }

    fn search_companies(&self, term: &str) -> Vec<SearchResult> {
        let scored = self.companies.iter().filter_map(|company| {
            let mut secondary: Vec<&str> = company.aliases.iter().map(String::as_str).collect();
            secondary.extend(company.tags.iter().map(String::as_str));
            if let Some(description) = company.description.as_deref() {
                secondary.push(description);
            }
            ladder_score(&company.name, &secondary, term).map(|score| SearchResult {
                id: company.id,
                kind: EntityKind::Company,
                title: company.name.clone(),
                subtitle: company.website.clone(),
                description: company.description.clone(),
                date: None,
                score,
            })
        });
        rank(scored, self.limit)
    }

    fn search_products(&self, term: &str) -> Vec<SearchResult> {
        let scored = self.products.iter().filter_map(|product| {
            let mut secondary: Vec<&str> = product.tags.iter().map(String::as_str).collect();
            if let Some(summary) = product.summary.as_deref() {
                secondary.push(summary);
            }
            ladder_score(&product.name, &secondary, term).map(|score| SearchResult {
                id: product.id,
                kind: EntityKind::Product,
                title: product.name.clone(),
                subtitle: product.company_id.map(|id| self.company_label(id)),
                description: product.summary.clone(),
                date: None,
                score,
            })
        });
        rank(scored, self.limit)
    }

    fn search_signals(&self, term: &str) -> Vec<SearchResult> {
        let scored = self.signals.iter().filter_map(|signal| {
            let mut secondary: Vec<&str> = signal.tags.iter().map(String::as_str).collect();
            if let Some(summary) = signal.summary.as_deref() {
                secondary.push(summary);
            }
            ladder_score(&signal.headline, &secondary, term).map(|score| SearchResult {
                id: signal.id,
                kind: EntityKind::Signal,
                title: signal.headline.clone(),
                subtitle: signal.company_id.map(|id| self.company_label(id)),
                description: signal.summary.clone(),
                date: signal.date,
                score,
            })
        });
        rank(scored, self.limit)
    }

    fn search_releases(&self, term: &str) -> Vec<SearchResult> {
        let scored = self.releases.iter().filter_map(|release| {
            let secondary: Vec<&str> = release.notes.as_deref().into_iter().collect();
            ladder_score(&release.title, &secondary, term).map(|score| SearchResult {
                id: release.id,
                kind: EntityKind::Release,
                title: release.title.clone(),
                subtitle: release
                    .product_id
                    .map(|id| self.product_label(id))
                    .or_else(|| release.company_id.map(|id| self.company_label(id))),
                description: release.notes.clone(),
                date: release.date,
                score,
            })
        });
        rank(scored, self.limit)
    }

    /// Resolve a company name by id, degrading to a placeholder label.
    fn company_label(&self, id: Uuid) -> String {
        self.companies
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "Unknown company".to_string())
    }

    /// Resolve a product name by id, degrading to a placeholder label.
    fn product_label(&self, id: Uuid) -> String {
        self.products
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown product".to_string())
    }
}

/// Split a raw query into its scope and lowercase term.
fn parse_query(raw: &str) -> (Scope, String) {
    let query = raw.trim().to_lowercase();
    for (prefix, scope) in [
        ("company:", Scope::Companies),
        ("product:", Scope::Products),
        ("signal:", Scope::Signals),
        ("release:", Scope::Releases),
    ] {
        if let Some(rest) = query.strip_prefix(prefix) {
            return (scope, rest.trim().to_string());
        }
    }
    (Scope::All, query)
}

/// Score a single entity on the match ladder: exact primary match, then
/// primary prefix, then primary substring, then secondary substring.
/// First rung wins; no rung means the entity is excluded outright.
fn ladder_score(primary: &str, secondary: &[&str], term: &str) -> Option<u32> {
    let primary = primary.to_lowercase();
    if primary == term {
        return Some(EXACT_SCORE);
    }
    if primary.starts_with(term) {
        return Some(PREFIX_SCORE);
    }
    if primary.contains(term) {
        return Some(CONTAINS_SCORE);
    }
    if secondary
        .iter()
        .any(|field| field.to_lowercase().contains(term))
    {
        return Some(SECONDARY_SCORE);
    }
    None
}

/// Order hits by descending score; the sort is stable, so ties keep the
/// original collection order. Caps the bucket at `limit`.
fn rank(scored: impl Iterator<Item = SearchResult>, limit: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = scored.collect();
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> SearchIndex {
        let acme = Company::new("Acme")
            .with_website("https://acme.com")
            .with_tag("robotics");
        let acme_id = acme.id;

        SearchIndex::new()
            .with_companies([
                acme,
                Company::new("Robot Corp").with_website("https://robotcorp.io"),
                Company::new("robot"),
            ])
            .with_products([
                Product::new("Gripper X").with_company(acme_id).with_tag("robot arm"),
                Product::new("Orphaned Widget").with_company(Uuid::new_v4()),
            ])
            .with_signals([Signal::new("Series B raised").with_company(acme_id)])
            .with_releases([Release::new("Gripper X 2.0").with_company(acme_id)])
    }

    #[test]
    fn empty_query_returns_empty_buckets() {
        assert!(index().search("").is_empty());
        assert!(index().search("   ").is_empty());
    }

    #[test]
    fn ladder_orders_exact_prefix_contains_secondary() {
        let results = index().search("robot");
        let companies = &results.companies;

        // exact "robot" > prefix "Robot Corp" > secondary-tag "Acme"
        assert_eq!(companies[0].title, "robot");
        assert_eq!(companies[0].score, 100);
        assert_eq!(companies[1].title, "Robot Corp");
        assert_eq!(companies[1].score, 80);
        assert_eq!(companies[2].title, "Acme");
        assert_eq!(companies[2].score, 40);

        // Products match via the "robot arm" tag.
        assert_eq!(results.products[0].title, "Gripper X");
        assert_eq!(results.products[0].score, 40);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let results = index().search("ROBOT");
        assert_eq!(results.companies[0].score, 100);
    }

    #[test]
    fn non_matching_entities_are_excluded_not_zero_scored() {
        let results = index().search("gripper");
        assert!(results.companies.is_empty());
        assert_eq!(results.products.len(), 1);
    }

    #[test]
    fn operator_prefix_scopes_to_one_bucket() {
        let results = index().search("company:acme");
        assert_eq!(results.companies.len(), 1);
        assert_eq!(results.companies[0].title, "Acme");
        assert!(results.products.is_empty());
        assert!(results.signals.is_empty());
        assert!(results.releases.is_empty());

        let results = index().search("release:gripper");
        assert!(results.companies.is_empty());
        assert_eq!(results.releases.len(), 1);
    }

    #[test]
    fn bucket_never_exceeds_limit_and_ties_keep_input_order() {
        let companies: Vec<Company> = (0..8)
            .map(|i| Company::new(format!("widgetco {i}")))
            .collect();
        let index = SearchIndex::new().with_limit(5).with_companies(companies);

        let results = index.search("widgetco");
        assert_eq!(results.companies.len(), 5);
        // All prefix matches score 80; stable sort keeps input order.
        for (i, hit) in results.companies.iter().enumerate() {
            assert_eq!(hit.title, format!("widgetco {i}"));
            assert_eq!(hit.score, 80);
        }
    }

    #[test]
    fn cross_references_resolve_by_id() {
        let results = index().search("gripper");
        assert_eq!(results.products[0].subtitle.as_deref(), Some("Acme"));
        assert_eq!(results.releases[0].subtitle.as_deref(), Some("Acme"));
    }

    #[test]
    fn missing_cross_reference_degrades_to_unknown_label() {
        let results = index().search("orphaned");
        assert_eq!(
            results.products[0].subtitle.as_deref(),
            Some("Unknown company")
        );
    }
}
