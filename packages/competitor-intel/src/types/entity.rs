//! Business entity projections - companies, products, signals, releases.
//!
//! These are read projections over records the storage layer owns; the
//! pipeline only counts them and the search engine only ranks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The minimal company identity used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
}

/// A tracked competitor company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub description: Option<String>,

    /// Alternative names the company is known by
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Company {
    /// Create a company with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            website: None,
            description: None,
            aliases: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Set the website.
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// The identity row used by the dedup matcher.
    pub fn identity(&self) -> CompanyIdentity {
        CompanyIdentity {
            id: self.id,
            name: self.name.clone(),
            website: self.website.clone(),
        }
    }
}

/// A product or offering extracted from a competitor site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub name: String,
    pub summary: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: None,
            name: name.into(),
            summary: None,
            tags: Vec::new(),
        }
    }

    pub fn with_company(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A market signal (announcement, hire, funding, partnership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub headline: String,
    pub summary: Option<String>,
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Signal {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: None,
            headline: headline.into(),
            summary: None,
            date: None,
            tags: Vec::new(),
        }
    }

    pub fn with_company(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A product release or changelog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub title: String,
    pub notes: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl Release {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: None,
            product_id: None,
            title: title.into(),
            notes: None,
            date: None,
        }
    }

    pub fn with_company(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn with_product(mut self, product_id: Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }
}

/// Per-entity-type counts reported by the extraction service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    #[serde(default)]
    pub companies: usize,
    #[serde(default)]
    pub products: usize,
    #[serde(default)]
    pub capabilities: usize,
    #[serde(default)]
    pub releases: usize,
    #[serde(default)]
    pub signals: usize,
}

impl EntityCounts {
    /// Total entities across all types.
    pub fn total(&self) -> usize {
        self.companies + self.products + self.capabilities + self.releases + self.signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_identity_round_trip() {
        let company = Company::new("Acme").with_website("https://acme.com");
        let identity = company.identity();
        assert_eq!(identity.id, company.id);
        assert_eq!(identity.website.as_deref(), Some("https://acme.com"));
    }

    #[test]
    fn entity_counts_total() {
        let counts = EntityCounts {
            companies: 1,
            products: 3,
            capabilities: 2,
            releases: 4,
            signals: 5,
        };
        assert_eq!(counts.total(), 15);
    }
}
