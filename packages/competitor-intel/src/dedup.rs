//! Duplicate-company detection.
//!
//! Decides whether a normalized URL identity already corresponds to a known
//! company. Domain identity is authoritative; name matching is a soft
//! fallback that catches re-entry of the same company under a different
//! website.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::registrable_domain;
use crate::types::entity::CompanyIdentity;

/// How an existing company was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Domain,
    Name,
}

/// Outcome of a dedup check against the company snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DedupMatch {
    /// No existing company shares this identity
    Unique,

    /// An existing company already covers this identity
    Duplicate {
        company_id: Uuid,
        company_name: String,
        matched_by: MatchKind,
    },
}

impl DedupMatch {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DedupMatch::Duplicate { .. })
    }
}

/// Check a candidate identity against the existing company snapshot.
///
/// Two passes over `existing`, in input order:
/// 1. domain pass — the candidate eTLD+1 against each company website's
///    eTLD+1, case-insensitive, first match wins;
/// 2. name pass — only if no domain matched anywhere; names are stripped
///    to lowercase alphanumerics and compared exactly, with candidates of
///    three characters or fewer never counted.
pub fn match_company(
    etld1: &str,
    candidate_name: &str,
    existing: &[CompanyIdentity],
) -> DedupMatch {
    let candidate_domain = etld1.to_ascii_lowercase();

    for company in existing {
        let Some(website) = company.website.as_deref() else {
            continue;
        };
        let Some(host) = website_host(website) else {
            continue;
        };
        if registrable_domain(&host) == candidate_domain {
            return DedupMatch::Duplicate {
                company_id: company.id,
                company_name: company.name.clone(),
                matched_by: MatchKind::Domain,
            };
        }
    }

    let candidate = normalize_name(candidate_name);
    if candidate.len() > 2 {
        for company in existing {
            if normalize_name(&company.name) == candidate {
                return DedupMatch::Duplicate {
                    company_id: company.id,
                    company_name: company.name.clone(),
                    matched_by: MatchKind::Name,
                };
            }
        }
    }

    DedupMatch::Unique
}

fn website_host(website: &str) -> Option<String> {
    let candidate = if website.contains("://") {
        website.to_string()
    } else {
        format!("https://{website}")
    };
    url::Url::parse(&candidate)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(name: &str, website: Option<&str>) -> CompanyIdentity {
        CompanyIdentity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            website: website.map(str::to_string),
        }
    }

    #[test]
    fn domain_match_wins_even_when_names_differ() {
        let existing = vec![company("PAL Robotics", Some("https://pal-robotics.com"))];
        let result = match_company("pal-robotics.com", "Anything", &existing);
        assert_eq!(
            result,
            DedupMatch::Duplicate {
                company_id: existing[0].id,
                company_name: "PAL Robotics".to_string(),
                matched_by: MatchKind::Domain,
            }
        );
    }

    #[test]
    fn domain_match_ignores_subdomain_and_case() {
        let existing = vec![company("Acme", Some("https://WWW.Acme.co.uk/about"))];
        let result = match_company("acme.co.uk", "Other", &existing);
        assert!(matches!(
            result,
            DedupMatch::Duplicate {
                matched_by: MatchKind::Domain,
                ..
            }
        ));
    }

    #[test]
    fn first_domain_match_in_input_order_wins() {
        let first = company("First", Some("acme.com"));
        let second = company("Second", Some("acme.com"));
        let result = match_company("acme.com", "Acme", &[first.clone(), second]);
        assert!(
            matches!(result, DedupMatch::Duplicate { company_id, .. } if company_id == first.id)
        );
    }

    #[test]
    fn name_fallback_when_no_domain_matches() {
        let existing = vec![company("Robo-Corp Inc.", Some("https://old-site.net"))];
        let result = match_company("robocorp.io", "Robo Corp, Inc", &existing);
        assert!(matches!(
            result,
            DedupMatch::Duplicate {
                matched_by: MatchKind::Name,
                ..
            }
        ));
    }

    #[test]
    fn short_names_never_match() {
        let existing = vec![company("AB", Some("https://somewhere.com"))];
        assert_eq!(match_company("ab.io", "A.B.", &existing), DedupMatch::Unique);
    }

    #[test]
    fn companies_without_websites_are_skipped_in_domain_pass() {
        let existing = vec![company("No Site", None)];
        assert_eq!(
            match_company("nosite.com", "Different", &existing),
            DedupMatch::Unique
        );
    }

    #[test]
    fn unique_when_nothing_matches() {
        let existing = vec![
            company("Acme", Some("acme.com")),
            company("Globex", Some("globex.io")),
        ];
        assert_eq!(
            match_company("initech.com", "Initech", &existing),
            DedupMatch::Unique
        );
    }
}
