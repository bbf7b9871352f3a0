//! URL normalization and validation.
//!
//! Canonicalizes a raw user string into an origin plus registrable-domain
//! (eTLD+1) identity, rejecting inputs that can never be a crawlable public
//! site. `normalize` is a pure function: identical input always yields an
//! identical result, and no network access happens here.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::UrlRejection;

/// Maximum accepted input length.
pub const MAX_URL_LENGTH: usize = 2000;

/// Hostnames that are never real competitor sites.
const PLACEHOLDER_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "example.net",
    "test.com",
    "test.org",
    "test.net",
    "local",
];

/// Non-IP hostnames that resolve to the local machine or cloud metadata.
const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "0.0.0.0",
    "metadata.google.internal",
    "metadata.gke.internal",
    "instance-data",
];

/// Two-part public suffixes checked before the last-two-labels fallback.
///
/// A fixed table, not the full public-suffix list: it covers the
/// multi-label registries competitor sites actually land on.
const TWO_PART_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "co.nz", "net.nz", "org.nz", "com.au",
    "net.au", "org.au", "com.br", "net.br", "org.br", "com.mx", "com.ar", "com.co", "co.jp",
    "ne.jp", "or.jp", "co.kr", "co.in", "net.in", "org.in", "co.za", "org.za", "com.sg",
    "com.my", "com.hk", "com.tw", "com.cn", "net.cn", "org.cn", "com.tr", "com.pl", "com.ua",
];

fn blocked_ranges() -> &'static [ipnet::IpNet] {
    static RANGES: OnceLock<Vec<ipnet::IpNet>> = OnceLock::new();
    RANGES.get_or_init(|| {
        [
            "127.0.0.0/8",    // loopback
            "10.0.0.0/8",     // RFC1918
            "172.16.0.0/12",  // RFC1918
            "192.168.0.0/16", // RFC1918
            "169.254.0.0/16", // link-local / cloud metadata
            "0.0.0.0/8",      // unspecified
            "::1/128",        // IPv6 loopback
            "fc00::/7",       // IPv6 private
            "fe80::/10",      // IPv6 link-local
        ]
        .iter()
        .map(|cidr| cidr.parse().expect("valid CIDR literal"))
        .collect()
    })
}

fn placeholder_domains() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| PLACEHOLDER_DOMAINS.iter().copied().collect())
}

/// A validated, canonicalized URL identity.
///
/// Produced only by [`normalize`]; a value of this type always has an
/// `http`/`https` origin ending in `/` and a lowercase `etld1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedUrl {
    /// Canonical origin: `scheme://host[:port]/` (default ports dropped)
    pub normalized_origin: String,

    /// The URL exactly as the user submitted it
    pub requested_url: String,

    /// Path + query + fragment when the input pointed below the root
    pub original_path: Option<String>,

    /// Registrable domain (eTLD+1), the stable dedup identity
    pub etld1: String,
}

/// Canonicalize and validate a raw user string.
pub fn normalize(input: &str) -> Result<NormalizedUrl, UrlRejection> {
    if input.len() > MAX_URL_LENGTH {
        return Err(UrlRejection::TooLong {
            length: input.len(),
            max: MAX_URL_LENGTH,
        });
    }
    if input.chars().any(char::is_whitespace) {
        return Err(UrlRejection::ContainsWhitespace);
    }

    // Prepend https:// for bare hostnames; inputs that already carry a
    // scheme are parsed as-is.
    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    let parsed = Url::parse(&candidate)?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(UrlRejection::UnsupportedScheme(scheme.to_string()));
    }

    let host = parsed
        .host()
        .ok_or(url::ParseError::EmptyHost)?
        .to_owned();
    let host_str = parsed.host_str().unwrap_or_default().to_ascii_lowercase();

    match &host {
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            if BLOCKED_HOSTS.contains(&domain.as_str()) {
                return Err(UrlRejection::PrivateOrLocalAddress(domain));
            }
            if placeholder_domains().contains(domain.as_str()) {
                return Err(UrlRejection::PlaceholderDomain(domain));
            }
            if !domain.contains('.') {
                return Err(UrlRejection::InvalidDomain(domain));
            }
        }
        Host::Ipv4(addr) => {
            if is_blocked_ip(&IpAddr::V4(*addr)) {
                return Err(UrlRejection::PrivateOrLocalAddress(addr.to_string()));
            }
        }
        Host::Ipv6(addr) => {
            if is_blocked_ip(&IpAddr::V6(*addr)) {
                return Err(UrlRejection::PrivateOrLocalAddress(addr.to_string()));
            }
        }
    }

    let port_suffix = parsed
        .port()
        .map(|p| format!(":{p}"))
        .unwrap_or_default();
    let normalized_origin = format!("{scheme}://{host_str}{port_suffix}/");

    let mut original_path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        original_path.push('?');
        original_path.push_str(query);
    }
    if let Some(fragment) = parsed.fragment() {
        original_path.push('#');
        original_path.push_str(fragment);
    }
    let original_path = (original_path != "/").then_some(original_path);

    Ok(NormalizedUrl {
        normalized_origin,
        requested_url: input.to_string(),
        original_path,
        etld1: registrable_domain(&host_str),
    })
}

fn is_blocked_ip(ip: &IpAddr) -> bool {
    blocked_ranges().iter().any(|range| range.contains(ip))
}

/// Extract the registrable domain (eTLD+1) from a hostname.
///
/// Longest match against the fixed two-part-suffix table first, then the
/// last-two-labels fallback. IP literals are their own identity.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if TWO_PART_SUFFIXES.contains(&last_two.as_str()) {
        labels[labels.len() - 3..].join(".")
    } else {
        last_two
    }
}

/// Derive a display name for a competitor from its eTLD+1.
///
/// `pal-robotics.com` becomes `Pal Robotics`; a blank identity maps to
/// the literal `Unknown`.
pub fn competitor_name(etld1: &str) -> String {
    let trimmed = etld1.trim();
    let trimmed = trimmed.strip_prefix("www.").unwrap_or(trimmed);
    let label = trimmed.split('.').next().unwrap_or_default();
    let words: Vec<String> = label
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(title_case)
        .collect();

    if words.is_empty() {
        "Unknown".to_string()
    } else {
        words.join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
