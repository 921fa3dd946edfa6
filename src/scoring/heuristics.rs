//! Static URL heuristics.
//!
//! Pure and deterministic: no DNS, no fetch. Starts at 100 and subtracts a
//! fixed penalty for every check that fires.

use std::collections::BTreeSet;
use std::net::IpAddr;
use url::{Host, Url};

/// Penalty for a scheme other than `https`.
pub const INSECURE_SCHEME_PENALTY: u8 = 30;
/// Penalty for a known link-shortener host.
pub const SHORTENER_PENALTY: u8 = 15;
/// Penalty for a bare IP literal host.
pub const IP_LITERAL_PENALTY: u8 = 20;
/// Penalty for a TLD commonly abused for phishing.
pub const SUSPICIOUS_TLD_PENALTY: u8 = 10;

pub const THREAT_INSECURE_SCHEME: &str = "insecure_scheme";
pub const THREAT_URL_SHORTENER: &str = "url_shortener";
pub const THREAT_IP_LITERAL: &str = "ip_literal_host";
pub const THREAT_SUSPICIOUS_TLD: &str = "suspicious_tld";
pub const THREAT_MALFORMED_URL: &str = "malformed_url";

/// Link shorteners that hide the final destination.
pub const KNOWN_SHORTENERS: &[&str] = &[
    "bit.ly",
    "bitly.com",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "rebrand.ly",
    "cutt.ly",
    "shorturl.at",
    "tiny.cc",
    "rb.gy",
    "t.ly",
    "s.id",
];

/// TLDs with a high share of abuse reports.
pub const SUSPICIOUS_TLDS: &[&str] = &[
    "tk", "ml", "ga", "cf", "gq", "xyz", "top", "zip", "mov", "click", "country", "kim", "work",
    "rest", "cam",
];

/// Outcome of the static checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlHeuristic {
    /// Composite in `[0, 100]`.
    pub score: u8,
    pub threats: BTreeSet<String>,
}

/// Static URL checker with built-in lists plus configured extras.
#[derive(Debug, Clone)]
pub struct UrlHeuristics {
    shorteners: BTreeSet<String>,
    suspicious_tlds: BTreeSet<String>,
}

impl Default for UrlHeuristics {
    fn default() -> Self {
        Self::with_extras(&[], &[])
    }
}

impl UrlHeuristics {
    /// Builds the checker, extending the built-in lists.
    pub fn with_extras(shorteners: &[String], tlds: &[String]) -> Self {
        let shorteners = KNOWN_SHORTENERS
            .iter()
            .map(|s| s.to_string())
            .chain(shorteners.iter().map(|s| normalize_host(s)))
            .collect();
        let suspicious_tlds = SUSPICIOUS_TLDS
            .iter()
            .map(|s| s.to_string())
            .chain(tlds.iter().map(|s| normalize_host(s)))
            .collect();
        Self {
            shorteners,
            suspicious_tlds,
        }
    }

    /// Runs every check against `raw`.
    pub fn evaluate(&self, raw: &str) -> UrlHeuristic {
        let mut threats = BTreeSet::new();

        let parsed = match Url::parse(raw.trim()) {
            Ok(url) if url.host().is_some() => url,
            _ => {
                threats.insert(THREAT_MALFORMED_URL.to_string());
                return UrlHeuristic { score: 0, threats };
            }
        };

        let mut score: u8 = 100;

        if parsed.scheme() != "https" {
            score = score.saturating_sub(INSECURE_SCHEME_PENALTY);
            threats.insert(THREAT_INSECURE_SCHEME.to_string());
        }

        match parsed.host() {
            Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                score = score.saturating_sub(IP_LITERAL_PENALTY);
                threats.insert(THREAT_IP_LITERAL.to_string());
            }
            Some(Host::Domain(domain)) => {
                let domain = normalize_host(domain);
                // Some parsers leave dotted-quad hosts as domains for
                // non-special schemes.
                if domain.parse::<IpAddr>().is_ok() {
                    score = score.saturating_sub(IP_LITERAL_PENALTY);
                    threats.insert(THREAT_IP_LITERAL.to_string());
                } else {
                    if self.is_shortener(&domain) {
                        score = score.saturating_sub(SHORTENER_PENALTY);
                        threats.insert(THREAT_URL_SHORTENER.to_string());
                    }
                    if self.has_suspicious_tld(&domain) {
                        score = score.saturating_sub(SUSPICIOUS_TLD_PENALTY);
                        threats.insert(THREAT_SUSPICIOUS_TLD.to_string());
                    }
                }
            }
            None => {}
        }

        UrlHeuristic { score, threats }
    }

    /// True if `domain` or any parent domain is a known shortener.
    fn is_shortener(&self, domain: &str) -> bool {
        let mut candidate = domain;
        loop {
            if self.shorteners.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return false,
            }
        }
    }

    fn has_suspicious_tld(&self, domain: &str) -> bool {
        domain
            .rsplit('.')
            .next()
            .is_some_and(|tld| self.suspicious_tlds.contains(tld))
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').trim_start_matches('.').to_ascii_lowercase()
}
