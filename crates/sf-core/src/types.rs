//! Core type definitions for SiteFilter
//!
//! These types mirror the JSON shape rule items have in extension storage
//! (`{"type": "DOMAIN-SUFFIX", "rule": "example.com"}`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Rule Types
// =============================================================================

/// How a rule pattern is compared against a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Host must equal the pattern exactly
    Domain,
    /// Host equals the pattern or is a subdomain of it
    DomainSuffix,
    /// Pattern appears anywhere in the host
    DomainKeyword,
    /// Pattern is a regular expression tested against the full URL
    Regex,
    /// Any type tag this version does not know. Never matches.
    Unknown,
}

impl RuleType {
    /// Wire name of the rule type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "DOMAIN",
            Self::DomainSuffix => "DOMAIN-SUFFIX",
            Self::DomainKeyword => "DOMAIN-KEYWORD",
            Self::Regex => "REGEX",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire name, mapping anything unrecognized to `Unknown`.
    pub fn from_tag(s: &str) -> Self {
        match s {
            "DOMAIN" => Self::Domain,
            "DOMAIN-SUFFIX" => Self::DomainSuffix,
            "DOMAIN-KEYWORD" => Self::DomainKeyword,
            "REGEX" => Self::Regex,
            _ => Self::Unknown,
        }
    }
}

impl FromStr for RuleType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Unrecognized tags map to `Unknown` rather than failing.
impl<'de> Deserialize<'de> for RuleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

// =============================================================================
// Filter Rule Item
// =============================================================================

/// A single `(type, pattern)` filter rule as supplied by the rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRuleItem {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Pattern text. Empty or missing patterns never match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl FilterRuleItem {
    pub fn new(rule_type: RuleType, rule: impl Into<String>) -> Self {
        Self {
            rule_type,
            rule: Some(rule.into()),
        }
    }

    /// The pattern, or `None` when it is missing or empty.
    #[inline]
    pub fn pattern(&self) -> Option<&str> {
        self.rule.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Display for FilterRuleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.rule_type, self.rule.as_deref().unwrap_or(""))
    }
}
