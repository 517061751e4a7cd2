//! Rule Matching
//!
//! Evaluates one [`FilterRuleItem`] against one URL. Domain rule types only
//! look at the host; `REGEX` rules are searched in the full `href`, so they
//! are the only rules that can match on path or query.
//!
//! The host is compared as given. Lowercasing and punycode are the URL
//! parser's job, not the matcher's.
//!
//! `REGEX` patterns are compiled with `fancy-regex`, which accepts the
//! lookaround and backreferences that stored `RegExp` sources use.

use fancy_regex::Regex;

use crate::types::{FilterRuleItem, RuleType};
use crate::url::RuleTarget;

/// Error type for rule evaluation.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: fancy_regex::Error,
    },
    #[error("Regex pattern '{pattern}' failed while matching: {source}")]
    RegexMatch {
        pattern: String,
        #[source]
        source: fancy_regex::Error,
    },
}

// =============================================================================
// Compiled Rule
// =============================================================================

/// A rule with its pattern prepared for repeated matching.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    kind: CompiledKind,
}

#[derive(Debug, Clone)]
enum CompiledKind {
    /// Empty pattern or unknown type
    Never,
    Domain(String),
    DomainSuffix(String),
    DomainKeyword(String),
    Regex(Regex),
}

impl CompiledRule {
    /// Compile a rule item.
    ///
    /// Only `REGEX` rules can fail, and only when the pattern does not parse.
    pub fn compile(item: &FilterRuleItem) -> Result<Self, RuleError> {
        let Some(pattern) = item.pattern() else {
            return Ok(Self { kind: CompiledKind::Never });
        };

        let kind = match item.rule_type {
            RuleType::Domain => CompiledKind::Domain(pattern.to_string()),
            RuleType::DomainSuffix => CompiledKind::DomainSuffix(pattern.to_string()),
            RuleType::DomainKeyword => CompiledKind::DomainKeyword(pattern.to_string()),
            RuleType::Regex => {
                let re = Regex::new(pattern).map_err(|source| {
                    log::warn!("rejecting REGEX rule '{}': {}", pattern, source);
                    RuleError::InvalidRegex {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                CompiledKind::Regex(re)
            }
            RuleType::Unknown => {
                log::debug!("rule with unknown type never matches: {}", item);
                CompiledKind::Never
            }
        };

        Ok(Self { kind })
    }

    /// Check whether this rule matches `url`.
    ///
    /// Only a `REGEX` rule can fail here, when backtracking hits its limit.
    pub fn matches<T: RuleTarget + ?Sized>(&self, url: &T) -> Result<bool, RuleError> {
        Ok(match &self.kind {
            CompiledKind::Never => false,
            CompiledKind::Domain(domain) => url.host() == domain.as_str(),
            CompiledKind::DomainSuffix(suffix) => host_has_suffix(url.host(), suffix),
            CompiledKind::DomainKeyword(keyword) => url.host().contains(keyword.as_str()),
            CompiledKind::Regex(re) => re.is_match(url.href()).map_err(|source| RuleError::RegexMatch {
                pattern: re.as_str().to_string(),
                source,
            })?,
        })
    }
}

/// `host` equals `suffix` or ends with `"." + suffix`.
#[inline]
fn host_has_suffix(host: &str, suffix: &str) -> bool {
    match host.strip_suffix(suffix) {
        Some("") => true,
        Some(rest) => rest.ends_with('.'),
        None => false,
    }
}

// =============================================================================
// Matching
// =============================================================================

/// Evaluate a single rule against a URL.
///
/// Empty or missing patterns and unknown rule types never match. An invalid
/// `REGEX` pattern is returned as an error instead of being treated as a miss.
pub fn matches_rule<T: RuleTarget + ?Sized>(url: &T, rule: &FilterRuleItem) -> Result<bool, RuleError> {
    CompiledRule::compile(rule)?.matches(url)
}

/// Index of the first rule in `rules` that matches `url`.
///
/// Rules are compiled lazily in order, so an invalid regex after the first
/// match is never seen.
pub fn first_match<T: RuleTarget + ?Sized>(url: &T, rules: &[FilterRuleItem]) -> Result<Option<usize>, RuleError> {
    for (idx, rule) in rules.iter().enumerate() {
        if matches_rule(url, rule)? {
            log::debug!("{} matched rule #{} ({})", url.href(), idx, rule);
            return Ok(Some(idx));
        }
    }
    Ok(None)
}
