//! Root domain extraction
//!
//! The "root domain" here is a naive heuristic: drop the leftmost label of any
//! host with three or more labels. It does not consult the Public Suffix List,
//! so `a.b.example.co.uk` becomes `b.example.co.uk`.
//!
//! # Examples
//!
//! ```
//! use sf_core::domain::root_domain_of_host;
//!
//! assert_eq!(root_domain_of_host("mail.google.com"), "google.com");
//! assert_eq!(root_domain_of_host("example.com"), "example.com");
//! ```

use crate::url::RuleTarget;

/// Root domain of a URL's host.
#[inline]
pub fn get_root_domain<T: RuleTarget + ?Sized>(url: &T) -> &str {
    root_domain_of_host(url.host())
}

/// Root domain of a bare host string.
///
/// Hosts with two or fewer labels are returned unchanged.
pub fn root_domain_of_host(host: &str) -> &str {
    if host.split('.').count() <= 2 {
        return host;
    }
    parent_domain(host).unwrap_or(host)
}

/// Get the parent domain (strip leftmost label).
pub fn parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}
