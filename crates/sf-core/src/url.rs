//! URL views for rule matching
//!
//! Matching only needs two parts of a URL: the host (no port) and the full
//! serialized `href`. [`RuleTarget`] abstracts over where those come from:
//! a parsed [`url::Url`], or host/href strings the browser already produced.

use url::Url;

// =============================================================================
// Rule Target
// =============================================================================

/// Anything a rule can be evaluated against.
pub trait RuleTarget {
    /// Authority host, without port.
    fn host(&self) -> &str;
    /// Full serialized URL.
    fn href(&self) -> &str;
}

impl RuleTarget for Url {
    #[inline]
    fn host(&self) -> &str {
        self.host_str().unwrap_or("")
    }

    #[inline]
    fn href(&self) -> &str {
        self.as_str()
    }
}

impl<T: RuleTarget + ?Sized> RuleTarget for &T {
    #[inline]
    fn host(&self) -> &str {
        (**self).host()
    }

    #[inline]
    fn href(&self) -> &str {
        (**self).href()
    }
}

/// Borrowed host/href pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlView<'a> {
    pub host: &'a str,
    pub href: &'a str,
}

impl<'a> UrlView<'a> {
    /// Wrap a host and href that were already parsed by the caller.
    pub fn new(host: &'a str, href: &'a str) -> Self {
        Self { host, href }
    }
}

impl RuleTarget for UrlView<'_> {
    #[inline]
    fn host(&self) -> &str {
        self.host
    }

    #[inline]
    fn href(&self) -> &str {
        self.href
    }
}
