//! SiteFilter Core Library
//!
//! Building blocks shared by the SiteFilter extension's wasm bindings and CLI.
//!
//! # Modules
//!
//! - `types`: Filter rule items and rule type tags
//! - `url`: Host/href views over parsed or raw URLs
//! - `matcher`: Single-rule URL matching
//! - `domain`: Naive root domain extraction
//! - `storage`: Async key/value storage adapter

pub mod domain;
pub mod matcher;
pub mod storage;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use domain::{get_root_domain, root_domain_of_host};
pub use matcher::{first_match, matches_rule, CompiledRule, RuleError};
pub use storage::{get_storage, set_storage, MemoryStorage, StorageArea, StorageError};
pub use types::{FilterRuleItem, RuleType};
pub use crate::url::{RuleTarget, UrlView};
