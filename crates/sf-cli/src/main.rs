//! SiteFilter CLI
//!
//! Check URLs against filter rules, inspect root domains, and read or write
//! a JSON-file key/value store shaped like extension local storage.

mod file_storage;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use url::Url;

use sf_core::{
    first_match, get_root_domain, get_storage, matches_rule, set_storage, FilterRuleItem, RuleType,
};

use crate::file_storage::FileStorage;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "SiteFilter rule matching and storage tools")]
struct Cli {
    /// Verbose logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a URL against a single rule
    Check {
        /// URL to test
        #[arg(short, long)]
        url: String,

        /// Rule type: DOMAIN, DOMAIN-SUFFIX, DOMAIN-KEYWORD or REGEX
        #[arg(short = 't', long = "type")]
        rule_type: String,

        /// Rule pattern
        #[arg(short, long, default_value = "")]
        rule: String,
    },

    /// Find the first rule in a JSON rule file that matches a URL
    Match {
        /// URL to test
        #[arg(short, long)]
        url: String,

        /// JSON array of {"type", "rule"} objects
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Print the root domain of each URL
    RootDomain {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Read or write the local key/value store
    Store {
        /// Store file
        #[arg(short, long, env = "SF_STORE", default_value = "sitefilter-store.json")]
        store: PathBuf,

        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Store a JSON value under a key
    Set {
        key: String,
        /// Value as JSON (e.g. '[{"type":"DOMAIN","rule":"example.com"}]')
        value: String,
    },
    /// Print the JSON value under a key, or `undefined`
    Get { key: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { url, rule_type, rule } => cmd_check(&url, &rule_type, &rule),
        Commands::Match { url, rules } => cmd_match(&url, &rules),
        Commands::RootDomain { urls } => cmd_root_domain(&urls),
        Commands::Store { store, action } => cmd_store(FileStorage::new(store), action),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_url(url: &str) -> Result<Url, String> {
    Url::parse(url).map_err(|e| format!("Invalid URL '{}': {}", url, e))
}

fn cmd_check(url: &str, rule_type: &str, rule: &str) -> Result<String, String> {
    let parsed = parse_url(url)?;
    let item = FilterRuleItem {
        rule_type: RuleType::from_tag(rule_type),
        rule: Some(rule.to_string()),
    };
    if item.rule_type == RuleType::Unknown {
        tracing::warn!(rule_type, "unknown rule type, it never matches");
    }

    let matched = matches_rule(&parsed, &item).map_err(|e| e.to_string())?;
    Ok(if matched { "match" } else { "no match" }.to_string())
}

fn cmd_match(url: &str, rules_path: &Path) -> Result<String, String> {
    let parsed = parse_url(url)?;
    let text = fs::read_to_string(rules_path)
        .map_err(|e| format!("Failed to read '{}': {}", rules_path.display(), e))?;
    let rules: Vec<FilterRuleItem> = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid rule file '{}': {}", rules_path.display(), e))?;
    tracing::debug!(count = rules.len(), path = %rules_path.display(), "loaded rules");

    Ok(match first_match(&parsed, &rules).map_err(|e| e.to_string())? {
        Some(idx) => format!("match #{}: {}", idx, rules[idx]),
        None => "no match".to_string(),
    })
}

/// One root domain per line, in argument order.
fn cmd_root_domain(urls: &[String]) -> Result<String, String> {
    let mut lines = Vec::with_capacity(urls.len());
    for url in urls {
        let parsed = parse_url(url)?;
        lines.push(get_root_domain(&parsed).to_string());
    }
    Ok(lines.join("\n"))
}

fn cmd_store(store: FileStorage, action: StoreAction) -> Result<String, String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))?;

    runtime.block_on(async {
        match action {
            StoreAction::Set { key, value } => {
                let value: Value = serde_json::from_str(&value)
                    .map_err(|e| format!("Value is not valid JSON: {}", e))?;
                set_storage(&store, &key, &value).await.map_err(|e| e.to_string())?;
                tracing::debug!(key = %key, path = %store.path().display(), "stored value");
                Ok::<String, String>("true".to_string())
            }
            StoreAction::Get { key } => {
                Ok(match get_storage::<_, Value>(&store, &key).await.map_err(|e| e.to_string())? {
                    Some(value) => value.to_string(),
                    None => "undefined".to_string(),
                })
            }
        }
    })
}
