//! Service configuration (§6.6, §10.3).
//!
//! Layers, lowest precedence first: built-in defaults, an optional
//! `centsible.toml` file, then `CENTSIBLE_*` environment variables. Mirrors
//! this codebase's existing `*Config::from_env()` idiom (see
//! `centsible-server::scheduler::BackupScheduleConfig`).

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct StoreSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SearchSection {
    endpoint: Option<String>,
    model: String,
    max_findings: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "default".to_string(),
            max_findings: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct DealsSection {
    allowed_categories: Vec<String>,
}

impl Default for DealsSection {
    fn default() -> Self {
        Self {
            allowed_categories: vec!["Groceries".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct WeeklySection {
    top_n: usize,
    min_savings_usd: f64,
}

impl Default for WeeklySection {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_savings_usd: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ConcurrencySection {
    users: usize,
}

impl Default for ConcurrencySection {
    fn default() -> Self {
        Self { users: 10 }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct CorsSection {
    allow_origins: Vec<String>,
}

/// The raw, file/env-deserializable shape. Kept separate from `Config` so
/// that `toml::from_str` and `envy`-style overrides stay simple field
/// assignments rather than bespoke merge logic.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    store: StoreSection,
    search: SearchSection,
    deals: DealsSection,
    weekly: WeeklySection,
    concurrency: ConcurrencySection,
    cors: CorsSection,
}

/// Resolved, validated configuration for the service (§6.6).
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path (`store.path`, `CENTSIBLE_STORE_PATH`).
    pub store_path: String,
    /// Web-search capability endpoint; `None` selects the mock backend.
    pub search_endpoint: Option<String>,
    /// Web-search capability model identifier (`search.model`).
    pub search_model: String,
    /// Upper bound on findings parsed per report (`search.max_findings`).
    pub search_max_findings: usize,
    /// Categories in which deal suggestions are surfaced (`deals.allowed_categories`).
    pub deals_allowed_categories: Vec<String>,
    /// Items analysed per user per week (`weekly.top_n`).
    pub weekly_top_n: usize,
    /// Minimum savings per finding, in USD (`weekly.min_savings_usd`).
    pub weekly_min_savings_usd: f64,
    /// Parallel users processed in a batch run (`concurrency.users`).
    pub concurrency_users: usize,
    /// Origins allowed by the HTTP facade's CORS layer (`cors.allow_origins`).
    pub cors_allow_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        from_raw(RawConfig::default())
    }
}

impl Config {
    /// Loads defaults, then `centsible.toml` at `path` if it exists, then
    /// `CENTSIBLE_*` environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let mut raw = RawConfig::default();

        if path.exists() {
            let text = std::fs::read_to_string(path)?;
            raw = toml::from_str(&text)
                .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))?;
        }

        apply_env(&mut raw)?;
        let config = from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    /// Loads defaults then `CENTSIBLE_*` environment variables only, without
    /// consulting a config file. Used when no `--config` path is given.
    pub fn from_env() -> Result<Self> {
        let mut raw = RawConfig::default();
        apply_env(&mut raw)?;
        let config = from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    /// The `WeeklyConfig` tunables derived from this configuration, for the
    /// Weekly Suggester pipeline (§4.6.1).
    pub fn weekly_config(&self) -> crate::weekly::WeeklyConfig {
        crate::weekly::WeeklyConfig {
            top_n: self.weekly_top_n,
            min_savings_usd: self.weekly_min_savings_usd,
            max_findings: self.search_max_findings,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.weekly_top_n == 0 {
            return Err(Error::Config("weekly.top_n must be at least 1".to_string()));
        }
        if self.concurrency_users == 0 {
            return Err(Error::Config(
                "concurrency.users must be at least 1".to_string(),
            ));
        }
        if self.weekly_min_savings_usd < 0.0 {
            return Err(Error::Config(
                "weekly.min_savings_usd must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn from_raw(raw: RawConfig) -> Config {
    Config {
        store_path: raw.store.path.unwrap_or_else(|| "centsible.db".to_string()),
        search_endpoint: raw.search.endpoint,
        search_model: raw.search.model,
        search_max_findings: raw.search.max_findings,
        deals_allowed_categories: raw.deals.allowed_categories,
        weekly_top_n: raw.weekly.top_n,
        weekly_min_savings_usd: raw.weekly.min_savings_usd,
        concurrency_users: raw.concurrency.users,
        cors_allow_origins: raw.cors.allow_origins,
    }
}

fn apply_env(raw: &mut RawConfig) -> Result<()> {
    if let Ok(v) = std::env::var("CENTSIBLE_STORE_PATH") {
        raw.store.path = Some(v);
    }
    if let Ok(v) = std::env::var("CENTSIBLE_SEARCH_ENDPOINT") {
        raw.search.endpoint = Some(v);
    }
    if let Ok(v) = std::env::var("CENTSIBLE_SEARCH_MODEL") {
        raw.search.model = v;
    }
    if let Ok(v) = std::env::var("CENTSIBLE_SEARCH_MAX_FINDINGS") {
        raw.search.max_findings = v
            .parse()
            .map_err(|_| Error::Config("CENTSIBLE_SEARCH_MAX_FINDINGS must be an integer".to_string()))?;
    }
    if let Ok(v) = std::env::var("CENTSIBLE_DEALS_ALLOWED_CATEGORIES") {
        raw.deals.allowed_categories = v.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(v) = std::env::var("CENTSIBLE_WEEKLY_TOP_N") {
        raw.weekly.top_n = v
            .parse()
            .map_err(|_| Error::Config("CENTSIBLE_WEEKLY_TOP_N must be an integer".to_string()))?;
    }
    if let Ok(v) = std::env::var("CENTSIBLE_WEEKLY_MIN_SAVINGS_USD") {
        raw.weekly.min_savings_usd = v.parse().map_err(|_| {
            Error::Config("CENTSIBLE_WEEKLY_MIN_SAVINGS_USD must be a number".to_string())
        })?;
    }
    if let Ok(v) = std::env::var("CENTSIBLE_CONCURRENCY_USERS") {
        raw.concurrency.users = v
            .parse()
            .map_err(|_| Error::Config("CENTSIBLE_CONCURRENCY_USERS must be an integer".to_string()))?;
    }
    if let Ok(v) = std::env::var("CENTSIBLE_CORS_ALLOW_ORIGINS") {
        raw.cors.allow_origins = v.split(',').map(|s| s.trim().to_string()).collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.weekly_top_n, 5);
        assert_eq!(config.weekly_min_savings_usd, 10.0);
        assert_eq!(config.concurrency_users, 10);
        assert_eq!(config.search_max_findings, 20);
        assert_eq!(config.deals_allowed_categories, vec!["Groceries"]);
    }

    #[test]
    fn rejects_zero_top_n() {
        std::env::set_var("CENTSIBLE_WEEKLY_TOP_N", "0");
        let result = Config::from_env();
        std::env::remove_var("CENTSIBLE_WEEKLY_TOP_N");
        assert!(result.is_err());
    }
}
