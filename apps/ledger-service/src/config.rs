//! # Service Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`DETAIL_*`)
//! 2. Config file (`ledger.toml`, or the path in `DETAIL_LEDGER_CONFIG`)
//! 3. Defaults (this file)
//!
//! ```toml
//! # ledger.toml
//! database_path = "/var/lib/detail-ledger/ledger.db"
//! tax_rate_bps = 825
//! receipt_width = 42
//!
//! [store]
//! name = "Shine On Mobile Detailing"
//! address = "Austin, TX"
//!
//! [gateway]
//! base_url = "https://api.stripe.com"
//! secret_key = "sk_live_..."
//! timeout_secs = 30
//! ```
//!
//! Configuration is read-only after startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use ledger_core::receipt::StoreHeader;
use ledger_core::validation::validate_tax_rate_bps;
use ledger_core::TaxRate;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine a data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Payment processor connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Unset means card refunds fail with "not configured".
    pub secret_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            base_url: "https://api.stripe.com".to_string(),
            secret_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite file. Defaults to the platform data dir.
    pub database_path: Option<PathBuf>,

    /// Printed at the top of receipts.
    pub store: StoreHeader,

    /// Applied to new drafts, in basis points (825 = 8.25%).
    pub tax_rate_bps: u32,

    /// Columns in the plain-text receipt.
    pub receipt_width: usize,

    /// Outbox entries replayed per reconciliation pass.
    pub reconcile_batch: u32,

    /// Replays before an entry is left for manual follow-up.
    pub max_reconcile_attempts: i64,

    pub gateway: GatewayConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            database_path: None,
            store: StoreHeader {
                name: "Detail Ledger".to_string(),
                address: None,
            },
            tax_rate_bps: 0,
            receipt_width: 42,
            reconcile_batch: 50,
            max_reconcile_attempts: 10,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("DETAIL_LEDGER_CONFIG").ok().map(PathBuf::from))
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        validate_tax_rate_bps(self.tax_rate_bps)
            .map_err(|_| ConfigError::InvalidValue("tax_rate_bps".to_string()))?;
        if self.receipt_width < 24 {
            return Err(ConfigError::InvalidValue("receipt_width".to_string()));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("gateway.timeout_secs".to_string()));
        }
        if !self.gateway.base_url.starts_with("https://")
            && !self.gateway.base_url.starts_with("http://")
        {
            return Err(ConfigError::InvalidValue("gateway.base_url".to_string()));
        }
        Ok(())
    }

    /// Applies `DETAIL_*` overrides read through `lookup`.
    fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DETAIL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(name) = lookup("DETAIL_STORE_NAME") {
            self.store.name = name;
        }
        if let Some(address) = lookup("DETAIL_STORE_ADDRESS") {
            self.store.address = Some(address);
        }
        if let Some(bps) = lookup("DETAIL_TAX_RATE_BPS") {
            self.tax_rate_bps = bps
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DETAIL_TAX_RATE_BPS".to_string()))?;
        }
        if let Some(width) = lookup("DETAIL_RECEIPT_WIDTH") {
            self.receipt_width = width
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DETAIL_RECEIPT_WIDTH".to_string()))?;
        }
        if let Some(url) = lookup("DETAIL_GATEWAY_URL") {
            debug!(url = %url, "Overriding gateway URL from environment");
            self.gateway.base_url = url;
        }
        if let Some(secret) = lookup("DETAIL_GATEWAY_SECRET") {
            self.gateway.secret_key = Some(secret);
        }
        if let Some(secs) = lookup("DETAIL_GATEWAY_TIMEOUT_SECS") {
            self.gateway.timeout_secs = secs
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DETAIL_GATEWAY_TIMEOUT_SECS".to_string()))?;
        }
        Ok(())
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Explicit path, `DETAIL_DB_PATH`, or `<data dir>/ledger.db`.
    pub fn resolve_database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("com", "detail", "ledger")
            .ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Read {
            path: data_dir.to_path_buf(),
            source,
        })?;
        Ok(data_dir.join("ledger.db"))
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "detail", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }
}
