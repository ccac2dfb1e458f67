use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ReimburseError, Result};
use crate::staking::CursorMode;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReimburseConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourcesConfig {
    pub block_index_url: String,
    pub staking_registry_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub cursor: CursorMode,
}

/// Allocation parameters. Amounts are decimal wei strings so they are not
/// bounded by TOML's 64-bit integers.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AllocationConfig {
    #[serde(default = "default_tolerance_wei")]
    pub tolerance_wei: String,
    #[serde(default = "default_min_amount_wei")]
    pub min_amount_wei: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    1000
}

fn default_tolerance_wei() -> String {
    "10000".to_string()
}

fn default_min_amount_wei() -> String {
    "0".to_string()
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            cursor: CursorMode::default(),
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            tolerance_wei: default_tolerance_wei(),
            min_amount_wei: default_min_amount_wei(),
        }
    }
}

impl Default for ReimburseConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            sources: SourcesConfig {
                block_index_url: "http://localhost:8000/subgraphs/name/blocklytics/ethereum-blocks"
                    .to_string(),
                staking_registry_url: "http://localhost:8000/subgraphs/name/staking/registry"
                    .to_string(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            paging: PagingConfig::default(),
            allocation: AllocationConfig::default(),
        }
    }
}

impl ReimburseConfig {
    /// Loads the config at `path`, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !std::path::Path::new(path).exists() {
            info!("Config file not found at '{}', using defaults", path);
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&s)?;
        info!("Config loaded from {}", path);
        Ok(config)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ReimburseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.paging.page_size == 0 {
            return Err(ReimburseError::Config("paging.page_size must be positive".into()));
        }
        crate::reimburse::parse_wei(&self.allocation.tolerance_wei)
            .map_err(|e| ReimburseError::Config(format!("allocation.tolerance_wei: {}", e)))?;
        crate::reimburse::parse_wei(&self.allocation.min_amount_wei)
            .map_err(|e| ReimburseError::Config(format!("allocation.min_amount_wei: {}", e)))?;
        Ok(())
    }
}
