//! Operator Configuration
//!
//! TOML file with per-section defaults, overlaid by environment variables.
//! Precedence, lowest first: network preset, config file, environment.

use std::fs;
use std::path::{Path, PathBuf};

use battle_fhe::Address;
use battle_worker::{WorkerConfig, WorkerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Missing setting: {0} (set it in the config file or the environment)")]
    Missing(&'static str),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Full operator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub contract: ContractSettings,

    #[serde(default)]
    pub signer: SignerSettings,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl BattleConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the effective configuration for a CLI invocation
    pub fn resolve(path: Option<&Path>, network: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => {
                let default_path = default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)?
                } else {
                    Self::for_network(network.unwrap_or("sepolia"))
                }
            }
        };
        if let Some(name) = network {
            if name != config.network.name {
                config.network = NetworkSettings::preset(name);
            }
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Create configuration for a specific network
    pub fn for_network(network: &str) -> Self {
        Self {
            network: NetworkSettings::preset(network),
            ..Default::default()
        }
    }

    /// Overlay environment variables, looked up through `var`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = var("RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(chain_id) = var("CHAIN_ID") {
            self.network.chain_id = chain_id
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("CHAIN_ID is not a number: {chain_id}")))?;
        }
        if let Some(address) = var("CONTRACT_ADDRESS") {
            self.contract.address = Some(address);
        }
        if let Some(operator) = var("OPERATOR_ADDRESS") {
            self.contract.operator = Some(operator);
        }
        if let Some(key) = var("PRIVATE_KEY") {
            self.signer.private_key = Some(key);
        }
        if let Some(secs) = var("POLL_INTERVAL_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("POLL_INTERVAL_SECS is not a number: {secs}")))?;
            self.worker = std::mem::take(&mut self.worker).with_poll_interval(secs);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.rpc_url.is_empty() {
            return Err(ConfigError::Invalid("rpc_url must not be empty".to_string()));
        }
        if self.network.chain_id == 0 {
            return Err(ConfigError::Invalid("chain_id must be greater than 0".to_string()));
        }
        if let Some(address) = &self.contract.address {
            parse_address("contract address", address)?;
        }
        if let Some(operator) = &self.contract.operator {
            parse_address("operator address", operator)?;
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging format must be text or json, got {}",
                self.logging.format
            )));
        }
        self.worker.validate()?;
        Ok(())
    }

    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        let raw = self.contract.address.as_deref().ok_or(ConfigError::Missing("CONTRACT_ADDRESS"))?;
        parse_address("contract address", raw)
    }

    pub fn private_key(&self) -> Result<&str, ConfigError> {
        self.signer.private_key.as_deref().ok_or(ConfigError::Missing("PRIVATE_KEY"))
    }

    /// Configured operator address, if any
    pub fn operator_address(&self) -> Result<Option<Address>, ConfigError> {
        self.contract
            .operator
            .as_deref()
            .map(|raw| parse_address("operator address", raw))
            .transpose()
    }
}

fn parse_address(what: &str, raw: &str) -> Result<Address, ConfigError> {
    raw.parse()
        .map_err(|e| ConfigError::Invalid(format!("{what}: {e}")))
}

/// Chain endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Preset name (sepolia, zama-devnet, local)
    pub name: String,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    pub chain_id: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self::preset("sepolia")
    }
}

impl NetworkSettings {
    /// Known networks; unknown names fall back to a local node
    pub fn preset(name: &str) -> Self {
        match name {
            "sepolia" => Self {
                name: "sepolia".to_string(),
                rpc_url: "https://eth-sepolia.public.blastapi.io".to_string(),
                chain_id: 11_155_111,
            },
            "zama-devnet" => Self {
                name: "zama-devnet".to_string(),
                rpc_url: "https://devnet.zama.ai".to_string(),
                chain_id: 8009,
            },
            _ => Self {
                name: "local".to_string(),
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: 31_337,
            },
        }
    }
}

/// Deployed contract settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractSettings {
    /// Battle contract address
    pub address: Option<String>,

    /// Expected operator, checked by `verify`
    pub operator: Option<String>,
}

/// Transaction signer
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SignerSettings {
    /// Hex private key; prefer the PRIVATE_KEY environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for SignerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerSettings")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Get default config file path
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("io", "meme-battle", "meme-battle")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".meme-battle"))
        .join("config.toml")
}
