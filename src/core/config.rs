use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::errors::InvokeError;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "BC24_PRIVATE_KEY";

pub const ENV_CONFIG_PATH: &str = "BC24_CONFIG";
pub const ENV_RPC_URL: &str = "BC24_RPC_URL";
pub const ENV_ARTIFACT_PATH: &str = "BC24_ARTIFACT_PATH";
pub const ENV_CONTRACT_ADDRESS: &str = "BC24_CONTRACT_ADDRESS";
pub const ENV_SENDER_ADDRESS: &str = "BC24_SENDER_ADDRESS";
pub const ENV_CHAIN_ID: &str = "BC24_CHAIN_ID";
pub const ENV_PRIVATE_KEY_ENV: &str = "BC24_PRIVATE_KEY_ENV";

/// HTTP transport settings for the RPC client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Per-request timeout (seconds)
    #[serde(default = "TransportConfig::default_timeout_secs")]
    pub timeout_secs: u64,

    /// Receipt polling interval (milliseconds)
    #[serde(default = "TransportConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl TransportConfig {
    fn default_timeout_secs() -> u64 { 30 }
    fn default_poll_interval_ms() -> u64 { 500 }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
            poll_interval_ms: Self::default_poll_interval_ms(),
        }
    }
}

/// On-disk TOML layout. Every field is optional so env vars and flags can fill gaps.
///
/// Key material has no field here; the file may only name the environment
/// variable that holds it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub artifact_path: Option<PathBuf>,
    pub contract_address: Option<String>,
    pub sender_address: Option<String>,
    pub chain_id: Option<u64>,
    pub private_key_env: Option<String>,
    #[serde(default)]
    pub transport: Option<TransportConfig>,
}

impl FileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, InvokeError> {
        toml::from_str(content).map_err(|e| InvokeError::Config(format!("Invalid config file: {}", e)))
    }

    pub fn from_path(path: &Path) -> Result<Self, InvokeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InvokeError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Values given on the command line; they win over env and file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub artifact_path: Option<PathBuf>,
    pub contract_address: Option<String>,
}

/// Everything one invocation run needs, resolved and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationConfig {
    pub endpoint: String,
    pub artifact_path: PathBuf,
    pub contract_address: Address,
    /// Expected sender; checked against the address derived from the key.
    pub sender: Option<Address>,
    /// Skips the `eth_chainId` lookup when set.
    pub chain_id: Option<u64>,
    /// Name of the environment variable holding the hex private key.
    pub private_key_env: String,
    pub transport: TransportConfig,
}

impl InvocationConfig {
    /// Resolve config from the process environment, an optional TOML file and CLI overrides.
    pub fn load(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, InvokeError> {
        let path = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));
        let file = match path {
            Some(p) => {
                tracing::info!(path = %p.display(), "Loading config file");
                Some(FileConfig::from_path(&p)?)
            }
            None => None,
        };
        Self::from_sources(file, |key| std::env::var(key).ok(), overrides)
    }

    /// Merge layers in order file < env < overrides. `env` is injected for tests.
    pub fn from_sources<F>(
        file: Option<FileConfig>,
        env: F,
        overrides: &ConfigOverrides,
    ) -> Result<Self, InvokeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let lookup = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = overrides
            .rpc_url
            .clone()
            .or_else(|| lookup(ENV_RPC_URL))
            .or(file.rpc_url)
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let artifact_path = overrides
            .artifact_path
            .clone()
            .or_else(|| lookup(ENV_ARTIFACT_PATH).map(PathBuf::from))
            .or(file.artifact_path)
            .ok_or_else(|| {
                InvokeError::Config(format!(
                    "Artifact path is required (--artifact, {} or artifact_path)",
                    ENV_ARTIFACT_PATH
                ))
            })?;

        let contract_raw = overrides
            .contract_address
            .clone()
            .or_else(|| lookup(ENV_CONTRACT_ADDRESS))
            .or(file.contract_address)
            .ok_or_else(|| {
                InvokeError::Config(format!(
                    "Contract address is required (--contract, {} or contract_address)",
                    ENV_CONTRACT_ADDRESS
                ))
            })?;
        let contract_address = parse_address(&contract_raw, "contract address")?;

        let sender = lookup(ENV_SENDER_ADDRESS)
            .or(file.sender_address)
            .map(|raw| parse_address(&raw, "sender address"))
            .transpose()?;

        let chain_id = match lookup(ENV_CHAIN_ID) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                InvokeError::Config(format!("{} must be an unsigned integer, got '{}'", ENV_CHAIN_ID, raw))
            })?),
            None => file.chain_id,
        };

        let private_key_env = lookup(ENV_PRIVATE_KEY_ENV)
            .or(file.private_key_env)
            .unwrap_or_else(|| DEFAULT_PRIVATE_KEY_ENV.to_string());

        let transport = file.transport.unwrap_or_default();
        if transport.timeout_secs == 0 {
            return Err(InvokeError::Config("transport.timeout_secs must be greater than zero".into()));
        }

        Ok(Self {
            endpoint,
            artifact_path,
            contract_address,
            sender,
            chain_id,
            private_key_env,
            transport,
        })
    }
}

/// Parse a 20-byte hex address, with or without the `0x` prefix.
pub fn parse_address(raw: &str, what: &str) -> Result<Address, InvokeError> {
    let trimmed = raw.trim();
    let hex_part = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(InvokeError::Config(format!("Invalid {} '{}': expected 20 hex-encoded bytes", what, raw)));
    }
    Address::from_str(hex_part).map_err(|e| InvokeError::Config(format!("Invalid {} '{}': {}", what, raw, e)))
}
