//! # Notary Configuration
//!
//! Defaults, then environment, then command-line flags.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `DL_RPC_URL` | `ledger.rpc_url` | `http://127.0.0.1:8545` |
//! | `DL_CHAIN_ID` | `ledger.expected_chain_id` | node value |
//! | `DL_PRIVATE_KEY` | `signer.private_key` | none |
//! | `DL_GAS_PRICE_WEI` | `gas.price` | 50 gwei; `node` asks the node |
//! | `DL_CONFIRMATION_TIMEOUT_SECS` | `confirmation.timeout` | 120 s |
//! | `DL_DB_PATH` | `store.db_path` | `logi/blockchain_logs.db` |
//! | `DL_CONTRACT_ADDRESS` | `registry.contract_address` | read from file |
//! | `DL_CONTRACT_FILE` | `registry.contract_file` | `data/contract_address.txt` |
//! | `DL_REVERT_ALREADY_EXISTS` | `registry.revert_reasons` | built-in reasons |
//! | `DL_REVERT_NOT_FOUND` | `registry.revert_reasons` | built-in reasons |
//! | `DL_MONITOR_POLL_MS` | `monitor.poll_interval` | 1000 ms |
//! | `DL_LOG_LEVEL` or `RUST_LOG` | `telemetry.log_level` | `info` |
//! | `DL_JSON_LOGS` | `telemetry.json_logs` | `false` |
//!
//! The revert variables take extra reason strings separated by `|`. They are
//! added to the built-in table, never replacing it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dl_02_ledger_client::{ContractRejection, RevertTable};
use dl_04_transaction_tracker::{
    GasPolicy, GasPrice, TrackerConfig, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_DEPLOY_GAS_LIMIT,
    DEFAULT_DOCUMENT_GAS_LIMIT, DEFAULT_GAS_PRICE_WEI, DEFAULT_RECEIPT_POLL_INTERVAL,
};
use dl_05_block_monitor::{MonitorConfig, StartPoint, DEFAULT_MAX_BACKOFF, DEFAULT_POLL_INTERVAL};
use primitive_types::U256;
use shared_types::{parse_address, Address};
use thiserror::Error;
use zeroize::Zeroizing;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_DB_PATH: &str = "logi/blockchain_logs.db";
pub const DEFAULT_CONTRACT_FILE: &str = "data/contract_address.txt";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct NotaryConfig {
    pub ledger: LedgerConfig,
    pub signer: SignerConfig,
    pub gas: GasPolicy,
    pub confirmation: ConfirmationConfig,
    pub store: StoreConfig,
    pub monitor: MonitorSettings,
    pub registry: RegistryConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub request_timeout: Duration,
    /// When set, the node's chain id must match.
    pub expected_chain_id: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            expected_chain_id: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct SignerConfig {
    pub private_key: Option<Zeroizing<String>>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub max_backoff: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Takes precedence over the contract file.
    pub contract_address: Option<Address>,
    pub contract_file: PathBuf,
    /// Extra revert reasons on top of the built-in table.
    pub revert_reasons: Vec<(String, ContractRejection)>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            contract_address: None,
            contract_file: PathBuf::from(DEFAULT_CONTRACT_FILE),
            revert_reasons: Vec::new(),
        }
    }
}

impl RegistryConfig {
    pub fn revert_table(&self) -> RevertTable {
        self.revert_reasons
            .iter()
            .fold(RevertTable::default(), |table, (reason, rejection)| {
                table.with_entry(reason.clone(), *rejection)
            })
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("No private key configured. Set DL_PRIVATE_KEY or pass --private-key")]
    MissingPrivateKey,

    #[error("Private key must be 32 bytes of hex")]
    InvalidPrivateKey,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{0} must be greater than zero")]
    ZeroGasLimit(&'static str),
}

impl NotaryConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DL_RPC_URL") {
            config.ledger.rpc_url = url;
        }
        if let Some(value) = get("DL_CHAIN_ID") {
            config.ledger.expected_chain_id = Some(parse("DL_CHAIN_ID", &value)?);
        }
        if let Some(key) = get("DL_PRIVATE_KEY") {
            config.signer.private_key = Some(Zeroizing::new(key));
        }
        if let Some(value) = get("DL_GAS_PRICE_WEI") {
            config.gas.price = parse_gas_price(&value)?;
        }
        if let Some(value) = get("DL_CONFIRMATION_TIMEOUT_SECS") {
            config.confirmation.timeout =
                Duration::from_secs(parse("DL_CONFIRMATION_TIMEOUT_SECS", &value)?);
        }
        if let Some(path) = get("DL_DB_PATH") {
            config.store.db_path = PathBuf::from(path);
        }
        if let Some(value) = get("DL_CONTRACT_ADDRESS") {
            config.registry.contract_address = Some(parse_address(&value).map_err(|_| {
                ConfigError::InvalidValue {
                    var: "DL_CONTRACT_ADDRESS",
                    value: value.clone(),
                }
            })?);
        }
        if let Some(path) = get("DL_CONTRACT_FILE") {
            config.registry.contract_file = PathBuf::from(path);
        }
        for (var, rejection) in [
            ("DL_REVERT_ALREADY_EXISTS", ContractRejection::AlreadyExists),
            ("DL_REVERT_NOT_FOUND", ContractRejection::NotFound),
        ] {
            if let Some(value) = get(var) {
                config
                    .registry
                    .revert_reasons
                    .extend(parse_reasons(&value).map(|reason| (reason, rejection)));
            }
        }
        if let Some(value) = get("DL_MONITOR_POLL_MS") {
            config.monitor.poll_interval =
                Duration::from_millis(parse("DL_MONITOR_POLL_MS", &value)?);
        }
        if let Some(level) = get("DL_LOG_LEVEL").or_else(|| get("RUST_LOG")) {
            config.telemetry.log_level = level;
        }
        if let Some(value) = get("DL_JSON_LOGS") {
            config.telemetry.json_logs = parse_bool("DL_JSON_LOGS", &value)?;
        }

        Ok(config)
    }

    /// Checks that apply to every command.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("confirmation timeout"));
        }
        if self.confirmation.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("receipt poll interval"));
        }
        if self.ledger.request_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request timeout"));
        }
        if self.monitor.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("monitor poll interval"));
        }
        if self.gas.document_gas_limit == 0 {
            return Err(ConfigError::ZeroGasLimit("document gas limit"));
        }
        if self.gas.deploy_gas_limit == 0 {
            return Err(ConfigError::ZeroGasLimit("deploy gas limit"));
        }
        Ok(())
    }

    /// Additional checks before any state-changing command.
    pub fn validate_for_signing(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let key = self
            .signer
            .private_key
            .as_ref()
            .ok_or(ConfigError::MissingPrivateKey)?;
        let hex = key.trim().trim_start_matches("0x");
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidPrivateKey);
        }
        Ok(())
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            gas: self.gas,
            confirmation_timeout: self.confirmation.timeout,
            receipt_poll_interval: self.confirmation.poll_interval,
        }
    }

    pub fn monitor_config(&self, start: StartPoint) -> MonitorConfig {
        MonitorConfig {
            poll_interval: self.monitor.poll_interval,
            max_backoff: self.monitor.max_backoff,
            start,
        }
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn parse_reasons(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split('|')
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

/// `node` or a price in wei.
pub fn parse_gas_price(value: &str) -> Result<GasPrice, ConfigError> {
    if value.trim().eq_ignore_ascii_case("node") {
        return Ok(GasPrice::Node);
    }
    U256::from_dec_str(value.trim())
        .map(GasPrice::Fixed)
        .map_err(|_| ConfigError::InvalidValue {
            var: "DL_GAS_PRICE_WEI",
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NotaryConfig::default();
        assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.gas.document_gas_limit, DEFAULT_DOCUMENT_GAS_LIMIT);
        assert_eq!(config.gas.deploy_gas_limit, DEFAULT_DEPLOY_GAS_LIMIT);
        assert_eq!(
            config.gas.price,
            GasPrice::Fixed(U256::from(DEFAULT_GAS_PRICE_WEI))
        );
        assert_eq!(config.confirmation.timeout, Duration::from_secs(120));
        assert_eq!(config.confirmation.poll_interval, Duration::from_millis(500));
        assert_eq!(config.monitor.poll_interval, Duration::from_secs(1));
        assert_eq!(config.store.db_path, PathBuf::from("logi/blockchain_logs.db"));
        assert_eq!(
            config.registry.contract_file,
            PathBuf::from("data/contract_address.txt")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let config = NotaryConfig::from_lookup(lookup(&[
            ("DL_RPC_URL", "http://node:8545"),
            ("DL_PRIVATE_KEY", DEV_KEY),
            ("DL_GAS_PRICE_WEI", "node"),
            ("DL_CONFIRMATION_TIMEOUT_SECS", "10"),
            ("DL_CONTRACT_ADDRESS", "0x5fbdb2315678afecb367f032d93f642f64180aa3"),
            ("RUST_LOG", "debug"),
            ("DL_JSON_LOGS", "true"),
        ]))
        .unwrap();

        assert_eq!(config.ledger.rpc_url, "http://node:8545");
        assert_eq!(config.gas.price, GasPrice::Node);
        assert_eq!(config.confirmation.timeout, Duration::from_secs(10));
        assert!(config.registry.contract_address.is_some());
        assert_eq!(config.telemetry.log_level, "debug");
        assert!(config.telemetry.json_logs);
        assert!(config.validate_for_signing().is_ok());
    }

    #[test]
    fn test_log_level_prefers_dl_variable() {
        let config = NotaryConfig::from_lookup(lookup(&[
            ("DL_LOG_LEVEL", "warn"),
            ("RUST_LOG", "trace"),
        ]))
        .unwrap();
        assert_eq!(config.telemetry.log_level, "warn");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            NotaryConfig::from_lookup(lookup(&[("DL_CONFIRMATION_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidValue { var: "DL_CONFIRMATION_TIMEOUT_SECS", .. })
        ));
        assert!(matches!(
            NotaryConfig::from_lookup(lookup(&[("DL_CONTRACT_ADDRESS", "0x1234")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            NotaryConfig::from_lookup(lookup(&[("DL_JSON_LOGS", "maybe")])),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_revert_reasons_extend_table() {
        let config = NotaryConfig::from_lookup(lookup(&[
            ("DL_REVERT_ALREADY_EXISTS", "DUPLICATE | Doc exists"),
            ("DL_REVERT_NOT_FOUND", "UNKNOWN_DOC"),
        ]))
        .unwrap();
        assert_eq!(config.registry.revert_reasons.len(), 3);

        let table = config.registry.revert_table();
        assert_eq!(
            table.classify(Some("DUPLICATE")),
            Some(ContractRejection::AlreadyExists)
        );
        assert_eq!(
            table.classify(Some("Doc exists")),
            Some(ContractRejection::AlreadyExists)
        );
        assert_eq!(
            table.classify(Some("UNKNOWN_DOC")),
            Some(ContractRejection::NotFound)
        );
        // Built-in reasons still apply
        assert_eq!(
            table.classify(Some("Document already exists")),
            Some(ContractRejection::AlreadyExists)
        );
        assert_eq!(
            NotaryConfig::default().registry.revert_table().len(),
            RevertTable::default().len()
        );
    }

    #[test]
    fn test_signing_requires_valid_key() {
        let mut config = NotaryConfig::default();
        assert!(matches!(
            config.validate_for_signing(),
            Err(ConfigError::MissingPrivateKey)
        ));

        config.signer.private_key = Some(Zeroizing::new("0x1234".into()));
        assert!(matches!(
            config.validate_for_signing(),
            Err(ConfigError::InvalidPrivateKey)
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = NotaryConfig::default();
        config.confirmation.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDuration(_))));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = NotaryConfig::from_lookup(lookup(&[("DL_PRIVATE_KEY", DEV_KEY)])).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ac0974"));
        assert!(debug.contains("***"));
    }
}
