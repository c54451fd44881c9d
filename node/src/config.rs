//! Node configuration, read from TOML.
//!
//! ```toml
//! network = "private"
//! node_type = "full"
//! genesis_hash = "…64 hex chars…"   # optional
//!
//! [nd]
//! server_read_timeout_ms = 5000
//! server_write_timeout_ms = 60000
//! handle_request_timeout_ms = 60000
//! concurrency_limit = 10
//!
//! [proposal]
//! skip_reserved_first_tx = false
//!
//! [logging]
//! level = "info,dasquare_node::nd=debug"
//! ```
//!
//! Every section and key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::das::NodeType;
use crate::genesis::{GenesisError, GenesisTable, Network};
use crate::logging::LoggingConfig;
use crate::nd;
use crate::proposal::ValidatorConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid nd parameters: {0}")]
    Nd(#[from] nd::Error),
    #[error(transparent)]
    Genesis(#[from] GenesisError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    pub network: Network,
    pub node_type: NodeType,
    /// Genesis hash for networks without a pinned one.
    pub genesis_hash: Option<String>,
    pub nd: nd::Parameters,
    pub proposal: ValidatorConfig,
    pub logging: LoggingConfig,
}

impl NodeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let mut cfg: Self = toml::from_str(s)?;
        cfg.nd.set_network_id(cfg.network.as_str());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.nd.validate()?;
        self.genesis_table()?;
        Ok(())
    }

    /// Built-in genesis table plus the configured override, if any.
    pub fn genesis_table(&self) -> Result<GenesisTable, GenesisError> {
        let table = GenesisTable::pinned()?;
        match &self.genesis_hash {
            Some(hash) => table.with_override(self.network, hash.as_str()),
            None => Ok(table),
        }
    }

    pub fn genesis_hash(&self) -> Result<String, GenesisError> {
        self.genesis_table()?.genesis_for(self.network).map(str::to_owned)
    }
}

/* --------------------------------- Tests -------------------------------- */

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = NodeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.node_type, NodeType::Light);
        assert_eq!(cfg.nd.protocol_id().as_str(), "/mainnet/nd/v0.0.1");
        assert!(!cfg.proposal.skip_reserved_first_tx);
        assert!(matches!(cfg.genesis_hash(), Err(GenesisError::NoGenesis(Network::Mainnet))));
    }

    #[test]
    fn full_document() {
        let doc = format!(
            r#"
network = "private"
node_type = "bridge"
genesis_hash = "{}"

[nd]
server_read_timeout_ms = 1500
concurrency_limit = 2

[proposal]
skip_reserved_first_tx = true

[logging]
level = "debug"
"#,
            "ab".repeat(32)
        );
        let cfg = NodeConfig::from_toml_str(&doc).unwrap();
        assert_eq!(cfg.node_type, NodeType::Bridge);
        assert_eq!(cfg.nd.server_read_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.nd.concurrency_limit, 2);
        assert_eq!(cfg.nd.network_id(), "private");
        assert!(cfg.proposal.skip_reserved_first_tx);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.genesis_hash().unwrap(), "ab".repeat(32));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(NodeConfig::from_toml_str("[nd]\nconcurrency_limit = 0"), Err(ConfigError::Nd(_))));
        assert!(matches!(NodeConfig::from_toml_str("genesis_hash = \"xyz\""), Err(ConfigError::Genesis(_))));
        assert!(matches!(NodeConfig::from_toml_str("network = \"devnet\""), Err(ConfigError::Parse(_))));
        assert!(matches!(NodeConfig::from_toml_str("colour = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(NodeConfig::load("/nonexistent/dasquare.toml"), Err(ConfigError::Io { .. })));
    }
}
