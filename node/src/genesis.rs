//! Genesis block hashes per network.
//!
//! Every long-running network gets its genesis hash pinned here. A node on a
//! network without a pinned hash must be given one through configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hex-encoded genesis block hash (64 characters).
pub type GenesisHash = String;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Private,
}

impl Network {
    pub const ALL: [Self; 3] = [Self::Mainnet, Self::Testnet, Self::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = GenesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| GenesisError::UnknownNetwork(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisError {
    #[error("unknown network {0:?}")]
    UnknownNetwork(String),
    #[error("genesis hash not found for network {0}")]
    NoGenesis(Network),
    #[error("malformed genesis hash for network {network}: {reason}")]
    Malformed { network: Network, reason: &'static str },
}

/// Hashes pinned at build time. None yet.
const PINNED: &[(Network, &str)] = &[];

/// Network to genesis hash lookup, validated on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisTable {
    hashes: BTreeMap<Network, GenesisHash>,
}

impl GenesisTable {
    /// The built-in table.
    pub fn pinned() -> Result<Self, GenesisError> {
        let table = Self { hashes: PINNED.iter().map(|(n, h)| (*n, (*h).to_owned())).collect() };
        table.validate()?;
        Ok(table)
    }

    /// Add or replace the hash of `network`, typically from node configuration.
    pub fn with_override(mut self, network: Network, hash: impl Into<GenesisHash>) -> Result<Self, GenesisError> {
        let hash = hash.into().to_ascii_lowercase();
        check_hash(network, &hash)?;
        self.hashes.insert(network, hash);
        Ok(self)
    }

    pub fn genesis_for(&self, network: Network) -> Result<&str, GenesisError> {
        self.hashes.get(&network).map(String::as_str).ok_or(GenesisError::NoGenesis(network))
    }

    pub fn validate(&self) -> Result<(), GenesisError> {
        self.hashes.iter().try_for_each(|(n, h)| check_hash(*n, h))
    }
}

fn check_hash(network: Network, hash: &str) -> Result<(), GenesisError> {
    if hash.len() != 64 {
        return Err(GenesisError::Malformed { network, reason: "expected 64 hex characters" });
    }
    hex::decode(hash).map_err(|_| GenesisError::Malformed { network, reason: "not hex" })?;
    Ok(())
}

/// Check the built-in table. Run once at startup.
pub fn validate_genesis_table() -> Result<(), GenesisError> {
    GenesisTable::pinned().map(|_| ())
}

/// Genesis hash of `network` from the built-in table.
pub fn genesis_for(network: Network) -> Result<GenesisHash, GenesisError> {
    GenesisTable::pinned()?.genesis_for(network).map(str::to_owned)
}

/* --------------------------------- Tests -------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "9A1F3B9C0E4D6F2A8B7C5D3E1F0A9B8C7D6E5F4A3B2C1D0E9F8A7B6C5D4E3F2A";

    #[test]
    fn networks_round_trip_through_strings() {
        for n in Network::ALL {
            assert_eq!(n.to_string().parse::<Network>().unwrap(), n);
        }
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
        assert!(matches!("devnet".parse::<Network>(), Err(GenesisError::UnknownNetwork(_))));
    }

    #[test]
    fn builtin_table_is_valid_but_unpinned() {
        validate_genesis_table().unwrap();
        assert_eq!(genesis_for(Network::Mainnet), Err(GenesisError::NoGenesis(Network::Mainnet)));
    }

    #[test]
    fn overrides_are_validated() {
        let table = GenesisTable::pinned().unwrap().with_override(Network::Private, HASH).unwrap();
        assert_eq!(table.genesis_for(Network::Private).unwrap(), HASH.to_ascii_lowercase());
        assert!(table.genesis_for(Network::Testnet).is_err());

        let bad = GenesisTable::pinned().unwrap().with_override(Network::Private, "abc");
        assert!(matches!(bad, Err(GenesisError::Malformed { .. })));
        let bad = GenesisTable::pinned().unwrap().with_override(Network::Private, "z".repeat(64));
        assert!(matches!(bad, Err(GenesisError::Malformed { reason: "not hex", .. })));
    }
}
