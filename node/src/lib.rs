//! dasquare_node: node-side services of the DA layer.
//!
//! - [`nd`]: namespaced-data request/response protocol (client, server, wire)
//! - [`proposal`]: prepare and process block data at consensus time
//! - [`das`]: sampler facade (full sampler or bridge-node stub)
//! - [`genesis`]: per-network genesis hash lookup
//! - [`config`]: TOML node configuration
//! - [`logging`]: `tracing` subscriber setup
//!
//! The encoding, commitment and proof engine lives in `dasquare_native`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod config;
pub mod das;
pub mod error;
pub mod genesis;
pub mod logging;
pub mod nd;
pub mod proposal;

pub use config::{ConfigError, NodeConfig};
pub use das::{NodeType, Sampler, SamplerError, SamplingStats};
pub use error::{Error, Result};
pub use genesis::{genesis_for, validate_genesis_table, GenesisError, Network};
pub use proposal::{ProposalValidator, ValidatorConfig};

pub use dasquare_native;
