//! Data availability sampler facade.
//!
//! Full and light nodes run a sampling loop (the "daser") that publishes its
//! progress through a watch channel; bridge nodes have none and answer every
//! query with [`SamplerError::Unavailable`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplerError {
    #[error("stubbed: dasing is not available on bridge nodes")]
    Unavailable,
    #[error("sampler stopped")]
    Stopped,
}

/// Role a node plays in the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Bridge,
    Full,
    #[default]
    Light,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bridge => "bridge",
            Self::Full => "full",
            Self::Light => "light",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node type {0:?}")]
pub struct UnknownNodeType(pub String);

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bridge" => Ok(Self::Bridge),
            "full" => Ok(Self::Full),
            "light" => Ok(Self::Light),
            _ => Err(UnknownNodeType(s.to_owned())),
        }
    }
}

/// Snapshot of sampling progress.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SamplingStats {
    /// Every height up to this one has been sampled.
    pub sampled_chain_head: u64,
    /// Highest height handed to catch-up workers.
    pub catchup_head: u64,
    /// Newest height announced by the network.
    pub network_head: u64,
    /// Heights whose sampling failed, with attempt counts.
    pub failed: BTreeMap<u64, u32>,
    pub concurrency: usize,
    pub is_running: bool,
}

impl SamplingStats {
    pub fn catch_up_done(&self) -> bool {
        self.failed.is_empty() && self.sampled_chain_head >= self.network_head
    }
}

/// Read side of a sampling loop.
#[derive(Clone, Debug)]
pub struct DaserHandle {
    stats: watch::Receiver<SamplingStats>,
}

/// Write side, owned by the sampling loop.
#[derive(Debug)]
pub struct DaserReporter {
    stats: watch::Sender<SamplingStats>,
}

/// Create a connected reporter/handle pair.
pub fn daser_channel(concurrency: usize) -> (DaserReporter, DaserHandle) {
    let (tx, rx) = watch::channel(SamplingStats { concurrency, is_running: true, ..SamplingStats::default() });
    (DaserReporter { stats: tx }, DaserHandle { stats: rx })
}

impl DaserReporter {
    pub fn network_head(&self, height: u64) {
        self.stats.send_modify(|s| s.network_head = s.network_head.max(height));
    }

    pub fn catchup_head(&self, height: u64) {
        self.stats.send_modify(|s| s.catchup_head = s.catchup_head.max(height));
    }

    /// Record a sampled height; a previous failure at it is forgiven.
    pub fn sampled(&self, height: u64) {
        self.stats.send_modify(|s| {
            s.failed.remove(&height);
            if height == s.sampled_chain_head + 1 {
                s.sampled_chain_head = height;
            }
        });
    }

    pub fn failed(&self, height: u64) {
        self.stats.send_modify(|s| *s.failed.entry(height).or_default() += 1);
    }

    pub fn stop(&self) {
        self.stats.send_modify(|s| s.is_running = false);
    }
}

/// Sampling capability of a node, fixed at construction.
#[derive(Clone, Debug)]
pub enum Sampler {
    Full(DaserHandle),
    Unavailable,
}

impl Sampler {
    /// Bridge nodes get [`Sampler::Unavailable`]; `daser` is only called for
    /// node types that sample.
    pub fn for_node(node_type: NodeType, daser: impl FnOnce() -> DaserHandle) -> Self {
        match node_type {
            NodeType::Bridge => Self::Unavailable,
            NodeType::Full | NodeType::Light => Self::Full(daser()),
        }
    }

    pub fn sampling_stats(&self) -> Result<SamplingStats, SamplerError> {
        match self {
            Self::Full(h) => Ok(h.stats.borrow().clone()),
            Self::Unavailable => Err(SamplerError::Unavailable),
        }
    }

    /// Resolve once the sampled head reaches the network head.
    pub async fn wait_catch_up(&self) -> Result<(), SamplerError> {
        match self {
            Self::Full(h) => {
                let mut rx = h.stats.clone();
                rx.wait_for(SamplingStats::catch_up_done).await.map_err(|_| SamplerError::Stopped)?;
                Ok(())
            }
            Self::Unavailable => Err(SamplerError::Unavailable),
        }
    }
}

/* --------------------------------- Tests -------------------------------- */
