//! Target network identification.
//!
//! Every per-network configuration map (reserve addresses, aggregators,
//! deployment records) is keyed by [`Network`]. The identifier is resolved
//! once per run into a [`NetworkContext`] and is immutable afterwards; when
//! the `FORK` environment variable is set it substitutes for the detected
//! network everywhere.

use crate::error::DeployError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable that forces the network when running against a fork.
pub const FORK_ENV: &str = "FORK";

/// Supported deployment networks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    Main,
    /// Public testnet.
    Testnet,
    /// Local or ephemeral development chain.
    #[default]
    Local,
}

impl Network {
    /// Stable lowercase name, used for file names and map keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Testnet => "testnet",
            Self::Local => "local",
        }
    }

    /// All known networks.
    pub fn all() -> [Network; 3] {
        [Self::Main, Self::Testnet, Self::Local]
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" => Ok(Self::Main),
            "testnet" => Ok(Self::Testnet),
            "local" | "localhost" | "hardhat" => Ok(Self::Local),
            other => Err(DeployError::InvalidConfig(format!(
                "unknown network '{other}'"
            ))),
        }
    }
}

/// Resolved network identity for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkContext {
    /// Network whose configuration sub-maps apply.
    pub network: Network,
    /// True when the identity came from a fork override rather than the
    /// detected runtime network.
    pub forked: bool,
}

impl NetworkContext {
    /// Resolve the effective network from the detected one, honoring the
    /// `FORK` override.
    pub fn resolve(detected: Network) -> Result<Self, DeployError> {
        match std::env::var(FORK_ENV) {
            Ok(value) if !value.is_empty() => {
                let network = value.parse()?;
                tracing::info!(detected = %detected, fork = %network, "Fork override active");
                Ok(Self {
                    network,
                    forked: true,
                })
            }
            _ => Ok(Self {
                network: detected,
                forked: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for network in Network::all() {
            assert_eq!(network.as_str().parse::<Network>().unwrap(), network);
        }
        assert!("ropsten".parse::<Network>().is_err());
    }

    #[test]
    fn test_fork_override() {
        std::env::set_var(FORK_ENV, "testnet");
        let ctx = NetworkContext::resolve(Network::Local).unwrap();
        assert_eq!(ctx.network, Network::Testnet);
        assert!(ctx.forked);
        std::env::remove_var(FORK_ENV);

        let ctx = NetworkContext::resolve(Network::Local).unwrap();
        assert_eq!(ctx.network, Network::Local);
        assert!(!ctx.forked);
    }
}
