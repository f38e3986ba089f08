//! Per-deployment TOML overrides for market address books.
//!
//! Instead of copy-pasting whole market files per revision, a deployment
//! ships one override file patching token or aggregator addresses on top of
//! the versioned template. Overrides are validated when applied: naming a
//! symbol the template does not configure is a load-time error.
//!
//! ```toml
//! [reserve_assets.testnet]
//! DAI = "0xcb913C75362A7Fd39de6A5DDE4341F370F5B4419"
//!
//! [chainlink_aggregators.testnet]
//! DAI = "0xb062542b2A173fe90E885C1A2bF6C87F842167d0"
//! ```

use crate::config::MarketConfiguration;
use crate::error::DeployError;
use crate::network::Network;
use alloy::primitives::Address;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Address-book overrides keyed by network name, then reserve symbol.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketOverrides {
    #[serde(default)]
    pub reserve_assets: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub chainlink_aggregators: BTreeMap<String, BTreeMap<String, String>>,
}

impl MarketOverrides {
    /// Load overrides from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse overrides from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, DeployError> {
        toml::from_str(content)
            .map_err(|e| DeployError::InvalidConfig(format!("override file: {e}")))
    }

    /// Apply the overrides to a template, shallow per key. Fails without
    /// modifying anything observable if any entry is invalid.
    pub fn apply(&self, config: &mut MarketConfiguration) -> Result<(), DeployError> {
        let assets = Self::parse_book(&self.reserve_assets, config)?;
        let aggregators = Self::parse_book(&self.chainlink_aggregators, config)?;

        for (network, book) in assets {
            config.reserve_assets.entry(network).or_default().extend(book);
        }
        for (network, book) in aggregators {
            config
                .chainlink_aggregators
                .entry(network)
                .or_default()
                .extend(book);
        }

        tracing::debug!(market = %config.market_id, "Applied address-book overrides");
        Ok(())
    }

    fn parse_book(
        raw: &BTreeMap<String, BTreeMap<String, String>>,
        config: &MarketConfiguration,
    ) -> Result<BTreeMap<Network, BTreeMap<String, Address>>, DeployError> {
        let mut parsed = BTreeMap::new();

        for (network_name, book) in raw {
            let network: Network = network_name.parse()?;
            let mut entries = BTreeMap::new();

            for (symbol, address) in book {
                if !config.reserves_config.contains_key(symbol) {
                    return Err(DeployError::InvalidConfig(format!(
                        "override names '{symbol}', which is not a configured reserve of '{}'",
                        config.market_id
                    )));
                }
                let address: Address = address.parse().map_err(|e| {
                    DeployError::InvalidConfig(format!(
                        "override for '{symbol}' on '{network_name}' has a bad address: {e}"
                    ))
                })?;
                entries.insert(symbol.clone(), address);
            }

            parsed.insert(network, entries);
        }

        Ok(parsed)
    }
}
