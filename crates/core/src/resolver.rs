//! Market configuration resolution.
//!
//! `resolve(market_id, network)` is a pure function of its inputs and the
//! static templates: identical inputs always yield an identical
//! configuration. Per-network gaps are warned about here and only become
//! hard errors at initialization time, where the addresses are actually
//! needed.

use crate::config::markets;
use crate::config::overrides::MarketOverrides;
use crate::config::MarketConfiguration;
use crate::error::DeployError;
use crate::network::Network;
use std::path::Path;

/// Environment variable selecting the market to operate on.
pub const MARKET_NAME_ENV: &str = "MARKET_NAME";

fn template(market_id: &str) -> Result<MarketConfiguration, DeployError> {
    match market_id.to_lowercase().as_str() {
        "aave" | "aave market" => Ok(markets::base()),
        "bob" | "build on bitcoin" => Ok(markets::bob()),
        _ => Err(DeployError::ConfigNotFound(market_id.to_string())),
    }
}

/// Resolve a market template for a target network.
pub fn resolve(market_id: &str, network: Network) -> Result<MarketConfiguration, DeployError> {
    let config = template(market_id)?;
    config.validate()?;

    for warning in config.validate_for_network(network) {
        tracing::warn!(market = market_id, network = %network, "{warning}");
    }

    Ok(config)
}

/// Resolve a market template, then patch it with a deployment's TOML
/// override file before validation.
pub fn resolve_with_overrides(
    market_id: &str,
    network: Network,
    overrides_path: impl AsRef<Path>,
) -> Result<MarketConfiguration, DeployError> {
    let mut config = template(market_id)?;
    MarketOverrides::from_file(overrides_path)?.apply(&mut config)?;
    config.validate()?;

    for warning in config.validate_for_network(network) {
        tracing::warn!(market = market_id, network = %network, "{warning}");
    }

    Ok(config)
}
