//! Market configuration model.
//!
//! A [`MarketConfiguration`] is the immutable template describing one
//! lending market: which reserves exist, their risk parameters, their
//! per-network token and price-feed addresses, e-mode categories and token
//! naming prefixes. Templates are static Rust literals (see [`markets`]),
//! optionally patched by validated TOML overrides (see [`overrides`]), and
//! never mutated after resolution.

pub mod markets;
pub mod overrides;

use crate::error::{DeployError, MismatchSide};
use crate::network::Network;
use alloy::primitives::{Address, U256};
use std::collections::BTreeMap;

/// `percent` % expressed in ray (1e27) units.
pub fn ray_pct(percent: u64) -> U256 {
    U256::from(percent) * U256::from(10u64).pow(U256::from(25u64))
}

/// `bps` basis points expressed in ray (1e27) units.
pub fn ray_bps(bps: u64) -> U256 {
    U256::from(bps) * U256::from(10u64).pow(U256::from(23u64))
}

/// Interest-rate strategy parameters, ray-scaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateStrategyParams {
    pub name: String,
    pub optimal_usage_ratio: U256,
    pub base_variable_borrow_rate: U256,
    pub variable_rate_slope1: U256,
    pub variable_rate_slope2: U256,
    pub stable_rate_slope1: U256,
    pub stable_rate_slope2: U256,
    pub base_stable_rate_offset: U256,
    pub stable_rate_excess_offset: U256,
    pub optimal_stable_to_total_debt_ratio: U256,
}

/// Per-reserve risk parameters. Purely declarative; never mutated after
/// load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveParams {
    /// Name of the rate strategy in [`MarketConfiguration::rate_strategies`].
    pub rate_strategy: String,
    /// Max loan-to-value when used as collateral, in basis points.
    pub base_ltv_bps: u16,
    /// Liquidation threshold in basis points (0 disables collateral use).
    pub liquidation_threshold_bps: u16,
    /// Liquidation bonus in basis points over 100% (e.g. 11000 = 10% bonus).
    pub liquidation_bonus_bps: u16,
    /// Share of the bonus routed to the protocol, in basis points.
    pub liquidation_protocol_fee_bps: u16,
    pub borrowing_enabled: bool,
    pub stable_borrow_rate_enabled: bool,
    pub flash_loan_enabled: bool,
    pub decimals: u8,
    /// aToken implementation artifact name.
    pub a_token_impl: String,
    /// Reserve factor in basis points.
    pub reserve_factor_bps: u16,
    /// Supply cap in whole tokens (0 = uncapped).
    pub supply_cap: u64,
    /// Borrow cap in whole tokens (0 = uncapped).
    pub borrow_cap: u64,
    /// Isolation-mode debt ceiling (0 = not isolated).
    pub debt_ceiling: u64,
    pub borrowable_in_isolation: bool,
}

/// A named group of correlated assets sharing relaxed risk parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EModeCategory {
    pub id: u8,
    pub ltv_bps: u16,
    pub liquidation_threshold_bps: u16,
    pub liquidation_bonus_bps: u16,
    pub label: String,
    /// Reserve symbols in the category; each must be a configured reserve.
    pub assets: Vec<String>,
}

/// Token naming prefixes applied when deriving aToken/debt-token names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenNamePrefixes {
    pub a_token_name_prefix: String,
    pub stable_debt_name_prefix: String,
    pub variable_debt_name_prefix: String,
    pub symbol_prefix: String,
}

/// Reference asset whose price is fixed at a constant unit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseCurrency {
    /// Symbol, e.g. "USD" or "WETH".
    pub symbol: String,
    /// Fixed unit the oracle returns for the base currency itself.
    pub unit: U256,
}

/// Immutable market template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfiguration {
    pub market_id: String,
    pub provider_id: u32,
    pub testnet_market: bool,
    pub wrapped_native_symbol: String,
    pub prefixes: TokenNamePrefixes,
    pub base_currency: BaseCurrency,
    pub rate_strategies: BTreeMap<String, RateStrategyParams>,
    /// symbol → risk parameters.
    pub reserves_config: BTreeMap<String, ReserveParams>,
    /// network → (symbol → token address).
    pub reserve_assets: BTreeMap<Network, BTreeMap<String, Address>>,
    /// network → (symbol → Chainlink aggregator address).
    pub chainlink_aggregators: BTreeMap<Network, BTreeMap<String, Address>>,
    /// label → e-mode category.
    pub emodes: BTreeMap<String, EModeCategory>,
    /// Externally owned incentives controller per network; networks without
    /// an entry get a stand-in deployed during the pipeline run.
    pub incentives_controller: BTreeMap<Network, Address>,
    /// Native/USD Chainlink aggregator proxy per network, consumed by the
    /// UI data-provider periphery; networks without an entry get a
    /// stand-in proxy deployed during the pipeline run.
    pub aggregator_proxy: BTreeMap<Network, Address>,
}

impl MarketConfiguration {
    /// Reserve token addresses for a network. Deliberately permissive: a
    /// network without an entry yields an empty map, and callers depending
    /// on specific symbols must check presence themselves.
    pub fn reserve_assets(&self, network: Network) -> BTreeMap<String, Address> {
        self.reserve_assets.get(&network).cloned().unwrap_or_default()
    }

    /// Chainlink aggregator addresses for a network (empty map default).
    pub fn aggregators(&self, network: Network) -> BTreeMap<String, Address> {
        self.chainlink_aggregators
            .get(&network)
            .cloned()
            .unwrap_or_default()
    }

    /// Address the oracle treats as the base currency on this network:
    /// the matching reserve token if the symbol names one, otherwise the
    /// zero address (USD-quoted markets).
    pub fn base_currency_address(&self, network: Network) -> Address {
        self.reserve_assets
            .get(&network)
            .and_then(|assets| assets.get(&self.base_currency.symbol))
            .copied()
            .unwrap_or(Address::ZERO)
    }

    /// Load-time structural validation: internal references must hold
    /// before a template is handed to any caller.
    pub fn validate(&self) -> Result<(), DeployError> {
        for (symbol, params) in &self.reserves_config {
            if !self.rate_strategies.contains_key(&params.rate_strategy) {
                return Err(DeployError::InvalidConfig(format!(
                    "reserve '{symbol}' references unknown rate strategy '{}'",
                    params.rate_strategy
                )));
            }
            if params.base_ltv_bps > params.liquidation_threshold_bps {
                return Err(DeployError::InvalidConfig(format!(
                    "reserve '{symbol}' has LTV above its liquidation threshold"
                )));
            }
            if params.liquidation_threshold_bps > 0 && params.liquidation_bonus_bps <= 10_000 {
                return Err(DeployError::InvalidConfig(format!(
                    "reserve '{symbol}' is collateral but its liquidation bonus is not above 100%"
                )));
            }
        }

        for (label, emode) in &self.emodes {
            for symbol in &emode.assets {
                if !self.reserves_config.contains_key(symbol) {
                    return Err(DeployError::InvalidConfig(format!(
                        "e-mode '{label}' references unconfigured reserve '{symbol}'"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Per-network gaps between `ReservesConfig` and the address books.
    /// These are configuration defects, surfaced as warnings at resolve
    /// time and as hard `AssetAddressMismatch` errors at initialization.
    pub fn validate_for_network(&self, network: Network) -> Vec<String> {
        let assets = self.reserve_assets(network);
        let aggregators = self.aggregators(network);
        let mut warnings = Vec::new();

        for symbol in self.reserves_config.keys() {
            if !assets.contains_key(symbol) {
                warnings.push(format!(
                    "reserve '{symbol}' has no token address for network '{network}'"
                ));
            }
            if !aggregators.contains_key(symbol) {
                warnings.push(format!(
                    "reserve '{symbol}' has no price aggregator for network '{network}'"
                ));
            }
        }
        for symbol in assets.keys() {
            if !self.reserves_config.contains_key(symbol) {
                warnings.push(format!(
                    "network '{network}' lists address for unconfigured reserve '{symbol}'"
                ));
            }
        }

        warnings
    }
}

/// Fully derived input for activating one reserve. Built fresh on every
/// initialization call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveInitInput {
    pub symbol: String,
    pub underlying: Address,
    pub decimals: u8,
    pub params: ReserveParams,
    pub rate_strategy: RateStrategyParams,
    pub a_token_name: String,
    pub a_token_symbol: String,
    pub variable_debt_name: String,
    pub variable_debt_symbol: String,
    pub stable_debt_name: String,
    pub stable_debt_symbol: String,
    pub treasury: Address,
    pub incentives_controller: Address,
}

/// Zip `ReservesConfig` with `ReserveAssets[network]` into activation
/// inputs. A symbol present in one map and absent from the other is a hard
/// error; nothing is built in that case.
pub fn build_reserve_init_inputs(
    config: &MarketConfiguration,
    network: Network,
    prefixes: &TokenNamePrefixes,
    treasury: Address,
    incentives_controller: Address,
) -> Result<Vec<ReserveInitInput>, DeployError> {
    let assets = config.reserve_assets(network);

    for symbol in assets.keys() {
        if !config.reserves_config.contains_key(symbol) {
            return Err(DeployError::AssetAddressMismatch {
                symbol: symbol.clone(),
                side: MismatchSide::ReservesConfig,
            });
        }
    }

    let mut inputs = Vec::with_capacity(config.reserves_config.len());
    for (symbol, params) in &config.reserves_config {
        let underlying = *assets
            .get(symbol)
            .ok_or_else(|| DeployError::AssetAddressMismatch {
                symbol: symbol.clone(),
                side: MismatchSide::ReserveAssets,
            })?;

        let rate_strategy = config
            .rate_strategies
            .get(&params.rate_strategy)
            .cloned()
            .ok_or_else(|| {
                DeployError::InvalidConfig(format!(
                    "reserve '{symbol}' references unknown rate strategy '{}'",
                    params.rate_strategy
                ))
            })?;

        inputs.push(ReserveInitInput {
            symbol: symbol.clone(),
            underlying,
            decimals: params.decimals,
            a_token_name: format!("{} {symbol}", prefixes.a_token_name_prefix),
            a_token_symbol: format!("a{}{symbol}", prefixes.symbol_prefix),
            variable_debt_name: format!(
                "{} Variable Debt {symbol}",
                prefixes.variable_debt_name_prefix
            ),
            variable_debt_symbol: format!("variableDebt{}{symbol}", prefixes.symbol_prefix),
            stable_debt_name: format!("{} Stable Debt {symbol}", prefixes.stable_debt_name_prefix),
            stable_debt_symbol: format!("stableDebt{}{symbol}", prefixes.symbol_prefix),
            treasury,
            incentives_controller,
            params: params.clone(),
            rate_strategy,
        });
    }

    Ok(inputs)
}
