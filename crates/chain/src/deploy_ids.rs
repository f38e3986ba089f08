//! Logical ids for deployable artifacts.
//!
//! A logical id identifies an artifact independent of its address and keys
//! its record in the deployment registry.

pub const POOL_ADDRESSES_PROVIDER_ID: &str = "PoolAddressesProvider";
pub const POOL_PROXY_ID: &str = "Pool-Proxy";
pub const POOL_CONFIGURATOR_PROXY_ID: &str = "PoolConfigurator-Proxy";
pub const TREASURY_PROXY_ID: &str = "Treasury-Proxy";
pub const INCENTIVES_PROXY_ID: &str = "IncentivesProxy";
pub const ORACLE_ID: &str = "MarketOracle";
pub const FALLBACK_ORACLE_ID: &str = "FallbackPriceOracle";
pub const UI_INCENTIVE_DATA_PROVIDER_ID: &str = "UiIncentiveDataProviderV3";
pub const UI_POOL_DATA_PROVIDER_ID: &str = "UiPoolDataProviderV3";
/// Stand-in native/USD aggregator proxy for networks without one.
pub const AGGREGATOR_PROXY_ID: &str = "ChainlinkAggregatorProxy";
