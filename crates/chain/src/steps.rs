//! Concrete deployment steps for a lending market.
//!
//! Step order follows the protocol's wiring constraints: the addresses
//! provider first, then the pool and configurator proxies that hang off
//! it, periphery (treasury, incentives), and finally the oracles which
//! the provider points at.

use crate::deploy_ids::{
    AGGREGATOR_PROXY_ID, FALLBACK_ORACLE_ID, INCENTIVES_PROXY_ID, ORACLE_ID,
    POOL_ADDRESSES_PROVIDER_ID, POOL_CONFIGURATOR_PROXY_ID, POOL_PROXY_ID, TREASURY_PROXY_ID,
    UI_INCENTIVE_DATA_PROVIDER_ID, UI_POOL_DATA_PROVIDER_ID,
};
use crate::pipeline::{DeployStep, DeploymentPipeline, StepContext};
use alloy::primitives::Address;
use async_trait::async_trait;
use deployer_core::DeployError;
use tracing::info;

/// The market-wide address book every other contract resolves through.
pub struct ProviderStep;

#[async_trait]
impl DeployStep for ProviderStep {
    fn id(&self) -> &str {
        POOL_ADDRESSES_PROVIDER_ID
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        info!(
            market = %ctx.config.market_id,
            provider = ctx.config.provider_id,
            "Deploying addresses provider"
        );
        ctx.engine.deploy("PoolAddressesProvider").await
    }
}

/// The lending pool proxy.
pub struct PoolStep;

#[async_trait]
impl DeployStep for PoolStep {
    fn id(&self) -> &str {
        POOL_PROXY_ID
    }

    fn artifact(&self) -> &str {
        "Pool"
    }

    fn dependencies(&self) -> &[&'static str] {
        &[POOL_ADDRESSES_PROVIDER_ID]
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        ctx.engine.deploy("Pool").await
    }
}

/// The configurator proxy that performs reserve administration.
pub struct ConfiguratorStep;

#[async_trait]
impl DeployStep for ConfiguratorStep {
    fn id(&self) -> &str {
        POOL_CONFIGURATOR_PROXY_ID
    }

    fn artifact(&self) -> &str {
        "PoolConfigurator"
    }

    fn dependencies(&self) -> &[&'static str] {
        &[POOL_ADDRESSES_PROVIDER_ID]
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        ctx.engine.deploy("PoolConfigurator").await
    }
}

/// Revenue collector. No wiring of its own, so re-runs skip it outright.
pub struct TreasuryStep;

#[async_trait]
impl DeployStep for TreasuryStep {
    fn id(&self) -> &str {
        TREASURY_PROXY_ID
    }

    fn artifact(&self) -> &str {
        "Treasury"
    }

    fn deploy_only(&self) -> bool {
        true
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        ctx.engine.deploy("Treasury").await
    }
}

/// Incentives controller. Networks with an externally operated controller
/// configure its address; everywhere else a stand-in is deployed and
/// registered under the same id, so downstream lookups never care which
/// case they hit.
pub struct IncentivesStep;

#[async_trait]
impl DeployStep for IncentivesStep {
    fn id(&self) -> &str {
        INCENTIVES_PROXY_ID
    }

    fn artifact(&self) -> &str {
        "RewardsController"
    }

    fn deploy_only(&self) -> bool {
        true
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        if let Some(external) = ctx.config.incentives_controller.get(&ctx.network) {
            info!(address = %external, "Using externally operated incentives controller");
            return Ok(*external);
        }
        ctx.registry
            .register_or_deploy(INCENTIVES_PROXY_ID, ctx.network, "RewardsController", || {
                ctx.engine.deploy("RewardsController")
            })
            .await
    }
}

/// Fallback price oracle, deployed before the main oracle so the latter
/// can reference it.
pub struct FallbackOracleStep;

#[async_trait]
impl DeployStep for FallbackOracleStep {
    fn id(&self) -> &str {
        FALLBACK_ORACLE_ID
    }

    fn artifact(&self) -> &str {
        "PriceOracle"
    }

    fn deploy_only(&self) -> bool {
        true
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        ctx.engine.deploy("PriceOracle").await
    }
}

/// Main market oracle.
pub struct OracleStep;

#[async_trait]
impl DeployStep for OracleStep {
    fn id(&self) -> &str {
        ORACLE_ID
    }

    fn artifact(&self) -> &str {
        "AaveOracle"
    }

    fn dependencies(&self) -> &[&'static str] {
        &[POOL_ADDRESSES_PROVIDER_ID, FALLBACK_ORACLE_ID]
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        info!(
            base_currency = %ctx.config.base_currency.symbol,
            unit = %ctx.config.base_currency.unit,
            "Deploying market oracle"
        );
        ctx.engine.deploy("AaveOracle").await
    }
}

/// Read-only incentive data getter for front ends.
pub struct UiIncentiveDataProviderStep;

#[async_trait]
impl DeployStep for UiIncentiveDataProviderStep {
    fn id(&self) -> &str {
        UI_INCENTIVE_DATA_PROVIDER_ID
    }

    fn deploy_only(&self) -> bool {
        true
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        ctx.engine.deploy("UiIncentiveDataProviderV3").await
    }
}

/// Read-only pool data getter for front ends. Its constructor needs a
/// native/USD aggregator proxy; networks without a configured one get a
/// stand-in proxy, registered so later runs reuse it.
pub struct UiPoolDataProviderStep;

#[async_trait]
impl DeployStep for UiPoolDataProviderStep {
    fn id(&self) -> &str {
        UI_POOL_DATA_PROVIDER_ID
    }

    fn deploy_only(&self) -> bool {
        true
    }

    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
        let proxy = match ctx.config.aggregator_proxy.get(&ctx.network) {
            Some(configured) => *configured,
            None => {
                ctx.registry
                    .register_or_deploy(AGGREGATOR_PROXY_ID, ctx.network, "EACAggregatorProxy", || {
                        ctx.engine.deploy("EACAggregatorProxy")
                    })
                    .await?
            }
        };
        info!(proxy = %proxy, "Deploying pool data provider");
        ctx.engine.deploy("UiPoolDataProviderV3").await
    }
}

/// Full market pipeline in wiring order.
pub fn market_steps() -> DeploymentPipeline {
    DeploymentPipeline::new()
        .push(ProviderStep)
        .push(PoolStep)
        .push(ConfiguratorStep)
        .push(TreasuryStep)
        .push(IncentivesStep)
        .push(FallbackOracleStep)
        .push(OracleStep)
        .push(UiIncentiveDataProviderStep)
        .push(UiPoolDataProviderStep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DeployEngine;
    use crate::registry::tests::scratch_dir;
    use crate::registry::DeploymentRegistry;
    use crate::reserves::ReserveInitializer;
    use crate::sim::SimEngine;
    use deployer_core::{resolver, Network};
    use std::sync::Arc;

    fn context(tag: &str, network: Network) -> (Arc<SimEngine>, StepContext) {
        let engine = Arc::new(SimEngine::new());
        let ctx = StepContext {
            engine: engine.clone(),
            registry: Arc::new(DeploymentRegistry::new(scratch_dir(tag)).unwrap()),
            network,
            config: Arc::new(resolver::resolve("bob", network).unwrap()),
        };
        (engine, ctx)
    }

    #[tokio::test]
    async fn test_full_market_deployment_and_reserve_activation() {
        let (engine, ctx) = context("market-e2e", Network::Testnet);

        let report = market_steps().run(&ctx).await.unwrap();
        assert_eq!(report.deployed.len(), 9);

        let treasury = ctx.registry.get(TREASURY_PROXY_ID, ctx.network).unwrap();
        let incentives = ctx.registry.get(INCENTIVES_PROXY_ID, ctx.network).unwrap();

        let initializer = ReserveInitializer::new(engine.clone());
        let outcome = initializer
            .initialize(&ctx.config, ctx.network, &ctx.config.prefixes, treasury, incentives)
            .await
            .unwrap();
        assert_eq!(outcome.activated, vec!["AAVE", "DAI", "USDC", "WETH"]);

        for status in engine.list_reserves().await.unwrap() {
            assert!(status.active);
            assert!(!status.paused);
        }

        // Drop one reserve and re-run initialization: only the dropped one
        // comes back.
        let assets = ctx.config.reserve_assets(ctx.network);
        let usdc = assets["USDC"];
        engine.drop_reserve(usdc).await.unwrap();

        let outcome = initializer
            .initialize(&ctx.config, ctx.network, &ctx.config.prefixes, treasury, incentives)
            .await
            .unwrap();
        assert_eq!(outcome.activated, vec!["USDC"]);
        assert_eq!(outcome.skipped, vec!["AAVE", "DAI", "WETH"]);
        assert!(engine.is_reserve_active(usdc).await.unwrap());
    }

    #[tokio::test]
    async fn test_incentives_uses_configured_external_address() {
        let (_engine, ctx) = context("incentives-external", Network::Testnet);
        let configured = ctx.config.incentives_controller[&Network::Testnet];

        market_steps().run(&ctx).await.unwrap();
        assert_eq!(
            ctx.registry.get(INCENTIVES_PROXY_ID, ctx.network).unwrap(),
            configured
        );
    }

    #[tokio::test]
    async fn test_aggregator_proxy_stand_in_when_unconfigured() {
        let (engine, ctx) = context("proxy-standin", Network::Local);
        assert!(!ctx.config.aggregator_proxy.contains_key(&Network::Local));

        market_steps().run(&ctx).await.unwrap();

        // The bypass registered a stand-in proxy for the data provider.
        let proxy = ctx.registry.get(AGGREGATOR_PROXY_ID, ctx.network).unwrap();
        assert_eq!(
            engine.artifact_at(proxy).as_deref(),
            Some("EACAggregatorProxy")
        );
        assert!(ctx
            .registry
            .lookup(UI_POOL_DATA_PROVIDER_ID, ctx.network)
            .is_some());
    }

    #[tokio::test]
    async fn test_aggregator_proxy_configured_skips_stand_in() {
        let (_engine, ctx) = context("proxy-configured", Network::Testnet);
        assert!(ctx.config.aggregator_proxy.contains_key(&Network::Testnet));

        market_steps().run(&ctx).await.unwrap();
        assert!(ctx.registry.lookup(AGGREGATOR_PROXY_ID, ctx.network).is_none());
        assert!(ctx
            .registry
            .lookup(UI_INCENTIVE_DATA_PROVIDER_ID, ctx.network)
            .is_some());
    }

    #[tokio::test]
    async fn test_incentives_stand_in_when_unconfigured() {
        let (engine, ctx) = context("incentives-standin", Network::Local);
        assert!(!ctx.config.incentives_controller.contains_key(&Network::Local));

        market_steps().run(&ctx).await.unwrap();
        let address = ctx.registry.get(INCENTIVES_PROXY_ID, ctx.network).unwrap();
        assert_eq!(
            engine.artifact_at(address).as_deref(),
            Some("RewardsController")
        );
    }
}
