//! CLI task implementations.

use alloy::primitives::{Address, U256};
use anyhow::{Context as _, Result};
use std::sync::Arc;
use tracing::{info, warn};

use deployer_chain::deploy_ids::{FALLBACK_ORACLE_ID, INCENTIVES_PROXY_ID, TREASURY_PROXY_ID};
use deployer_chain::{
    steps, DeployEngine, FallbackOracle, PriceOracle, ReserveInitializer, StepContext,
};
use deployer_core::Capability;

use crate::TaskContext;

fn step_context(ctx: &TaskContext) -> StepContext {
    StepContext {
        engine: ctx.engine.clone(),
        registry: ctx.registry.clone(),
        network: ctx.network,
        config: ctx.config.clone(),
    }
}

/// Deploy the full market, activate its reserves and wire price sources.
pub async fn deploy(ctx: &TaskContext) -> Result<()> {
    let report = steps::market_steps().run(&step_context(ctx)).await?;
    info!(
        deployed = report.deployed.len(),
        reused = report.reused.len(),
        "Market contracts in place"
    );

    add_atokens(ctx).await?;

    // Point the market oracle at the configured aggregators.
    let oracle = market_oracle(ctx);
    let aggregators = ctx.config.aggregators(ctx.network);
    if aggregators.is_empty() {
        warn!(network = %ctx.network, "No aggregators configured; skipping oracle wiring");
        return Ok(());
    }

    let assets_by_symbol = ctx.config.reserve_assets(ctx.network);
    let mut assets = Vec::with_capacity(aggregators.len());
    let mut sources = Vec::with_capacity(aggregators.len());
    for (symbol, source) in &aggregators {
        let asset = assets_by_symbol
            .get(symbol)
            .with_context(|| format!("aggregator '{symbol}' has no reserve asset"))?;
        assets.push(*asset);
        sources.push(*source);
    }
    oracle.set_asset_sources(ctx.deployer, &assets, &sources)?;
    for (asset, source) in assets.iter().zip(&sources) {
        ctx.engine.set_asset_source(*asset, *source)?;
    }

    let fallback_address = ctx.registry.get(FALLBACK_ORACLE_ID, ctx.network)?;
    oracle.set_fallback_oracle(ctx.deployer, Arc::new(FallbackOracle::new(fallback_address)))?;

    info!(sources = assets.len(), "Oracle wired");
    Ok(())
}

/// Activate every configured reserve not already live on the market.
pub async fn add_atokens(ctx: &TaskContext) -> Result<()> {
    let treasury = ctx.registry.get(TREASURY_PROXY_ID, ctx.network)?;
    let incentives = ctx.registry.get(INCENTIVES_PROXY_ID, ctx.network)?;

    let initializer = ReserveInitializer::new(ctx.engine.clone());
    let outcome = initializer
        .initialize(
            &ctx.config,
            ctx.network,
            &ctx.config.prefixes,
            treasury,
            incentives,
        )
        .await?;

    info!(
        activated = ?outcome.activated,
        skipped = ?outcome.skipped,
        "Reserve activation finished"
    );
    Ok(())
}

/// Delist one reserve by its underlying address.
pub async fn remove_atokens(ctx: &TaskContext, asset: Address) -> Result<()> {
    ctx.acl.require(ctx.deployer, Capability::ListAssets)?;
    ctx.engine.drop_reserve(asset).await?;
    Ok(())
}

/// Emergency pause switch options.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedButton {
    pub enable: bool,
    pub disable: bool,
    /// Limit the action to one reserve instead of the whole pool.
    pub asset: Option<Address>,
}

/// Pause or unpause the pool (or one reserve). Exactly one of
/// `--enable`/`--disable` must be given; anything else is a no-op.
pub async fn red_button(ctx: &TaskContext, options: RedButton) -> Result<()> {
    let paused = match (options.enable, options.disable) {
        (true, false) => true,
        (false, true) => false,
        _ => {
            warn!("red-button needs exactly one of --enable or --disable; doing nothing");
            return Ok(());
        }
    };

    ctx.acl.require(ctx.deployer, Capability::Emergency)?;

    match options.asset {
        Some(asset) => {
            ctx.engine.set_reserve_pause(asset, paused).await?;
            info!(asset = %asset, paused, "Reserve pause updated");
        }
        None => {
            ctx.engine.set_pool_pause(paused).await?;
            info!(paused, "Pool pause updated");
        }
    }
    Ok(())
}

/// Mock price per symbol, in base-currency units.
fn mock_price(symbol: &str, unit: U256) -> U256 {
    match symbol {
        "DAI" | "USDC" => unit,
        "WETH" => unit * U256::from(2500u64),
        "AAVE" => unit * U256::from(80u64),
        _ => unit,
    }
}

/// Seed the fallback oracle with mock prices for every configured asset.
/// Used on development networks where no aggregator answers.
pub async fn seed_fallback_prices(ctx: &TaskContext) -> Result<()> {
    let fallback_address = ctx.registry.get(FALLBACK_ORACLE_ID, ctx.network)?;
    let fallback = Arc::new(FallbackOracle::new(fallback_address));

    let unit = ctx.config.base_currency.unit;
    let assets = ctx.config.reserve_assets(ctx.network);
    for (symbol, asset) in &assets {
        let price = mock_price(symbol, unit);
        fallback.set_asset_price(*asset, price);
        ctx.engine.set_fallback_price(*asset, price)?;
    }

    let oracle = market_oracle(ctx);
    oracle.set_fallback_oracle(ctx.deployer, fallback)?;

    info!(prices = assets.len(), fallback = %fallback_address, "Fallback prices seeded");
    Ok(())
}

/// Print the registered deployments and the live reserve states.
pub async fn status(ctx: &TaskContext) -> Result<()> {
    println!("Deployments on {}:", ctx.network);
    for (id, record) in ctx.registry.records(ctx.network) {
        println!("  {id:<28} {} ({})", record.address, record.artifact);
    }

    let oracle = market_oracle(ctx);
    println!("Reserves:");
    for reserve in ctx.engine.list_reserves().await? {
        let price = match oracle.get_asset_price(reserve.underlying) {
            Ok(price) => price.to_string(),
            Err(_) => "-".to_string(),
        };
        println!(
            "  {:<8} {} active={} paused={} price={price}",
            reserve.symbol, reserve.underlying, reserve.active, reserve.paused
        );
    }
    Ok(())
}

/// Oracle view over the persisted chain state: source assignments and the
/// fallback price book recorded by earlier invocations are rehydrated so
/// every task sees the same wiring.
fn market_oracle(ctx: &TaskContext) -> PriceOracle {
    let oracle = PriceOracle::new(
        ctx.engine.clone(),
        ctx.acl.clone(),
        ctx.config.base_currency_address(ctx.network),
        ctx.config.base_currency.unit,
    );
    oracle.restore_sources(ctx.engine.asset_sources());

    if let Ok(fallback_address) = ctx.registry.get(FALLBACK_ORACLE_ID, ctx.network) {
        let fallback = Arc::new(FallbackOracle::new(fallback_address));
        for (asset, price) in ctx.engine.fallback_prices() {
            fallback.set_asset_price(asset, price);
        }
        oracle.restore_fallback(fallback);
    }
    oracle
}
