//! Lending-market deployment CLI.
//!
//! Drives the full deployment pipeline and the day-two administration
//! tasks (reserve listing, the emergency red button, fallback price
//! seeding) against a market configuration resolved by name. State lives
//! under a deployments directory so invocations are resumable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deployer_chain::{DeploymentRegistry, SimEngine};
use deployer_core::{resolver, AccessControlList, Network, NetworkContext, Role};

mod tasks;

/// Environment variable names.
mod env {
    pub const NETWORK: &str = "NETWORK";
    pub const MARKET_NAME: &str = "MARKET_NAME";
    pub const MARKET_OVERRIDES: &str = "MARKET_OVERRIDES";
    pub const DEPLOYMENTS_DIR: &str = "DEPLOYMENTS_DIR";
    pub const SIM_STATE: &str = "SIM_STATE";
    pub const DEPLOYER: &str = "DEPLOYER";
}

const USAGE: &str = "\
Usage: market-deployer <task> [options]

Tasks:
  deploy                      Deploy the full market and activate reserves
  add-atokens                 Activate reserves missing from the live market
  remove-atokens <asset>      Delist one reserve by underlying address
  red-button --enable         Pause every reserve (or one with --asset <addr>)
  red-button --disable        Unpause every reserve (or one with --asset <addr>)
  seed-fallback-prices        Push mock prices into the fallback oracle
  status                      Print registered deployments and reserves

Environment:
  NETWORK, MARKET_NAME, MARKET_OVERRIDES, DEPLOYMENTS_DIR, SIM_STATE, DEPLOYER, FORK";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,deployer_core=debug,deployer_chain=debug")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(task) = args.first() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let ctx = build_context()?;
    info!(
        market = %ctx.config.market_id,
        network = %ctx.network,
        forked = ctx.forked,
        task,
        "Running deployment task"
    );

    match task.as_str() {
        "deploy" => tasks::deploy(&ctx).await?,
        "add-atokens" => tasks::add_atokens(&ctx).await?,
        "remove-atokens" => {
            let asset = args
                .get(1)
                .context("remove-atokens needs an underlying asset address")?
                .parse()
                .context("invalid asset address")?;
            tasks::remove_atokens(&ctx, asset).await?;
        }
        "red-button" => {
            let options = parse_red_button(&args[1..])?;
            tasks::red_button(&ctx, options).await?;
        }
        "seed-fallback-prices" => tasks::seed_fallback_prices(&ctx).await?,
        "status" => tasks::status(&ctx).await?,
        other => {
            eprintln!("Unknown task '{other}'\n\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

/// Everything a task needs: the resolved market, the execution engine and
/// the durable registry for the selected network.
pub struct TaskContext {
    pub engine: Arc<SimEngine>,
    pub registry: Arc<DeploymentRegistry>,
    pub acl: Arc<AccessControlList>,
    pub network: Network,
    pub forked: bool,
    pub config: Arc<deployer_core::MarketConfiguration>,
    /// Caller identity for gated administration calls.
    pub deployer: alloy::primitives::Address,
}

fn build_context() -> Result<TaskContext> {
    let detected = match std::env::var(env::NETWORK) {
        Ok(raw) => raw.parse().context("invalid NETWORK")?,
        Err(_) => Network::default(),
    };
    let net_ctx = NetworkContext::resolve(detected)?;

    let market = std::env::var(env::MARKET_NAME).unwrap_or_else(|_| "bob".to_string());
    let config = match std::env::var(env::MARKET_OVERRIDES) {
        Ok(path) => resolver::resolve_with_overrides(&market, net_ctx.network, PathBuf::from(path))?,
        Err(_) => resolver::resolve(&market, net_ctx.network)?,
    };

    let dir = std::env::var(env::DEPLOYMENTS_DIR).unwrap_or_else(|_| "deployments".to_string());
    let state_path = std::env::var(env::SIM_STATE)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(&dir).join("chain-state.json"));

    let deployer = match std::env::var(env::DEPLOYER) {
        Ok(raw) => raw.parse().context("invalid DEPLOYER address")?,
        Err(_) => alloy::primitives::Address::repeat_byte(0x10),
    };
    // The deploying identity administers its own market.
    let acl = Arc::new(AccessControlList::new());
    acl.grant(deployer, Role::PoolAdmin);

    Ok(TaskContext {
        engine: Arc::new(SimEngine::load(state_path)?),
        registry: Arc::new(DeploymentRegistry::new(dir)?),
        acl,
        network: net_ctx.network,
        forked: net_ctx.forked,
        config: Arc::new(config),
        deployer,
    })
}

fn parse_red_button(args: &[String]) -> Result<tasks::RedButton> {
    let mut options = tasks::RedButton::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--enable" => options.enable = true,
            "--disable" => options.disable = true,
            "--asset" => {
                let raw = iter.next().context("--asset needs an address")?;
                options.asset = Some(raw.parse().context("invalid --asset address")?);
            }
            other => bail!("unknown red-button option '{other}'"),
        }
    }
    Ok(options)
}
