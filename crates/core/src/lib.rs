//! Deployment domain model.
//!
//! This crate provides the pure side of the market deployer:
//! - Market configuration templates and their resolver
//! - Per-deployment TOML address overrides, validated at load time
//! - Reserve-activation input derivation (the config/address zip)
//! - Network identity with fork override
//! - Role-based authorization table shared by all admin surfaces
//! - The error taxonomy used across the workspace
//!
//! Everything effectful (registries, pipelines, engines, oracles) lives in
//! `deployer-chain`.

pub mod acl;
pub mod config;
mod error;
mod network;
pub mod resolver;

pub use acl::{AccessControlList, Capability, Role};
pub use config::{
    build_reserve_init_inputs, BaseCurrency, EModeCategory, MarketConfiguration,
    RateStrategyParams, ReserveInitInput, ReserveParams, TokenNamePrefixes,
};
pub use error::{DeployError, MismatchSide};
pub use network::{Network, NetworkContext, FORK_ENV};
pub use resolver::{resolve, resolve_with_overrides, MARKET_NAME_ENV};
