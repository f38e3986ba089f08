//! Deployment and market-administration layer.
//!
//! This crate provides:
//! - A durable per-network deployment registry with idempotent ids
//! - An ordered deployment pipeline with dependency checks and resume
//! - Concrete deployment steps for a full lending market
//! - Batched reserve activation against a resolved configuration
//! - A price oracle with fallback ladder, grace period and events
//! - Snapshot/restore fixtures for isolated test suites
//! - An in-memory engine standing in for a live chain
//!
//! Execution substrates plug in behind the [`DeployEngine`], [`PriceFeed`]
//! and [`FixtureManager`] traits.

pub mod deploy_ids;
mod engine;
mod fixture;
pub mod oracle;
mod pipeline;
mod registry;
mod reserves;
mod sim;
pub mod steps;

pub use engine::{DeployEngine, PriceFeed, ReserveStatus, RoundData};
pub use fixture::{FixtureGuard, FixtureManager, SnapshotToken};
pub use oracle::{FallbackOracle, OracleEvent, PriceOracle};
pub use pipeline::{DeployStep, DeploymentPipeline, RunReport, StepContext};
pub use registry::{DeploymentRecord, DeploymentRegistry, RunLockGuard};
pub use reserves::{BatchResult, ReserveInitializer};
pub use sim::{unix_now, SimEngine};
