//! Execution engine seams.
//!
//! The orchestration core treats "deploy a contract" and "send a
//! transaction" as opaque external calls with an address result and a
//! success/failure outcome. [`DeployEngine`] is that seam; [`PriceFeed`] is
//! the equivalent seam for reading price-source rounds. The in-tree
//! implementation is [`crate::SimEngine`]; an RPC-backed engine plugs into
//! the same traits.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use deployer_core::{DeployError, ReserveInitInput};

/// One listed reserve as reported by the target system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveStatus {
    pub symbol: String,
    pub underlying: Address,
    pub active: bool,
    pub paused: bool,
}

/// Opaque deployment and market-administration calls.
#[async_trait]
pub trait DeployEngine: Send + Sync {
    /// Deploy an artifact, returning its address. Each call settles before
    /// the caller proceeds.
    async fn deploy(&self, artifact: &str) -> Result<Address, DeployError>;

    /// Activate all reserves in one batched call. Either every reserve in
    /// the batch becomes active or none does.
    async fn init_reserves(&self, inputs: &[ReserveInitInput]) -> Result<(), DeployError>;

    /// Delist one reserve.
    async fn drop_reserve(&self, asset: Address) -> Result<(), DeployError>;

    /// Pause or unpause one reserve.
    async fn set_reserve_pause(&self, asset: Address, paused: bool) -> Result<(), DeployError>;

    /// Pause or unpause every reserve in the pool.
    async fn set_pool_pause(&self, paused: bool) -> Result<(), DeployError>;

    /// Whether a reserve is listed and active for this underlying.
    async fn is_reserve_active(&self, asset: Address) -> Result<bool, DeployError>;

    /// Whether a reserve is currently paused. Fails if the asset is not
    /// listed.
    async fn is_reserve_paused(&self, asset: Address) -> Result<bool, DeployError>;

    /// All listed reserves.
    async fn list_reserves(&self) -> Result<Vec<ReserveStatus>, DeployError>;
}

/// Latest reading from a registered price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    /// Last reported value; zero means the source is unusable.
    pub answer: U256,
    /// Unix seconds of the last update.
    pub updated_at: u64,
}

/// Read-only access to price-source rounds. Queries are independent and
/// safe to issue concurrently from many readers.
pub trait PriceFeed: Send + Sync {
    /// Latest round for a source address, `None` when the source has never
    /// reported.
    fn latest_round(&self, source: Address) -> Result<Option<RoundData>, DeployError>;
}
