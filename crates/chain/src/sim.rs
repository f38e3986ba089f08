//! In-memory execution environment.
//!
//! `SimEngine` stands in for a real chain behind the [`DeployEngine`],
//! [`PriceFeed`] and [`FixtureManager`] seams: deterministic contract
//! addresses, atomic batched reserve activation, pause flags and
//! price-feed rounds. State can optionally be persisted to a JSON file so
//! consecutive CLI invocations operate on the same simulated market.

use crate::engine::{DeployEngine, PriceFeed, ReserveStatus, RoundData};
use crate::fixture::{FixtureManager, SnapshotToken};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use deployer_core::{DeployError, ReserveInitInput};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Unix seconds now.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReserveState {
    symbol: String,
    active: bool,
    paused: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredRound {
    answer: U256,
    updated_at: u64,
}

/// Full simulated chain state. Cloneable so snapshots are plain copies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChainState {
    next_contract: u64,
    /// address → artifact name.
    contracts: BTreeMap<Address, String>,
    /// underlying → reserve state.
    reserves: BTreeMap<Address, ReserveState>,
    /// source → latest round.
    feeds: BTreeMap<Address, StoredRound>,
    /// asset → registered price source.
    #[serde(default)]
    sources: BTreeMap<Address, Address>,
    /// asset → manually-set fallback price.
    #[serde(default)]
    fallback_prices: BTreeMap<Address, U256>,
}

/// Simulated execution engine.
pub struct SimEngine {
    state: Mutex<ChainState>,
    snapshots: Mutex<HashMap<u64, ChainState>>,
    next_token: AtomicU64,
    persist_path: Option<PathBuf>,
}

impl SimEngine {
    /// Fresh, non-persistent engine.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState::default()),
            snapshots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            persist_path: None,
        }
    }

    /// Engine backed by a JSON state file; loads existing state if the
    /// file is present.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let path = path.into();
        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            ChainState::default()
        };

        info!(path = %path.display(), contracts = state.contracts.len(), "Simulated chain loaded");

        Ok(Self {
            state: Mutex::new(state),
            snapshots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
            persist_path: Some(path),
        })
    }

    fn save(&self, state: &ChainState) -> Result<(), DeployError> {
        if let Some(path) = &self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(state)?)?;
        }
        Ok(())
    }

    /// Set the latest round for a price source.
    pub fn set_round(&self, source: Address, answer: U256, updated_at: u64) {
        let mut state = self.state.lock();
        state.feeds.insert(source, StoredRound { answer, updated_at });
    }

    /// Record an asset's price-source assignment in chain state, so oracle
    /// wiring survives across invocations.
    pub fn set_asset_source(&self, asset: Address, source: Address) -> Result<(), DeployError> {
        let mut state = self.state.lock();
        state.sources.insert(asset, source);
        self.save(&state)
    }

    /// All recorded asset → source assignments.
    pub fn asset_sources(&self) -> Vec<(Address, Address)> {
        self.state
            .lock()
            .sources
            .iter()
            .map(|(asset, source)| (*asset, *source))
            .collect()
    }

    /// Record a fallback price for an asset in chain state.
    pub fn set_fallback_price(&self, asset: Address, price: U256) -> Result<(), DeployError> {
        let mut state = self.state.lock();
        state.fallback_prices.insert(asset, price);
        self.save(&state)
    }

    /// All recorded fallback prices.
    pub fn fallback_prices(&self) -> Vec<(Address, U256)> {
        self.state
            .lock()
            .fallback_prices
            .iter()
            .map(|(asset, price)| (*asset, *price))
            .collect()
    }

    /// Artifact name deployed at an address, if any.
    pub fn artifact_at(&self, address: Address) -> Option<String> {
        self.state.lock().contracts.get(&address).cloned()
    }

    fn next_address(state: &mut ChainState) -> Address {
        state.next_contract += 1;
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&state.next_contract.to_be_bytes());
        Address::from(bytes)
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeployEngine for SimEngine {
    async fn deploy(&self, artifact: &str) -> Result<Address, DeployError> {
        let mut state = self.state.lock();
        let address = Self::next_address(&mut state);
        state.contracts.insert(address, artifact.to_string());
        self.save(&state)?;

        debug!(artifact, address = %address, "Deployed artifact");
        Ok(address)
    }

    async fn init_reserves(&self, inputs: &[ReserveInitInput]) -> Result<(), DeployError> {
        let mut state = self.state.lock();

        // Validate the whole batch before touching anything; a failed
        // batch activates no reserves.
        for input in inputs {
            if input.underlying.is_zero() {
                return Err(DeployError::Engine(format!(
                    "reserve '{}' has a zero underlying address",
                    input.symbol
                )));
            }
            if state.reserves.contains_key(&input.underlying) {
                return Err(DeployError::Engine(format!(
                    "reserve '{}' is already initialized",
                    input.symbol
                )));
            }
        }

        for input in inputs {
            state.reserves.insert(
                input.underlying,
                ReserveState {
                    symbol: input.symbol.clone(),
                    active: true,
                    paused: false,
                },
            );
        }
        self.save(&state)?;

        info!(count = inputs.len(), "Activated reserve batch");
        Ok(())
    }

    async fn drop_reserve(&self, asset: Address) -> Result<(), DeployError> {
        let mut state = self.state.lock();
        let removed = state
            .reserves
            .remove(&asset)
            .ok_or_else(|| DeployError::Engine(format!("asset {asset} is not a listed reserve")))?;
        self.save(&state)?;

        info!(symbol = %removed.symbol, asset = %asset, "Dropped reserve");
        Ok(())
    }

    async fn set_reserve_pause(&self, asset: Address, paused: bool) -> Result<(), DeployError> {
        let mut state = self.state.lock();
        let reserve = state
            .reserves
            .get_mut(&asset)
            .ok_or_else(|| DeployError::Engine(format!("asset {asset} is not a listed reserve")))?;
        reserve.paused = paused;
        self.save(&state)?;
        Ok(())
    }

    async fn set_pool_pause(&self, paused: bool) -> Result<(), DeployError> {
        let mut state = self.state.lock();
        for reserve in state.reserves.values_mut() {
            reserve.paused = paused;
        }
        self.save(&state)?;

        info!(paused, "Set pause on every reserve");
        Ok(())
    }

    async fn is_reserve_active(&self, asset: Address) -> Result<bool, DeployError> {
        Ok(self
            .state
            .lock()
            .reserves
            .get(&asset)
            .is_some_and(|r| r.active))
    }

    async fn is_reserve_paused(&self, asset: Address) -> Result<bool, DeployError> {
        self.state
            .lock()
            .reserves
            .get(&asset)
            .map(|r| r.paused)
            .ok_or_else(|| DeployError::Engine(format!("asset {asset} is not a listed reserve")))
    }

    async fn list_reserves(&self) -> Result<Vec<ReserveStatus>, DeployError> {
        Ok(self
            .state
            .lock()
            .reserves
            .iter()
            .map(|(underlying, r)| ReserveStatus {
                symbol: r.symbol.clone(),
                underlying: *underlying,
                active: r.active,
                paused: r.paused,
            })
            .collect())
    }
}

impl PriceFeed for SimEngine {
    fn latest_round(&self, source: Address) -> Result<Option<RoundData>, DeployError> {
        Ok(self.state.lock().feeds.get(&source).map(|r| RoundData {
            answer: r.answer,
            updated_at: r.updated_at,
        }))
    }
}

impl FixtureManager for SimEngine {
    fn snapshot(&self) -> Result<SnapshotToken, DeployError> {
        let state = self.state.lock().clone();
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.snapshots.lock().insert(token, state);

        debug!(token, "Captured chain snapshot");
        Ok(SnapshotToken(token))
    }

    fn restore(&self, token: SnapshotToken) -> Result<(), DeployError> {
        let captured = self
            .snapshots
            .lock()
            .get(&token.0)
            .cloned()
            .ok_or_else(|| DeployError::Engine(format!("unknown snapshot token {}", token.0)))?;

        let mut state = self.state.lock();
        *state = captured;
        self.save(&state)?;

        debug!(token = token.0, "Restored chain snapshot");
        Ok(())
    }
}
