//! Market price oracle with fallback and staleness policy.
//!
//! Every asset maps to at most one price source. Reads walk a fixed
//! ladder: the base currency short-circuits to its configured unit, a
//! live source wins when its answer is non-zero and recent enough, the
//! fallback oracle covers gaps, and when nothing usable remains the read
//! fails rather than returning a guess. Administration is gated on the
//! market access-control list and every successful change is broadcast to
//! subscribers.

use crate::engine::PriceFeed;
use crate::sim::unix_now;
use alloy::primitives::{Address, U256};
use dashmap::DashMap;
use deployer_core::{AccessControlList, Capability, DeployError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Change notifications emitted by the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleEvent {
    AssetSourceUpdated { asset: Address, source: Address },
    FallbackOracleUpdated { oracle: Address },
    GracePeriodUpdated { seconds: u64 },
}

/// Directly-administered price store used when live sources cannot answer.
pub struct FallbackOracle {
    address: Address,
    prices: DashMap<Address, U256>,
}

impl FallbackOracle {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            prices: DashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Set the quoted price for an asset. Zero clears it.
    pub fn set_asset_price(&self, asset: Address, price: U256) {
        debug!(asset = %asset, price = %price, "Fallback price set");
        self.prices.insert(asset, price);
    }

    pub fn price(&self, asset: Address) -> Option<U256> {
        self.prices.get(&asset).map(|p| *p)
    }
}

/// Asset → source price oracle.
pub struct PriceOracle {
    feed: Arc<dyn PriceFeed>,
    acl: Arc<AccessControlList>,
    sources: DashMap<Address, Address>,
    fallback: RwLock<Option<Arc<FallbackOracle>>>,
    base_currency: Address,
    base_currency_unit: U256,
    /// Max age in seconds for a live answer; zero disables the check.
    grace_period: AtomicU64,
    events: broadcast::Sender<OracleEvent>,
}

impl PriceOracle {
    pub fn new(
        feed: Arc<dyn PriceFeed>,
        acl: Arc<AccessControlList>,
        base_currency: Address,
        base_currency_unit: U256,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            feed,
            acl,
            sources: DashMap::new(),
            fallback: RwLock::new(None),
            base_currency,
            base_currency_unit,
            grace_period: AtomicU64::new(0),
            events,
        }
    }

    /// Listen for configuration changes.
    pub fn subscribe(&self) -> broadcast::Receiver<OracleEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: OracleEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Registered source for an asset, if any.
    pub fn source_of(&self, asset: Address) -> Option<Address> {
        self.sources.get(&asset).map(|s| *s)
    }

    /// Rehydrate source assignments from persisted oracle state. Not an
    /// admin path: no capability check and no events.
    pub fn restore_sources(&self, pairs: impl IntoIterator<Item = (Address, Address)>) {
        for (asset, source) in pairs {
            self.sources.insert(asset, source);
        }
    }

    /// Rehydrate the fallback oracle from persisted state, silently.
    pub fn restore_fallback(&self, fallback: Arc<FallbackOracle>) {
        *self.fallback.write() = Some(fallback);
    }

    /// Current staleness bound in seconds; zero means disabled.
    pub fn grace_period(&self) -> u64 {
        self.grace_period.load(Ordering::SeqCst)
    }

    /// Map assets to price sources pairwise. Callers need asset-listing
    /// rights; a length mismatch rejects the whole update.
    pub fn set_asset_sources(
        &self,
        caller: Address,
        assets: &[Address],
        sources: &[Address],
    ) -> Result<(), DeployError> {
        self.acl.require(caller, Capability::ListAssets)?;

        if assets.len() != sources.len() {
            return Err(DeployError::InconsistentParams {
                assets: assets.len(),
                sources: sources.len(),
            });
        }

        for (asset, source) in assets.iter().zip(sources) {
            self.sources.insert(*asset, *source);
            self.emit(OracleEvent::AssetSourceUpdated {
                asset: *asset,
                source: *source,
            });
        }

        info!(count = assets.len(), "Updated asset price sources");
        Ok(())
    }

    /// Replace the fallback oracle.
    pub fn set_fallback_oracle(
        &self,
        caller: Address,
        fallback: Arc<FallbackOracle>,
    ) -> Result<(), DeployError> {
        self.acl.require(caller, Capability::ListAssets)?;

        let address = fallback.address();
        *self.fallback.write() = Some(fallback);
        self.emit(OracleEvent::FallbackOracleUpdated { oracle: address });

        info!(oracle = %address, "Fallback oracle updated");
        Ok(())
    }

    /// Set the staleness bound for live answers. Zero disables it.
    pub fn set_grace_period(&self, caller: Address, seconds: u64) -> Result<(), DeployError> {
        self.acl.require(caller, Capability::ManageRisk)?;

        self.grace_period.store(seconds, Ordering::SeqCst);
        self.emit(OracleEvent::GracePeriodUpdated { seconds });

        info!(seconds, "Price grace period updated");
        Ok(())
    }

    fn fresh_enough(&self, updated_at: u64) -> bool {
        let grace = self.grace_period();
        grace == 0 || unix_now().saturating_sub(updated_at) <= grace
    }

    /// Price of an asset in the base currency.
    ///
    /// The base currency itself always answers with its unit, regardless
    /// of any registered source. Otherwise the live source answers when
    /// its value is non-zero and within the grace period, then the
    /// fallback, and a read with no usable value fails with `StalePrice`.
    pub fn get_asset_price(&self, asset: Address) -> Result<U256, DeployError> {
        if asset == self.base_currency {
            return Ok(self.base_currency_unit);
        }

        if let Some(source) = self.source_of(asset) {
            match self.feed.latest_round(source)? {
                Some(round) if !round.answer.is_zero() && self.fresh_enough(round.updated_at) => {
                    return Ok(round.answer);
                }
                Some(round) => {
                    debug!(
                        asset = %asset,
                        answer = %round.answer,
                        updated_at = round.updated_at,
                        "Live answer unusable; consulting fallback"
                    );
                }
                None => {
                    debug!(asset = %asset, source = %source, "Source has never reported");
                }
            }
        }

        if let Some(fallback) = self.fallback.read().as_ref() {
            if let Some(price) = fallback.price(asset) {
                if !price.is_zero() {
                    return Ok(price);
                }
            }
        }

        warn!(asset = %asset, "No usable price");
        Err(DeployError::StalePrice { asset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimEngine;
    use deployer_core::Role;

    const BASE_UNIT: u64 = 100_000_000;

    fn admin() -> Address {
        Address::repeat_byte(0xAD)
    }

    fn oracle() -> (Arc<SimEngine>, PriceOracle) {
        let engine = Arc::new(SimEngine::new());
        let acl = Arc::new(AccessControlList::new());
        acl.grant(admin(), Role::PoolAdmin);
        let oracle = PriceOracle::new(
            engine.clone(),
            acl,
            Address::repeat_byte(0xBC),
            U256::from(BASE_UNIT),
        );
        (engine, oracle)
    }

    #[tokio::test]
    async fn test_base_currency_ignores_sources() {
        let (engine, oracle) = oracle();
        let base = Address::repeat_byte(0xBC);
        let source = Address::repeat_byte(1);
        engine.set_round(source, U256::from(42u64), unix_now());
        oracle
            .set_asset_sources(admin(), &[base], &[source])
            .unwrap();

        assert_eq!(oracle.get_asset_price(base).unwrap(), U256::from(BASE_UNIT));
    }

    #[tokio::test]
    async fn test_live_answer_wins_over_fallback() {
        let (engine, oracle) = oracle();
        let asset = Address::repeat_byte(2);
        let source = Address::repeat_byte(3);
        engine.set_round(source, U256::from(2500u64), unix_now());
        oracle
            .set_asset_sources(admin(), &[asset], &[source])
            .unwrap();

        let fallback = Arc::new(FallbackOracle::new(Address::repeat_byte(4)));
        fallback.set_asset_price(asset, U256::from(12u64));
        oracle.set_fallback_oracle(admin(), fallback).unwrap();

        assert_eq!(oracle.get_asset_price(asset).unwrap(), U256::from(2500u64));
    }

    #[tokio::test]
    async fn test_zero_answer_falls_back() {
        let (engine, oracle) = oracle();
        let asset = Address::repeat_byte(2);
        let source = Address::repeat_byte(3);
        engine.set_round(source, U256::ZERO, unix_now());
        oracle
            .set_asset_sources(admin(), &[asset], &[source])
            .unwrap();

        let fallback = Arc::new(FallbackOracle::new(Address::repeat_byte(4)));
        fallback.set_asset_price(asset, U256::from(12u64));
        oracle.set_fallback_oracle(admin(), fallback).unwrap();

        assert_eq!(oracle.get_asset_price(asset).unwrap(), U256::from(12u64));
    }

    #[tokio::test]
    async fn test_no_source_uses_fallback() {
        let (_engine, oracle) = oracle();
        let asset = Address::repeat_byte(5);

        let fallback = Arc::new(FallbackOracle::new(Address::repeat_byte(4)));
        fallback.set_asset_price(asset, U256::from(12u64));
        oracle.set_fallback_oracle(admin(), fallback).unwrap();

        assert_eq!(oracle.get_asset_price(asset).unwrap(), U256::from(12u64));
    }

    #[tokio::test]
    async fn test_no_source_no_fallback_is_stale() {
        let (_engine, oracle) = oracle();
        let asset = Address::repeat_byte(5);

        assert!(matches!(
            oracle.get_asset_price(asset),
            Err(DeployError::StalePrice { asset: a }) if a == asset
        ));
    }

    #[tokio::test]
    async fn test_zero_answer_no_fallback_is_stale() {
        let (engine, oracle) = oracle();
        let asset = Address::repeat_byte(2);
        let source = Address::repeat_byte(3);
        engine.set_round(source, U256::ZERO, unix_now());
        oracle
            .set_asset_sources(admin(), &[asset], &[source])
            .unwrap();

        assert!(matches!(
            oracle.get_asset_price(asset),
            Err(DeployError::StalePrice { .. })
        ));
    }

    #[tokio::test]
    async fn test_grace_period_rejects_old_answers() {
        let (engine, oracle) = oracle();
        let asset = Address::repeat_byte(2);
        let source = Address::repeat_byte(3);
        engine.set_round(source, U256::from(2500u64), unix_now() - 3600);
        oracle
            .set_asset_sources(admin(), &[asset], &[source])
            .unwrap();

        // Disabled grace period accepts any age.
        assert_eq!(oracle.get_asset_price(asset).unwrap(), U256::from(2500u64));

        oracle.set_grace_period(admin(), 60).unwrap();
        assert!(matches!(
            oracle.get_asset_price(asset),
            Err(DeployError::StalePrice { .. })
        ));

        // A fresh answer passes again.
        engine.set_round(source, U256::from(2600u64), unix_now());
        assert_eq!(oracle.get_asset_price(asset).unwrap(), U256::from(2600u64));
    }

    #[tokio::test]
    async fn test_unauthorized_update_changes_nothing() {
        let (_engine, oracle) = oracle();
        let intruder = Address::repeat_byte(0x66);
        let asset = Address::repeat_byte(2);

        let err = oracle
            .set_asset_sources(intruder, &[asset], &[Address::repeat_byte(3)])
            .unwrap_err();
        assert!(matches!(err, DeployError::Unauthorized { .. }));
        assert!(oracle.source_of(asset).is_none());

        let err = oracle.set_grace_period(intruder, 60).unwrap_err();
        assert!(matches!(err, DeployError::Unauthorized { .. }));
        assert_eq!(oracle.grace_period(), 0);
    }

    #[tokio::test]
    async fn test_length_mismatch_rejects_whole_update() {
        let (_engine, oracle) = oracle();
        let assets = [Address::repeat_byte(1), Address::repeat_byte(2)];
        let sources = [Address::repeat_byte(3)];

        let err = oracle
            .set_asset_sources(admin(), &assets, &sources)
            .unwrap_err();
        assert!(matches!(
            err,
            DeployError::InconsistentParams {
                assets: 2,
                sources: 1
            }
        ));
        assert!(oracle.source_of(assets[0]).is_none());
    }

    #[tokio::test]
    async fn test_restored_wiring_resolves_prices_without_events() {
        let (engine, oracle) = oracle();
        let mut events = oracle.subscribe();

        let asset = Address::repeat_byte(2);
        let source = Address::repeat_byte(3);
        engine.set_round(source, U256::from(2500u64), unix_now());
        oracle.restore_sources([(asset, source)]);

        let seeded = Address::repeat_byte(5);
        let fallback = Arc::new(FallbackOracle::new(Address::repeat_byte(4)));
        fallback.set_asset_price(seeded, U256::from(12u64));
        oracle.restore_fallback(fallback);

        // Rehydration needs no capability and notifies nobody.
        assert_eq!(oracle.get_asset_price(asset).unwrap(), U256::from(2500u64));
        assert_eq!(oracle.get_asset_price(seeded).unwrap(), U256::from(12u64));
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let (_engine, oracle) = oracle();
        let mut events = oracle.subscribe();

        let asset = Address::repeat_byte(2);
        let source = Address::repeat_byte(3);
        oracle
            .set_asset_sources(admin(), &[asset], &[source])
            .unwrap();
        oracle.set_grace_period(admin(), 120).unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            OracleEvent::AssetSourceUpdated { asset, source }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            OracleEvent::GracePeriodUpdated { seconds: 120 }
        );
    }
}
