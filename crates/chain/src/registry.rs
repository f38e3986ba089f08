//! Durable deployment registry.
//!
//! One append-only record per `(network, logical id)`, persisted as a JSON
//! file per network so a re-run is a continuation rather than a redo.
//! Registration is idempotent: the first address registered for a key wins
//! for the lifetime of the deployment, which prevents re-deploying an
//! artifact with possibly different constructor arguments on a retry.
//!
//! Writers are serialized per process by a mutex over the record maps, and
//! across processes by an advisory per-network lock file taken for the
//! duration of a pipeline run.

use alloy::primitives::Address;
use deployer_core::{DeployError, Network};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A registered deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRecord {
    pub address: Address,
    /// Artifact (ABI) reference for the deployed contract.
    pub artifact: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    address: String,
    artifact: String,
}

/// Durable id → address store, one namespace per network.
pub struct DeploymentRegistry {
    dir: PathBuf,
    networks: Mutex<HashMap<Network, BTreeMap<String, DeploymentRecord>>>,
}

impl DeploymentRegistry {
    /// Open (or create) a registry rooted at `dir`, loading any persisted
    /// records.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let mut networks = HashMap::new();
        for network in Network::all() {
            let records = Self::load_network(&dir, network)?;
            if !records.is_empty() {
                debug!(network = %network, records = records.len(), "Loaded deployment records");
            }
            networks.insert(network, records);
        }

        Ok(Self {
            dir,
            networks: Mutex::new(networks),
        })
    }

    fn file_path(dir: &Path, network: Network) -> PathBuf {
        dir.join(format!("{network}.json"))
    }

    fn load_network(
        dir: &Path,
        network: Network,
    ) -> Result<BTreeMap<String, DeploymentRecord>, DeployError> {
        let path = Self::file_path(dir, network);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let stored: BTreeMap<String, StoredRecord> = serde_json::from_str(&content)?;

        let mut records = BTreeMap::new();
        for (id, record) in stored {
            let address = record.address.parse().map_err(|e| {
                DeployError::InvalidConfig(format!(
                    "record '{id}' on '{network}' has a bad address: {e}"
                ))
            })?;
            records.insert(
                id,
                DeploymentRecord {
                    address,
                    artifact: record.artifact,
                },
            );
        }
        Ok(records)
    }

    fn persist(
        &self,
        network: Network,
        records: &BTreeMap<String, DeploymentRecord>,
    ) -> Result<(), DeployError> {
        let stored: BTreeMap<&str, StoredRecord> = records
            .iter()
            .map(|(id, r)| {
                (
                    id.as_str(),
                    StoredRecord {
                        address: r.address.to_string(),
                        artifact: r.artifact.clone(),
                    },
                )
            })
            .collect();

        let path = Self::file_path(&self.dir, network);
        std::fs::write(path, serde_json::to_string_pretty(&stored)?)?;
        Ok(())
    }

    /// Address registered for a logical id; `NotFound` when absent.
    pub fn get(&self, id: &str, network: Network) -> Result<Address, DeployError> {
        self.lookup(id, network).ok_or_else(|| DeployError::NotFound {
            id: id.to_string(),
            network,
        })
    }

    /// Non-failing lookup.
    pub fn lookup(&self, id: &str, network: Network) -> Option<Address> {
        self.networks
            .lock()
            .get(&network)
            .and_then(|records| records.get(id))
            .map(|r| r.address)
    }

    /// Full record for a logical id.
    pub fn record(&self, id: &str, network: Network) -> Option<DeploymentRecord> {
        self.networks
            .lock()
            .get(&network)
            .and_then(|records| records.get(id))
            .cloned()
    }

    /// Register an address for a logical id. Idempotent: when the key is
    /// already present the existing address is returned and the new one
    /// discarded.
    pub fn register(
        &self,
        id: &str,
        network: Network,
        address: Address,
        artifact: &str,
    ) -> Result<Address, DeployError> {
        let mut networks = self.networks.lock();
        let records = networks.entry(network).or_default();

        if let Some(existing) = records.get(id) {
            if existing.address != address {
                warn!(
                    id,
                    network = %network,
                    existing = %existing.address,
                    discarded = %address,
                    "Logical id already registered; keeping the first address"
                );
            }
            return Ok(existing.address);
        }

        records.insert(
            id.to_string(),
            DeploymentRecord {
                address,
                artifact: artifact.to_string(),
            },
        );
        // Persist while still holding the lock: a racing writer rewriting
        // the file from an older map would drop this record.
        self.persist(network, records)?;
        drop(networks);

        info!(id, network = %network, address = %address, "Registered deployment");
        Ok(address)
    }

    /// Register-if-absent for an external prerequisite: when the id has no
    /// record, `deploy_fn` produces a stand-in artifact which is registered
    /// under the id, and every later lookup resolves to it transparently.
    pub async fn register_or_deploy<F, Fut>(
        &self,
        id: &str,
        network: Network,
        artifact: &str,
        deploy_fn: F,
    ) -> Result<Address, DeployError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Address, DeployError>> + Send,
    {
        if let Some(existing) = self.lookup(id, network) {
            return Ok(existing);
        }

        info!(id, network = %network, artifact, "Prerequisite not configured; deploying stand-in");
        let address = deploy_fn().await?;
        // register() resolves the race if another writer got there first.
        self.register(id, network, address, artifact)
    }

    /// All records for a network.
    pub fn records(&self, network: Network) -> Vec<(String, DeploymentRecord)> {
        self.networks
            .lock()
            .get(&network)
            .map(|records| {
                records
                    .iter()
                    .map(|(id, r)| (id.clone(), r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Take the advisory per-network run lock. Held for the duration of a
    /// pipeline run; a second concurrent run fails with `LockHeld`.
    pub fn run_lock(&self, network: Network) -> Result<RunLockGuard, DeployError> {
        let path = self.dir.join(format!("{network}.lock"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => {
                debug!(network = %network, "Acquired deployment run lock");
                Ok(RunLockGuard { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(DeployError::LockHeld { network })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Holds the per-network run lock; released on drop.
pub struct RunLockGuard {
    path: PathBuf,
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if let Err(error) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), %error, "Failed to release run lock");
        }
    }
}
