//! Error taxonomy for configuration, deployment and price resolution.
//!
//! Configuration and dependency errors abort an entire run; admin-call
//! shape and authorization errors are rejected with no state change; price
//! resolution failures propagate to the caller instead of being masked as
//! a zero price.

use crate::acl::Capability;
use crate::network::Network;
use alloy::primitives::Address;
use thiserror::Error;

/// Unified error type for the deployment workspace.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Unknown market id passed to the config resolver.
    #[error("unknown market id '{0}'")]
    ConfigNotFound(String),

    /// A market template or override file failed load-time validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No deployment record exists for the logical id on this network.
    #[error("no deployment record for '{id}' on network '{network}'")]
    NotFound { id: String, network: Network },

    /// A pipeline step's declared prerequisite is not in the registry.
    #[error("step '{step}' requires '{dependency}', which is not registered on network '{network}'")]
    DependencyMissing {
        step: String,
        dependency: String,
        network: Network,
    },

    /// A pipeline step failed; completed registrations remain valid.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<DeployError>,
    },

    /// A reserve symbol is present in only one of the config/address maps.
    #[error("reserve '{symbol}' is missing from {side} for the target network")]
    AssetAddressMismatch { symbol: String, side: MismatchSide },

    /// Parallel arrays on an admin call differ in length.
    #[error("inconsistent parameters: {assets} assets vs {sources} sources")]
    InconsistentParams { assets: usize, sources: usize },

    /// Caller does not hold the capability required by an admin call.
    #[error("caller {caller} lacks the {required} capability")]
    Unauthorized {
        caller: Address,
        required: Capability,
    },

    /// No usable price source for the asset (none registered, zero answer,
    /// or outside the grace period) and no fallback price is set.
    #[error("no usable price source for asset {asset}")]
    StalePrice { asset: Address },

    /// Another run holds the per-network registry lock.
    #[error("deployment lock for network '{network}' is held by another run")]
    LockHeld { network: Network },

    /// Opaque failure from the external deploy/transaction engine.
    #[error("engine call failed: {0}")]
    Engine(String),

    /// Registry storage I/O failure.
    #[error("registry storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A persisted registry record could not be decoded.
    #[error("malformed registry record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Which side of the config/address zip is missing a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchSide {
    /// The symbol has risk params but no on-chain address for the network.
    ReserveAssets,
    /// The network address book names a symbol with no risk params.
    ReservesConfig,
}

impl std::fmt::Display for MismatchSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReserveAssets => write!(f, "ReserveAssets"),
            Self::ReservesConfig => write!(f, "ReservesConfig"),
        }
    }
}

impl DeployError {
    /// Wrap an error with the id of the pipeline step that raised it.
    pub fn in_step(self, step: impl Into<String>) -> Self {
        Self::StepFailed {
            step: step.into(),
            source: Box::new(self),
        }
    }
}
