//! Role-based authorization for administrative calls.
//!
//! All admin operations go through one gate, [`AccessControlList::require`],
//! against a fixed role-to-capability table. The two admin capabilities
//! (asset listing vs. risk) are distinct and cannot drift apart across call
//! sites.

use crate::error::DeployError;
use alloy::primitives::Address;
use dashmap::DashMap;
use std::collections::HashSet;
use std::fmt;

/// Granted roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Full market administration.
    PoolAdmin,
    /// May list assets and manage their price sources.
    AssetListingAdmin,
    /// May change risk settings such as the oracle grace period.
    RiskAdmin,
    /// May pause and unpause reserves.
    EmergencyAdmin,
}

/// Capabilities checked by admin operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Register price sources or replace the fallback oracle.
    ListAssets,
    /// Change risk parameters (stricter than asset listing).
    ManageRisk,
    /// Pause or unpause reserves and the pool.
    Emergency,
}

impl Capability {
    /// Roles granted this capability. PoolAdmin holds everything.
    pub fn granted_to(&self) -> &'static [Role] {
        match self {
            Self::ListAssets => &[Role::PoolAdmin, Role::AssetListingAdmin],
            Self::ManageRisk => &[Role::PoolAdmin, Role::RiskAdmin],
            Self::Emergency => &[Role::PoolAdmin, Role::EmergencyAdmin],
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListAssets => write!(f, "asset-listing-or-pool-admin"),
            Self::ManageRisk => write!(f, "risk-or-pool-admin"),
            Self::Emergency => write!(f, "emergency-or-pool-admin"),
        }
    }
}

/// Address to role grants, shared by every admin surface.
#[derive(Debug, Default)]
pub struct AccessControlList {
    grants: DashMap<Address, HashSet<Role>>,
}

impl AccessControlList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role to an address.
    pub fn grant(&self, who: Address, role: Role) {
        self.grants.entry(who).or_default().insert(role);
        tracing::debug!(who = %who, role = ?role, "Granted role");
    }

    /// Revoke a role from an address.
    pub fn revoke(&self, who: Address, role: Role) {
        if let Some(mut roles) = self.grants.get_mut(&who) {
            roles.remove(&role);
        }
    }

    /// Whether an address holds a specific role.
    pub fn holds(&self, who: Address, role: Role) -> bool {
        self.grants
            .get(&who)
            .is_some_and(|roles| roles.contains(&role))
    }

    /// The single authorization gate: succeeds when the caller holds any
    /// role that grants the capability.
    pub fn require(&self, caller: Address, capability: Capability) -> Result<(), DeployError> {
        let authorized = capability
            .granted_to()
            .iter()
            .any(|role| self.holds(caller, *role));

        if authorized {
            Ok(())
        } else {
            Err(DeployError::Unauthorized {
                caller,
                required: capability,
            })
        }
    }
}
