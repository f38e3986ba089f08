//! Snapshot/restore isolation boundary for test harnesses.
//!
//! The capability is deliberately abstract: whatever the execution
//! substrate offers (in-memory state copy, transactional rollback, a
//! throwaway sandbox) sits behind [`FixtureManager`]. Harness code takes an
//! explicit [`FixtureGuard`] per suite instead of mutating any shared
//! module state, so suites cannot leak into each other and may run in
//! parallel.

use deployer_core::DeployError;

/// Opaque handle to a captured state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotToken(pub u64);

/// Snapshot/restore capability of an execution environment.
pub trait FixtureManager: Send + Sync {
    /// Capture the current state.
    fn snapshot(&self) -> Result<SnapshotToken, DeployError>;

    /// Roll the environment back to a captured state.
    fn restore(&self, token: SnapshotToken) -> Result<(), DeployError>;
}

/// Snapshot on creation, restore on drop.
pub struct FixtureGuard<'a> {
    manager: &'a dyn FixtureManager,
    token: Option<SnapshotToken>,
}

impl<'a> FixtureGuard<'a> {
    /// Capture the environment now; the state is restored when the guard
    /// drops.
    pub fn new(manager: &'a dyn FixtureManager) -> Result<Self, DeployError> {
        let token = manager.snapshot()?;
        Ok(Self {
            manager,
            token: Some(token),
        })
    }

    /// The captured token.
    pub fn token(&self) -> Option<SnapshotToken> {
        self.token
    }

    /// Restore eagerly and disarm the drop behavior.
    pub fn restore_now(mut self) -> Result<(), DeployError> {
        if let Some(token) = self.token.take() {
            self.manager.restore(token)?;
        }
        Ok(())
    }
}

impl Drop for FixtureGuard<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(error) = self.manager.restore(token) {
                tracing::error!(%error, "Failed to restore fixture snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DeployEngine;
    use crate::sim::SimEngine;

    #[tokio::test]
    async fn test_guard_restores_on_drop() {
        let engine = SimEngine::new();
        let baseline = engine.deploy("Pool").await.unwrap();

        {
            let _guard = FixtureGuard::new(&engine).unwrap();
            engine.deploy("Scratch").await.unwrap();
        }

        // Only the pre-guard deployment survives.
        assert_eq!(engine.artifact_at(baseline).as_deref(), Some("Pool"));
        let next = engine.deploy("Next").await.unwrap();
        assert_eq!(engine.artifact_at(next).as_deref(), Some("Next"));
        assert_ne!(next, baseline);
    }

    #[tokio::test]
    async fn test_restore_now_disarms_drop() {
        let engine = SimEngine::new();
        let guard = FixtureGuard::new(&engine).unwrap();
        engine.deploy("Scratch").await.unwrap();

        guard.restore_now().unwrap();
        // State after the eager restore sticks; nothing rolls back twice.
        let kept = engine.deploy("Kept").await.unwrap();
        assert_eq!(engine.artifact_at(kept).as_deref(), Some("Kept"));
    }

    #[tokio::test]
    async fn test_nested_guards_restore_in_reverse_order() {
        let engine = SimEngine::new();
        let outer = FixtureGuard::new(&engine).unwrap();
        let first = engine.deploy("First").await.unwrap();

        let second = {
            let _inner = FixtureGuard::new(&engine).unwrap();
            engine.deploy("Second").await.unwrap()
        };
        // Inner rollback keeps the outer-scope deployment only.
        assert_eq!(engine.artifact_at(first).as_deref(), Some("First"));
        assert!(engine.artifact_at(second).is_none());

        outer.restore_now().unwrap();
        assert!(engine.artifact_at(first).is_none());
    }
}
