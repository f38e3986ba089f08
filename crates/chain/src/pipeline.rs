//! Ordered, idempotent deployment pipeline.
//!
//! A pipeline is an ordered set of named steps. Each step declares an
//! idempotency id and the dependency ids it expects already present in the
//! registry. Steps run strictly in declaration order; each external call
//! settles before the next step begins. A failed step aborts the rest of
//! the run, but ids registered by completed steps stay valid, so a retry
//! continues where the previous run stopped.

use crate::engine::DeployEngine;
use crate::registry::DeploymentRegistry;
use alloy::primitives::Address;
use async_trait::async_trait;
use deployer_core::{DeployError, MarketConfiguration, Network};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared context handed to every step.
pub struct StepContext {
    pub engine: Arc<dyn DeployEngine>,
    pub registry: Arc<DeploymentRegistry>,
    pub network: Network,
    pub config: Arc<MarketConfiguration>,
}

/// One named deployment step.
#[async_trait]
pub trait DeployStep: Send + Sync {
    /// Idempotency id, also the registry key for the deployed artifact.
    fn id(&self) -> &str;

    /// Artifact (ABI) reference recorded with the registration.
    fn artifact(&self) -> &str {
        self.id()
    }

    /// Logical ids that must already be registered when this step runs.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// True when the step has no side effects beyond the deployment
    /// itself, so a re-run can skip it entirely.
    fn deploy_only(&self) -> bool {
        false
    }

    /// Produce the step's artifact address.
    async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError>;

    /// Non-deployment side effects (wiring calls). Runs after a fresh
    /// deploy and again on re-runs that skip the deploy, unless the step
    /// is deploy-only.
    async fn wire(&self, _ctx: &StepContext, _address: Address) -> Result<(), DeployError> {
        Ok(())
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Steps that deployed a fresh artifact.
    pub deployed: Vec<String>,
    /// Steps whose registered address was reused.
    pub reused: Vec<String>,
}

/// Ordered step executor.
#[derive(Default)]
pub struct DeploymentPipeline {
    steps: Vec<Box<dyn DeployStep>>,
}

impl DeploymentPipeline {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step; execution follows insertion order.
    pub fn push(mut self, step: impl DeployStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Execute all steps against the registry. The per-network run lock is
    /// held for the whole run, so concurrent runs against the same network
    /// cannot double-deploy a logical id.
    pub async fn run(&self, ctx: &StepContext) -> Result<RunReport, DeployError> {
        let _lock = ctx.registry.run_lock(ctx.network)?;
        info!(network = %ctx.network, steps = self.steps.len(), "Starting deployment run");

        let mut report = RunReport::default();
        for step in &self.steps {
            self.run_step(step.as_ref(), ctx, &mut report)
                .await
                .map_err(|e| e.in_step(step.id()))?;
        }

        info!(
            network = %ctx.network,
            deployed = report.deployed.len(),
            reused = report.reused.len(),
            "Deployment run complete"
        );
        Ok(report)
    }

    async fn run_step(
        &self,
        step: &dyn DeployStep,
        ctx: &StepContext,
        report: &mut RunReport,
    ) -> Result<(), DeployError> {
        for dependency in step.dependencies() {
            if ctx.registry.lookup(dependency, ctx.network).is_none() {
                return Err(DeployError::DependencyMissing {
                    step: step.id().to_string(),
                    dependency: dependency.to_string(),
                    network: ctx.network,
                });
            }
        }

        if let Some(existing) = ctx.registry.lookup(step.id(), ctx.network) {
            report.reused.push(step.id().to_string());
            if step.deploy_only() {
                debug!(step = step.id(), address = %existing, "Already registered; skipping");
                return Ok(());
            }
            debug!(step = step.id(), address = %existing, "Already registered; re-wiring only");
            return step.wire(ctx, existing).await;
        }

        let deployed = step.deploy(ctx).await?;
        let address = ctx
            .registry
            .register(step.id(), ctx.network, deployed, step.artifact())?;
        report.deployed.push(step.id().to_string());

        step.wire(ctx, address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::scratch_dir;
    use crate::sim::SimEngine;
    use deployer_core::resolver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PlainStep {
        id: &'static str,
        deps: Vec<&'static str>,
        artifact: &'static str,
        deploy_only: bool,
        wires: Arc<AtomicUsize>,
    }

    impl PlainStep {
        fn new(id: &'static str, deps: Vec<&'static str>) -> Self {
            Self {
                id,
                deps,
                artifact: id,
                deploy_only: false,
                wires: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl DeployStep for PlainStep {
        fn id(&self) -> &str {
            self.id
        }

        fn artifact(&self) -> &str {
            self.artifact
        }

        fn dependencies(&self) -> &[&'static str] {
            &self.deps
        }

        fn deploy_only(&self) -> bool {
            self.deploy_only
        }

        async fn deploy(&self, ctx: &StepContext) -> Result<Address, DeployError> {
            ctx.engine.deploy(self.artifact).await
        }

        async fn wire(&self, _ctx: &StepContext, _address: Address) -> Result<(), DeployError> {
            self.wires.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context(tag: &str) -> StepContext {
        StepContext {
            engine: Arc::new(SimEngine::new()),
            registry: Arc::new(DeploymentRegistry::new(scratch_dir(tag)).unwrap()),
            network: Network::Local,
            config: Arc::new(resolver::resolve("bob", Network::Local).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_declared_order() {
        let ctx = context("order");
        let pipeline = DeploymentPipeline::new()
            .push(PlainStep::new("A", vec![]))
            .push(PlainStep::new("B", vec!["A"]))
            .push(PlainStep::new("C", vec!["A", "B"]));

        let report = pipeline.run(&ctx).await.unwrap();
        assert_eq!(report.deployed, vec!["A", "B", "C"]);
        assert!(report.reused.is_empty());
    }

    #[tokio::test]
    async fn test_missing_dependency_fails_immediately() {
        let ctx = context("missing-dep");
        let pipeline = DeploymentPipeline::new()
            .push(PlainStep::new("B", vec!["A"]))
            .push(PlainStep::new("C", vec![]));

        let err = pipeline.run(&ctx).await.unwrap_err();
        let DeployError::StepFailed { step, source } = err else {
            panic!("expected StepFailed, got {err:?}");
        };
        assert_eq!(step, "B");
        assert!(matches!(
            *source,
            DeployError::DependencyMissing { ref dependency, .. } if dependency == "A"
        ));
        // No partial skip: C never ran.
        assert!(ctx.registry.lookup("C", Network::Local).is_none());
    }

    #[tokio::test]
    async fn test_rerun_reuses_and_rewires() {
        let ctx = context("rerun");
        let step = PlainStep::new("A", vec![]);
        let wires = step.wires.clone();
        let pipeline = DeploymentPipeline::new().push(step);

        pipeline.run(&ctx).await.unwrap();
        let first = ctx.registry.get("A", Network::Local).unwrap();
        assert_eq!(wires.load(Ordering::SeqCst), 1);

        let report = pipeline.run(&ctx).await.unwrap();
        assert_eq!(report.reused, vec!["A"]);
        assert!(report.deployed.is_empty());
        // Address is stable and the wiring side effects ran again.
        assert_eq!(ctx.registry.get("A", Network::Local).unwrap(), first);
        assert_eq!(wires.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deploy_only_step_skips_entirely_on_rerun() {
        let ctx = context("deploy-only");
        let mut step = PlainStep::new("T", vec![]);
        step.deploy_only = true;
        let wires = step.wires.clone();
        let pipeline = DeploymentPipeline::new().push(step);

        pipeline.run(&ctx).await.unwrap();
        pipeline.run(&ctx).await.unwrap();
        assert_eq!(wires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupted_run_resumes_to_same_registry() {
        // Reference: an uninterrupted run.
        let full_ctx = context("resume-full");
        let full = DeploymentPipeline::new()
            .push(PlainStep::new("A", vec![]))
            .push(PlainStep::new("B", vec!["A"]))
            .push(PlainStep::new("C", vec!["B"]));
        full.run(&full_ctx).await.unwrap();

        // Interrupted run: only A completed before the crash.
        let ctx = context("resume-partial");
        let prefix = DeploymentPipeline::new().push(PlainStep::new("A", vec![]));
        prefix.run(&ctx).await.unwrap();

        let resumed = DeploymentPipeline::new()
            .push(PlainStep::new("A", vec![]))
            .push(PlainStep::new("B", vec!["A"]))
            .push(PlainStep::new("C", vec!["B"]));
        resumed.run(&ctx).await.unwrap();

        let final_ids: Vec<String> = ctx
            .registry
            .records(Network::Local)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let reference_ids: Vec<String> = full_ctx
            .registry
            .records(Network::Local)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(final_ids, reference_ids);
    }
}
