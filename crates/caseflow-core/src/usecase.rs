//! Use Case Lifecycle
//!
//! The state machine each use case instance goes through:
//! `construct -> prepare -> commit -> after_commit -> return model`.
//!
//! Concrete use cases embed a [`UseCaseState`] and override up to three
//! hooks; the provided drivers orchestrate the phases, guard against phase
//! misuse, and cascade commit/after-commit through every registered
//! dependency.
//!
//! # Usage
//!
//! ```ignore
//! struct CreateOrder {
//!     state: UseCaseState<PendingOrder>,
//!     params: OrderParams,
//!     orders: Arc<OrderStore>,
//! }
//!
//! #[async_trait]
//! impl UseCase for CreateOrder {
//!     type Model = PendingOrder;
//!
//!     fn state(&self) -> &UseCaseState<PendingOrder> { &self.state }
//!     fn state_mut(&mut self) -> &mut UseCaseState<PendingOrder> { &mut self.state }
//!
//!     async fn on_prepare(&mut self) -> Result<(), UseCaseError> {
//!         // validate, build the unsaved model, register dependencies
//!         self.state.set_model(PendingOrder::build(&self.params, &self.orders)?);
//!         Ok(())
//!     }
//! }
//!
//! let order = CreateOrder::new(params, ctx, runner).execute().await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::context::ExecutionContext;
use crate::error::UseCaseError;
use crate::persist::Persist;
use crate::policy::Policy;
use crate::registry::{AfterCommittable, Committable, DependencyRegistry};
use crate::transaction::{TransactionRunner, TransactionWork};

/// Lifecycle phase of a use case instance.
///
/// Transitions are one-directional and occur at most once per instance.
/// A failed commit leaves the instance in `Committing`, which permanently
/// refuses the after-commit phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Prepared,
    Committing,
    Committed,
    Finalized,
}

/// Per-instance state embedded in every concrete use case.
///
/// Holds the actor context, the prepared model, the dependency registry,
/// the injected transaction runner, an optional access policy, and the
/// phase guard. Construction performs no I/O.
pub struct UseCaseState<M> {
    context: ExecutionContext,
    model: Option<M>,
    dependencies: DependencyRegistry,
    transaction: Arc<dyn TransactionRunner>,
    policy: Option<Arc<dyn Policy<M>>>,
    phase: Phase,
}

impl<M> UseCaseState<M> {
    pub fn new(context: ExecutionContext, transaction: Arc<dyn TransactionRunner>) -> Self {
        Self {
            context,
            model: None,
            dependencies: DependencyRegistry::new(),
            transaction,
            policy: None,
            phase: Phase::Constructed,
        }
    }

    /// Attach an access policy. Checked by [`authorize`](Self::authorize);
    /// absence means no check occurs.
    pub fn with_policy(mut self, policy: Arc<dyn Policy<M>>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut M> {
        self.model.as_mut()
    }

    pub fn set_model(&mut self, model: M) {
        self.model = Some(model);
    }

    pub fn take_model(&mut self) -> Option<M> {
        self.model.take()
    }

    /// Register a child use case (or any committable unit) so its commit
    /// and after-commit phases cascade together with this instance's.
    pub fn register_dependency<D: Committable + 'static>(&mut self, dependency: D) {
        self.dependencies.register(dependency);
    }

    pub fn dependencies(&self) -> &DependencyRegistry {
        &self.dependencies
    }

    pub fn dependencies_mut(&mut self) -> &mut DependencyRegistry {
        &mut self.dependencies
    }

    pub fn transaction(&self) -> &Arc<dyn TransactionRunner> {
        &self.transaction
    }

    /// Check the prepared model against the attached policy, with this
    /// instance's context as the actor. No policy or no model: no check.
    pub fn authorize(&self) -> Result<(), UseCaseError> {
        match (&self.policy, &self.model) {
            (Some(policy), Some(model)) => policy.authorize(&self.context, model),
            _ => Ok(()),
        }
    }

    pub(crate) fn begin_prepare(&mut self) -> Result<(), UseCaseError> {
        match self.phase {
            Phase::Constructed => {
                self.phase = Phase::Prepared;
                Ok(())
            }
            _ => Err(UseCaseError::lifecycle(
                "ALREADY_PREPARED",
                "prepare was already invoked on this instance",
            )),
        }
    }

    pub(crate) fn begin_commit(&mut self) -> Result<(), UseCaseError> {
        match self.phase {
            Phase::Constructed | Phase::Prepared => {
                self.phase = Phase::Committing;
                Ok(())
            }
            _ => Err(UseCaseError::lifecycle(
                "ALREADY_COMMITTED",
                "commit was already invoked on this instance",
            )),
        }
    }

    pub(crate) fn mark_committed(&mut self) {
        self.phase = Phase::Committed;
    }

    pub(crate) fn begin_after_commit(&mut self) -> Result<(), UseCaseError> {
        match self.phase {
            Phase::Committed => {
                self.phase = Phase::Finalized;
                Ok(())
            }
            Phase::Finalized => Err(UseCaseError::lifecycle(
                "ALREADY_FINALIZED",
                "after_commit was already invoked on this instance",
            )),
            _ => Err(UseCaseError::lifecycle(
                "NOT_COMMITTED",
                "after_commit requires a successful commit",
            )),
        }
    }
}

impl<M: Persist> UseCaseState<M> {
    /// Persist the prepared model, if any. Called by the default commit
    /// hook, inside the open transaction scope.
    pub async fn persist_model(&mut self) -> Result<(), UseCaseError> {
        match self.model.as_mut() {
            Some(model) => model.persist().await,
            None => Ok(()),
        }
    }
}

/// One discrete unit of business logic, executed on behalf of an actor.
///
/// Implementations provide the two state accessors and override the hooks
/// they need; every hook has a default, so a minimal use case implements
/// nothing beyond the accessors. The drivers (`prepare`, `commit`,
/// `after_commit`, `call`, `execute`) are provided and not meant to be
/// overridden.
#[async_trait]
pub trait UseCase: Send {
    /// The primary result this use case produces and (optionally) persists.
    type Model: Persist;

    fn state(&self) -> &UseCaseState<Self::Model>;

    fn state_mut(&mut self) -> &mut UseCaseState<Self::Model>;

    /// Hook: validation, reads, building the model, registering
    /// dependencies. Runs before any transaction opens and must not assume
    /// one; a failure here leaves no persistence side effects.
    async fn on_prepare(&mut self) -> Result<(), UseCaseError> {
        Ok(())
    }

    /// Hook: this instance's own persistence, inside the open transaction
    /// scope. Default: persist the prepared model, if any, exactly once.
    ///
    /// Keep this free of long-running or fragile external calls (network,
    /// queueing): it frequently runs while transactional locks are held.
    /// Such work belongs in [`on_after_commit`](Self::on_after_commit).
    async fn commit_within_transaction(&mut self) -> Result<(), UseCaseError> {
        self.state_mut().persist_model().await
    }

    /// Hook: this instance's own post-commit side effects (background
    /// jobs, notifications, anything that must only happen once state is
    /// durable). Default: no-op.
    async fn on_after_commit(&mut self) -> Result<(), UseCaseError> {
        Ok(())
    }

    /// Driver: run the preparation phase once.
    async fn prepare(&mut self) -> Result<(), UseCaseError> {
        self.state_mut().begin_prepare()?;
        self.on_prepare().await
    }

    /// Driver: run the transactional phase once.
    ///
    /// Opens the transaction boundary (only the root of a cascade opens
    /// one), commits this instance's own state, then every registered
    /// dependency in registration order. Any error rolls the whole scope
    /// back and propagates unmodified; the instance then permanently
    /// refuses `after_commit`.
    async fn commit(&mut self) -> Result<(), UseCaseError> {
        self.state_mut().begin_commit()?;
        let runner = Arc::clone(self.state().transaction());

        let this = &mut *self;
        let work: TransactionWork<'_> = Box::pin(async move {
            this.commit_within_transaction().await?;
            for dep in this.state_mut().dependencies_mut().iter_mut() {
                dep.commit_cascade().await?;
            }
            Ok(())
        });

        match runner.run(work).await {
            Ok(()) => {
                self.state_mut().mark_committed();
                debug!(
                    execution_id = %self.state().context().execution_id,
                    dependencies = self.state().dependencies().len(),
                    "use case subtree committed"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    execution_id = %self.state().context().execution_id,
                    error = %err,
                    "use case commit rolled back"
                );
                Err(err)
            }
        }
    }

    /// Driver: run the post-commit phase once.
    ///
    /// Refused unless `commit` returned successfully for the whole
    /// subtree. Runs this instance's own hook, then cascades to every
    /// registered dependency that exposes the after-commit capability, in
    /// registration order. The cascade is sequential: the first failure
    /// stops the remaining dependencies and propagates.
    async fn after_commit(&mut self) -> Result<(), UseCaseError> {
        self.state_mut().begin_after_commit()?;
        self.on_after_commit().await?;
        for dep in self.state_mut().dependencies_mut().iter_mut() {
            if let Some(hook) = dep.as_after_committable() {
                hook.after_commit_cascade().await?;
            }
        }
        Ok(())
    }

    /// Driver: the single-shot lifecycle (`prepare`, then `commit`, then
    /// `after_commit`), returning the prepared model.
    async fn call(&mut self) -> Result<Option<Self::Model>, UseCaseError> {
        self.prepare().await?;
        self.commit().await?;
        self.after_commit().await?;
        Ok(self.state_mut().take_model())
    }

    /// Entry point for callers that construct and run in one shot:
    /// `MyUseCase::new(...).execute().await`.
    async fn execute(mut self) -> Result<Option<Self::Model>, UseCaseError>
    where
        Self: Sized,
    {
        self.call().await
    }
}

// Every use case can be registered as a dependency of another: its commit
// joins the root's transaction scope instead of opening its own.
#[async_trait]
impl<U: UseCase> Committable for U {
    async fn commit_cascade(&mut self) -> Result<(), UseCaseError> {
        self.commit_within_transaction().await?;
        for dep in self.state_mut().dependencies_mut().iter_mut() {
            dep.commit_cascade().await?;
        }
        Ok(())
    }

    fn as_after_committable(&mut self) -> Option<&mut dyn AfterCommittable> {
        Some(self)
    }
}

#[async_trait]
impl<U: UseCase> AfterCommittable for U {
    async fn after_commit_cascade(&mut self) -> Result<(), UseCaseError> {
        self.on_after_commit().await?;
        for dep in self.state_mut().dependencies_mut().iter_mut() {
            if let Some(hook) = dep.as_after_committable() {
                hook.after_commit_cascade().await?;
            }
        }
        Ok(())
    }
}
