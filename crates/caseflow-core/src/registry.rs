//! Dependency Registry
//!
//! An ordered, append-only collection of child units registered by a parent
//! use case during preparation. Insertion order is commit order and
//! after-commit order. The commit capability is a trait bound on
//! registration, so an object that cannot commit is rejected when the code
//! is compiled rather than when the cascade runs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::UseCaseError;

/// The commit capability required of every registered dependency.
///
/// Implemented automatically for every [`UseCase`](crate::UseCase); other
/// committable units may implement it directly.
#[async_trait]
pub trait Committable: Send {
    /// Persist this unit and everything it registered, in registration
    /// order. Always invoked inside the transaction scope opened by the
    /// root of the cascade; implementations must not open their own.
    async fn commit_cascade(&mut self) -> Result<(), UseCaseError>;

    /// Capability query for the optional post-commit phase.
    ///
    /// A unit without the capability returns `None` and is skipped by the
    /// after-commit cascade.
    fn as_after_committable(&mut self) -> Option<&mut dyn AfterCommittable> {
        None
    }
}

/// The optional post-commit capability of a registered dependency.
#[async_trait]
pub trait AfterCommittable: Send {
    /// Run post-commit side effects for this unit and everything it
    /// registered, in registration order. Only invoked after the whole
    /// subtree committed successfully.
    async fn after_commit_cascade(&mut self) -> Result<(), UseCaseError>;
}

/// Ordered sequence of registered dependencies.
///
/// Write-once-append-only for the lifetime of one invocation: there is no
/// removal, and duplicates are not collapsed; callers are responsible for
/// not double-registering.
#[derive(Default)]
pub struct DependencyRegistry {
    entries: Vec<Box<dyn Committable>>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency. Commit order is registration order.
    pub fn register<D: Committable + 'static>(&mut self, dependency: D) {
        self.entries.push(Box::new(dependency));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The cascade's view of the registry, in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Committable>> {
        self.entries.iter_mut()
    }
}

// A shared handle is registrable too: registration hands the registry one
// clone while the registering code keeps another, so the dependency can be
// inspected or reused after the cascade has run.
#[async_trait]
impl<D: Committable> Committable for Arc<Mutex<D>> {
    async fn commit_cascade(&mut self) -> Result<(), UseCaseError> {
        self.lock().await.commit_cascade().await
    }

    fn as_after_committable(&mut self) -> Option<&mut dyn AfterCommittable> {
        Some(self)
    }
}

#[async_trait]
impl<D: Committable> AfterCommittable for Arc<Mutex<D>> {
    async fn after_commit_cascade(&mut self) -> Result<(), UseCaseError> {
        let mut inner = self.lock().await;
        match inner.as_after_committable() {
            Some(hook) => hook.after_commit_cascade().await,
            None => Ok(()),
        }
    }
}
