//! Transaction Boundary
//!
//! The narrow interface through which the commit phase consumes the
//! persistence engine's atomic-transaction primitive. Runners are injected
//! at construction and selected by configuration, never detected from the
//! running environment.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::UseCaseError;

/// The work executed inside one transaction scope.
pub type TransactionWork<'a> = BoxFuture<'a, Result<(), UseCaseError>>;

/// Runs a block of commit-phase work atomically.
///
/// On `Ok` the boundary commits; on `Err` it rolls back and propagates the
/// error unmodified. This is not a retry or compensation mechanism: one
/// scope, one attempt.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    async fn run<'a>(&self, work: TransactionWork<'a>) -> Result<(), UseCaseError>;
}

/// Executes work directly, with no atomicity guarantee.
///
/// An explicit opt-out for backends without a transaction primitive. With
/// this runner a failure partway through a cascading commit leaves earlier
/// writes in place, so prefer a real runner wherever the store supports one.
pub struct NoTransaction;

#[async_trait]
impl TransactionRunner for NoTransaction {
    async fn run<'a>(&self, work: TransactionWork<'a>) -> Result<(), UseCaseError> {
        work.await
    }
}

/// How commit-phase work acquires atomicity.
///
/// A configuration value: deserializable from service config and mapped to
/// a concrete [`TransactionRunner`] by the backend in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// Commit-phase work runs inside a real transaction.
    #[default]
    Required,
    /// No transaction scope; work executes directly.
    Disabled,
}
