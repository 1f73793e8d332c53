//! Persist Capability
//!
//! How a prepared model writes itself durably. A model that persists
//! carries its own store handle, the same way a use case carries the
//! repositories it reads from.

use async_trait::async_trait;

use crate::error::UseCaseError;

/// Persistence capability of a use case's model.
///
/// The default commit phase calls this once, inside the open transaction
/// scope, for the model produced by preparation. Keep implementations free
/// of long-running external calls; they frequently run while transactional
/// locks are held.
#[async_trait]
pub trait Persist: Send {
    async fn persist(&mut self) -> Result<(), UseCaseError>;
}

/// A unit model for use cases that produce no persistable result.
#[async_trait]
impl Persist for () {
    async fn persist(&mut self) -> Result<(), UseCaseError> {
        Ok(())
    }
}
