//! Access Policies
//!
//! The authorization capability consumed by the lifecycle. Policies are
//! supplied at construction as an optional collaborator; when none is
//! supplied, no check occurs.

use crate::context::ExecutionContext;
use crate::error::UseCaseError;

/// Permission check keyed off an actor and a target model.
///
/// Deny with [`UseCaseError::denied`]; the lifecycle never converts a
/// denial into a boolean or swallows it.
pub trait Policy<M>: Send + Sync {
    fn authorize(&self, actor: &ExecutionContext, target: &M) -> Result<(), UseCaseError>;
}
