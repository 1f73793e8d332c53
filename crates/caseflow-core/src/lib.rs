//! Use Case Lifecycle Kit
//!
//! Provides the foundational pattern for business-logic use cases that
//! separate preparation, atomic commit, and post-commit side effects:
//! - `UseCase` / `UseCaseState` - the staged lifecycle and its drivers
//! - `DependencyRegistry` - cascading commit/after-commit across child use cases
//! - `TransactionRunner` - the injected atomic-commit boundary
//! - `Policy` - optional actor/target authorization checks
//! - `UseCaseError` - categorized error types for consistent handling
//! - `ExecutionContext` - actor and tracing context for a use case execution

pub mod context;
pub mod error;
pub mod persist;
pub mod policy;
pub mod registry;
pub mod transaction;
pub mod usecase;

pub use context::ExecutionContext;
pub use error::UseCaseError;
pub use persist::Persist;
pub use policy::Policy;
pub use registry::{AfterCommittable, Committable, DependencyRegistry};
pub use transaction::{NoTransaction, TransactionMode, TransactionRunner, TransactionWork};
pub use usecase::{Phase, UseCase, UseCaseState};
