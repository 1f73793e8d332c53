//! Execution Context
//!
//! The actor context a use case runs on behalf of. Carries the principal
//! and tracing IDs through one `prepare -> commit -> after_commit` pass and
//! is immutable for the lifetime of the instance that owns it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Context for a use case execution.
///
/// Supplied at construction and owned by the use case state. Access
/// policies receive it as the actor; concrete use cases read the principal
/// for auditing and attribution.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Unique ID for this execution (generated)
    pub execution_id: String,
    /// ID for distributed tracing (usually from the original request)
    pub correlation_id: String,
    /// ID of the parent operation that caused this execution (if any)
    pub causation_id: Option<String>,
    /// ID of the principal performing the action
    pub principal_id: String,
    /// When the execution was initiated
    pub initiated_at: DateTime<Utc>,
}

impl ExecutionContext {
    /// Create a new execution context for a fresh request.
    ///
    /// The execution_id and correlation_id are both set to a new generated
    /// ID. Use [`with_correlation`](Self::with_correlation) when an upstream
    /// correlation ID is available.
    pub fn create(principal_id: impl Into<String>) -> Self {
        let exec_id = format!("exec-{}", Uuid::new_v4());
        Self {
            execution_id: exec_id.clone(),
            correlation_id: exec_id, // correlation starts as execution ID
            causation_id: None,      // no causation for fresh requests
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }

    /// Create a new execution context with a specific correlation ID.
    ///
    /// Use this when you have an existing correlation ID from an
    /// upstream system or request header.
    pub fn with_correlation(
        principal_id: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: format!("exec-{}", Uuid::new_v4()),
            correlation_id: correlation_id.into(),
            causation_id: None,
            principal_id: principal_id.into(),
            initiated_at: Utc::now(),
        }
    }

    /// Create a child context within the same execution.
    ///
    /// Use this when an execution performs sub-operations that should share
    /// the same execution_id but record what caused them.
    pub fn with_causation(&self, causing_id: impl Into<String>) -> Self {
        Self {
            execution_id: self.execution_id.clone(),
            correlation_id: self.correlation_id.clone(),
            causation_id: Some(causing_id.into()),
            principal_id: self.principal_id.clone(),
            initiated_at: Utc::now(),
        }
    }

    /// Create a new context with a different principal.
    ///
    /// Use this for system-initiated operations that run on behalf of
    /// a different principal than the original request.
    pub fn with_principal(&self, principal_id: impl Into<String>) -> Self {
        Self {
            execution_id: self.execution_id.clone(),
            correlation_id: self.correlation_id.clone(),
            causation_id: self.causation_id.clone(),
            principal_id: principal_id.into(),
            initiated_at: self.initiated_at,
        }
    }
}
