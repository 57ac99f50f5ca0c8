use thiserror::Error;

use crate::domain::package::ItemStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid item transition from {from:?} to {to:?} for item `{item_id}`")]
    InvalidItemTransition { item_id: String, from: ItemStatus, to: ItemStatus },
    #[error("item not found in package: `{0}`")]
    ItemNotFound(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures surfaced by collaborator services (stores, roster, CRM, ...).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Per-item execution failures, recorded on the item and never fatal to a batch.
///
/// `Guardrail` is kept distinct from `Validation` so operators can tell
/// "unsafe" rejections apart from "malformed input" rejections in logs
/// and in the persisted `item.error` text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("guardrail rejected execution: {0}")]
    Guardrail(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("execution already in progress: {0}")]
    Busy(String),
}

impl ExecutorError {
    pub fn is_guardrail(&self) -> bool {
        matches!(self, Self::Guardrail(_))
    }
}
