use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;
use crate::models::application::Application;
use crate::models::interview::Interview;

/// Result of an operation that writes one entity and then cascades into
/// another. The primary write has always happened when this is returned.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Cascaded<T> {
    Complete { value: T },
    PartialSuccess { value: T, failed: Vec<CascadeFailure> },
}

impl<T> Cascaded<T> {
    pub fn new(value: T, failed: Vec<CascadeFailure>) -> Self {
        if failed.is_empty() {
            Cascaded::Complete { value }
        } else {
            Cascaded::PartialSuccess { value, failed }
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Cascaded::Complete { value } | Cascaded::PartialSuccess { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Cascaded::Complete { value } | Cascaded::PartialSuccess { value, .. } => value,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Cascaded::PartialSuccess { .. })
    }

    pub fn failures(&self) -> &[CascadeFailure] {
        match self {
            Cascaded::Complete { .. } => &[],
            Cascaded::PartialSuccess { failed, .. } => failed,
        }
    }
}

/// A follow-up write that did not go through. Carries the error as data so the
/// caller can retry or reconcile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeFailure {
    pub operation: String,
    pub entity_id: Uuid,
    pub kind: String,
    pub message: String,
}

impl CascadeFailure {
    pub fn new(operation: impl Into<String>, entity_id: Uuid, error: &Error) -> Self {
        Self {
            operation: operation.into(),
            entity_id,
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Withdrawal {
    pub application: Application,
    pub cancelled_interviews: Vec<Interview>,
}
