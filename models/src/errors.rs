// models/src/errors.rs

pub use thiserror::Error;

use crate::identifiers::{ActivityId, BillingId, PlanId, ResidentId};
use crate::medical::PlanStatus;

/// Top-level error for every operation of the shared client layer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CareError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Conflict(#[from] DomainConflict),
}

impl CareError {
    /// True when reloading the affected list and re-evaluating is the right
    /// reaction. Transport failures are always worth a reload.
    pub fn is_recoverable(&self) -> bool {
        match self {
            CareError::Transport(_) => true,
            CareError::Shape(_) => true,
            CareError::Conflict(conflict) => conflict.is_recoverable(),
        }
    }

    pub fn as_conflict(&self) -> Option<&DomainConflict> {
        match self {
            CareError::Conflict(conflict) => Some(conflict),
            _ => None,
        }
    }
}

/// Network failure or a non-success HTTP status.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{method} {endpoint} failed{}: {message}", .status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
pub struct TransportError {
    pub method: &'static str,
    pub endpoint: String,
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(method: &'static str, endpoint: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        TransportError {
            method,
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status == Some(409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// A payload matched none of the known shapes. The normalizer resolves these
/// to defaulted records, the type exists so the event can be logged and tested.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{entity} payload did not match any known shape: {message}")]
pub struct ShapeError {
    pub entity: &'static str,
    pub message: String,
}

/// A mutation was blocked because of the current domain state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainConflict {
    #[error("care plan {0} already exists for this resident")]
    DuplicatePlanId(PlanId),
    #[error("cannot {operation} care plan {plan_id} while it is {from}")]
    IllegalTransition {
        plan_id: PlanId,
        from: PlanStatus,
        operation: &'static str,
    },
    #[error("care plan {0} is not in the loaded plan list")]
    UnknownPlan(PlanId),
    #[error("care plan {plan_id} was changed by someone else: {reason}")]
    StaleState { plan_id: PlanId, reason: String },
    #[error("{actor} may not {operation}")]
    NotPermitted { actor: String, operation: &'static str },
    #[error("billing record {0} is not in the loaded ledger")]
    UnknownBilling(BillingId),
    #[error("billing record {0} has nothing left to pay")]
    NothingToPay(BillingId),
    #[error("a payment for billing record {0} is already in progress")]
    PaymentInProgress(BillingId),
    #[error("resident {resident_id} is already registered for activity {activity_id}")]
    AlreadyRegistered { activity_id: ActivityId, resident_id: ResidentId },
    #[error("resident {resident_id} is not registered for activity {activity_id}")]
    NotRegistered { activity_id: ActivityId, resident_id: ResidentId },
}

impl DomainConflict {
    /// Conflicts that a reload of the authoritative list can resolve.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DomainConflict::UnknownPlan(_)
                | DomainConflict::StaleState { .. }
                | DomainConflict::UnknownBilling(_)
                | DomainConflict::NothingToPay(_)
                | DomainConflict::PaymentInProgress(_)
                | DomainConflict::AlreadyRegistered { .. }
                | DomainConflict::NotRegistered { .. }
        )
    }
}

/// A validation error for locally parsed values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("'{1}' is not a valid {0} identifier")]
    InvalidIdentifier(&'static str, String),
    #[error("unknown {0} value '{1}'")]
    UnknownVariant(&'static str, String),
}

/// A type alias for a `Result` that returns a `CareError` on failure.
pub type CareResult<T> = Result<T, CareError>;

impl From<serde_json::Error> for ShapeError {
    fn from(err: serde_json::Error) -> Self {
        ShapeError {
            entity: "json",
            message: err.to_string(),
        }
    }
}
