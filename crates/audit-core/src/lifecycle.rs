//! Analysis request lifecycle
//!
//! `Idle -> Pending -> {Success, Failed} -> Idle`. At most one request is
//! `Pending` at a time; the controller enforces it through this table.

use crate::error::TransitionError;
use audit_model::InvoiceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Status of the analysis slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Nothing in flight
    Idle,
    /// One request awaiting the engine
    Pending,
    /// Last request produced a result
    Success,
    /// Last request failed
    Failed,
}

impl RequestStatus {
    /// Whether a new request may be admitted from this status
    #[inline]
    #[must_use]
    pub fn accepts_submit(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Validate a status transition
///
/// # Errors
/// `TransitionError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: RequestStatus, to: RequestStatus) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// Statuses reachable in one step
#[must_use]
pub fn allowed_transitions(from: RequestStatus) -> Vec<RequestStatus> {
    use RequestStatus::*;
    match from {
        Idle => vec![Pending],
        Pending => vec![Success, Failed],
        Success | Failed => vec![Idle],
    }
}

/// Unique request identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Ulid);

impl RequestId {
    /// Generate new request ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One logical analysis request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Request ID
    pub id: RequestId,
    /// Invoice being analysed
    pub identifier: InvoiceId,
    /// Return period sent to the engine
    pub period: String,
    /// Current status
    pub status: RequestStatus,
    /// Admission time
    pub issued_at: DateTime<Utc>,
}

impl AnalysisRequest {
    /// Create a request in `Pending` status
    #[must_use]
    pub fn pending(identifier: InvoiceId, period: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            identifier,
            period: period.into(),
            status: RequestStatus::Pending,
            issued_at: Utc::now(),
        }
    }

    /// Move to a new status through the lifecycle table
    ///
    /// # Errors
    /// `TransitionError::IllegalTransition` if the move is not allowed.
    pub fn advance(&mut self, to: RequestStatus) -> Result<(), TransitionError> {
        validate_transition(self.status, to)?;
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn any_status() -> impl Strategy<Value = RequestStatus> {
        prop_oneof![
            Just(RequestStatus::Idle),
            Just(RequestStatus::Pending),
            Just(RequestStatus::Success),
            Just(RequestStatus::Failed),
        ]
    }

    #[test]
    fn happy_path_transitions() {
        assert!(validate_transition(RequestStatus::Idle, RequestStatus::Pending).is_ok());
        assert!(validate_transition(RequestStatus::Pending, RequestStatus::Success).is_ok());
        assert!(validate_transition(RequestStatus::Pending, RequestStatus::Failed).is_ok());
        assert!(validate_transition(RequestStatus::Success, RequestStatus::Idle).is_ok());
        assert!(validate_transition(RequestStatus::Failed, RequestStatus::Idle).is_ok());
    }

    #[test]
    fn pending_cannot_reenter_pending() {
        assert_eq!(
            validate_transition(RequestStatus::Pending, RequestStatus::Pending),
            Err(TransitionError::IllegalTransition {
                from: RequestStatus::Pending,
                to: RequestStatus::Pending,
            })
        );
        assert!(!RequestStatus::Pending.accepts_submit());
        assert!(RequestStatus::Idle.accepts_submit());
    }

    #[test]
    fn request_advances_through_table() {
        let id = InvoiceId::from_str("INV-BD-1").unwrap();
        let mut req = AnalysisRequest::pending(id, "2024-09");
        assert_eq!(req.status, RequestStatus::Pending);

        req.advance(RequestStatus::Failed).unwrap();
        assert!(req.advance(RequestStatus::Success).is_err());
        req.advance(RequestStatus::Idle).unwrap();
    }

    proptest! {
        #[test]
        fn prop_validation_matches_table(from in any_status(), to in any_status()) {
            let res = validate_transition(from, to);
            prop_assert_eq!(res.is_ok(), allowed_transitions(from).contains(&to));
        }
    }
}
