//! Request lifecycle controller
//!
//! Owns the single analysis slot and the write side of the audit result
//! store. A submit while a request is pending is rejected without touching
//! the engine; a failed request leaves the stored result exactly as it was.

use crate::engine::AnalysisEngine;
use crate::error::{AnalysisFailure, EngineError};
use crate::lifecycle::{AnalysisRequest, RequestStatus};
use crate::store::{store, AuditResultStore, StoreWriter};
use audit_model::{AnalyzeInvoiceRequest, AuditResult, InvoiceId};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Result of one `submit` call
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// Engine answered; the result is now in the store
    Success(Arc<AuditResult>),
    /// Engine call failed; the store is unchanged
    Failed(AnalysisFailure),
    /// Another request was pending; nothing happened
    Rejected {
        /// Identifier of the request still in flight
        pending: InvoiceId,
    },
}

impl AnalysisOutcome {
    /// Whether the submit produced a stored result
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Whether the submit was a no-op
    #[inline]
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[derive(Debug, Default)]
struct Slot {
    in_flight: Option<AnalysisRequest>,
    last: Option<AnalysisRequest>,
    last_failure: Option<AnalysisFailure>,
}

/// Mediates the single outstanding call to the Analysis Engine
pub struct RequestLifecycleController {
    engine: Arc<dyn AnalysisEngine>,
    results: StoreWriter<AuditResult>,
    period: String,
    timeout: Option<Duration>,
    slot: Mutex<Slot>,
    status: watch::Sender<RequestStatus>,
}

impl std::fmt::Debug for RequestLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLifecycleController")
            .field("period", &self.period)
            .field("timeout", &self.timeout)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl RequestLifecycleController {
    /// Create controller with a fresh, empty result store
    #[must_use]
    pub fn new(engine: Arc<dyn AnalysisEngine>, period: impl Into<String>) -> Self {
        let (results, _) = store();
        let (status, _) = watch::channel(RequestStatus::Idle);
        Self {
            engine,
            results,
            period: period.into(),
            timeout: None,
            slot: Mutex::new(Slot::default()),
            status,
        }
    }

    /// With a client-side budget for each engine call
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read side of the audit result store
    #[must_use]
    pub fn results(&self) -> AuditResultStore {
        self.results.reader()
    }

    /// Period sent with every request
    #[inline]
    #[must_use]
    pub fn period(&self) -> &str {
        &self.period
    }

    /// Current slot status
    #[must_use]
    pub fn status(&self) -> RequestStatus {
        *self.status.borrow()
    }

    /// Watch slot status changes
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<RequestStatus> {
        self.status.subscribe()
    }

    /// Identifier being analysed, while a request is pending
    #[must_use]
    pub fn current_identifier(&self) -> Option<InvoiceId> {
        self.slot
            .lock()
            .in_flight
            .as_ref()
            .map(|r| r.identifier.clone())
    }

    /// Most recently completed request, in its terminal status
    #[must_use]
    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.slot.lock().last.clone()
    }

    /// Failure of the most recent request, if it failed
    #[must_use]
    pub fn last_failure(&self) -> Option<AnalysisFailure> {
        self.slot.lock().last_failure.clone()
    }

    /// Submit an identifier for analysis
    ///
    /// Returns `Rejected` immediately, with no engine call, if another
    /// request is pending. The slot is back to `Idle` when this returns.
    pub async fn submit(&self, identifier: InvoiceId) -> AnalysisOutcome {
        self.submit_with(identifier, |_| {}).await
    }

    /// As [`submit`](Self::submit), calling `on_admit` once the request
    /// is `Pending` and before the engine is contacted
    pub async fn submit_with<F>(&self, identifier: InvoiceId, on_admit: F) -> AnalysisOutcome
    where
        F: FnOnce(&AnalysisRequest) + Send,
    {
        let request = match self.admit(identifier) {
            Ok(request) => request,
            Err(pending) => return AnalysisOutcome::Rejected { pending },
        };
        on_admit(&request);
        let mut guard = InFlight {
            controller: self,
            armed: true,
        };

        tracing::info!(
            request_id = %request.id,
            invoice = %request.identifier,
            period = %request.period,
            "analysis request admitted"
        );

        let wire = AnalyzeInvoiceRequest::new(request.identifier.clone(), request.period.clone());
        let response = self.call_engine(&wire).await;

        guard.armed = false;
        self.complete(request, response)
    }

    /// Clear the stored result
    ///
    /// An in-flight request is not cancelled; it still writes on success.
    pub fn reset(&self) {
        self.results.clear();
        self.slot.lock().last_failure = None;
        tracing::info!("audit result store reset");
    }

    fn admit(&self, identifier: InvoiceId) -> Result<AnalysisRequest, InvoiceId> {
        let mut slot = self.slot.lock();
        if let Some(current) = &slot.in_flight {
            tracing::warn!(
                pending = %current.identifier,
                rejected = %identifier,
                "analysis already pending, submit ignored"
            );
            return Err(current.identifier.clone());
        }

        let request = AnalysisRequest::pending(identifier, self.period.clone());
        slot.in_flight = Some(request.clone());
        self.status.send_replace(RequestStatus::Pending);
        Ok(request)
    }

    async fn call_engine(&self, wire: &AnalyzeInvoiceRequest) -> Result<AuditResult, EngineError> {
        let call = self.engine.analyze_invoice(wire);
        match self.timeout {
            Some(budget) => tokio::time::timeout(budget, call).await.unwrap_or_else(|_| {
                Err(EngineError::Timeout {
                    timeout_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
                })
            }),
            None => call.await,
        }
    }

    fn complete(
        &self,
        mut request: AnalysisRequest,
        response: Result<AuditResult, EngineError>,
    ) -> AnalysisOutcome {
        let (terminal, outcome) = match response {
            Ok(result) => {
                let stored = self.results.set(result);
                tracing::info!(
                    request_id = %request.id,
                    invoice = %request.identifier,
                    mismatches = stored.mismatches.len(),
                    risk = %stored.overall_risk,
                    "analysis complete"
                );
                (RequestStatus::Success, AnalysisOutcome::Success(stored))
            }
            Err(err) => {
                let failure = AnalysisFailure::new(request.identifier.clone(), &err);
                tracing::error!(
                    request_id = %request.id,
                    invoice = %request.identifier,
                    kind = ?failure.kind,
                    error = %err,
                    "analysis failed"
                );
                (RequestStatus::Failed, AnalysisOutcome::Failed(failure))
            }
        };

        if let Err(err) = request.advance(terminal) {
            tracing::error!(error = %err, "request lifecycle out of step");
        }

        let mut slot = self.slot.lock();
        slot.last_failure = match &outcome {
            AnalysisOutcome::Failed(failure) => Some(failure.clone()),
            _ => None,
        };
        slot.last = Some(request);
        slot.in_flight = None;
        self.status.send_replace(terminal);
        self.status.send_replace(RequestStatus::Idle);
        outcome
    }

    fn abandon(&self) {
        let mut slot = self.slot.lock();
        if let Some(request) = slot.in_flight.take() {
            tracing::warn!(
                request_id = %request.id,
                invoice = %request.identifier,
                "analysis request dropped before completion"
            );
        }
        self.status.send_replace(RequestStatus::Idle);
    }
}

/// Releases the slot if a submit future is dropped mid-flight
struct InFlight<'a> {
    controller: &'a RequestLifecycleController,
    armed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.abandon();
        }
    }
}
