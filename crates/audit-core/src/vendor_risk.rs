//! Vendor risk fetches
//!
//! Independent of the analysis slot: fetches may overlap. Each fetch takes
//! a monotonic token and only the response carrying the latest token is
//! written, so the store never moves backwards to an older lookup.

use crate::engine::AnalysisEngine;
use crate::error::FailureKind;
use crate::store::{store, StoreWriter, VendorRiskStore};
use audit_model::{Gstin, VendorRisk};
use parking_lot::Mutex;
use std::sync::Arc;

/// Failed vendor risk lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorFailure {
    /// Vendor that was looked up
    pub gstin: Gstin,
    /// Failure class
    pub kind: FailureKind,
    /// Technical detail for logs
    pub detail: String,
}

/// Result of one `fetch` call
#[derive(Debug, Clone)]
pub enum VendorOutcome {
    /// Response written to the store
    Applied(Arc<VendorRisk>),
    /// A newer fetch was issued meanwhile; response discarded
    Stale {
        /// Token of the discarded fetch
        token: u64,
    },
    /// Engine call failed; the store is unchanged
    Failed(VendorFailure),
}

impl VendorOutcome {
    /// Whether the response reached the store
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Owns the write side of the vendor risk store
pub struct VendorRiskController {
    engine: Arc<dyn AnalysisEngine>,
    profiles: StoreWriter<VendorRisk>,
    latest: Mutex<u64>,
}

impl std::fmt::Debug for VendorRiskController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorRiskController")
            .field("latest", &*self.latest.lock())
            .finish_non_exhaustive()
    }
}

impl VendorRiskController {
    /// Create controller with a fresh, empty vendor risk store
    #[must_use]
    pub fn new(engine: Arc<dyn AnalysisEngine>) -> Self {
        let (profiles, _) = store();
        Self {
            engine,
            profiles,
            latest: Mutex::new(0),
        }
    }

    /// Read side of the vendor risk store
    #[must_use]
    pub fn profiles(&self) -> VendorRiskStore {
        self.profiles.reader()
    }

    /// Latest token issued
    #[must_use]
    pub fn latest_token(&self) -> u64 {
        *self.latest.lock()
    }

    /// Fetch the risk profile for a vendor
    pub async fn fetch(&self, gstin: &Gstin) -> VendorOutcome {
        let token = {
            let mut latest = self.latest.lock();
            *latest += 1;
            *latest
        };
        tracing::info!(%gstin, token, "vendor risk lookup issued");

        let response = self.engine.vendor_risk(gstin).await;

        // Token check and store write under one lock
        let latest = self.latest.lock();
        if *latest != token {
            tracing::warn!(%gstin, token, latest = *latest, "stale vendor risk response discarded");
            return VendorOutcome::Stale { token };
        }

        match response {
            Ok(profile) => {
                tracing::info!(
                    %gstin,
                    score = profile.compliance_score,
                    bucket = profile.risk_bucket.label(),
                    "vendor risk updated"
                );
                VendorOutcome::Applied(self.profiles.set(profile))
            }
            Err(err) => {
                tracing::error!(%gstin, error = %err, "vendor risk lookup failed");
                VendorOutcome::Failed(VendorFailure {
                    gstin: gstin.clone(),
                    kind: err.failure_kind(),
                    detail: err.to_string(),
                })
            }
        }
    }

    /// Clear the store and invalidate every in-flight fetch
    pub fn reset(&self) {
        let mut latest = self.latest.lock();
        *latest += 1;
        self.profiles.clear();
        tracing::info!("vendor risk store reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use async_trait::async_trait;
    use audit_model::{AnalyzeInvoiceRequest, AuditResult, RiskBucket};
    use indexmap::IndexMap;
    use std::str::FromStr;
    use tokio::sync::oneshot;

    /// Each lookup waits on a oneshot keyed by GSTIN
    struct Gated {
        gates: Mutex<IndexMap<String, oneshot::Receiver<Result<VendorRisk, EngineError>>>>,
    }

    #[async_trait]
    impl AnalysisEngine for Gated {
        async fn analyze_invoice(
            &self,
            _request: &AnalyzeInvoiceRequest,
        ) -> Result<AuditResult, EngineError> {
            Err(EngineError::Network("unused".into()))
        }

        async fn vendor_risk(&self, gstin: &Gstin) -> Result<VendorRisk, EngineError> {
            let gate = self.gates.lock().shift_remove(gstin.as_str());
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(EngineError::Network("gate dropped".into()))),
                None => Err(EngineError::Status {
                    code: 404,
                    body: String::new(),
                }),
            }
        }
    }

    fn profile(score: f64, bucket: RiskBucket) -> VendorRisk {
        VendorRisk::new(score, bucket, IndexMap::new()).unwrap()
    }

    fn gstin(text: &str) -> Gstin {
        Gstin::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn older_response_is_discarded() {
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let mut gates = IndexMap::new();
        gates.insert("GSTIN_A".to_string(), rx_a);
        gates.insert("GSTIN_B".to_string(), rx_b);
        let controller = Arc::new(VendorRiskController::new(Arc::new(Gated {
            gates: Mutex::new(gates),
        })));

        let first = {
            let c = Arc::clone(&controller);
            tokio::spawn(async move { c.fetch(&gstin("GSTIN_A")).await })
        };
        while controller.latest_token() < 1 {
            tokio::task::yield_now().await;
        }
        let second = {
            let c = Arc::clone(&controller);
            tokio::spawn(async move { c.fetch(&gstin("GSTIN_B")).await })
        };
        while controller.latest_token() < 2 {
            tokio::task::yield_now().await;
        }

        tx_b.send(Ok(profile(12.0, RiskBucket::Low))).unwrap();
        assert!(second.await.unwrap().is_applied());

        tx_a.send(Ok(profile(91.0, RiskBucket::High))).unwrap();
        assert!(matches!(
            first.await.unwrap(),
            VendorOutcome::Stale { token: 1 }
        ));

        let stored = controller.profiles().value().unwrap();
        assert_eq!(stored.risk_bucket, RiskBucket::Low);
    }

    #[tokio::test]
    async fn failure_keeps_previous_profile() {
        let (tx, rx) = oneshot::channel();
        let mut gates = IndexMap::new();
        gates.insert("GSTIN_A".to_string(), rx);
        let controller = VendorRiskController::new(Arc::new(Gated {
            gates: Mutex::new(gates),
        }));

        tx.send(Ok(profile(40.0, RiskBucket::Medium))).unwrap();
        controller.fetch(&gstin("GSTIN_A")).await;
        let before = controller.profiles().value().unwrap();

        let outcome = controller.fetch(&gstin("GSTIN_UNKNOWN")).await;
        match outcome {
            VendorOutcome::Failed(failure) => {
                assert_eq!(failure.kind, FailureKind::IdentifierNotRecognized);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(Arc::ptr_eq(&before, &controller.profiles().value().unwrap()));
    }

    #[tokio::test]
    async fn reset_invalidates_in_flight() {
        let (tx, rx) = oneshot::channel();
        let mut gates = IndexMap::new();
        gates.insert("GSTIN_C".to_string(), rx);
        let controller = Arc::new(VendorRiskController::new(Arc::new(Gated {
            gates: Mutex::new(gates),
        })));

        let fetch = {
            let c = Arc::clone(&controller);
            tokio::spawn(async move { c.fetch(&gstin("GSTIN_C")).await })
        };
        while controller.latest_token() < 1 {
            tokio::task::yield_now().await;
        }
        controller.reset();

        tx.send(Ok(profile(77.0, RiskBucket::High))).unwrap();
        assert!(matches!(fetch.await.unwrap(), VendorOutcome::Stale { .. }));
        assert!(!controller.profiles().has_value());
    }
}
