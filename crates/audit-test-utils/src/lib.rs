//! Testing utilities for the audit console workspace
//!
//! Shared test helpers and fixtures: a scripted engine, a recording
//! animator, canned results and the demo node layout.

#![allow(missing_docs)]

use async_trait::async_trait;
use audit_core::{
    AnalysisEngine, AnimationHandle, Animator, ConsoleConfig, Easing, EngineError, NodeEntry,
    NodeRegistry, RigPart, Vec3,
};
use audit_model::{
    Amount, AnalyzeInvoiceRequest, AuditResult, Gstin, InvoiceId, Mismatch, NodeRef, RiskBucket,
    Severity, VendorRisk,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Engine that replays queued replies
///
/// When gated, every analysis call waits for a permit from
/// [`ScriptedEngine::release`] before answering, so tests can hold a
/// request in `Pending`.
#[derive(Default)]
pub struct ScriptedEngine {
    analyses: Mutex<VecDeque<Result<AuditResult, EngineError>>>,
    vendors: Mutex<IndexMap<String, VecDeque<Result<VendorRisk, EngineError>>>>,
    requests: Mutex<Vec<AnalyzeInvoiceRequest>>,
    analysis_calls: AtomicUsize,
    vendor_calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold analysis calls until released
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn with_analysis(self, reply: Result<AuditResult, EngineError>) -> Self {
        self.analyses.lock().push_back(reply);
        self
    }

    pub fn with_vendor(self, gstin: &str, reply: Result<VendorRisk, EngineError>) -> Self {
        self.vendors
            .lock()
            .entry(gstin.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Let `n` gated analysis calls through
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn analysis_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst)
    }

    pub fn vendor_calls(&self) -> usize {
        self.vendor_calls.load(Ordering::SeqCst)
    }

    /// Bodies received by the analysis endpoint, in order
    pub fn requests(&self) -> Vec<AnalyzeInvoiceRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AnalysisEngine for ScriptedEngine {
    async fn analyze_invoice(
        &self,
        request: &AnalyzeInvoiceRequest,
    ) -> Result<AuditResult, EngineError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.analyses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Network("no scripted reply".into())))
    }

    async fn vendor_risk(&self, gstin: &Gstin) -> Result<VendorRisk, EngineError> {
        self.vendor_calls.fetch_add(1, Ordering::SeqCst);
        self.vendors
            .lock()
            .get_mut(gstin.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(EngineError::Status {
                    code: 404,
                    body: "{\"detail\": \"Not Found\"}".into(),
                })
            })
    }
}

pub fn not_found() -> EngineError {
    EngineError::Status {
        code: 404,
        body: "{\"detail\": \"Invoice not found\"}".into(),
    }
}

pub fn offline() -> EngineError {
    EngineError::Network("connection refused".into())
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationCall {
    pub part: RigPart,
    pub target: Vec3,
    pub duration: Duration,
    pub easing: Easing,
}

/// Animator that records calls; transitions never finish on their own
#[derive(Default)]
pub struct RecordingAnimator {
    calls: Mutex<Vec<AnimationCall>>,
    cancelled: Arc<AtomicUsize>,
    auto_rotate: AtomicBool,
}

impl RecordingAnimator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<AnimationCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self, part: RigPart) -> Option<AnimationCall> {
        self.calls.lock().iter().rev().find(|c| c.part == part).cloned()
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate.load(Ordering::SeqCst)
    }
}

struct RecordedHandle {
    finished: bool,
    cancelled: Arc<AtomicUsize>,
}

impl AnimationHandle for RecordedHandle {
    fn cancel(&mut self) {
        if !self.finished {
            self.finished = true;
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Animator for RecordingAnimator {
    fn animate_to(
        &self,
        part: RigPart,
        target: Vec3,
        duration: Duration,
        easing: Easing,
    ) -> Box<dyn AnimationHandle> {
        self.calls.lock().push(AnimationCall {
            part,
            target,
            duration,
            easing,
        });
        Box::new(RecordedHandle {
            finished: false,
            cancelled: Arc::clone(&self.cancelled),
        })
    }

    fn set_auto_rotate(&self, enabled: bool) {
        self.auto_rotate.store(enabled, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn invoice(id: &str) -> InvoiceId {
    InvoiceId::from_str(id).unwrap()
}

pub fn gstin(id: &str) -> Gstin {
    Gstin::from_str(id).unwrap()
}

pub fn amount(value: f64) -> Amount {
    Amount::new(value, "fixture").unwrap()
}

/// `INV-BD-1`: one missing-filing mismatch worth ₹1,45,000
pub fn critical_result() -> AuditResult {
    AuditResult::new(
        "High - Missing Filing",
        "GSTIN_B claimed ITC on INV-BD-1 but GSTIN_D never filed GSTR-1 for 2024-09.",
    )
    .with_invoice_id("INV-BD-1")
    .with_mismatches(vec![Mismatch::new(
        "Supplier did not file GSTR-1",
        amount(145_000.0),
    )
    .with_severity(Severity::High)
    .with_path(vec![
        NodeRef::taxpayer("GSTIN_D"),
        NodeRef::invoice("INV-BD-1"),
        NodeRef::taxpayer("GSTIN_B"),
    ])
    .with_evidence("gstr1_filed", serde_json::Value::Bool(false))])
    .with_total_exposure(amount(145_000.0))
}

/// Circular trading across A, B and C
pub fn cyclic_result() -> AuditResult {
    AuditResult::new(
        "Critical - Cycle Detected",
        "Invoices INV-AB-1, INV-BC-1 and INV-CA-1 form a closed loop.",
    )
    .with_invoice_id("INV-AB-1")
    .with_mismatches(vec![Mismatch::new(
        "Circular trading detected",
        amount(300_000.0),
    )
    .with_severity(Severity::Critical)
    .with_path(vec![
        NodeRef::taxpayer("GSTIN_A"),
        NodeRef::invoice("INV-AB-1"),
        NodeRef::taxpayer("GSTIN_B"),
        NodeRef::invoice("INV-BC-1"),
        NodeRef::taxpayer("GSTIN_C"),
        NodeRef::invoice("INV-CA-1"),
        NodeRef::taxpayer("GSTIN_A"),
    ])])
    .with_total_exposure(amount(300_000.0))
}

/// Perfect match, nothing to report
pub fn clean_result() -> AuditResult {
    AuditResult::new("Low", "All registries agree for INV-AB-1.").with_invoice_id("INV-AB-1")
}

pub fn vendor_profile(score: f64, bucket: RiskBucket) -> VendorRisk {
    let mut weights = IndexMap::new();
    weights.insert("circular_trading_involvement".to_string(), 0.45);
    weights.insert("network_risk_propagation".to_string(), 0.35);
    weights.insert("historical_mismatches".to_string(), 0.20);
    VendorRisk::new(score, bucket, weights).unwrap()
}

/// The demonstration graph layout
pub fn demo_nodes() -> Vec<(NodeRef, Vec3)> {
    vec![
        (NodeRef::taxpayer("GSTIN_A"), Vec3::new(-5.0, 0.0, -2.0)),
        (NodeRef::taxpayer("GSTIN_B"), Vec3::new(0.0, 2.0, 0.0)),
        (NodeRef::taxpayer("GSTIN_C"), Vec3::new(5.0, 0.0, -2.0)),
        (NodeRef::taxpayer("GSTIN_D"), Vec3::new(0.0, -4.0, 2.0)),
        (NodeRef::invoice("INV-AB-1"), Vec3::new(-2.5, 1.0, -1.0)),
        (NodeRef::invoice("INV-BC-1"), Vec3::new(2.5, 1.0, -1.0)),
        (NodeRef::invoice("INV-CA-1"), Vec3::new(0.0, 0.0, -3.0)),
        (NodeRef::invoice("INV-BD-1"), Vec3::new(0.0, -1.0, 1.0)),
    ]
}

pub fn demo_registry() -> NodeRegistry {
    demo_nodes().into_iter().collect()
}

/// Default config with the demo layout
pub fn demo_config() -> ConsoleConfig {
    let mut config = ConsoleConfig::new();
    config.graph.nodes = demo_nodes()
        .into_iter()
        .map(|(node, position)| NodeEntry {
            id: node.key(),
            position,
        })
        .collect();
    config
}
