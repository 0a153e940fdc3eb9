//! Console session
//!
//! Wires operator triggers to the extractor, both controllers and the
//! focus coordinator, and owns the derived-state hub every panel reads.

use crate::config::ConsoleConfig;
use crate::controller::{AnalysisOutcome, RequestLifecycleController};
use crate::engine::{AnalysisEngine, HttpAnalysisEngine};
use crate::error::{ConfigError, ExtractionFailure};
use crate::extractor::{extract, extract_from_file_name, extract_gstin};
use crate::focus::{Animator, FocusChange, GraphFocusCoordinator};
use crate::highlight::{highlight_nodes, NodeHighlight};
use crate::metrics::{DerivedHub, DerivedMetrics};
use crate::store::{AuditResultStore, VendorRiskStore};
use crate::vendor_risk::{VendorOutcome, VendorRiskController};
use audit_model::{Gstin, InvoiceId, NodeRef};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Something the operator did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Free text typed into the chat panel
    ChatMessage(String),
    /// A file dropped on the upload zone (file name only)
    FileDrop(String),
    /// Text submitted from the search box
    SearchSubmit(String),
    /// Explicit vendor profile lookup
    VendorLookup(String),
}

/// What a trigger led to
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// An analysis was submitted
    Analysis(AnalysisOutcome),
    /// A vendor risk lookup ran
    Vendor(VendorOutcome),
    /// Nothing recognisable in the input; the controller was not involved
    NotRecognized(ExtractionFailure),
}

/// One operator session over a single Analysis Engine
pub struct AuditConsole {
    analysis: RequestLifecycleController,
    vendors: VendorRiskController,
    focus: Mutex<GraphFocusCoordinator>,
    derived: DerivedHub,
    config: ConsoleConfig,
}

impl std::fmt::Debug for AuditConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditConsole")
            .field("analysis", &self.analysis)
            .field("vendors", &self.vendors)
            .field("focus", &*self.focus.lock())
            .finish_non_exhaustive()
    }
}

impl AuditConsole {
    /// Create session over an engine and animator
    ///
    /// Must be called inside a tokio runtime (the derived-state hub runs
    /// as a task).
    #[must_use]
    pub fn new(
        engine: Arc<dyn AnalysisEngine>,
        animator: Arc<dyn Animator>,
        config: ConsoleConfig,
    ) -> Self {
        let mut analysis =
            RequestLifecycleController::new(Arc::clone(&engine), config.engine.period.clone());
        if let Some(ms) = config.engine.request_timeout_ms {
            analysis = analysis.with_timeout(Duration::from_millis(ms));
        }
        let vendors = VendorRiskController::new(engine);
        let focus = GraphFocusCoordinator::new(animator, config.graph.registry(), config.focus);
        let derived = DerivedHub::spawn(&analysis.results(), config.display.clone());

        tracing::info!(
            period = %config.engine.period,
            nodes = config.graph.nodes.len(),
            "audit console session started"
        );

        Self {
            analysis,
            vendors,
            focus: Mutex::new(focus),
            derived,
            config,
        }
    }

    /// Create session against the HTTP engine named in `config`
    ///
    /// # Errors
    /// `ConfigError` if the engine URL is unusable.
    pub fn connect(config: ConsoleConfig, animator: Arc<dyn Animator>) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = HttpAnalysisEngine::new(&config.engine)?;
        Ok(Self::new(Arc::new(engine), animator, config))
    }

    /// Route a trigger
    pub async fn handle(&self, trigger: Trigger) -> TriggerOutcome {
        match trigger {
            Trigger::ChatMessage(text) => self.analyze_text(&text).await,
            Trigger::FileDrop(name) => match extract_from_file_name(&name) {
                Ok(id) => TriggerOutcome::Analysis(self.analyze(id).await),
                Err(failure) => not_recognized(failure),
            },
            Trigger::SearchSubmit(text) => {
                if let Ok(id) = extract(&text) {
                    return TriggerOutcome::Analysis(self.analyze(id).await);
                }
                match extract_gstin(&text) {
                    Some(gstin) => TriggerOutcome::Vendor(self.lookup_vendor(&gstin).await),
                    None => not_recognized(ExtractionFailure::new(text)),
                }
            }
            Trigger::VendorLookup(text) => match extract_gstin(&text)
                .or_else(|| text.trim().parse::<Gstin>().ok())
            {
                Some(gstin) => TriggerOutcome::Vendor(self.lookup_vendor(&gstin).await),
                None => not_recognized(ExtractionFailure::new(text)),
            },
        }
    }

    async fn analyze_text(&self, text: &str) -> TriggerOutcome {
        match extract(text) {
            Ok(id) => TriggerOutcome::Analysis(self.analyze(id).await),
            Err(failure) => not_recognized(failure),
        }
    }

    /// Submit an identifier, focusing its invoice node once admitted
    ///
    /// A successful result also refreshes the vendor panel with the
    /// supplier's risk profile. That fetch does not change the returned
    /// outcome; its failures stay in the vendor controller.
    pub async fn analyze(&self, identifier: InvoiceId) -> AnalysisOutcome {
        let outcome = self
            .analysis
            .submit_with(identifier, |request| {
                self.focus(Some(request.identifier.node_ref()));
            })
            .await;

        if let AnalysisOutcome::Success(result) = &outcome {
            match result.supplier().map(|node| node.entity_id.parse::<Gstin>()) {
                Some(Ok(gstin)) => {
                    self.vendors.fetch(&gstin).await;
                }
                Some(Err(err)) => tracing::debug!(%err, "supplier id is not a GSTIN"),
                None => tracing::debug!("no supplier on the traversal path"),
            }
        }
        outcome
    }

    /// Fetch a vendor's risk profile
    pub async fn lookup_vendor(&self, gstin: &Gstin) -> VendorOutcome {
        self.vendors.fetch(gstin).await
    }

    /// Move the graph focus
    pub fn focus(&self, node: Option<NodeRef>) -> FocusChange {
        self.focus.lock().focus(node)
    }

    /// Current focus target
    #[must_use]
    pub fn focus_target(&self) -> Option<NodeRef> {
        self.focus.lock().target().cloned()
    }

    /// Whether the camera is idling with auto-rotation
    #[must_use]
    pub fn auto_rotate(&self) -> bool {
        self.focus.lock().auto_rotate()
    }

    /// Highlight records for every known node
    #[must_use]
    pub fn highlights(&self) -> Vec<NodeHighlight> {
        let result = self.analysis.results().value();
        let focus = self.focus.lock();
        highlight_nodes(focus.registry(), result.as_deref(), focus.target())
    }

    /// Latest derived state
    ///
    /// Derivation runs on a background task, so right after `handle`
    /// returns this may still describe the previous result. Use
    /// [`Self::settled_derived`] to wait for the current one.
    #[must_use]
    pub fn derived(&self) -> Option<Arc<DerivedMetrics>> {
        self.derived.current()
    }

    /// Derived state for whatever the result store holds right now
    pub async fn settled_derived(&self) -> Option<Arc<DerivedMetrics>> {
        self.derived.settled().await
    }

    /// Subscribe to derived state
    #[must_use]
    pub fn subscribe_derived(&self) -> watch::Receiver<Option<Arc<DerivedMetrics>>> {
        self.derived.subscribe()
    }

    /// Audit result store
    #[must_use]
    pub fn results(&self) -> AuditResultStore {
        self.analysis.results()
    }

    /// Vendor risk store
    #[must_use]
    pub fn vendor_profiles(&self) -> VendorRiskStore {
        self.vendors.profiles()
    }

    /// Analysis controller
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &RequestLifecycleController {
        &self.analysis
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Clear both stores and return the camera to its default pose
    pub fn reset(&self) {
        self.analysis.reset();
        self.vendors.reset();
        self.focus(None);
    }
}

fn not_recognized(failure: ExtractionFailure) -> TriggerOutcome {
    tracing::warn!(input = %failure.input, "no identifier recognised");
    TriggerOutcome::NotRecognized(failure)
}
