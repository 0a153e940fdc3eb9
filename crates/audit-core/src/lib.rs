//! Audit Core - analysis-result orchestration
//!
//! Everything between an operator trigger and the panels that render a
//! result:
//! - Extracts canonical invoice identifiers from text and file names
//! - Runs at most one analysis request at a time against the engine
//! - Holds the last result and vendor profile in single-writer stores
//! - Derives presentation state once per change and fans it out
//! - Drives the graph camera rig toward focused nodes
//!
//! # Example
//!
//! ```rust,ignore
//! use audit_core::{AuditConsole, ConsoleConfig, Trigger, TriggerOutcome};
//!
//! # async fn example(animator: std::sync::Arc<dyn audit_core::Animator>) -> Result<(), Box<dyn std::error::Error>> {
//! let console = AuditConsole::connect(ConsoleConfig::new(), animator)?;
//!
//! let outcome = console.handle(Trigger::FileDrop("report-INV-bd-1.pdf".into())).await;
//! if let Some(derived) = console.derived() {
//!     println!("{}", derived.action_plan);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod focus;
pub mod format;
pub mod highlight;
pub mod lifecycle;
pub mod metrics;
pub mod session;
pub mod store;
pub mod vendor_risk;

// Re-exports for convenience
pub use config::{ConsoleConfig, DisplayConfig, EngineConfig, FocusConfig, GraphConfig, NodeEntry};
pub use controller::{AnalysisOutcome, RequestLifecycleController};
pub use engine::{AnalysisEngine, HttpAnalysisEngine};
pub use error::{
    AnalysisFailure, ConfigError, EngineError, ExtractionFailure, FailureKind, TransitionError,
};
pub use extractor::{extract, extract_from_file_name, extract_gstin};
pub use focus::{
    AnimationHandle, Animator, Easing, FocusChange, GraphFocusCoordinator, NodeRegistry, RigPart,
    Vec3,
};
pub use format::{shorten_id, CurrencyFormat, DigitGrouping};
pub use highlight::{highlight_nodes, CycleFlag, NodeHighlight};
pub use lifecycle::{allowed_transitions, validate_transition, AnalysisRequest, RequestId, RequestStatus};
pub use metrics::{compute, DerivedHub, DerivedMetrics, MismatchRow, PathStep, PathSummary};
pub use session::{AuditConsole, Trigger, TriggerOutcome};
pub use store::{store, AuditResultStore, StoreClosed, StoreReader, StoreWriter, VendorRiskStore};
pub use vendor_risk::{VendorFailure, VendorOutcome, VendorRiskController};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Audit Core
    pub use crate::{
        AnalysisEngine, AnalysisOutcome, Animator, AuditConsole, ConsoleConfig, DerivedMetrics,
        FailureKind, GraphFocusCoordinator, RequestLifecycleController, RequestStatus, Trigger,
        TriggerOutcome, VendorOutcome,
    };
    pub use audit_model::{AuditResult, Gstin, InvoiceId, NodeRef, VendorRisk};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
