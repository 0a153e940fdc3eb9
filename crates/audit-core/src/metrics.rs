//! Derived presentation state
//!
//! [`compute`] turns one [`AuditResult`] into everything the panels show.
//! It is a pure function of the result and the display settings; the
//! [`DerivedHub`] runs it once per store change and hands the same `Arc`
//! to every subscriber.

use crate::config::DisplayConfig;
use crate::format::shorten_id;
use crate::store::AuditResultStore;
use audit_model::{AuditResult, NodeRef, Severity};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Fallback root cause when the engine left it empty
const GENERIC_ROOT_CAUSE: &str = "tax discrepancies";

/// Whether the overall risk flags a circular trading pattern
///
/// Only meaningful for critical results; a result without mismatches is
/// never treated as cyclic.
#[inline]
#[must_use]
pub fn has_cycle(result: &AuditResult) -> bool {
    !result.mismatches.is_empty() && result.overall_risk.contains("Cycle")
}

/// One hop of a rendered traversal path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    /// Entity kind label (`Taxpayer`, `Invoice`, registry name, ...)
    pub label: String,
    /// Shortened id for display; empty when the hop has no id
    pub short_id: String,
    /// Last hop of the path
    pub is_terminal: bool,
}

/// Rendered traversal path of the first mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "steps", rename_all = "snake_case")]
pub enum PathSummary {
    /// Path reported by the engine
    Traversal(Vec<PathStep>),
    /// No path available; canonical `Supplier -> Invoice -> Buyer`
    Placeholder(Vec<PathStep>),
}

impl PathSummary {
    /// The two-hop placeholder
    #[must_use]
    pub fn placeholder() -> Self {
        let labels = ["Supplier", "Invoice", "Buyer"];
        Self::Placeholder(
            labels
                .iter()
                .enumerate()
                .map(|(i, label)| PathStep {
                    label: (*label).to_string(),
                    short_id: String::new(),
                    is_terminal: i + 1 == labels.len(),
                })
                .collect(),
        )
    }

    /// Whether this is the placeholder
    #[inline]
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Steps in order
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        match self {
            Self::Traversal(steps) | Self::Placeholder(steps) => steps,
        }
    }

    /// `A → B → C` rendering
    #[must_use]
    pub fn render(&self) -> String {
        self.steps()
            .iter()
            .map(|s| {
                if s.short_id.is_empty() {
                    s.label.clone()
                } else {
                    format!("{}({})", s.label, s.short_id)
                }
            })
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Reconciliation table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRow {
    /// Why the filings disagree
    pub root_cause: String,
    /// Formatted exposure
    pub exposure: String,
    /// Severity, if the engine supplied one
    pub severity: Option<Severity>,
    /// Number of hops in the traversal path
    pub hops: usize,
}

/// Everything the panels render for one result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedMetrics {
    /// At least one mismatch
    pub is_critical: bool,
    /// Number of mismatches
    pub mismatch_count: usize,
    /// Total exposure with currency grouping
    pub total_exposure_formatted: String,
    /// Overall risk flags a cycle (never for a non-critical result)
    pub has_cycle: bool,
    /// Overall risk reads as critical or high
    pub is_high_risk_label: bool,
    /// Rendered traversal path
    pub path_summary: PathSummary,
    /// Recommended action
    pub action_plan: String,
    /// Reconciliation panel headline
    pub reconciliation_headline: String,
    /// Reconciliation table rows, in mismatch order
    pub rows: Vec<MismatchRow>,
}

/// Derive presentation state from a result
#[must_use]
pub fn compute(result: &AuditResult, display: &DisplayConfig) -> DerivedMetrics {
    let currency = display.currency();
    let is_critical = !result.mismatches.is_empty();
    let total_exposure_formatted = currency.format(result.total_exposure);

    let action_plan = if is_critical {
        let root_cause = result
            .first_mismatch()
            .map(|m| m.root_cause.trim())
            .filter(|c| !c.is_empty())
            .unwrap_or(GENERIC_ROOT_CAUSE);
        format!(
            "Issue show-cause notice regarding {root_cause}. Recommend temporary block of \
             {total_exposure_formatted} ITC pending vendor clarification."
        )
    } else {
        "Clearance approved. No compliance issues discovered. Routine processing authorized."
            .to_string()
    };

    let reconciliation_headline = match result.mismatches.len() {
        0 => "Perfect 3-way match".to_string(),
        n => format!("{n} discrepancy flag(s) found"),
    };

    let rows = result
        .mismatches
        .iter()
        .map(|m| MismatchRow {
            root_cause: m.root_cause.clone(),
            exposure: currency.format(m.financial_exposure),
            severity: m.severity,
            hops: m.traversal_path.len(),
        })
        .collect();

    DerivedMetrics {
        is_critical,
        mismatch_count: result.mismatches.len(),
        total_exposure_formatted,
        has_cycle: has_cycle(result),
        is_high_risk_label: result.overall_risk.contains("Critical")
            || result.overall_risk.contains("High"),
        path_summary: path_summary(result, display),
        action_plan,
        reconciliation_headline,
        rows,
    }
}

fn path_summary(result: &AuditResult, display: &DisplayConfig) -> PathSummary {
    let Some(path) = result
        .mismatches
        .iter()
        .map(|m| &m.traversal_path)
        .find(|p| !p.is_empty())
    else {
        return PathSummary::placeholder();
    };

    let last = path.len() - 1;
    PathSummary::Traversal(
        path.iter()
            .enumerate()
            .map(|(i, node)| step(node, i == last, display))
            .collect(),
    )
}

fn step(node: &NodeRef, is_terminal: bool, display: &DisplayConfig) -> PathStep {
    let short_id = if node.entity_id.is_empty() {
        String::new()
    } else {
        shorten_id(&node.entity_id, display.short_id_len, &display.ellipsis)
    };
    PathStep {
        label: node.entity_type.label().to_string(),
        short_id,
        is_terminal,
    }
}

/// Shared, once-per-change derivation
///
/// Consumers subscribe here instead of deriving from the raw store
/// themselves. The background task stops when the result store is
/// disposed or the hub is dropped.
pub struct DerivedHub {
    rx: watch::Receiver<Option<Arc<DerivedMetrics>>>,
    results: AuditResultStore,
    source: watch::Receiver<Option<Arc<AuditResult>>>,
    computations: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for DerivedHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedHub")
            .field("computations", &self.computations())
            .finish_non_exhaustive()
    }
}

impl DerivedHub {
    /// Start deriving from `results`
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(results: &AuditResultStore, display: DisplayConfig) -> Self {
        let computations = Arc::new(AtomicU64::new(0));
        let mut changes = results.subscribe();

        let derive = {
            let computations = Arc::clone(&computations);
            move |value: Option<Arc<AuditResult>>, display: &DisplayConfig| {
                value.map(|result| {
                    computations.fetch_add(1, Ordering::Relaxed);
                    let metrics = compute(&result, display);
                    tracing::debug!(
                        mismatches = metrics.mismatch_count,
                        critical = metrics.is_critical,
                        "derived metrics recomputed"
                    );
                    Arc::new(metrics)
                })
            }
        };

        let initial = changes.value();
        let (tx, rx) = watch::channel(derive(initial.clone(), &display));
        let (source_tx, source) = watch::channel(initial);
        let task = tokio::spawn(async move {
            while let Ok(value) = changes.changed().await {
                // Metrics first: a matching source implies current metrics
                tx.send_replace(derive(value.clone(), &display));
                source_tx.send_replace(value);
            }
            tracing::debug!("result store disposed, derived hub stopped");
        });

        Self {
            rx,
            results: results.clone(),
            source,
            computations,
            task,
        }
    }

    /// Latest derived state
    #[must_use]
    pub fn current(&self) -> Option<Arc<DerivedMetrics>> {
        self.rx.borrow().clone()
    }

    /// Derived state once the hub has caught up with the result store
    ///
    /// Returns the last published state if the hub has stopped.
    pub async fn settled(&self) -> Option<Arc<DerivedMetrics>> {
        let mut source = self.source.clone();
        let caught_up = source
            .wait_for(|derived_from| {
                same_result(derived_from.as_ref(), self.results.value().as_ref())
            })
            .await;
        if caught_up.is_err() {
            tracing::debug!("derived hub stopped before catching up");
        }
        self.current()
    }

    /// Receiver notified on every recomputation
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DerivedMetrics>>> {
        self.rx.clone()
    }

    /// Number of derivations performed so far
    #[must_use]
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::Relaxed)
    }
}

fn same_result(a: Option<&Arc<AuditResult>>, b: Option<&Arc<AuditResult>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl Drop for DerivedHub {
    fn drop(&mut self) {
        self.task.abort();
    }
}
