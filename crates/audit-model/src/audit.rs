//! Audit results returned by the invoice analysis endpoint

use crate::amount::Amount;
use crate::error::SchemaError;
use crate::ids::{EntityType, NodeRef};
use indexmap::IndexMap;
use serde::Serialize;
use std::str::FromStr;

/// Severity the engine attached to a single mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    /// Cosmetic discrepancy
    Low,
    /// Needs follow-up
    Medium,
    /// Blocks ITC
    High,
    /// Blocks ITC and indicates fraud patterns
    Critical,
}

impl Severity {
    /// Wire label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl FromStr for Severity {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            "Critical" => Ok(Self::Critical),
            other => Err(SchemaError::UnknownSeverity(other.to_string())),
        }
    }
}

/// A discrepancy between filings for the same invoice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Human-readable cause ("Invoice not reflected in GSTR-2B", ...)
    pub root_cause: String,
    /// ITC at stake for this mismatch
    pub financial_exposure: Amount,
    /// Entities the engine walked to explain the mismatch
    pub traversal_path: Vec<NodeRef>,
    /// Raw evidence, wire order preserved
    pub supporting_evidence: Option<IndexMap<String, serde_json::Value>>,
    /// Engine-assigned severity, if supplied
    pub severity: Option<Severity>,
}

impl Mismatch {
    /// Create mismatch with an empty path and no evidence
    #[inline]
    #[must_use]
    pub fn new(root_cause: impl Into<String>, financial_exposure: Amount) -> Self {
        Self {
            root_cause: root_cause.into(),
            financial_exposure,
            traversal_path: Vec::new(),
            supporting_evidence: None,
            severity: None,
        }
    }

    /// With traversal path
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: Vec<NodeRef>) -> Self {
        self.traversal_path = path;
        self
    }

    /// With severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// With a single evidence entry
    #[must_use]
    pub fn with_evidence(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.supporting_evidence
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Structured outcome of one invoice analysis
///
/// Immutable once stored; a later analysis replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditResult {
    /// Invoice the engine says it analysed (echoed back, optional)
    pub invoice_id: Option<String>,
    /// Free-form classification ("Low", "Critical (Cycle Detected)", ...)
    pub overall_risk: String,
    /// Sum of ITC at stake
    pub total_exposure: Amount,
    /// Detected mismatches, engine order
    pub mismatches: Vec<Mismatch>,
    /// Narrative explanation, newline separated
    pub explanation: String,
    /// Nodes the engine reports as members of a circular-trading loop
    ///
    /// `None` when the engine did not report membership at all.
    pub cycle_members: Option<Vec<NodeRef>>,
}

impl AuditResult {
    /// Create result with no mismatches
    #[inline]
    #[must_use]
    pub fn new(overall_risk: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            invoice_id: None,
            overall_risk: overall_risk.into(),
            total_exposure: Amount::ZERO,
            mismatches: Vec::new(),
            explanation: explanation.into(),
            cycle_members: None,
        }
    }

    /// With mismatches
    #[inline]
    #[must_use]
    pub fn with_mismatches(mut self, mismatches: Vec<Mismatch>) -> Self {
        self.mismatches = mismatches;
        self
    }

    /// With total exposure
    #[inline]
    #[must_use]
    pub fn with_total_exposure(mut self, total: Amount) -> Self {
        self.total_exposure = total;
        self
    }

    /// With echoed invoice id
    #[inline]
    #[must_use]
    pub fn with_invoice_id(mut self, id: impl Into<String>) -> Self {
        self.invoice_id = Some(id.into());
        self
    }

    /// With explicit cycle membership
    #[inline]
    #[must_use]
    pub fn with_cycle_members(mut self, members: Vec<NodeRef>) -> Self {
        self.cycle_members = Some(members);
        self
    }

    /// `total_exposure` is zero whenever there are no mismatches
    ///
    /// Producers are not forced to honour this; callers decide what to do.
    #[inline]
    #[must_use]
    pub fn exposure_is_consistent(&self) -> bool {
        !self.mismatches.is_empty() || self.total_exposure.is_zero()
    }

    /// First mismatch, if any
    #[inline]
    #[must_use]
    pub fn first_mismatch(&self) -> Option<&Mismatch> {
        self.mismatches.first()
    }

    /// Supplier behind the flagged invoice
    ///
    /// First taxpayer hop of the first non-empty traversal path.
    #[must_use]
    pub fn supplier(&self) -> Option<&NodeRef> {
        self.mismatches
            .iter()
            .find(|m| !m.traversal_path.is_empty())?
            .traversal_path
            .iter()
            .find(|node| node.entity_type == EntityType::Taxpayer && !node.entity_id.is_empty())
    }
}
