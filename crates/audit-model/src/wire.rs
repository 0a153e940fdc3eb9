//! Engine wire schemas
//!
//! Payloads are decoded into these loose shapes first and then validated
//! into the domain types. Any shape violation is a [`SchemaError`]; nothing
//! downstream ever sees an unchecked payload.

use crate::amount::Amount;
use crate::audit::{AuditResult, Mismatch, Severity};
use crate::error::SchemaError;
use crate::ids::{InvoiceId, NodeRef};
use crate::vendor::{RiskBucket, VendorRisk};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Body of `POST /analyze-invoice`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeInvoiceRequest {
    /// Canonical invoice identifier
    pub invoice_id: InvoiceId,
    /// Return period, e.g. `2024-09`
    pub period: String,
}

impl AnalyzeInvoiceRequest {
    /// Create request body
    #[inline]
    #[must_use]
    pub fn new(invoice_id: InvoiceId, period: impl Into<String>) -> Self {
        Self {
            invoice_id,
            period: period.into(),
        }
    }
}

/// Raw `AuditResult` as sent by the engine
#[derive(Debug, Clone, Deserialize)]
pub struct AuditResultWire {
    /// Echoed invoice id
    #[serde(default)]
    pub invoice_id: Option<String>,
    /// Free-form risk classification
    pub overall_risk: String,
    /// Sum of exposures
    pub total_exposure: f64,
    /// Mismatch list
    pub mismatches: Vec<MismatchWire>,
    /// Narrative
    pub explanation: String,
    /// Explicit cycle membership, `Type:id` strings
    #[serde(default)]
    pub cycle_members: Option<Vec<String>>,
}

/// Raw mismatch entry
#[derive(Debug, Clone, Deserialize)]
pub struct MismatchWire {
    /// Cause label
    pub root_cause: String,
    /// Exposure for this mismatch
    pub financial_exposure: f64,
    /// `Type:id` strings
    #[serde(default)]
    pub traversal_path: Vec<String>,
    /// Evidence map
    #[serde(default)]
    pub supporting_evidence: Option<IndexMap<String, serde_json::Value>>,
    /// Severity label
    #[serde(default)]
    pub risk_severity: Option<String>,
}

/// Raw vendor risk payload
#[derive(Debug, Clone, Deserialize)]
pub struct VendorRiskWire {
    /// Score, possibly fractional
    pub compliance_risk_score: f64,
    /// Bucket label
    pub risk_bucket: String,
    /// Feature weights
    pub feature_importance: IndexMap<String, f64>,
}

fn parse_path(raw: Vec<String>) -> Result<Vec<NodeRef>, SchemaError> {
    raw.iter().map(|s| s.parse()).collect()
}

impl TryFrom<MismatchWire> for Mismatch {
    type Error = SchemaError;

    fn try_from(wire: MismatchWire) -> Result<Self, Self::Error> {
        Ok(Self {
            root_cause: wire.root_cause,
            financial_exposure: Amount::new(wire.financial_exposure, "financial_exposure")?,
            traversal_path: parse_path(wire.traversal_path)?,
            supporting_evidence: wire.supporting_evidence,
            severity: wire.risk_severity.as_deref().map(str::parse::<Severity>).transpose()?,
        })
    }
}

impl TryFrom<AuditResultWire> for AuditResult {
    type Error = SchemaError;

    fn try_from(wire: AuditResultWire) -> Result<Self, Self::Error> {
        let mismatches = wire
            .mismatches
            .into_iter()
            .map(Mismatch::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            // Echo is informational; a non-canonical echo is kept verbatim
            invoice_id: wire.invoice_id.map(|raw| match raw.parse::<InvoiceId>() {
                Ok(id) => id.to_string(),
                Err(_) => raw,
            }),
            overall_risk: wire.overall_risk,
            total_exposure: Amount::new(wire.total_exposure, "total_exposure")?,
            mismatches,
            explanation: wire.explanation,
            cycle_members: wire.cycle_members.map(parse_path).transpose()?,
        })
    }
}

impl TryFrom<VendorRiskWire> for VendorRisk {
    type Error = SchemaError;

    fn try_from(wire: VendorRiskWire) -> Result<Self, Self::Error> {
        let bucket: RiskBucket = wire.risk_bucket.parse()?;
        VendorRisk::new(wire.compliance_risk_score, bucket, wire.feature_importance)
    }
}

/// Decode and validate an `/analyze-invoice` response body
///
/// # Errors
/// Returns `SchemaError` on invalid JSON, missing fields or out-of-range values.
pub fn decode_audit_result(body: &[u8]) -> Result<AuditResult, SchemaError> {
    let wire: AuditResultWire = serde_json::from_slice(body)?;
    AuditResult::try_from(wire)
}

/// Decode and validate a `/vendor-risk/{gstin}` response body
///
/// # Errors
/// Returns `SchemaError` on invalid JSON, missing fields or out-of-range values.
pub fn decode_vendor_risk(body: &[u8]) -> Result<VendorRisk, SchemaError> {
    let wire: VendorRiskWire = serde_json::from_slice(body)?;
    VendorRisk::try_from(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityType;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    const CRITICAL_BODY: &str = r#"{
        "invoice_id": "INV-BD-1",
        "explanation": "Invoice INV-BD-1 failed reconciliation.\nSupplier Taxpayer:GSTIN_B is in a loop.",
        "mismatches": [{
            "root_cause": "Invoice not reflected in GSTR-2B",
            "traversal_path": ["Invoice:INV-BD-1", "Taxpayer:GSTIN_B", "GSTR2B (Missing for 2024-09)"],
            "financial_exposure": 145000.0,
            "risk_severity": "High",
            "supporting_evidence": {"invoice_id": "INV-BD-1"}
        }],
        "total_exposure": 145000.0,
        "overall_risk": "Critical (Cycle Detected)"
    }"#;

    #[test]
    fn request_serialises_wire_names() {
        let req = AnalyzeInvoiceRequest::new(InvoiceId::from_str("INV-BD-1").unwrap(), "2024-09");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"invoice_id": "INV-BD-1", "period": "2024-09"})
        );
    }

    #[test]
    fn decode_full_audit_result() {
        let result = decode_audit_result(CRITICAL_BODY.as_bytes()).unwrap();

        assert_eq!(result.invoice_id.as_deref(), Some("INV-BD-1"));
        assert_eq!(result.total_exposure.value(), 145_000.0);
        assert_eq!(result.mismatches.len(), 1);
        assert!(result.cycle_members.is_none());

        let m = &result.mismatches[0];
        assert_eq!(m.severity, Some(Severity::High));
        assert_eq!(m.traversal_path.len(), 3);
        assert_eq!(m.traversal_path[1], NodeRef::taxpayer("GSTIN_B"));
        assert!(matches!(m.traversal_path[2].entity_type, EntityType::Other(_)));
    }

    #[test]
    fn missing_mismatches_is_a_shape_violation() {
        let body = r#"{"overall_risk": "Low", "total_exposure": 0, "explanation": "ok"}"#;
        let err = decode_audit_result(body.as_bytes()).unwrap_err();
        assert!(err.is_decode_error());
    }

    #[test]
    fn missing_overall_risk_is_a_shape_violation() {
        let body = r#"{"mismatches": [], "total_exposure": 0, "explanation": "ok"}"#;
        assert!(decode_audit_result(body.as_bytes()).is_err());
    }

    #[test]
    fn negative_exposure_rejected() {
        let body = r#"{"overall_risk": "Low", "total_exposure": -3, "mismatches": [], "explanation": ""}"#;
        assert!(matches!(
            decode_audit_result(body.as_bytes()),
            Err(SchemaError::NegativeAmount { field: "total_exposure", .. })
        ));
    }

    #[test]
    fn explicit_cycle_members_decoded() {
        let body = r#"{
            "overall_risk": "Critical (Cycle Detected)",
            "total_exposure": 0,
            "mismatches": [],
            "explanation": "",
            "cycle_members": ["Taxpayer:GSTIN_A", "Taxpayer:GSTIN_B"]
        }"#;
        let result = decode_audit_result(body.as_bytes()).unwrap();
        assert_eq!(
            result.cycle_members,
            Some(vec![NodeRef::taxpayer("GSTIN_A"), NodeRef::taxpayer("GSTIN_B")])
        );
    }

    #[test]
    fn decode_vendor_risk_payload() {
        let body = r#"{
            "compliance_risk_score": 72.4,
            "risk_bucket": "Medium",
            "feature_importance": {
                "circular_trading_involvement": 0.45,
                "network_risk_propagation": 0.35,
                "historical_mismatches": 0.2
            },
            "graph_features_used": {"cycle_involvements": 1}
        }"#;
        let risk = decode_vendor_risk(body.as_bytes()).unwrap();
        assert_eq!(risk.compliance_score, 72);
        assert_eq!(risk.risk_bucket, RiskBucket::Medium);
        assert_eq!(
            risk.feature_importance.keys().next().map(String::as_str),
            Some("circular_trading_involvement")
        );
    }

    #[test]
    fn unknown_bucket_rejected() {
        let body = r#"{"compliance_risk_score": 10, "risk_bucket": "Tiny", "feature_importance": {}}"#;
        assert!(matches!(
            decode_vendor_risk(body.as_bytes()),
            Err(SchemaError::UnknownRiskBucket(_))
        ));
    }
}
