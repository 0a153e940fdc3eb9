//! Identifiers for invoices, taxpayers and graph nodes

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Canonical invoice identifier: `INV-<LETTERS>-<DIGITS>`, uppercase
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InvoiceId(String);

impl InvoiceId {
    /// Borrow the canonical text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Graph node for this invoice (`Invoice:<id>`)
    #[inline]
    #[must_use]
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(EntityType::Invoice, self.0.clone())
    }

    /// Check the full-string grammar, ignoring case
    #[must_use]
    pub fn is_valid(text: &str) -> bool {
        let mut parts = text.splitn(3, '-');
        let (Some(prefix), Some(letters), Some(digits)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        prefix.eq_ignore_ascii_case("INV")
            && !letters.is_empty()
            && letters.bytes().all(|b| b.is_ascii_alphabetic())
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
    }
}

impl FromStr for InvoiceId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_valid(s) {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(SchemaError::InvalidInvoiceId(s.to_string()))
        }
    }
}

impl TryFrom<String> for InvoiceId {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InvoiceId> for String {
    fn from(id: InvoiceId) -> Self {
        id.0
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Taxpayer registration identifier
///
/// Kept verbatim; only emptiness, whitespace and path separators are
/// rejected since the value ends up as a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gstin(String);

impl Gstin {
    /// Borrow the identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Graph node for this taxpayer (`Taxpayer:<gstin>`)
    #[inline]
    #[must_use]
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(EntityType::Taxpayer, self.0.clone())
    }
}

impl FromStr for Gstin {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(SchemaError::InvalidGstin(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for Gstin {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gstin> for String {
    fn from(gstin: Gstin) -> Self {
        gstin.0
    }
}

impl std::fmt::Display for Gstin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of entity a graph node stands for
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    /// A registered business
    Taxpayer,
    /// A tax invoice
    Invoice,
    /// Anything else the engine walked through (registry filings, e-invoices)
    Other(String),
}

impl EntityType {
    /// Label as it appears on the wire
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Taxpayer => "Taxpayer",
            Self::Invoice => "Invoice",
            Self::Other(label) => label,
        }
    }

    fn from_label(label: &str) -> Self {
        match label {
            "Taxpayer" => Self::Taxpayer,
            "Invoice" => Self::Invoice,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Reference to a node in the taxpayer/invoice graph
///
/// Identity is `entityType:entityId`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeRef {
    /// Entity kind
    pub entity_type: EntityType,
    /// Entity identifier (may be empty for `Other` steps)
    pub entity_id: String,
}

impl NodeRef {
    /// Create node reference
    #[inline]
    #[must_use]
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    /// Taxpayer node
    #[inline]
    #[must_use]
    pub fn taxpayer(id: impl Into<String>) -> Self {
        Self::new(EntityType::Taxpayer, id)
    }

    /// Invoice node
    #[inline]
    #[must_use]
    pub fn invoice(id: impl Into<String>) -> Self {
        Self::new(EntityType::Invoice, id)
    }

    /// Canonical `Type:id` key
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl FromStr for NodeRef {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SchemaError::EmptyNodeRef);
        }
        Ok(match s.split_once(':') {
            Some((label, id)) => Self::new(EntityType::from_label(label), id),
            None => Self::new(EntityType::Other(s.to_string()), String::new()),
        })
    }
}

impl TryFrom<String> for NodeRef {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeRef> for String {
    fn from(node: NodeRef) -> Self {
        node.to_string()
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.entity_type, self.entity_id.is_empty()) {
            (EntityType::Other(label), true) => f.write_str(label),
            (kind, _) => write!(f, "{}:{}", kind.label(), self.entity_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_id_normalises_case() {
        let id = InvoiceId::from_str("inv-ax-9").unwrap();
        assert_eq!(id.as_str(), "INV-AX-9");
    }

    #[test]
    fn invoice_id_rejects_bad_grammar() {
        for bad in ["INV-9-AX", "INV--9", "INV-AX-", "INVOICE-AX-9", "INV-AX-9X", ""] {
            assert!(InvoiceId::from_str(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn invoice_node_ref() {
        let id = InvoiceId::from_str("INV-BD-1").unwrap();
        assert_eq!(id.node_ref().key(), "Invoice:INV-BD-1");
    }

    #[test]
    fn gstin_rejects_path_separators() {
        assert!(Gstin::from_str("GSTIN_B").is_ok());
        assert!(Gstin::from_str("a/b").is_err());
        assert!(Gstin::from_str("   ").is_err());
    }

    #[test]
    fn node_ref_parses_known_and_other_types() {
        let node = NodeRef::from_str("Taxpayer:GSTIN_A").unwrap();
        assert_eq!(node.entity_type, EntityType::Taxpayer);
        assert_eq!(node.entity_id, "GSTIN_A");

        let step = NodeRef::from_str("GSTR1 (Missing for 2024-09)").unwrap();
        assert_eq!(
            step.entity_type,
            EntityType::Other("GSTR1 (Missing for 2024-09)".to_string())
        );
        assert_eq!(step.to_string(), "GSTR1 (Missing for 2024-09)");

        let einv = NodeRef::from_str("EInvoice:IRN:42").unwrap();
        assert_eq!(einv.entity_type, EntityType::Other("EInvoice".to_string()));
        assert_eq!(einv.entity_id, "IRN:42");
    }

    #[test]
    fn node_ref_serde_uses_wire_string() {
        let node = NodeRef::invoice("INV-BD-1");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, "\"Invoice:INV-BD-1\"");

        let back: NodeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
