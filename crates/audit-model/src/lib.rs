//! Audit Model
//!
//! Typed view of everything the Analysis Engine hands back:
//! - Canonical invoice and taxpayer identifiers
//! - Audit results with their mismatches and traversal paths
//! - Vendor risk scores
//! - Wire schemas with validation at the boundary
//!
//! # Example
//!
//! ```rust,ignore
//! use audit_model::{decode_audit_result, InvoiceId};
//! use std::str::FromStr;
//!
//! let id = InvoiceId::from_str("inv-bd-1")?;
//! assert_eq!(id.as_str(), "INV-BD-1");
//!
//! let result = decode_audit_result(&body)?;
//! println!("{} mismatches", result.mismatches.len());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod amount;
mod audit;
mod error;
mod ids;
mod vendor;
pub mod wire;

pub use amount::Amount;
pub use audit::{AuditResult, Mismatch, Severity};
pub use error::SchemaError;
pub use ids::{EntityType, Gstin, InvoiceId, NodeRef};
pub use vendor::{RiskBucket, VendorRisk};
pub use wire::{decode_audit_result, decode_vendor_risk, AnalyzeInvoiceRequest};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
