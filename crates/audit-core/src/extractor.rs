//! Invoice identifier extraction
//!
//! The only gate before an analysis request may be issued. Pure: no
//! network, no shared state.

use crate::error::ExtractionFailure;
use audit_model::{Gstin, InvoiceId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// `INV-<letters>-<digits>`, ASCII only, any case
static INVOICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i-u)INV-[A-Z]+-[0-9]+").expect("invoice token pattern is valid"));

/// Whole-input GSTIN: demo `GSTIN_<suffix>` or the 15-character registration format
static GSTIN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i-u)^(GSTIN_[A-Z0-9]+|[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][0-9A-Z]Z[0-9A-Z])$")
        .expect("gstin pattern is valid")
});

/// Find the first invoice identifier in free text
///
/// # Errors
/// `ExtractionFailure` carrying the original input when no token matches.
pub fn extract(input: &str) -> Result<InvoiceId, ExtractionFailure> {
    INVOICE_TOKEN
        .find(input)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| ExtractionFailure::new(input))
}

/// Find an invoice identifier in a file name
///
/// Only the final path component is scanned; directory names never
/// contribute an identifier.
///
/// # Errors
/// `ExtractionFailure` carrying the path as given when no token matches.
pub fn extract_from_file_name(path: impl AsRef<Path>) -> Result<InvoiceId, ExtractionFailure> {
    let path = path.as_ref();
    let original = path.to_string_lossy();
    let name = path
        .file_name()
        .map_or_else(|| original.clone(), |n| n.to_string_lossy());

    extract(&name).map_err(|_| ExtractionFailure::new(original.into_owned()))
}

/// Interpret a search string as a vendor GSTIN
///
/// The whole trimmed input must be a GSTIN; the result is uppercased.
#[must_use]
pub fn extract_gstin(input: &str) -> Option<Gstin> {
    let trimmed = input.trim();
    if !GSTIN_TOKEN.is_match(trimmed) {
        return None;
    }
    trimmed.to_ascii_uppercase().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extracts_from_file_name_and_uppercases() {
        let id = extract_from_file_name("report-INV-ax-9.pdf").unwrap();
        assert_eq!(id.as_str(), "INV-AX-9");
    }

    #[test]
    fn file_name_without_token_fails() {
        let err = extract_from_file_name("quarterly-report.pdf").unwrap_err();
        assert_eq!(err.input, "quarterly-report.pdf");
    }

    #[test]
    fn directories_are_ignored() {
        let err = extract_from_file_name("/uploads/INV-AB-1/scan.pdf").unwrap_err();
        assert_eq!(err.input, "/uploads/INV-AB-1/scan.pdf");

        let id = extract_from_file_name("/uploads/batch/INV-AB-1.pdf").unwrap();
        assert_eq!(id.as_str(), "INV-AB-1");
    }

    #[test]
    fn extracts_from_chat_text() {
        let id = extract("please check inv-bd-1 for ITC issues").unwrap();
        assert_eq!(id.as_str(), "INV-BD-1");
    }

    #[test]
    fn gstin_search_strings() {
        assert_eq!(extract_gstin(" gstin_b ").unwrap().as_str(), "GSTIN_B");
        assert_eq!(
            extract_gstin("27aapfu0939f1zv").unwrap().as_str(),
            "27AAPFU0939F1ZV"
        );
        assert!(extract_gstin("INV-BD-1").is_none());
        assert!(extract_gstin("GSTIN_B please").is_none());
        assert!(extract_gstin("").is_none());
    }

    #[test]
    fn first_match_wins() {
        let id = extract("INV-AB-1 and INV-BC-2").unwrap();
        assert_eq!(id.as_str(), "INV-AB-1");
    }

    #[test]
    fn rejects_non_ascii_lookalikes() {
        assert!(extract("INV-ÄB-1").is_err());
        assert!(extract("INV-AB-١٢").is_err());
        assert!(extract("").is_err());
    }

    proptest! {
        #[test]
        fn prop_embedded_token_is_found(
            prefix in "[a-z ._]{0,12}",
            letters in "[a-zA-Z]{1,4}",
            digits in "[0-9]{1,5}",
            suffix in "[ .][a-z]{0,6}",
        ) {
            let input = format!("{prefix}INV-{letters}-{digits}{suffix}");
            let id = extract(&input).unwrap();
            prop_assert_eq!(
                id.as_str().to_string(),
                format!("INV-{}-{}", letters.to_ascii_uppercase(), digits)
            );
        }

        #[test]
        fn prop_extraction_is_deterministic(input in ".{0,40}") {
            prop_assert_eq!(extract(&input).ok(), extract(&input).ok());
        }
    }
}
