//! Boundary validation errors
//!
//! Every way an engine payload can fail to match the modelled shape.

/// Shape violation in an identifier or engine payload
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Body is not valid JSON or misses a required field
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Monetary amount below zero
    #[error("negative amount in {field}: {value}")]
    NegativeAmount {
        /// Offending field
        field: &'static str,
        /// Received value
        value: f64,
    },

    /// Monetary amount is NaN or infinite
    #[error("non-finite amount in {field}")]
    NonFiniteAmount {
        /// Offending field
        field: &'static str,
    },

    /// Compliance score outside 0..=100
    #[error("compliance score out of range: {0}")]
    ScoreOutOfRange(f64),

    /// Feature weight outside [0, 1]
    #[error("feature weight for {feature} out of range: {weight}")]
    WeightOutOfRange {
        /// Feature name
        feature: String,
        /// Received weight
        weight: f64,
    },

    /// Risk bucket label not one of Low/Medium/High
    #[error("unknown risk bucket: {0}")]
    UnknownRiskBucket(String),

    /// Severity label not one of Low/Medium/High/Critical
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    /// Text does not follow the `INV-<letters>-<digits>` grammar
    #[error("invalid invoice identifier: {0:?}")]
    InvalidInvoiceId(String),

    /// Taxpayer registration identifier is empty or unusable in a path
    #[error("invalid GSTIN: {0:?}")]
    InvalidGstin(String),

    /// Traversal path entry with no content
    #[error("empty node reference in traversal path")]
    EmptyNodeRef,
}

impl SchemaError {
    /// Check if the error came from JSON decoding rather than a value check
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display() {
        let err = SchemaError::NegativeAmount {
            field: "total_exposure",
            value: -1.0,
        };
        assert!(err.to_string().contains("total_exposure"));
    }

    #[test]
    fn decode_error_classification() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(SchemaError::from(json_err).is_decode_error());
        assert!(!SchemaError::EmptyNodeRef.is_decode_error());
    }
}
