//! Error types for the orchestration layer
//!
//! Failure kinds the console distinguishes:
//! - Extraction failures (no identifier in the operator's input)
//! - Transport failures (engine unreachable, non-2xx, timeout, bad payload)
//! - Illegal request lifecycle transitions
//! - Configuration errors

use crate::lifecycle::RequestStatus;
use audit_model::{InvoiceId, SchemaError};
use std::path::PathBuf;

/// Failure talking to the Analysis Engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Connection refused, DNS failure, reset, ...
    #[error("engine unreachable: {0}")]
    Network(String),

    /// Engine answered with a non-2xx status
    #[error("engine returned HTTP {code}: {body}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// No response within the configured budget
    #[error("engine did not answer within {timeout_ms}ms")]
    Timeout {
        /// Budget that elapsed
        timeout_ms: u64,
    },

    /// Response did not match the expected schema
    #[error("malformed engine response: {0}")]
    Malformed(#[from] SchemaError),
}

impl EngineError {
    /// Classify for the operator
    ///
    /// `404` and `422` mean the engine does not know the identifier; every
    /// other failure reads as the engine being offline.
    #[inline]
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Status { code: 404 | 422, .. } => FailureKind::IdentifierNotRecognized,
            _ => FailureKind::EngineOffline,
        }
    }

    /// Build from a reqwest error
    #[must_use]
    pub fn from_transport(err: &reqwest::Error, timeout_ms: Option<u64>) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                timeout_ms: timeout_ms.unwrap_or_default(),
            };
        }
        if let Some(status) = err.status() {
            return Self::Status {
                code: status.as_u16(),
                body: String::new(),
            };
        }
        Self::Network(err.to_string())
    }
}

/// Operator-facing failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Engine unreachable or misbehaving
    EngineOffline,
    /// Engine does not know the identifier
    IdentifierNotRecognized,
}

impl FailureKind {
    /// Fixed banner text
    #[inline]
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::EngineOffline => {
                "The analysis engine is offline. Check the engine service and try again."
            }
            Self::IdentifierNotRecognized => {
                "The analysis engine does not recognise this invoice identifier."
            }
        }
    }
}

/// A failed analysis, as exposed by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisFailure {
    /// Identifier that was being analysed
    pub identifier: InvoiceId,
    /// Failure class
    pub kind: FailureKind,
    /// Technical detail for logs
    pub detail: String,
}

impl AnalysisFailure {
    /// Create failure from an engine error
    #[inline]
    #[must_use]
    pub fn new(identifier: InvoiceId, error: &EngineError) -> Self {
        Self {
            identifier,
            kind: error.failure_kind(),
            detail: error.to_string(),
        }
    }

    /// Human-readable reason
    #[must_use]
    pub fn reason(&self) -> String {
        format!("{} ({})", self.kind.message(), self.identifier)
    }
}

impl std::fmt::Display for AnalysisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.identifier, self.detail)
    }
}

/// No invoice identifier could be found in the input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no invoice identifier in {input:?}")]
pub struct ExtractionFailure {
    /// The input exactly as received
    pub input: String,
}

impl ExtractionFailure {
    /// Create failure for the given input
    #[inline]
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Guidance shown to the operator
    #[must_use]
    pub fn guidance(&self) -> String {
        format!(
            "Could not detect a valid GST invoice identifier in \"{}\". \
             The file name must contain the identifier (e.g. INV-AX-9.pdf). \
             Rename the file or type the invoice identifier explicitly.",
            self.input
        )
    }
}

/// Request lifecycle errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition not in the lifecycle table
    #[error("illegal request transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current status
        from: RequestStatus,
        /// Requested status
        to: RequestStatus,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of its allowed range
    #[error("invalid config value: {0}")]
    Invalid(String),
}
