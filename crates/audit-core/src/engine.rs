//! Analysis Engine client
//!
//! The [`AnalysisEngine`] trait is the seam between the orchestration
//! layer and the remote service. [`HttpAnalysisEngine`] speaks the two
//! HTTP endpoints; tests substitute scripted engines.

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError};
use async_trait::async_trait;
use audit_model::{
    decode_audit_result, decode_vendor_risk, AnalyzeInvoiceRequest, AuditResult, Gstin,
    VendorRisk,
};
use reqwest::{Client, Url};
use std::time::Duration;

/// Longest error body kept in `EngineError::Status`
const MAX_ERROR_BODY: usize = 512;

/// Remote analysis service
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// `POST /analyze-invoice`
    async fn analyze_invoice(
        &self,
        request: &AnalyzeInvoiceRequest,
    ) -> Result<AuditResult, EngineError>;

    /// `GET /vendor-risk/{gstin}`
    async fn vendor_risk(&self, gstin: &Gstin) -> Result<VendorRisk, EngineError>;
}

/// HTTP implementation of [`AnalysisEngine`]
#[derive(Debug, Clone)]
pub struct HttpAnalysisEngine {
    client: Client,
    base_url: Url,
    timeout_ms: Option<u64>,
}

impl HttpAnalysisEngine {
    /// Create client for the configured engine
    ///
    /// # Errors
    /// `ConfigError::Invalid` if the base URL cannot carry paths or the
    /// HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::Invalid(format!("engine.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "engine.base_url cannot carry paths: {base_url}"
            )));
        }

        let mut builder = Client::builder();
        if let Some(ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            timeout_ms: config.request_timeout_ms,
        })
    }

    /// Base URL in use
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn read(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, EngineError> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::from_transport(&e, self.timeout_ms))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| EngineError::from_transport(&e, self.timeout_ms))?;
        check_status(status, &body)?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl AnalysisEngine for HttpAnalysisEngine {
    async fn analyze_invoice(
        &self,
        request: &AnalyzeInvoiceRequest,
    ) -> Result<AuditResult, EngineError> {
        let url = self.endpoint(&["analyze-invoice"]);
        tracing::debug!(%url, invoice = %request.invoice_id, "posting analysis request");

        let body = self.read(self.client.post(url).json(request)).await?;
        let result = decode_audit_result(&body)?;
        if !result.exposure_is_consistent() {
            tracing::warn!(
                invoice = %request.invoice_id,
                total = %result.total_exposure,
                "engine reported exposure without mismatches"
            );
        }
        Ok(result)
    }

    async fn vendor_risk(&self, gstin: &Gstin) -> Result<VendorRisk, EngineError> {
        let url = self.endpoint(&["vendor-risk", gstin.as_str()]);
        tracing::debug!(%url, "fetching vendor risk");

        let body = self.read(self.client.get(url)).await?;
        Ok(decode_vendor_risk(&body)?)
    }
}

/// Map a non-2xx status to `EngineError::Status`
fn check_status(status: u16, body: &[u8]) -> Result<(), EngineError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let text = String::from_utf8_lossy(body);
    let body = match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    };
    Err(EngineError::Status { code: status, body })
}
