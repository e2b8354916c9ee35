//! services/studio/src/adapters/backend.rs
//!
//! HTTP adapter for the remote generation backend. Implements the
//! `OutlineGenerationService` and `DocumentGenerationService` ports from the
//! core crate over `POST /outline`, `POST /generate`, and
//! `POST /generate_slides`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use lesson_studio_core::ports::{
    DocumentFormat, DocumentGenerationService, DocumentRequest, GeneratedDocument,
    OutlineGenerationService, OutlineRequest, OutlineResponse, PortError, PortResult,
    SlidesRequest, RATE_LIMIT_SENTINEL,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that talks to the generation backend over HTTP.
#[derive(Clone)]
pub struct HttpBackendAdapter {
    client: reqwest::Client,
    base_url: String,
    /// Timeout for generation calls (outline and document conversion).
    generation_timeout: Duration,
    /// Timeout for simpler calls.
    request_timeout: Duration,
}

impl HttpBackendAdapter {
    /// Creates a new `HttpBackendAdapter`.
    pub fn new(base_url: String, generation_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            generation_timeout,
            request_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Maps a transport-level failure, keeping timeouts distinguishable from
/// other network errors.
fn map_transport_error(error: reqwest::Error) -> PortError {
    if error.is_timeout() {
        PortError::Timeout(error.to_string())
    } else {
        PortError::Network(error.to_string())
    }
}

/// Maps an in-body backend error, honoring the rate-limit sentinel.
fn map_body_error(body: &OutlineResponse) -> Option<PortError> {
    let error = body.error.as_deref()?;
    if error == RATE_LIMIT_SENTINEL {
        Some(PortError::RateLimited(body.rate_limit.clone().unwrap_or_default()))
    } else {
        Some(PortError::Backend(error.to_string()))
    }
}

/// Classifies a `POST /generate` response by its content type.
fn classify_content_type(content_type: &str) -> Option<DocumentFormat> {
    let lower = content_type.to_lowercase();
    if lower.contains("presentationml") || lower.contains("vnd.ms-powerpoint") {
        Some(DocumentFormat::Presentation)
    } else if lower.contains("wordprocessingml") || lower.contains("msword") {
        Some(DocumentFormat::WordProcessing)
    } else if lower.contains("pdf") {
        Some(DocumentFormat::Pdf)
    } else {
        None
    }
}

//=========================================================================================
// `OutlineGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl OutlineGenerationService for HttpBackendAdapter {
    async fn generate_outline(&self, request: &OutlineRequest) -> PortResult<OutlineResponse> {
        info!(
            resource_type = %request.resource_type,
            regeneration = request.regeneration,
            "POST /outline"
        );

        let response = self
            .client
            .post(self.url("/outline"))
            .timeout(self.generation_timeout)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            // A non-2xx body may still carry the structured error contract.
            if let Ok(body) = serde_json::from_str::<OutlineResponse>(&text) {
                if let Some(error) = map_body_error(&body) {
                    return Err(error);
                }
            }
            warn!(%status, "Outline request failed without a parseable error body");
            return Err(PortError::Network(format!("HTTP {}", status)));
        }

        let body: OutlineResponse = serde_json::from_str(&text)
            .map_err(|e| PortError::Unexpected(format!("Unparseable outline response: {}", e)))?;
        if let Some(error) = map_body_error(&body) {
            return Err(error);
        }
        Ok(body)
    }
}

//=========================================================================================
// `DocumentGenerationService` Trait Implementation
//=========================================================================================

/// JSON error body returned by the document endpoints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Success body of `POST /generate_slides`.
#[derive(Debug, Deserialize)]
struct SlidesResponse {
    presentation_url: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl DocumentGenerationService for HttpBackendAdapter {
    async fn generate_document(&self, request: &DocumentRequest) -> PortResult<GeneratedDocument> {
        info!(resource_type = %request.resource_type, "POST /generate");

        let response = self
            .client
            .post(self.url("/generate"))
            .timeout(self.generation_timeout)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !status.is_success() {
            let text = response.text().await.map_err(map_transport_error)?;
            if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
                if let Some(error) = body.error {
                    return Err(PortError::Backend(error));
                }
            }
            return Err(PortError::Network(format!("HTTP {}", status)));
        }

        match classify_content_type(&content_type) {
            Some(format) => {
                let bytes = response.bytes().await.map_err(map_transport_error)?;
                Ok(GeneratedDocument { format, bytes })
            }
            None => {
                // A 200 with a JSON body means the backend declined.
                let text = response.text().await.map_err(map_transport_error)?;
                if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
                    if let Some(error) = body.error {
                        return Err(PortError::Backend(error));
                    }
                }
                Err(PortError::Unexpected(format!(
                    "Unrecognized document content type: '{}'",
                    content_type
                )))
            }
        }
    }

    async fn generate_slides(&self, request: &SlidesRequest) -> PortResult<String> {
        info!("POST /generate_slides");

        let response = self
            .client
            .post(self.url("/generate_slides"))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body: SlidesResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Unparseable slides response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(PortError::Backend(error));
        }
        match body.presentation_url {
            Some(url) if status.is_success() => Ok(url),
            _ => Err(PortError::Network(format!("HTTP {}", status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_classification() {
        assert_eq!(
            classify_content_type(
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            ),
            Some(DocumentFormat::Presentation)
        );
        assert_eq!(
            classify_content_type(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            Some(DocumentFormat::WordProcessing)
        );
        assert_eq!(classify_content_type("application/pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(classify_content_type("application/json"), None);
        assert_eq!(classify_content_type(""), None);
    }

    #[test]
    fn body_error_mapping_honors_rate_limit_sentinel() {
        let body: OutlineResponse =
            serde_json::from_str(r#"{"error": "RATE_LIMIT_EXCEEDED", "rateLimit": {"limit": 3}}"#)
                .unwrap();
        match map_body_error(&body) {
            Some(PortError::RateLimited(info)) => assert_eq!(info.limit, Some(3)),
            other => panic!("expected RateLimited, got {:?}", other),
        }

        let body: OutlineResponse =
            serde_json::from_str(r#"{"error": "model overloaded"}"#).unwrap();
        assert!(matches!(map_body_error(&body), Some(PortError::Backend(_))));

        let body: OutlineResponse = serde_json::from_str("{}").unwrap();
        assert!(map_body_error(&body).is_none());
    }
}
