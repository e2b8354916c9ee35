//! crates/lesson_studio_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! workflow to be independent of the concrete HTTP backend and local storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{RawSection, Section, UsageLimits};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The distinguished error sentinel the backend uses for quota exhaustion.
pub const RATE_LIMIT_SENTINEL: &str = "RATE_LIMIT_EXCEEDED";

/// Metadata attached to a rate-limit rejection. Carried all the way to the
/// UI so the rate-limit case renders its own UX instead of a generic error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reset_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A generic error type for all port operations.
///
/// Timeouts are deliberately distinct from other transport failures, and the
/// rate-limit sentinel is a distinct variant rather than a message string.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limit exceeded")]
    RateLimited(RateLimitInfo),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Wire Types (the JSON contract with the generation backend)
//=========================================================================================

/// Request body for `POST /outline`. Field casing follows the backend
/// contract verbatim, which mixes camelCase and snake_case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlineRequest {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(rename = "gradeLevel")]
    pub grade_level: String,
    #[serde(rename = "subjectFocus")]
    pub subject_focus: String,
    pub language: String,
    #[serde(rename = "lessonTopic")]
    pub lesson_topic: String,
    pub custom_prompt: String,
    #[serde(rename = "numSlides")]
    pub num_slides: u8,
    #[serde(rename = "selectedStandards")]
    pub selected_standards: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub regeneration: bool,
    #[serde(
        rename = "regenerationCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub regeneration_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_outline: Option<String>,
}

/// Response body for `POST /outline`.
///
/// `messages` and `structured_content` are both required for a response to
/// be usable; the workflow enforces that, not the adapter, so the format
/// check stays in one place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutlineResponse {
    #[serde(default)]
    pub messages: Option<Vec<String>>,
    #[serde(default)]
    pub structured_content: Option<Vec<RawSection>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub usage_limits: Option<UsageLimits>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "rateLimit")]
    pub rate_limit: Option<RateLimitInfo>,
}

/// Request body for `POST /generate` (downloadable document).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub lesson_outline: String,
    pub structured_content: Vec<Section>,
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(rename = "gradeLevel")]
    pub grade_level: String,
    #[serde(rename = "subjectFocus")]
    pub subject_focus: String,
    pub language: String,
    #[serde(rename = "lessonTopic")]
    pub lesson_topic: String,
    pub district: String,
    #[serde(rename = "includeImages")]
    pub include_images: bool,
}

/// Request body for `POST /generate_slides`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlidesRequest {
    pub structured_content: Vec<Section>,
    pub meta: SlidesMeta,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlidesMeta {
    pub lesson_topic: String,
    pub district: String,
    pub grade_level: String,
    pub subject_focus: String,
}

/// Document format signaled by the response content-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Presentation,
    WordProcessing,
    Pdf,
}

/// A binary document returned by `POST /generate`.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub format: DocumentFormat,
    pub bytes: bytes::Bytes,
}

/// One finalized-outline record for the history/tracking collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub resource_type: String,
    pub lesson_topic: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait OutlineGenerationService: Send + Sync {
    /// Requests one lesson outline for a single resource type.
    async fn generate_outline(&self, request: &OutlineRequest) -> PortResult<OutlineResponse>;
}

#[async_trait]
pub trait DocumentGenerationService: Send + Sync {
    /// Converts a finalized outline into a downloadable binary document.
    async fn generate_document(&self, request: &DocumentRequest) -> PortResult<GeneratedDocument>;

    /// Builds a slide deck and returns its presentation URL.
    async fn generate_slides(&self, request: &SlidesRequest) -> PortResult<String>;
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    /// Records a finalized outline. Best-effort; callers must not block on
    /// or surface failures from this.
    async fn record(&self, entry: &HistoryEntry) -> PortResult<()>;
}
