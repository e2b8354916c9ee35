//! crates/lesson_studio_core/src/workflow.rs
//!
//! The generation/regeneration state machine. Orchestrates the request
//! lifecycle over the service ports: initial generation with a per-resource
//! fan-out, bounded regeneration, the example-mode short-circuit, usage-limit
//! bookkeeping, finalization, and the document-generation gate.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ContentState, FormState, Section, SubscriptionState, UiState};
use crate::example::{example_form, example_sections, EXAMPLE_DELAY, EXAMPLE_TITLE};
use crate::outline::format::format_outline;
use crate::outline::normalize::normalize_sections;
use crate::ports::{
    DocumentGenerationService, DocumentRequest, GeneratedDocument, HistoryEntry, HistoryService,
    OutlineGenerationService, OutlineRequest, OutlineResponse, PortError, RateLimitInfo,
    SlidesMeta, SlidesRequest, RATE_LIMIT_SENTINEL,
};
use crate::prompt::{build_prompt, PromptMode, OUTLINE_PROMPT_TEMPLATE};
use crate::readiness::check_readiness;
use crate::subscription::apply_usage_limits;

/// Hard upper bound on accepted regenerations per session.
pub const MAX_REGENERATION_ATTEMPTS: u8 = 3;

//=========================================================================================
// Errors and Phases
//=========================================================================================

/// The error taxonomy of the workflow. Every variant is terminal for the
/// current operation (no automatic retry) and never corrupts
/// already-finalized state.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Missing required form fields; caught before any network call.
    #[error("Missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// The backend's distinguished quota sentinel, with its metadata.
    #[error("Rate limit exceeded")]
    RateLimited(RateLimitInfo),

    /// 200 response whose payload lacks the fields required to proceed.
    #[error("Invalid response format: {0}")]
    Format(String),

    /// Transport failure or non-2xx with no parseable error body.
    #[error("Network error: {0}")]
    Network(String),

    /// Distinguished from other transport failures.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Local precondition failure (regeneration count or quota); never
    /// results in a network request.
    #[error("{0}")]
    LimitExceeded(String),

    /// A generate/regenerate call arrived while one was already in flight.
    #[error("Another generation is already in progress")]
    Busy,

    /// The caller cancelled the in-flight request.
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation is not valid in the current phase.
    #[error("{0}")]
    InvalidState(String),

    /// An error body the backend surfaced verbatim.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<PortError> for WorkflowError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Timeout(m) => WorkflowError::Timeout(m),
            PortError::Network(m) => WorkflowError::Network(m),
            PortError::RateLimited(info) => WorkflowError::RateLimited(info),
            PortError::Backend(m) => WorkflowError::Backend(m),
            PortError::Unexpected(m) => WorkflowError::Backend(m),
        }
    }
}

/// The phases of the request lifecycle. `Failed` is recoverable: a new
/// generate (or a retry of regenerate when content survived) leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Generating,
    AwaitingConfirmation,
    Regenerating,
    Finalized,
    Failed,
}

//=========================================================================================
// Workflow
//=========================================================================================

/// Orchestrates the outline lifecycle over the service ports.
///
/// Single in-flight mutating operation at a time: a second generate or
/// regenerate while `ui.is_loading` is set is rejected with
/// [`WorkflowError::Busy`], independent of any UI affordance.
pub struct Workflow {
    outline_service: Arc<dyn OutlineGenerationService>,
    document_service: Arc<dyn DocumentGenerationService>,
    history_service: Arc<dyn HistoryService>,
    prompt_template: String,
    phase: WorkflowPhase,
    pub form: FormState,
    pub ui: UiState,
    pub content: ContentState,
    pub subscription: SubscriptionState,
}

impl Workflow {
    pub fn new(
        outline_service: Arc<dyn OutlineGenerationService>,
        document_service: Arc<dyn DocumentGenerationService>,
        history_service: Arc<dyn HistoryService>,
    ) -> Self {
        Self {
            outline_service,
            document_service,
            history_service,
            prompt_template: OUTLINE_PROMPT_TEMPLATE.to_string(),
            phase: WorkflowPhase::Idle,
            form: FormState::default(),
            ui: UiState::default(),
            content: ContentState::default(),
            subscription: SubscriptionState::default(),
        }
    }

    /// Replaces the default prompt template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    //-------------------------------------------------------------------------------------
    // Form and UI transitions
    //-------------------------------------------------------------------------------------

    /// Replaces the form. A change to a significant field (resource types,
    /// grade, subject, topic) clears previously generated content so stale
    /// results are never shown for a new configuration.
    pub fn update_form(&mut self, form: FormState) {
        if self.form.differs_significantly(&form) {
            self.content = ContentState::default();
            self.ui.outline_confirmed = false;
            self.ui.generate_outline_clicked = false;
            self.ui.is_example = false;
            self.phase = WorkflowPhase::Idle;
        }
        self.form = form;
    }

    /// Loads the example configuration and arms the example short-circuit.
    pub fn load_example(&mut self) {
        self.form = example_form();
        self.content = ContentState::default();
        self.ui = UiState {
            is_example: true,
            ..UiState::default()
        };
        self.phase = WorkflowPhase::Idle;
    }

    /// Resets form, content, and transient UI state wholesale. Subscription
    /// state survives; it is server-authoritative.
    pub fn clear(&mut self) {
        self.form = FormState::default();
        self.content = ContentState::default();
        self.ui = UiState::default();
        self.phase = WorkflowPhase::Idle;
    }

    /// Explicit dismissal of the single error slot.
    pub fn dismiss_error(&mut self) {
        self.ui.error = None;
    }

    /// Closes the confirmation dialog without confirming.
    pub fn close_outline_modal(&mut self) {
        self.ui.outline_modal_open = false;
    }

    //-------------------------------------------------------------------------------------
    // Generation
    //-------------------------------------------------------------------------------------

    /// Runs an initial generation for every selected resource type.
    ///
    /// Sequential fan-out, fail-fast: the first per-type failure aborts the
    /// remaining types and surfaces. On success the first processed type
    /// becomes the primary content shown in the confirmation view.
    pub async fn generate(&mut self) -> Result<(), WorkflowError> {
        if self.ui.is_loading {
            return Err(WorkflowError::Busy);
        }
        if let Err(error) = self.validate_form() {
            self.ui.error = Some(error.to_string());
            return Err(error);
        }

        self.ui.error = None;
        self.ui.is_loading = true;
        self.ui.generate_outline_clicked = true;
        self.phase = WorkflowPhase::Generating;
        info!(
            resource_types = ?self.form.resource_types,
            is_example = self.ui.is_example,
            "Outline generation started"
        );

        let result = if self.ui.is_example {
            self.generate_example().await
        } else {
            self.generate_via_backend().await
        };
        self.ui.is_loading = false;

        match result {
            Ok(()) => {
                self.content.outline_to_confirm = format_outline(&self.content.structured_content);
                self.ui.outline_modal_open = true;
                self.phase = WorkflowPhase::AwaitingConfirmation;
                info!("Outline generation finished");
                Ok(())
            }
            Err(error) => {
                self.phase = WorkflowPhase::Failed;
                self.ui.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Example short-circuit: fixed dataset, cosmetic delay, no network,
    /// and no quota checks or decrements of any kind.
    async fn generate_example(&mut self) -> Result<(), WorkflowError> {
        tokio::time::sleep(EXAMPLE_DELAY).await;

        let mut content = ContentState::default();
        for resource_type in &self.form.resource_types {
            let sections = example_sections(resource_type);
            if content.primary_resource_type.is_empty() {
                content.primary_resource_type = resource_type.clone();
                content.structured_content = sections.clone();
                content.title = EXAMPLE_TITLE.to_string();
            }
            content.generated_resources.insert(resource_type.clone(), sections);
        }
        self.content = content;
        Ok(())
    }

    async fn generate_via_backend(&mut self) -> Result<(), WorkflowError> {
        let resource_types = self.form.resource_types.clone();
        let mut content = ContentState::default();

        for resource_type in resource_types {
            let prompt = build_prompt(
                &self.prompt_template,
                &self.form,
                &resource_type,
                PromptMode::Initial,
            );
            let request = self.outline_request(&resource_type, prompt, false);
            let response = self.outline_service.generate_outline(&request).await?;
            let (title, sections) = self.ingest_response(response)?;

            if content.primary_resource_type.is_empty() {
                content.primary_resource_type = resource_type.clone();
                content.structured_content = sections.clone();
                content.title = title.unwrap_or_else(|| self.form.lesson_topic.clone());
            }
            content.generated_resources.insert(resource_type, sections);
        }

        // Committed only after every type succeeded; a mid-fan-out failure
        // leaves the previous content untouched.
        self.content = content;
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // Regeneration
    //-------------------------------------------------------------------------------------

    /// Regenerates the primary resource's outline with an incremental
    /// modification request.
    ///
    /// The attempt counter increments only after a confirmed successful
    /// response; a failed or cancelled regeneration does not consume one of
    /// the [`MAX_REGENERATION_ATTEMPTS`] attempts.
    pub async fn regenerate(
        &mut self,
        modified_text: &str,
        cancel: CancellationToken,
    ) -> Result<(), WorkflowError> {
        if self.ui.is_loading {
            return Err(WorkflowError::Busy);
        }
        if let Err(error) = self.check_regeneration_preconditions() {
            self.ui.error = Some(error.to_string());
            return Err(error);
        }

        self.ui.error = None;
        self.ui.modified_prompt = modified_text.to_string();
        self.ui.is_loading = true;
        self.phase = WorkflowPhase::Regenerating;
        info!(
            attempt = self.ui.regeneration_count + 1,
            resource_type = %self.content.primary_resource_type,
            "Outline regeneration started"
        );

        let result = if self.ui.is_example {
            self.regenerate_example(&cancel).await
        } else {
            self.regenerate_via_backend(modified_text, &cancel).await
        };
        self.ui.is_loading = false;

        match result {
            Ok((title, sections)) => {
                self.ui.regeneration_count += 1;
                if let Some(title) = title {
                    self.content.title = title;
                }
                let primary = self.content.primary_resource_type.clone();
                self.content.structured_content = sections.clone();
                self.content.generated_resources.insert(primary, sections);
                self.content.outline_to_confirm = format_outline(&self.content.structured_content);
                self.ui.modified_prompt.clear();
                self.phase = WorkflowPhase::AwaitingConfirmation;
                info!(count = self.ui.regeneration_count, "Outline regeneration accepted");
                Ok(())
            }
            Err(WorkflowError::Cancelled) => {
                // The in-flight response future was dropped; nothing could
                // have written over newer state.
                self.phase = WorkflowPhase::AwaitingConfirmation;
                info!("Outline regeneration cancelled");
                Err(WorkflowError::Cancelled)
            }
            Err(error) => {
                self.phase = WorkflowPhase::Failed;
                self.ui.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    fn check_regeneration_preconditions(&self) -> Result<(), WorkflowError> {
        if self.content.structured_content.is_empty()
            || !matches!(
                self.phase,
                WorkflowPhase::AwaitingConfirmation | WorkflowPhase::Failed
            )
        {
            return Err(WorkflowError::InvalidState(
                "no outline awaiting confirmation to regenerate".to_string(),
            ));
        }
        if self.ui.regeneration_count >= MAX_REGENERATION_ATTEMPTS {
            return Err(WorkflowError::LimitExceeded(format!(
                "Maximum regeneration attempts ({}) reached",
                MAX_REGENERATION_ATTEMPTS
            )));
        }
        if !self.ui.is_example
            && !self.subscription.is_premium
            && self.subscription.generations_left <= 0
        {
            return Err(WorkflowError::LimitExceeded(
                "No generations remaining on the current plan".to_string(),
            ));
        }
        Ok(())
    }

    async fn regenerate_example(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, Vec<Section>), WorkflowError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(WorkflowError::Cancelled),
            _ = tokio::time::sleep(EXAMPLE_DELAY) => {
                let sections = example_sections(&self.content.primary_resource_type);
                Ok((Some(EXAMPLE_TITLE.to_string()), sections))
            }
        }
    }

    async fn regenerate_via_backend(
        &mut self,
        modified_text: &str,
        cancel: &CancellationToken,
    ) -> Result<(Option<String>, Vec<Section>), WorkflowError> {
        let resource_type = self.content.primary_resource_type.clone();
        let prompt = build_prompt(
            &self.prompt_template,
            &self.form,
            &resource_type,
            PromptMode::Regeneration { modified_prompt: modified_text },
        );
        let mut request = self.outline_request(&resource_type, prompt, true);
        request.previous_outline = Some(self.content.outline_to_confirm.clone());

        let service = self.outline_service.clone();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled),
            response = async move { service.generate_outline(&request).await } => response?,
        };

        self.ingest_response(response)
    }

    //-------------------------------------------------------------------------------------
    // Finalization and document generation
    //-------------------------------------------------------------------------------------

    /// Confirms the outline. The history notification is best-effort and
    /// non-blocking; its failure never rolls back finalization.
    pub fn finalize(&mut self) -> Result<(), WorkflowError> {
        if self.content.structured_content.is_empty()
            || !matches!(
                self.phase,
                WorkflowPhase::AwaitingConfirmation | WorkflowPhase::Failed
            )
        {
            let error = WorkflowError::InvalidState(
                "cannot finalize without a generated outline".to_string(),
            );
            self.ui.error = Some(error.to_string());
            return Err(error);
        }

        self.content.final_outline = self.content.outline_to_confirm.clone();
        self.ui.outline_confirmed = true;
        self.ui.outline_modal_open = false;
        self.phase = WorkflowPhase::Finalized;

        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            resource_type: self.content.primary_resource_type.clone(),
            lesson_topic: self.form.lesson_topic.clone(),
            title: self.content.title.clone(),
            created_at: chrono::Utc::now(),
        };
        let history = self.history_service.clone();
        tokio::spawn(async move {
            if let Err(error) = history.record(&entry).await {
                warn!("Failed to record outline history: {}", error);
            }
        });

        info!("Outline finalized");
        Ok(())
    }

    /// Converts the finalized outline into a downloadable document, gated by
    /// the readiness check for the primary resource family.
    pub async fn generate_document(&mut self) -> Result<GeneratedDocument, WorkflowError> {
        self.ensure_ready_for_documents()?;

        let request = DocumentRequest {
            lesson_outline: self.content.final_outline.clone(),
            structured_content: self.content.structured_content.clone(),
            resource_type: self.content.primary_resource_type.clone(),
            grade_level: self.form.grade_level.clone(),
            subject_focus: self.form.effective_subject(),
            language: self.form.language.clone(),
            lesson_topic: self.form.lesson_topic.clone(),
            district: self.form.district.clone(),
            include_images: self.form.include_images,
        };
        let document = self.document_service.generate_document(&request).await?;
        self.subscription.record_download();
        Ok(document)
    }

    /// Builds a slide deck for the finalized outline and returns its URL.
    pub async fn generate_slides(&mut self) -> Result<String, WorkflowError> {
        self.ensure_ready_for_documents()?;

        let request = SlidesRequest {
            structured_content: self.content.structured_content.clone(),
            meta: SlidesMeta {
                lesson_topic: self.form.lesson_topic.clone(),
                district: self.form.district.clone(),
                grade_level: self.form.grade_level.clone(),
                subject_focus: self.form.effective_subject(),
            },
        };
        let url = self.document_service.generate_slides(&request).await?;
        self.subscription.record_download();
        Ok(url)
    }

    fn ensure_ready_for_documents(&mut self) -> Result<(), WorkflowError> {
        if self.phase != WorkflowPhase::Finalized {
            return Err(WorkflowError::InvalidState(
                "document generation requires a finalized outline".to_string(),
            ));
        }
        let report = check_readiness(
            &self.content.primary_resource_type,
            &self.content.structured_content,
        );
        if !report.ready {
            let error = WorkflowError::Format(format!(
                "content not ready for {}: {}",
                self.content.primary_resource_type, report.reason
            ));
            self.ui.error = Some(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // Shared internals
    //-------------------------------------------------------------------------------------

    fn validate_form(&self) -> Result<(), WorkflowError> {
        let mut missing = Vec::new();
        if self.form.grade_level.trim().is_empty() {
            missing.push("grade level".to_string());
        }
        if self.form.effective_subject().is_empty() {
            missing.push("subject".to_string());
        }
        if self.form.language.trim().is_empty() {
            missing.push("language".to_string());
        }
        if self.form.resource_types.is_empty() {
            missing.push("resource type".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::Validation(missing))
        }
    }

    fn outline_request(
        &self,
        resource_type: &str,
        prompt: String,
        regeneration: bool,
    ) -> OutlineRequest {
        OutlineRequest {
            resource_type: resource_type.to_string(),
            grade_level: self.form.grade_level.clone(),
            subject_focus: self.form.effective_subject(),
            language: self.form.language.clone(),
            lesson_topic: self.form.lesson_topic.clone(),
            custom_prompt: prompt,
            num_slides: self.form.num_slides,
            selected_standards: self.form.selected_standards.clone(),
            regeneration,
            regeneration_count: regeneration.then_some(self.ui.regeneration_count),
            previous_outline: None,
        }
    }

    /// Applies `usage_limits` (unconditionally, before any format checks),
    /// maps the in-body error contract, and normalizes the sections.
    fn ingest_response(
        &mut self,
        response: OutlineResponse,
    ) -> Result<(Option<String>, Vec<Section>), WorkflowError> {
        if let Some(limits) = &response.usage_limits {
            apply_usage_limits(&mut self.subscription, limits);
        }

        if let Some(error) = &response.error {
            if error == RATE_LIMIT_SENTINEL {
                return Err(WorkflowError::RateLimited(
                    response.rate_limit.clone().unwrap_or_default(),
                ));
            }
            return Err(WorkflowError::Backend(error.clone()));
        }

        let (Some(_messages), Some(raw_sections)) =
            (&response.messages, &response.structured_content)
        else {
            return Err(WorkflowError::Format(
                "missing messages or structured_content".to_string(),
            ));
        };

        Ok((response.title.clone(), normalize_sections(raw_sections)))
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawSection, UsageLimits};
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    //-------------------------------------------------------------------------------------
    // Mock ports
    //-------------------------------------------------------------------------------------

    #[derive(Default)]
    struct MockOutline {
        calls: AtomicUsize,
        requests: Mutex<Vec<OutlineRequest>>,
        scripted: Mutex<VecDeque<PortResult<OutlineResponse>>>,
        delay: Option<Duration>,
    }

    impl MockOutline {
        fn scripted(responses: Vec<PortResult<OutlineResponse>>) -> Self {
            Self {
                scripted: Mutex::new(responses.into()),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> OutlineRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl OutlineGenerationService for MockOutline {
        async fn generate_outline(&self, request: &OutlineRequest) -> PortResult<OutlineResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.scripted.lock().unwrap().pop_front() {
                Some(response) => response,
                None => Ok(good_response("Default")),
            }
        }
    }

    #[derive(Default)]
    struct MockDocuments;

    #[async_trait]
    impl DocumentGenerationService for MockDocuments {
        async fn generate_document(
            &self,
            _request: &DocumentRequest,
        ) -> PortResult<GeneratedDocument> {
            Ok(GeneratedDocument {
                format: crate::ports::DocumentFormat::Pdf,
                bytes: bytes::Bytes::from_static(b"%PDF"),
            })
        }

        async fn generate_slides(&self, _request: &SlidesRequest) -> PortResult<String> {
            Ok("https://slides.example/deck".to_string())
        }
    }

    #[derive(Default)]
    struct MockHistory {
        recorded: Mutex<Vec<HistoryEntry>>,
    }

    #[async_trait]
    impl HistoryService for MockHistory {
        async fn record(&self, entry: &HistoryEntry) -> PortResult<()> {
            self.recorded.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    //-------------------------------------------------------------------------------------
    // Helpers
    //-------------------------------------------------------------------------------------

    fn good_response(title: &str) -> OutlineResponse {
        OutlineResponse {
            messages: Some(vec!["Outline generated".to_string()]),
            structured_content: Some(vec![RawSection {
                title: Some(title.to_string()),
                content: Some(vec!["- Point A".to_string()]),
                ..RawSection::default()
            }]),
            title: Some(title.to_string()),
            usage_limits: Some(UsageLimits {
                generations_left: 4,
                ..UsageLimits::default()
            }),
            ..OutlineResponse::default()
        }
    }

    fn filled_form() -> FormState {
        FormState {
            resource_types: vec!["presentation".to_string()],
            grade_level: "5".to_string(),
            subject: "Science".to_string(),
            language: "English".to_string(),
            lesson_topic: "Cells".to_string(),
            num_slides: 5,
            ..FormState::default()
        }
    }

    fn workflow_with(outline: Arc<MockOutline>) -> (Workflow, Arc<MockHistory>) {
        let history = Arc::new(MockHistory::default());
        let workflow = Workflow::new(outline, Arc::new(MockDocuments), history.clone());
        (workflow, history)
    }

    async fn generated_workflow(outline: Arc<MockOutline>) -> Workflow {
        let (mut workflow, _) = workflow_with(outline);
        workflow.update_form(filled_form());
        workflow.generate().await.unwrap();
        workflow
    }

    //-------------------------------------------------------------------------------------
    // Generation
    //-------------------------------------------------------------------------------------

    #[tokio::test]
    async fn validation_error_lists_missing_fields_and_skips_network() {
        let outline = Arc::new(MockOutline::default());
        let (mut workflow, _) = workflow_with(outline.clone());
        workflow.update_form(FormState {
            subject: "Science".to_string(),
            language: "English".to_string(),
            resource_types: vec!["quiz".to_string()],
            ..FormState::default()
        });

        let error = workflow.generate().await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("grade level"));
        assert!(!message.contains("subject"));
        assert_eq!(outline.call_count(), 0);
        assert_eq!(workflow.ui.error.as_deref(), Some(message.as_str()));
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn example_mode_bypasses_network_and_subscription_limits() {
        let outline = Arc::new(MockOutline::default());
        let (mut workflow, _) = workflow_with(outline.clone());
        workflow.load_example();
        workflow.subscription.generations_left = 0;
        workflow.subscription.is_premium = false;

        workflow.generate().await.unwrap();

        assert_eq!(outline.call_count(), 0);
        assert_eq!(workflow.subscription.generations_left, 0);
        assert_eq!(workflow.phase(), WorkflowPhase::AwaitingConfirmation);
        assert!(!workflow.content.structured_content.is_empty());
        assert!(workflow.ui.outline_modal_open);
    }

    #[tokio::test]
    async fn fan_out_issues_one_request_per_type_and_first_is_primary() {
        let outline = Arc::new(MockOutline::scripted(vec![
            Ok(good_response("Deck")),
            Ok(good_response("Quiz Pack")),
        ]));
        let (mut workflow, _) = workflow_with(outline.clone());
        let mut form = filled_form();
        form.resource_types = vec!["presentation".to_string(), "quiz".to_string()];
        workflow.update_form(form);

        workflow.generate().await.unwrap();

        assert_eq!(outline.call_count(), 2);
        assert_eq!(workflow.content.primary_resource_type, "presentation");
        assert_eq!(workflow.content.title, "Deck");
        assert_eq!(workflow.content.generated_resources.len(), 2);
        assert!(workflow.content.generated_resources.contains_key("quiz"));
    }

    #[tokio::test]
    async fn fan_out_fails_fast_and_leaves_content_untouched() {
        let outline = Arc::new(MockOutline::scripted(vec![
            Ok(good_response("Deck")),
            Err(PortError::Network("connection reset".to_string())),
            Ok(good_response("Never reached")),
        ]));
        let (mut workflow, _) = workflow_with(outline.clone());
        let mut form = filled_form();
        form.resource_types = vec![
            "presentation".to_string(),
            "quiz".to_string(),
            "worksheet".to_string(),
        ];
        workflow.update_form(form);

        let error = workflow.generate().await.unwrap_err();
        assert!(matches!(error, WorkflowError::Network(_)));
        // Third type never requested.
        assert_eq!(outline.call_count(), 2);
        assert!(workflow.content.structured_content.is_empty());
        assert_eq!(workflow.phase(), WorkflowPhase::Failed);
        assert!(workflow.ui.error.is_some());
    }

    #[tokio::test]
    async fn missing_structured_content_is_a_format_error_but_limits_still_apply() {
        let response = OutlineResponse {
            messages: Some(vec!["ok".to_string()]),
            structured_content: None,
            usage_limits: Some(UsageLimits {
                generations_left: 2,
                ..UsageLimits::default()
            }),
            ..OutlineResponse::default()
        };
        let outline = Arc::new(MockOutline::scripted(vec![Ok(response)]));
        let (mut workflow, _) = workflow_with(outline);
        workflow.update_form(filled_form());

        let error = workflow.generate().await.unwrap_err();
        assert!(matches!(error, WorkflowError::Format(_)));
        assert!(error.to_string().contains("Invalid response format"));
        // The piggy-backed metadata was applied despite the failure.
        assert_eq!(workflow.subscription.generations_left, 2);
    }

    #[tokio::test]
    async fn rate_limit_sentinel_maps_to_distinct_error_with_metadata() {
        let response = OutlineResponse {
            error: Some(RATE_LIMIT_SENTINEL.to_string()),
            rate_limit: Some(RateLimitInfo {
                limit: Some(10),
                ..RateLimitInfo::default()
            }),
            ..OutlineResponse::default()
        };
        let outline = Arc::new(MockOutline::scripted(vec![Ok(response)]));
        let (mut workflow, _) = workflow_with(outline);
        workflow.update_form(filled_form());

        let error = workflow.generate().await.unwrap_err();
        match error {
            WorkflowError::RateLimited(info) => assert_eq!(info.limit, Some(10)),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn usage_limits_from_every_response_are_applied_last_writer() {
        let mut first = good_response("Deck");
        first.usage_limits = Some(UsageLimits {
            generations_left: 4,
            ..UsageLimits::default()
        });
        let mut second = good_response("Quiz");
        second.usage_limits = Some(UsageLimits {
            generations_left: 3,
            ..UsageLimits::default()
        });
        let outline = Arc::new(MockOutline::scripted(vec![Ok(first), Ok(second)]));
        let (mut workflow, _) = workflow_with(outline);
        let mut form = filled_form();
        form.resource_types = vec!["presentation".to_string(), "quiz".to_string()];
        workflow.update_form(form);

        workflow.generate().await.unwrap();
        assert_eq!(workflow.subscription.generations_left, 3);
    }

    #[tokio::test]
    async fn busy_guard_rejects_reentrant_calls() {
        let outline = Arc::new(MockOutline::default());
        let (mut workflow, _) = workflow_with(outline.clone());
        workflow.update_form(filled_form());
        workflow.ui.is_loading = true;

        assert!(matches!(workflow.generate().await, Err(WorkflowError::Busy)));
        assert!(matches!(
            workflow.regenerate("x", CancellationToken::new()).await,
            Err(WorkflowError::Busy)
        ));
        assert_eq!(outline.call_count(), 0);
    }

    //-------------------------------------------------------------------------------------
    // Regeneration
    //-------------------------------------------------------------------------------------

    #[tokio::test]
    async fn regeneration_succeeds_replaces_content_and_clears_prompt() {
        let outline = Arc::new(MockOutline::scripted(vec![
            Ok(good_response("Deck")),
            Ok(good_response("Deck v2")),
        ]));
        let mut workflow = generated_workflow(outline.clone()).await;

        workflow
            .regenerate("Add a quiz", CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(workflow.ui.regeneration_count, 1);
        assert_eq!(workflow.content.title, "Deck v2");
        assert!(workflow.ui.modified_prompt.is_empty());
        assert_eq!(workflow.phase(), WorkflowPhase::AwaitingConfirmation);

        let request = outline.last_request();
        assert!(request.regeneration);
        assert_eq!(request.regeneration_count, Some(0));
        assert!(request.previous_outline.is_some());
        let primary = request.custom_prompt.find("PRIMARY REQUIREMENTS").unwrap();
        let additional = request.custom_prompt.find("Add a quiz").unwrap();
        assert!(primary < additional);
    }

    #[tokio::test]
    async fn fourth_regeneration_is_rejected_without_a_network_call() {
        let outline = Arc::new(MockOutline::default());
        let mut workflow = generated_workflow(outline.clone()).await;
        let calls_after_generate = outline.call_count();

        for _ in 0..3 {
            workflow
                .regenerate("tweak", CancellationToken::new())
                .await
                .unwrap();
        }
        assert_eq!(workflow.ui.regeneration_count, 3);

        let error = workflow
            .regenerate("one more", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::LimitExceeded(_)));
        assert_eq!(workflow.ui.regeneration_count, 3);
        assert_eq!(outline.call_count(), calls_after_generate + 3);
    }

    #[tokio::test]
    async fn failed_regeneration_keeps_counter_and_previous_content() {
        let outline = Arc::new(MockOutline::scripted(vec![
            Ok(good_response("Deck")),
            Err(PortError::Timeout("100s elapsed".to_string())),
        ]));
        let mut workflow = generated_workflow(outline).await;
        let before = workflow.content.structured_content.clone();

        let error = workflow
            .regenerate("tweak", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::Timeout(_)));
        assert_eq!(workflow.ui.regeneration_count, 0);
        assert_eq!(workflow.content.structured_content, before);
        assert_eq!(workflow.phase(), WorkflowPhase::Failed);

        // Failed is recoverable: the next attempt may proceed.
        workflow
            .regenerate("tweak again", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(workflow.ui.regeneration_count, 1);
    }

    #[tokio::test]
    async fn regeneration_requires_quota_unless_premium_or_example() {
        let outline = Arc::new(MockOutline::default());
        let mut workflow = generated_workflow(outline.clone()).await;
        let calls_after_generate = outline.call_count();
        workflow.subscription.generations_left = 0;
        workflow.subscription.is_premium = false;

        let error = workflow
            .regenerate("tweak", CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(error, WorkflowError::LimitExceeded(_)));
        assert_eq!(outline.call_count(), calls_after_generate);

        workflow.subscription.is_premium = true;
        workflow
            .regenerate("tweak", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(workflow.ui.regeneration_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_regeneration_discards_the_late_response() {
        let outline = Arc::new(MockOutline {
            delay: Some(Duration::from_secs(30)),
            ..MockOutline::default()
        });
        let mut workflow = generated_workflow(outline.clone()).await;
        let before = workflow.content.structured_content.clone();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let error = workflow.regenerate("tweak", cancel).await.unwrap_err();

        assert!(matches!(error, WorkflowError::Cancelled));
        assert_eq!(workflow.ui.regeneration_count, 0);
        assert_eq!(workflow.content.structured_content, before);
        assert_eq!(workflow.phase(), WorkflowPhase::AwaitingConfirmation);
        assert!(workflow.ui.error.is_none());
    }

    //-------------------------------------------------------------------------------------
    // Finalization and documents
    //-------------------------------------------------------------------------------------

    #[tokio::test]
    async fn finalize_requires_generated_content() {
        let (mut workflow, _) = workflow_with(Arc::new(MockOutline::default()));
        let error = workflow.finalize().unwrap_err();
        assert!(matches!(error, WorkflowError::InvalidState(_)));
    }

    #[tokio::test]
    async fn finalize_fixes_outline_and_records_history() {
        let outline = Arc::new(MockOutline::default());
        let history = Arc::new(MockHistory::default());
        let mut workflow = Workflow::new(outline, Arc::new(MockDocuments), history.clone());
        workflow.update_form(filled_form());
        workflow.generate().await.unwrap();

        workflow.finalize().unwrap();
        assert_eq!(workflow.phase(), WorkflowPhase::Finalized);
        assert_eq!(workflow.content.final_outline, workflow.content.outline_to_confirm);
        assert!(!workflow.ui.outline_modal_open);

        // The history call is fire-and-forget; give it a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let recorded = history.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].resource_type, "presentation");
    }

    #[tokio::test]
    async fn document_generation_is_gated_by_family_readiness() {
        // A quiz whose sections only carry flattened content is not ready.
        let response = OutlineResponse {
            messages: Some(vec!["ok".to_string()]),
            structured_content: Some(vec![RawSection {
                title: Some("Quiz".to_string()),
                content: Some(vec!["- looks like content".to_string()]),
                ..RawSection::default()
            }]),
            ..OutlineResponse::default()
        };
        let outline = Arc::new(MockOutline::scripted(vec![Ok(response)]));
        let (mut workflow, _) = workflow_with(outline);
        let mut form = filled_form();
        form.resource_types = vec!["quiz".to_string()];
        workflow.update_form(form);
        workflow.generate().await.unwrap();
        workflow.finalize().unwrap();

        let error = workflow.generate_document().await.unwrap_err();
        assert!(matches!(error, WorkflowError::Format(_)));
        assert!(error.to_string().contains("not ready"));
    }

    #[tokio::test]
    async fn successful_download_decrements_quota_optimistically() {
        let outline = Arc::new(MockOutline::default());
        let (mut workflow, _) = workflow_with(outline);
        workflow.update_form(filled_form());
        workflow.subscription.downloads_remaining = 2;
        workflow.generate().await.unwrap();
        workflow.finalize().unwrap();

        let document = workflow.generate_document().await.unwrap();
        assert_eq!(document.format, crate::ports::DocumentFormat::Pdf);
        assert_eq!(workflow.subscription.downloads_remaining, 1);
    }

    //-------------------------------------------------------------------------------------
    // Form lifecycle
    //-------------------------------------------------------------------------------------

    #[tokio::test]
    async fn significant_form_change_clears_generated_content() {
        let outline = Arc::new(MockOutline::default());
        let mut workflow = generated_workflow(outline).await;
        assert!(!workflow.content.structured_content.is_empty());

        let mut form = workflow.form.clone();
        form.district = "Elsewhere".to_string();
        workflow.update_form(form);
        // District is not significant.
        assert!(!workflow.content.structured_content.is_empty());

        let mut form = workflow.form.clone();
        form.lesson_topic = "Volcanoes".to_string();
        workflow.update_form(form);
        assert!(workflow.content.structured_content.is_empty());
        assert_eq!(workflow.phase(), WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn clear_resets_everything_but_subscription() {
        let outline = Arc::new(MockOutline::default());
        let mut workflow = generated_workflow(outline).await;
        workflow.subscription.generations_left = 4;

        workflow.clear();
        assert_eq!(workflow.form, FormState::default());
        assert!(workflow.content.structured_content.is_empty());
        assert_eq!(workflow.ui.regeneration_count, 0);
        assert_eq!(workflow.subscription.generations_left, 4);
    }
}
