//! crates/lesson_studio_core/src/domain.rs
//!
//! Defines the core data structures of the application: the canonical
//! lesson-unit record (`Section`), the loosely-shaped section payloads the
//! backend actually returns (`RawSection`), and the three state records the
//! workflow mutates (form, content, subscription).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of standards a teacher can attach to one request.
pub const MAX_SELECTED_STANDARDS: usize = 3;

/// Maximum length of the free-text "Other" subject after sanitization.
pub const MAX_OTHER_SUBJECT_LEN: usize = 100;

//=========================================================================================
// Canonical Section Model
//=========================================================================================

/// Slide/section layout hint carried through from the backend.
///
/// Unknown layout strings from the backend degrade to `TitleAndContent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionLayout {
    TwoColumns,
    #[default]
    #[serde(other)]
    TitleAndContent,
}

/// One entry of a resource-specific array (`structured_questions`,
/// `exercises`, ...). The backend is not consistent here: quiz questions
/// arrive as objects, worksheet exercises sometimes as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    Text(String),
    Structured(serde_json::Map<String, serde_json::Value>),
}

impl RawEntry {
    /// Flattens the entry into display text.
    ///
    /// Strings pass through as-is. Objects yield the first present of
    /// `question`, `prompt`, `text`; otherwise a JSON rendering truncated to
    /// 200 characters with a `...` suffix.
    pub fn display_text(&self) -> String {
        match self {
            RawEntry::Text(s) => s.clone(),
            RawEntry::Structured(map) => {
                for key in ["question", "prompt", "text"] {
                    if let Some(serde_json::Value::String(s)) = map.get(key) {
                        return s.clone();
                    }
                }
                let rendered = serde_json::Value::Object(map.clone()).to_string();
                if rendered.chars().count() > 200 {
                    let truncated: String = rendered.chars().take(200).collect();
                    format!("{}...", truncated)
                } else {
                    rendered
                }
            }
        }
    }
}

/// A section exactly as the backend shaped it. Every field is optional;
/// which ones are populated depends on the resource family that produced
/// the response (quizzes use `structured_questions`, worksheets use
/// `exercises`/`structured_activities`, presentations use plain `content`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSection {
    pub title: Option<String>,
    pub heading: Option<String>,
    pub name: Option<String>,
    pub layout: Option<SectionLayout>,
    pub content: Option<Vec<String>>,
    pub structured_questions: Option<Vec<RawEntry>>,
    pub structured_activities: Option<Vec<RawEntry>>,
    pub exercises: Option<Vec<RawEntry>>,
    pub questions: Option<Vec<RawEntry>>,
    pub items: Option<Vec<RawEntry>>,
    pub teacher_notes: Option<Vec<String>>,
    pub visual_elements: Option<Vec<String>>,
    pub left_column: Option<Vec<String>>,
    pub right_column: Option<Vec<String>>,
    pub instructions: Option<Vec<String>>,
    pub answers: Option<Vec<RawEntry>>,
}

/// The canonical lesson-unit record every downstream consumer works with.
///
/// Invariant: `content` is always a real (possibly empty) array, regardless
/// of which backend shape the section came from. The resource-specific
/// arrays are preserved in addition to the flattened `content`, so the
/// quiz/worksheet document builders keep their original structured data.
/// `teacher_notes` and `visual_elements` are English-only by contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub layout: SectionLayout,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teacher_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visual_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub left_column: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub right_column: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structured_questions: Vec<RawEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<RawEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structured_activities: Vec<RawEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<RawEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<RawEntry>,
}

//=========================================================================================
// FormState (user-chosen generation parameters)
//=========================================================================================

/// The set of user-chosen generation parameters.
///
/// Reset wholesale on "clear" or "load example"; a change to one of the
/// significant fields (resource types, grade, subject, topic) additionally
/// clears previously generated content so stale results are never shown for
/// a new configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    /// One or many resource types (multi-select).
    pub resource_types: Vec<String>,
    pub grade_level: String,
    pub subject: String,
    /// Free-text escape hatch used when `subject` is "Other". Sanitized.
    pub other_subject: String,
    pub language: String,
    pub lesson_topic: String,
    pub district: String,
    pub custom_prompt: String,
    pub num_slides: u8,
    pub selected_standards: Vec<String>,
    pub include_images: bool,
}

impl FormState {
    /// The subject actually sent to the backend: the sanitized "Other" text
    /// when the teacher picked the escape hatch, otherwise the selection.
    pub fn effective_subject(&self) -> String {
        if self.subject == "Other" {
            sanitize_subject(&self.other_subject)
        } else {
            self.subject.clone()
        }
    }

    /// True when a field that invalidates previously generated content
    /// differs between the two form states.
    pub fn differs_significantly(&self, other: &FormState) -> bool {
        self.resource_types != other.resource_types
            || self.grade_level != other.grade_level
            || self.subject != other.subject
            || self.lesson_topic != other.lesson_topic
    }

    /// Replaces the selected standards, keeping at most
    /// [`MAX_SELECTED_STANDARDS`] entries.
    pub fn set_standards(&mut self, standards: Vec<String>) {
        self.selected_standards = standards;
        self.selected_standards.truncate(MAX_SELECTED_STANDARDS);
    }
}

/// Restricts the free-text subject to a safe character set and caps its
/// length. Allowed: letters, digits, space, `,.-&()`.
pub fn sanitize_subject(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | ',' | '.' | '-' | '&' | '(' | ')'))
        .take(MAX_OTHER_SUBJECT_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Clamps the requested slide count to the bounds of the resource family.
/// Presentations allow up to 18 slides; everything else up to 10.
pub fn clamp_num_slides(requested: i64, resource_type: &str) -> u8 {
    let max = if resource_type.to_lowercase().contains("presentation") {
        18
    } else {
        10
    };
    requested.clamp(1, max) as u8
}

//=========================================================================================
// UiState (transient workflow state)
//=========================================================================================

/// Transient workflow state. `regeneration_count` increments monotonically
/// per session and is never decremented; crossing its bound is a hard stop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub is_loading: bool,
    /// Single error slot; cleared explicitly (dismiss or a new operation),
    /// never implicitly on the next keystroke.
    pub error: Option<String>,
    pub outline_modal_open: bool,
    pub outline_confirmed: bool,
    pub regeneration_count: u8,
    /// The user's incremental regeneration request, cleared on success.
    pub modified_prompt: String,
    pub generate_outline_clicked: bool,
    /// Example mode bypasses the network path and all limit bookkeeping.
    pub is_example: bool,
}

//=========================================================================================
// ContentState (the generation result)
//=========================================================================================

/// The generation result. Created empty, populated once per successful
/// generation/regeneration call, and replaced (not merged) on each
/// regeneration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentState {
    pub title: String,
    /// The primary/active resource's sections.
    pub structured_content: Vec<Section>,
    /// The resource type whose sections are shown as primary.
    pub primary_resource_type: String,
    /// One entry per requested resource type.
    pub generated_resources: BTreeMap<String, Vec<Section>>,
    /// Rendered display string shown in the confirmation dialog.
    pub outline_to_confirm: String,
    /// Rendered display string fixed at finalization.
    pub final_outline: String,
}

//=========================================================================================
// SubscriptionState and usage-limit metadata
//=========================================================================================

/// Usage metadata piggy-backed on generation responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub generations_left: i64,
    #[serde(default)]
    pub reset_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub user_tier: Option<String>,
}

/// Subscription/quota state. Mutated only by merging `usage_limits`
/// metadata from generation responses (see [`crate::subscription`]),
/// plus one optimistic local decrement after a successful download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionState {
    pub is_premium: bool,
    pub generations_left: i64,
    pub downloads_remaining: i64,
    pub reset_time: Option<DateTime<Utc>>,
    pub user_tier: Option<String>,
}

impl SubscriptionState {
    /// Optimistic local decrement after a successful document download.
    pub fn record_download(&mut self) {
        self.downloads_remaining = (self.downloads_remaining - 1).max(0);
    }
}
