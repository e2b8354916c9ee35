//! crates/lesson_studio_core/src/readiness.rs
//!
//! Decides whether generated content has the fields the document builder
//! needs for a given resource type. Purely diagnostic; never mutates state.

use crate::domain::Section;

//=========================================================================================
// Resource Family
//=========================================================================================

/// Resource families with family-specific readiness rules.
///
/// Determined once where a resource type name enters the system, instead of
/// re-deriving it with substring checks at every consumption site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFamily {
    Quiz,
    Worksheet,
    Generic,
}

impl ResourceFamily {
    /// Classifies a resource type name. `quiz`/`test` map to the quiz
    /// family, `worksheet` to the worksheet family, anything else is
    /// generic.
    pub fn classify(resource_type: &str) -> Self {
        let lower = resource_type.to_lowercase();
        if lower.contains("quiz") || lower.contains("test") {
            ResourceFamily::Quiz
        } else if lower.contains("worksheet") {
            ResourceFamily::Worksheet
        } else {
            ResourceFamily::Generic
        }
    }
}

//=========================================================================================
// Readiness Report
//=========================================================================================

/// The outcome of a readiness check, with a human-readable reason for the
/// diagnostics surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessReport {
    pub family: ResourceFamily,
    pub ready: bool,
    pub reason: String,
}

/// Checks whether `sections` are ready for document generation as
/// `resource_type`.
///
/// The family-specific rule takes priority over the generic content
/// fallback: a quiz whose sections all have empty `structured_questions` is
/// not ready even when `content` is populated.
pub fn check_readiness(resource_type: &str, sections: &[Section]) -> ReadinessReport {
    let family = ResourceFamily::classify(resource_type);

    let (ready, reason) = match family {
        ResourceFamily::Quiz => {
            let ready = sections.iter().any(|s| !s.structured_questions.is_empty());
            if ready {
                (true, "at least one section has structured questions".to_string())
            } else {
                (false, "no section has structured questions".to_string())
            }
        }
        ResourceFamily::Worksheet => {
            let ready = sections
                .iter()
                .any(|s| !s.exercises.is_empty() || !s.structured_activities.is_empty());
            if ready {
                (true, "at least one section has exercises or activities".to_string())
            } else {
                (false, "no section has exercises or structured activities".to_string())
            }
        }
        ResourceFamily::Generic => {
            let ready = sections.iter().any(|s| !s.content.is_empty());
            if ready {
                (true, "at least one section has content".to_string())
            } else {
                (false, "no section has content".to_string())
            }
        }
    };

    ReadinessReport { family, ready, reason }
}
