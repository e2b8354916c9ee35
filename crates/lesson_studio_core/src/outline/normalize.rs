//! crates/lesson_studio_core/src/outline/normalize.rs
//!
//! The single seam that absorbs the backend's per-resource-family shape
//! variance. Quiz responses carry `structured_questions`, worksheets carry
//! `exercises`/`structured_activities`, presentations carry plain `content`;
//! every downstream consumer gets one canonical `Section` regardless, while
//! the specialized arrays are preserved for the document builders.

use crate::domain::{RawEntry, RawSection, Section};

/// Fallback title when a section carries none of `title`/`heading`/`name`.
pub const UNTITLED: &str = "Untitled";

/// Normalizes one backend-shaped section into the canonical form.
pub fn normalize_section(raw: &RawSection) -> Section {
    let content = match &raw.content {
        Some(existing) => existing.clone(),
        None => flatten_specialized_arrays(raw),
    };

    let title = [&raw.title, &raw.heading, &raw.name]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    Section {
        title,
        layout: raw.layout.unwrap_or_default(),
        content,
        teacher_notes: cloned_or_empty(&raw.teacher_notes),
        visual_elements: cloned_or_empty(&raw.visual_elements),
        left_column: cloned_or_empty(&raw.left_column),
        right_column: cloned_or_empty(&raw.right_column),
        structured_questions: cloned_or_empty(&raw.structured_questions),
        exercises: cloned_or_empty(&raw.exercises),
        structured_activities: cloned_or_empty(&raw.structured_activities),
        questions: cloned_or_empty(&raw.questions),
        instructions: cloned_or_empty(&raw.instructions),
        answers: cloned_or_empty(&raw.answers),
    }
}

/// Normalizes a whole response payload.
pub fn normalize_sections(raws: &[RawSection]) -> Vec<Section> {
    raws.iter().map(normalize_section).collect()
}

/// Derives a flattened `content` array from whichever specialized arrays are
/// present, in a fixed priority order.
fn flatten_specialized_arrays(raw: &RawSection) -> Vec<String> {
    let sources: [&Option<Vec<RawEntry>>; 5] = [
        &raw.structured_questions,
        &raw.structured_activities,
        &raw.exercises,
        &raw.questions,
        &raw.items,
    ];

    sources
        .into_iter()
        .flatten()
        .flat_map(|entries| entries.iter().map(RawEntry::display_text))
        .collect()
}

fn cloned_or_empty<T: Clone>(field: &Option<Vec<T>>) -> Vec<T> {
    field.clone().unwrap_or_default()
}
