//! crates/lesson_studio_core/src/prompt.rs
//!
//! Assembles the outbound generation/regeneration prompt text from a
//! template and the form parameters. Regeneration does not simply
//! concatenate the new request onto the old one; it composes a block that
//! ranks the new requirements above the original ones.

use crate::domain::FormState;

/// Fallback for unset form values.
const NOT_SPECIFIED: &str = "Not specified";

/// Fallback for an unset custom prompt.
const NO_CUSTOM_PROMPT: &str = "None";

/// Default template for outline generation requests.
pub const OUTLINE_PROMPT_TEMPLATE: &str = r#"Create a lesson outline for a {resourceType} resource.

Topic: {topic}
Grade level: {gradeLevel}
Subject: {subject}
Language: {language}
School district: {district}
Standards: {standard}
Number of slides: {numSlides}

Structure every slide exactly as:
Slide N: <title>
Content:
- <bullet point>
Teacher Notes:
- <teacher note, in English>
Visual Elements:
- <visual element, in English>

Write the slide content in {language}. Teacher Notes and Visual Elements are always in English.

Additional instructions from the teacher:
{custom_prompt}"#;

/// Composed `{custom_prompt}` block used for regeneration requests.
///
/// The additional requirements outrank the primary ones, which in turn
/// outrank the default structure; the checklist makes the model verify the
/// ranking was honored.
const REGENERATION_BLOCK_TEMPLATE: &str = r#"PRIMARY REQUIREMENTS (from the original request):
{primary}

ADDITIONAL CRITICAL REQUIREMENTS (apply these first):
{additional}

Instructions:
1. The additional critical requirements take priority over everything else.
2. The primary requirements apply wherever they do not conflict with the additional critical requirements.
3. The default outline structure applies only where neither of the above specifies otherwise.

Before responding, verify that:
- Every additional critical requirement is reflected in the outline.
- No primary requirement was dropped unless it conflicted with an additional critical requirement.
- The slide count and slide structure still match the request."#;

/// Whether the prompt is for an initial generation or a regeneration with
/// an incremental modification request.
#[derive(Debug, Clone, Copy)]
pub enum PromptMode<'a> {
    Initial,
    Regeneration { modified_prompt: &'a str },
}

/// Builds the outbound prompt for one resource type.
///
/// Every placeholder in the template is substituted; none may survive in
/// the emitted prompt. Missing values fall back to "Not specified", except
/// the custom prompt, which falls back to "None".
pub fn build_prompt(
    template: &str,
    form: &FormState,
    resource_type: &str,
    mode: PromptMode<'_>,
) -> String {
    let custom_prompt = match mode {
        PromptMode::Initial => or_fallback(&form.custom_prompt, NO_CUSTOM_PROMPT),
        PromptMode::Regeneration { modified_prompt } => REGENERATION_BLOCK_TEMPLATE
            .replace("{primary}", &or_fallback(&form.custom_prompt, NO_CUSTOM_PROMPT))
            .replace("{additional}", &or_fallback(modified_prompt, NOT_SPECIFIED)),
    };

    let standards = if form.selected_standards.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        form.selected_standards.join("; ")
    };

    template
        .replace("{resourceType}", &or_fallback(resource_type, NOT_SPECIFIED))
        .replace("{topic}", &or_fallback(&form.lesson_topic, NOT_SPECIFIED))
        .replace("{gradeLevel}", &or_fallback(&form.grade_level, NOT_SPECIFIED))
        .replace("{subject}", &or_fallback(&form.effective_subject(), NOT_SPECIFIED))
        .replace("{language}", &or_fallback(&form.language, NOT_SPECIFIED))
        .replace("{district}", &or_fallback(&form.district, NOT_SPECIFIED))
        .replace("{standard}", &standards)
        .replace("{numSlides}", &form.num_slides.to_string())
        .replace("{custom_prompt}", &custom_prompt)
}

fn or_fallback(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACEHOLDERS: [&str; 9] = [
        "{topic}",
        "{language}",
        "{gradeLevel}",
        "{subject}",
        "{district}",
        "{numSlides}",
        "{custom_prompt}",
        "{standard}",
        "{resourceType}",
    ];

    fn filled_form() -> FormState {
        FormState {
            resource_types: vec!["presentation".into()],
            grade_level: "5".into(),
            subject: "Science".into(),
            language: "Spanish".into(),
            lesson_topic: "The water cycle".into(),
            district: "Riverside".into(),
            custom_prompt: "Use examples".into(),
            num_slides: 6,
            selected_standards: vec!["NGSS 5-ESS2-1".into(), "NGSS 5-PS1-1".into()],
            ..FormState::default()
        }
    }

    #[test]
    fn no_placeholder_survives_substitution() {
        for form in [filled_form(), FormState::default()] {
            let prompt = build_prompt(
                OUTLINE_PROMPT_TEMPLATE,
                &form,
                "presentation",
                PromptMode::Initial,
            );
            for placeholder in PLACEHOLDERS {
                assert!(
                    !prompt.contains(placeholder),
                    "{} survived in prompt",
                    placeholder
                );
            }
        }
    }

    #[test]
    fn missing_values_fall_back() {
        let prompt = build_prompt(
            OUTLINE_PROMPT_TEMPLATE,
            &FormState { num_slides: 5, ..FormState::default() },
            "worksheet",
            PromptMode::Initial,
        );
        assert!(prompt.contains("Topic: Not specified"));
        assert!(prompt.contains("Standards: Not specified"));
        assert!(prompt.contains("Additional instructions from the teacher:\nNone"));
    }

    #[test]
    fn standards_are_joined() {
        let prompt = build_prompt(
            OUTLINE_PROMPT_TEMPLATE,
            &filled_form(),
            "presentation",
            PromptMode::Initial,
        );
        assert!(prompt.contains("Standards: NGSS 5-ESS2-1; NGSS 5-PS1-1"));
    }

    #[test]
    fn regeneration_ranks_modification_above_original_prompt() {
        let prompt = build_prompt(
            OUTLINE_PROMPT_TEMPLATE,
            &filled_form(),
            "presentation",
            PromptMode::Regeneration { modified_prompt: "Add a quiz" },
        );

        let primary_label = prompt.find("PRIMARY REQUIREMENTS").unwrap();
        let additional_label = prompt.find("ADDITIONAL CRITICAL REQUIREMENTS").unwrap();
        let original = prompt.find("Use examples").unwrap();
        let modification = prompt.find("Add a quiz").unwrap();

        assert!(primary_label < original);
        assert!(additional_label < modification);
        assert!(original < additional_label, "original must sit under the primary label");
        assert!(prompt.contains("take priority over everything else"));
        assert!(prompt.contains("Before responding, verify"));
    }

    #[test]
    fn regeneration_with_empty_original_prompt_labels_it_none() {
        let mut form = filled_form();
        form.custom_prompt = String::new();
        let prompt = build_prompt(
            OUTLINE_PROMPT_TEMPLATE,
            &form,
            "presentation",
            PromptMode::Regeneration { modified_prompt: "Shorter slides" },
        );
        assert!(prompt.contains("PRIMARY REQUIREMENTS (from the original request):\nNone"));
        assert!(prompt.contains("Shorter slides"));
    }
}
