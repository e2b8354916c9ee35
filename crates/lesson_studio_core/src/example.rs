//! crates/lesson_studio_core/src/example.rs
//!
//! The fixed example dataset used when example mode is active. The example
//! path never touches the network or the subscription quota; a short
//! artificial delay keeps the UI transition readable, nothing more.

use std::time::Duration;

use crate::domain::{FormState, RawEntry, Section};
use crate::readiness::ResourceFamily;

/// Cosmetic delay injected on the example path.
pub const EXAMPLE_DELAY: Duration = Duration::from_millis(800);

/// Title of the example lesson.
pub const EXAMPLE_TITLE: &str = "The Water Cycle";

/// Form settings matching the example dataset.
pub fn example_form() -> FormState {
    FormState {
        resource_types: vec!["presentation".to_string()],
        grade_level: "5".to_string(),
        subject: "Science".to_string(),
        language: "English".to_string(),
        lesson_topic: "The Water Cycle".to_string(),
        district: String::new(),
        custom_prompt: String::new(),
        num_slides: 3,
        selected_standards: vec!["NGSS 5-ESS2-1".to_string()],
        include_images: false,
        other_subject: String::new(),
    }
}

/// Example sections shaped for the requested resource type.
pub fn example_sections(resource_type: &str) -> Vec<Section> {
    match ResourceFamily::classify(resource_type) {
        ResourceFamily::Quiz => quiz_sections(),
        ResourceFamily::Worksheet => worksheet_sections(),
        ResourceFamily::Generic => presentation_sections(),
    }
}

fn presentation_sections() -> Vec<Section> {
    vec![
        Section {
            title: "What Is the Water Cycle?".to_string(),
            content: vec![
                "- Water moves between the ocean, air, and land in a continuous loop".to_string(),
                "- The sun powers the whole cycle".to_string(),
            ],
            teacher_notes: vec!["- Ask students where rain comes from before revealing the diagram".to_string()],
            visual_elements: vec!["- Labeled diagram of the full water cycle".to_string()],
            ..Section::default()
        },
        Section {
            title: "Evaporation and Condensation".to_string(),
            content: vec![
                "- Heat turns liquid water into invisible water vapor".to_string(),
                "- Vapor cools high in the sky and forms clouds".to_string(),
            ],
            teacher_notes: vec!["- Demonstrate with a kettle and a cold lid if available".to_string()],
            visual_elements: vec!["- Photo sequence: puddle shrinking over a sunny day".to_string()],
            ..Section::default()
        },
        Section {
            title: "Precipitation and Collection".to_string(),
            content: vec![
                "- Clouds release rain, snow, sleet, or hail".to_string(),
                "- Water collects in rivers, lakes, and oceans and the cycle repeats".to_string(),
            ],
            teacher_notes: vec!["- Connect back to local weather from this week".to_string()],
            visual_elements: vec!["- Map of the local watershed".to_string()],
            ..Section::default()
        },
    ]
}

fn quiz_sections() -> Vec<Section> {
    let question = |q: &str| {
        let mut map = serde_json::Map::new();
        map.insert("question".to_string(), serde_json::json!(q));
        map.insert(
            "options".to_string(),
            serde_json::json!(["Evaporation", "Condensation", "Precipitation", "Collection"]),
        );
        RawEntry::Structured(map)
    };
    vec![Section {
        title: "Water Cycle Check".to_string(),
        content: vec![
            "Which stage turns liquid water into vapor?".to_string(),
            "Which stage forms clouds?".to_string(),
        ],
        structured_questions: vec![
            question("Which stage turns liquid water into vapor?"),
            question("Which stage forms clouds?"),
        ],
        ..Section::default()
    }]
}

fn worksheet_sections() -> Vec<Section> {
    vec![Section {
        title: "Label the Water Cycle".to_string(),
        content: vec![
            "Label each stage on the diagram".to_string(),
            "Describe what happens to a raindrop after it lands".to_string(),
        ],
        exercises: vec![
            RawEntry::Text("Label each stage on the diagram".to_string()),
            RawEntry::Text("Describe what happens to a raindrop after it lands".to_string()),
        ],
        instructions: vec!["- Work in pairs and compare answers".to_string()],
        ..Section::default()
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::check_readiness;

    #[test]
    fn example_sections_pass_their_own_readiness_check() {
        for resource_type in ["presentation", "quiz", "worksheet"] {
            let sections = example_sections(resource_type);
            let report = check_readiness(resource_type, &sections);
            assert!(report.ready, "{} example not ready: {}", resource_type, report.reason);
        }
    }

    #[test]
    fn example_form_satisfies_generation_preconditions() {
        let form = example_form();
        assert!(!form.grade_level.is_empty());
        assert!(!form.subject.is_empty());
        assert!(!form.language.is_empty());
        assert!(!form.resource_types.is_empty());
    }
}
