//! crates/lesson_studio_core/src/outline/format.rs
//!
//! Renders canonical sections back into the human-readable string shown in
//! the confirmation dialog. Pure and deterministic; idempotent for a given
//! canonical input.

use crate::domain::Section;
use crate::outline::bullets::bullet_text;

/// Literal fallback for an empty or malformed section list.
pub const NO_CONTENT_FALLBACK: &str = "No content available";

/// Separator rendered between sections.
const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Formats sections for the confirmation dialog.
///
/// Each section renders as a `Slide N: <title>` heading, a `Content:`
/// sub-heading, and one `• item` line per bullet. Sections are separated by
/// a horizontal rule; trailing whitespace is trimmed.
pub fn format_outline(sections: &[Section]) -> String {
    if sections.is_empty() {
        return NO_CONTENT_FALLBACK.to_string();
    }

    let blocks: Vec<String> = sections
        .iter()
        .enumerate()
        .map(|(i, section)| format_section(i + 1, section))
        .collect();

    blocks.join(SECTION_SEPARATOR).trim_end().to_string()
}

fn format_section(number: usize, section: &Section) -> String {
    let mut out = String::new();
    if section.title.is_empty() {
        out.push_str(&format!("Slide {}\n", number));
    } else {
        out.push_str(&format!("Slide {}: {}\n", number, section.title));
    }
    out.push_str("Content:\n");
    for item in &section.content {
        out.push_str(&format!("• {}\n", bullet_text(item)));
    }
    out.trim_end().to_string()
}
