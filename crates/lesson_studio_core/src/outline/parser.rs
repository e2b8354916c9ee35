//! crates/lesson_studio_core/src/outline/parser.rs
//!
//! Parses the raw text blob returned by the generation backend into an
//! ordered sequence of canonical sections. Malformed input universally
//! degrades to empty results; this layer never errors.

use regex::Regex;

use crate::domain::Section;
use crate::outline::bullets::normalize_bullet;

/// A leading artifact some backend responses prepend to the outline body.
const RAW_OUTLINE_PREFIX: &str = "Raw Outline Text:";

/// Parses `raw_text` into at most `expected_count` sections.
///
/// Segments are recognized by a `Slide <digits>:` marker at line start.
/// Excess segments beyond `expected_count` are silently discarded; a
/// shortfall is not padded. The caller receives fewer sections than
/// requested and must treat that as a valid, if incomplete, result.
pub fn parse_outline(raw_text: &str, expected_count: usize) -> Vec<Section> {
    let text = raw_text.trim();
    let text = text
        .strip_prefix(RAW_OUTLINE_PREFIX)
        .map(str::trim_start)
        .unwrap_or(text);

    let slide_marker = Regex::new(r"(?m)^Slide \d+:").unwrap();
    let starts: Vec<usize> = slide_marker.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return Vec::new();
    }

    // Lookahead split: each segment runs from its marker to the next one,
    // keeping the marker at the head of the segment.
    let mut segments: Vec<&str> = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let segment = text[start..end].trim();
        if !segment.is_empty() {
            segments.push(segment);
        }
    }
    segments.truncate(expected_count);

    segments.into_iter().map(parse_segment).collect()
}

/// Parses one `Slide N:`-headed segment into a section.
fn parse_segment(segment: &str) -> Section {
    let marker = Regex::new(r"^Slide \d+:\s*").unwrap();
    let first_line = segment.lines().next().unwrap_or("");
    // Missing or malformed title stays empty; defaulting happens downstream.
    let title = marker
        .find(first_line)
        .map(|m| first_line[m.end()..].trim().to_string())
        .unwrap_or_default();

    Section {
        title,
        content: extract_subsection(segment, "Content"),
        teacher_notes: extract_subsection(segment, "Teacher Notes"),
        visual_elements: extract_subsection(segment, "Visual Elements"),
        ..Section::default()
    }
}

/// Extracts the bullet items of one named sub-section.
///
/// The body runs from the header line until the next recognized header
/// (`Content:`, `Teacher Notes:`, `Visual Elements:`, the next `Slide N:`)
/// or the end of the segment, case-insensitive.
fn extract_subsection(segment: &str, header: &str) -> Vec<String> {
    let header_pattern = Regex::new(&format!(r"(?mi)^\s*{}:[ \t]*", regex::escape(header))).unwrap();
    let Some(found) = header_pattern.find(segment) else {
        return Vec::new();
    };

    let rest = &segment[found.end()..];
    let boundary =
        Regex::new(r"(?mi)^\s*(?:content:|teacher notes:|visual elements:|slide \d+:)").unwrap();
    let body_end = boundary.find(rest).map(|m| m.start()).unwrap_or(rest.len());

    rest[..body_end]
        .lines()
        .filter_map(normalize_bullet)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SLIDES: &str =
        "Slide 1: Intro\nContent:\n- Point A\n- Point B\n\nSlide 2: Body\nContent:\n- Point C";

    #[test]
    fn returns_min_of_segments_and_expected_count() {
        let sections = parse_outline(TWO_SLIDES, 5);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Intro");
        assert_eq!(sections[1].title, "Body");
        assert_eq!(sections[0].content, vec!["- Point A", "- Point B"]);
        assert_eq!(sections[1].content, vec!["- Point C"]);

        let truncated = parse_outline(TWO_SLIDES, 1);
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated[0].title, "Intro");
    }

    #[test]
    fn strips_raw_outline_prefix() {
        let raw = format!("Raw Outline Text:\n{}", TWO_SLIDES);
        let sections = parse_outline(&raw, 10);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Intro");
    }

    #[test]
    fn extracts_all_three_subsections() {
        let raw = "Slide 1: Water Cycle\n\
                   Content:\n- Evaporation\n- Condensation\n\
                   Teacher Notes:\n- Pace slowly\n\
                   Visual Elements:\n- Diagram of the cycle";
        let sections = parse_outline(raw, 3);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, vec!["- Evaporation", "- Condensation"]);
        assert_eq!(sections[0].teacher_notes, vec!["- Pace slowly"]);
        assert_eq!(sections[0].visual_elements, vec!["- Diagram of the cycle"]);
    }

    #[test]
    fn subsection_headers_match_case_insensitively() {
        let raw = "Slide 1: Title\nCONTENT:\n- Upper\nteacher notes:\n- lower";
        let sections = parse_outline(raw, 1);
        assert_eq!(sections[0].content, vec!["- Upper"]);
        assert_eq!(sections[0].teacher_notes, vec!["- lower"]);
    }

    #[test]
    fn bullet_glyphs_are_normalized() {
        let raw = "Slide 1: Mixed\nContent:\n• Dot bullet\n- Dash bullet\n•\n-";
        let sections = parse_outline(raw, 1);
        assert_eq!(sections[0].content, vec!["- Dot bullet", "- Dash bullet"]);
    }

    #[test]
    fn section_without_headers_yields_empty_arrays() {
        let raw = "Slide 1: Just a title and prose\nSome free text without bullets.";
        let sections = parse_outline(raw, 1);
        assert_eq!(sections[0].title, "Just a title and prose");
        assert!(sections[0].content.is_empty());
        assert!(sections[0].teacher_notes.is_empty());
        assert!(sections[0].visual_elements.is_empty());
    }

    #[test]
    fn missing_title_yields_empty_string() {
        let raw = "Slide 3:\nContent:\n- Something";
        let sections = parse_outline(raw, 1);
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[0].content, vec!["- Something"]);
    }

    #[test]
    fn unrecognizable_text_yields_no_sections() {
        assert!(parse_outline("no slide markers here", 5).is_empty());
        assert!(parse_outline("", 5).is_empty());
        // Marker must be at line start.
        assert!(parse_outline("see Slide 1: inline mention", 5).is_empty());
    }

    #[test]
    fn subsection_stops_at_next_slide_marker() {
        let raw = "Slide 1: A\nContent:\n- One\nSlide 2: B\nContent:\n- Two";
        let sections = parse_outline(raw, 5);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].content, vec!["- One"]);
        assert_eq!(sections[1].content, vec!["- Two"]);
    }

    #[test]
    fn expected_count_zero_returns_nothing() {
        assert!(parse_outline(TWO_SLIDES, 0).is_empty());
    }
}
