//! crates/lesson_studio_core/src/outline/bullets.rs
//!
//! The single bullet-normalization seam used by both the parser and the
//! display formatter.

/// Normalizes one line into a canonical `- ` bullet item.
///
/// Accepts `-` or `•` glyphs, strips the glyph and surrounding whitespace,
/// and rejects empty items and horizontal rules (`---`).
pub fn normalize_bullet(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '-') {
        return None;
    }
    let stripped = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('•'))?;
    let item = stripped.trim();
    if item.is_empty() {
        None
    } else {
        Some(format!("- {}", item))
    }
}

/// Returns the text of a canonical bullet item without its `- ` marker.
/// Tolerates items that never carried a marker.
pub fn bullet_text(item: &str) -> &str {
    let trimmed = item.trim();
    trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('•'))
        .map(str::trim_start)
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_both_glyphs_to_dash() {
        assert_eq!(normalize_bullet("- Point A").as_deref(), Some("- Point A"));
        assert_eq!(normalize_bullet("• Point B").as_deref(), Some("- Point B"));
        assert_eq!(normalize_bullet("  -   spaced  ").as_deref(), Some("- spaced"));
    }

    #[test]
    fn rejects_empty_items_plain_text_and_rules() {
        assert_eq!(normalize_bullet("-"), None);
        assert_eq!(normalize_bullet("- "), None);
        assert_eq!(normalize_bullet("---"), None);
        assert_eq!(normalize_bullet("not a bullet"), None);
        assert_eq!(normalize_bullet(""), None);
    }

    #[test]
    fn bullet_text_strips_marker() {
        assert_eq!(bullet_text("- Point A"), "Point A");
        assert_eq!(bullet_text("• Point B"), "Point B");
        assert_eq!(bullet_text("bare"), "bare");
    }

    #[test]
    fn round_trip_is_stable() {
        let normalized = normalize_bullet("•  Point C ").unwrap();
        assert_eq!(normalize_bullet(&normalized).as_deref(), Some(normalized.as_str()));
        assert_eq!(bullet_text(&normalized), "Point C");
    }
}
