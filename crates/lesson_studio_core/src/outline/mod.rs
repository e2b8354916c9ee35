//! crates/lesson_studio_core/src/outline/mod.rs
//!
//! Outline ingestion and rendering: raw backend text → canonical sections →
//! confirmation display string. Bullet normalization is shared between the
//! parser and the formatter so a formatted outline re-parses to the same
//! bullet text.

pub mod bullets;
pub mod format;
pub mod normalize;
pub mod parser;

pub use format::{format_outline, NO_CONTENT_FALLBACK};
pub use normalize::{normalize_section, normalize_sections};
pub use parser::parse_outline;
