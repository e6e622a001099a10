//! Renderer - turns a unit's markdown into an HTML fragment

mod markdown;

use anyhow::Result;

pub use markdown::MarkdownRenderer;

/// Excerpt marker inside a post body
pub const MORE_MARKER: &str = "<!-- more -->";

/// Converts markdown to a sanitized HTML fragment
///
/// Implementations must be pure functions of their input: rendering the same
/// text twice yields the same bytes.
pub trait Renderer: Send + Sync {
    /// Render markdown to HTML
    fn render(&self, markdown: &str) -> Result<String>;
}

/// Split excerpt from content (split by `<!-- more -->`)
///
/// Returns the excerpt, if any, and the full text with the marker removed.
pub fn split_excerpt(content: &str) -> (Option<String>, String) {
    if let Some(pos) = content.find(MORE_MARKER) {
        let excerpt = content[..pos].trim().to_string();
        let remaining = content[pos + MORE_MARKER.len()..].trim();
        let full = format!("{}\n\n{}", excerpt, remaining);
        (Some(excerpt), full)
    } else {
        (None, content.to_string())
    }
}
