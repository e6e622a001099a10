//! Template composer - places rendered fragments into named layout slots
//!
//! Layouts are opaque to the rest of the pipeline: callers hand over a
//! [`Blocks`] mapping and get a finished page back.

mod composer;
mod filters;
mod loader;

use indexmap::IndexMap;

use crate::error::ComposeError;

pub use composer::TeraComposer;
pub use loader::load_layouts;

/// Slot name to HTML fragment, in insertion order
pub type Blocks = IndexMap<String, String>;

/// The slot every layout must expose
pub const CONTENT_SLOT: &str = "content";

/// Slots a layout may use without the caller providing them
pub const OPTIONAL_SLOTS: &[&str] = &[
    "title",
    "date",
    "tags",
    "prev",
    "next",
    "pagination",
    "site_title",
    "site_url",
    "head",
    "description",
];

const CONTENT_PROBE: &str = "<!--quire:content-probe-->";

/// Fills layouts with blocks
pub trait Composer: Send + Sync {
    /// Compose `layout` with `blocks`
    ///
    /// Optional slots missing from `blocks` compose as empty strings; a
    /// mapping without `content` is rejected.
    fn compose(&self, layout: &str, blocks: &Blocks) -> Result<String, ComposeError>;

    /// Whether `layout` can be composed at all
    fn has_layout(&self, layout: &str) -> bool;

    /// Check that `layout` exposes the content slot
    fn validate(&self, layout: &str) -> Result<(), ComposeError> {
        let mut blocks = Blocks::new();
        blocks.insert(CONTENT_SLOT.to_string(), CONTENT_PROBE.to_string());

        let html = self.compose(layout, &blocks)?;
        if html.contains(CONTENT_PROBE) {
            Ok(())
        } else {
            Err(ComposeError::MissingRequiredSlot {
                layout: layout.to_string(),
                slot: CONTENT_SLOT,
            })
        }
    }
}
