//! Content module - content units, front matter, and the loader

mod frontmatter;
pub mod loader;
mod unit;

pub use frontmatter::{parse_date_string, FrontMatter};
pub use loader::{load_all, load_source, ContentLoader, ContentSource, LoadOutcome};
pub use unit::{ContentUnit, Rendered};
