//! Helper functions for building page fragments
//!
//! Links, lists, pagers and dates that the orchestrator renders into layout
//! slots. Everything here is a pure function of its arguments.

mod date;
mod html;
mod list;
mod url;

pub use date::*;
pub use html::*;
pub use list::*;
pub use url::*;
