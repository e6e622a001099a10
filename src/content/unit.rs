//! Content unit model

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// HTML produced by the render stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Full body fragment
    pub body: String,
    /// Fragment for the text before `<!-- more -->`, if the source had one
    pub excerpt: Option<String>,
}

/// One blog post
#[derive(Debug, Clone)]
pub struct ContentUnit {
    /// Unique identifier, used to build the output path
    pub slug: String,

    /// Post title
    pub title: String,

    /// Publication date (no time zone)
    pub date: NaiveDate,

    /// Raw markdown content, excerpt marker removed
    pub raw_body: String,

    /// Markdown before the excerpt marker
    pub excerpt: Option<String>,

    /// Post tags
    pub tags: Vec<String>,

    /// Layout template to use
    pub layout: String,

    /// False for drafts
    pub published: bool,

    /// Markdown file, or bundle directory for bundled posts
    pub source_path: PathBuf,

    /// Sibling files of a bundle, copied verbatim
    pub assets: BTreeSet<PathBuf>,

    /// Custom front-matter fields
    pub extra: IndexMap<String, serde_yaml::Value>,

    rendered: OnceLock<Rendered>,
}

impl ContentUnit {
    /// Create a new unit with minimal required fields
    pub fn new(slug: String, title: String, date: NaiveDate, source_path: PathBuf) -> Self {
        Self {
            slug,
            title,
            date,
            raw_body: String::new(),
            excerpt: None,
            tags: Vec::new(),
            layout: "post".to_string(),
            published: true,
            source_path,
            assets: BTreeSet::new(),
            extra: IndexMap::new(),
            rendered: OnceLock::new(),
        }
    }

    /// Rendered HTML, once the render stage has run
    pub fn rendered(&self) -> Option<&Rendered> {
        self.rendered.get()
    }

    /// Rendered body fragment, once the render stage has run
    pub fn rendered_body(&self) -> Option<&str> {
        self.rendered.get().map(|r| r.body.as_str())
    }

    /// Store the render result. Succeeds only the first time.
    pub fn set_rendered(&self, rendered: Rendered) -> Result<(), Rendered> {
        self.rendered.set(rendered)
    }

    /// Asset paths relative to the bundle directory
    pub fn relative_assets(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.assets.iter().filter_map(move |asset| {
            asset
                .strip_prefix(&self.source_path)
                .ok()
                .map(|relative| (asset.as_path(), relative))
        })
    }

    /// Scalar custom fields, stringified, in front-matter order
    pub fn scalar_extras(&self) -> impl Iterator<Item = (&str, String)> {
        self.extra.iter().filter_map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.as_str(), text))
        })
    }
}
