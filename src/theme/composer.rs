//! Tera-backed composer with built-in layouts

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error as _;
use std::path::Path;
use tera::{Context, Tera};

use super::{filters, load_layouts, Blocks, Composer, CONTENT_SLOT, OPTIONAL_SLOTS};
use crate::error::{ComposeError, ConfigError};

lazy_static! {
    static ref TAG_BODY: Regex = Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").unwrap();
    static ref STRING_LITERAL: Regex = Regex::new(r#""[^"]*"|'[^']*'"#).unwrap();
    static ref IDENTIFIER: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

/// Layouts bundled into the binary
const BUILTIN_LAYOUTS: &[(&str, &str)] = &[
    ("base.html", include_str!("default/base.html")),
    ("post.html", include_str!("default/post.html")),
    ("index.html", include_str!("default/index.html")),
];

/// Composer over a set of Tera layouts
///
/// Layouts are addressed by name with or without the `.html` extension, so
/// a unit's `layout: post` resolves to `post.html`.
pub struct TeraComposer {
    tera: Tera,
    /// Every name a layout could look up, composed as empty when not provided
    defaults: BTreeSet<String>,
}

impl TeraComposer {
    /// Composer with the built-in layouts only
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_layouts(Vec::new())
    }

    /// Built-in layouts, overridden and extended by the layouts in `dir`
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ConfigError> {
        Self::with_layouts(load_layouts(dir.as_ref())?)
    }

    /// Built-in layouts plus `layouts` as `(name, source)` pairs
    pub fn with_layouts(layouts: Vec<(String, String)>) -> Result<Self, ConfigError> {
        let mut tera = Tera::default();

        // Slots carry finished HTML; text slots are escaped by the caller
        tera.autoescape_on(vec![]);

        tera.register_filter("strip_html", filters::strip_html);
        tera.register_filter("truncate_chars", filters::truncate_chars);

        let mut templates: Vec<(String, String)> = BUILTIN_LAYOUTS
            .iter()
            .filter(|(name, _)| !layouts.iter().any(|(n, _)| n == name))
            .map(|(name, source)| (name.to_string(), source.to_string()))
            .collect();
        templates.extend(layouts);

        let mut defaults: BTreeSet<String> =
            OPTIONAL_SLOTS.iter().map(|s| s.to_string()).collect();
        for (_, source) in &templates {
            defaults.extend(referenced_names(source));
        }

        tera.add_raw_templates(templates)
            .map_err(|e| ConfigError::Layouts(describe(&e)))?;

        Ok(Self { tera, defaults })
    }

    /// Names of all loaded layouts, sorted
    pub fn layouts(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tera.get_template_names().collect();
        names.sort_unstable();
        names
    }

    fn template_name(layout: &str) -> String {
        if layout.ends_with(".html") {
            layout.to_string()
        } else {
            format!("{}.html", layout)
        }
    }
}

impl Composer for TeraComposer {
    fn compose(&self, layout: &str, blocks: &Blocks) -> Result<String, ComposeError> {
        if !blocks.contains_key(CONTENT_SLOT) {
            return Err(ComposeError::MissingRequiredSlot {
                layout: layout.to_string(),
                slot: CONTENT_SLOT,
            });
        }

        let name = Self::template_name(layout);
        if !self.has_layout(&name) {
            return Err(ComposeError::UnknownLayout(layout.to_string()));
        }

        let mut context = Context::new();
        for slot in &self.defaults {
            context.insert(slot.as_str(), "");
        }
        for (slot, html) in blocks {
            context.insert(slot.as_str(), html);
        }

        self.tera
            .render(&name, &context)
            .map_err(|e| ComposeError::Template {
                layout: layout.to_string(),
                message: describe(&e),
            })
    }

    fn has_layout(&self, layout: &str) -> bool {
        let name = Self::template_name(layout);
        self.tera.get_template_names().any(|n| n == name)
    }
}

/// Identifiers appearing inside the tags of a layout source
///
/// Over-collects (keywords, filter names, argument names); an unused
/// empty entry in the context is harmless.
fn referenced_names(source: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for cap in TAG_BODY.captures_iter(source) {
        let Some(body) = cap.get(1).or_else(|| cap.get(2)) else {
            continue;
        };
        let body = STRING_LITERAL.replace_all(body.as_str(), " ");
        names.extend(IDENTIFIER.find_iter(&body).map(|m| m.as_str().to_string()));
    }
    names
}

/// Tera nests the useful part of its errors in the source chain
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
