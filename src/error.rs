//! Error types for the build pipeline
//!
//! Errors split into two classes. Per-unit errors ([`LoadError`],
//! [`RenderError`], [`ComposeError`] raised for one unit) exclude a single
//! content unit and are collected into the build report as [`UnitFailure`]s.
//! Global errors ([`ConfigError`], [`BuildError`]) abort the run.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a content source could not become a content unit
#[derive(Debug, Error)]
pub enum LoadErrorKind {
    #[error("missing front matter (expected a leading `---` or `;;;` block)")]
    MissingFrontMatter,

    #[error("malformed front matter: {0}")]
    MalformedFrontMatter(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("malformed date `{0}`")]
    MalformedDate(String),

    #[error("slug `{0}` is empty after normalization")]
    InvalidSlug(String),

    #[error("duplicate slug `{slug}`, also produced by {}", other.display())]
    DuplicateSlug { slug: String, other: PathBuf },

    #[error("unreadable source: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// A content source that failed to load
#[derive(Debug, Error)]
#[error("{}: {reason}", source_path.display())]
pub struct LoadError {
    pub source_path: PathBuf,
    pub reason: LoadErrorKind,
}

impl LoadError {
    pub fn new(source_path: impl Into<PathBuf>, reason: LoadErrorKind) -> Self {
        Self {
            source_path: source_path.into(),
            reason,
        }
    }

    /// Whether this error must abort the build rather than skip one unit
    pub fn is_duplicate_slug(&self) -> bool {
        matches!(self.reason, LoadErrorKind::DuplicateSlug { .. })
    }
}

/// The renderer rejected a unit's markdown
#[derive(Debug, Error)]
#[error("{}: render failed: {cause}", source_path.display())]
pub struct RenderError {
    pub source_path: PathBuf,
    pub cause: String,
}

/// Template composition failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("layout `{0}` does not exist")]
    UnknownLayout(String),

    #[error("layout `{layout}` does not expose required slot `{slot}`")]
    MissingRequiredSlot { layout: String, slot: &'static str },

    #[error("layout `{layout}` failed to compose: {message}")]
    Template { layout: String, message: String },
}

impl ComposeError {
    /// A broken layout is a configuration problem, not a content problem
    pub fn is_configuration(&self) -> bool {
        matches!(self, ComposeError::MissingRequiredSlot { .. })
    }
}

/// One unit excluded from the build
#[derive(Debug, Error)]
pub enum UnitFailure {
    #[error(transparent)]
    Load(LoadError),

    #[error(transparent)]
    Render(RenderError),

    #[error("{}: {error}", source_path.display())]
    Compose {
        source_path: PathBuf,
        error: ComposeError,
    },
}

impl UnitFailure {
    /// Source file or bundle directory of the failed unit
    pub fn source_path(&self) -> &Path {
        match self {
            UnitFailure::Load(e) => &e.source_path,
            UnitFailure::Render(e) => &e.source_path,
            UnitFailure::Compose { source_path, .. } => source_path,
        }
    }

    /// Pipeline stage the unit failed in
    pub fn stage(&self) -> &'static str {
        match self {
            UnitFailure::Load(_) => "load",
            UnitFailure::Render(_) => "render",
            UnitFailure::Compose { .. } => "compose",
        }
    }
}

/// A mis-specified run: nothing is written
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("feed length must be at least 1")]
    InvalidFeedLength,

    #[error("worker count must be at least 1")]
    InvalidJobs,

    #[error("invalid permalink pattern `{pattern}`: {reason}")]
    InvalidPermalink { pattern: String, reason: String },

    #[error("content root {} does not exist or is not a directory", .0.display())]
    MissingContentRoot(PathBuf),

    #[error("content root {} is unreadable: {source}", path.display())]
    UnreadableContentRoot {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("output root {} is not writable: {source}", path.display())]
    UnwritableOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("output root {} contains the content root; refusing to clean it", .0.display())]
    OutputContainsContent(PathBuf),

    #[error("layout `{0}` does not exist")]
    UnknownLayout(String),

    #[error("layout `{layout}` does not expose required slot `{slot}`")]
    MissingRequiredSlot { layout: String, slot: &'static str },

    #[error("failed to load layouts: {0}")]
    Layouts(String),
}

impl From<ComposeError> for ConfigError {
    fn from(err: ComposeError) -> Self {
        match err {
            ComposeError::UnknownLayout(layout) => ConfigError::UnknownLayout(layout),
            ComposeError::MissingRequiredSlot { layout, slot } => {
                ConfigError::MissingRequiredSlot { layout, slot }
            }
            ComposeError::Template { layout, message } => {
                ConfigError::Layouts(format!("layout `{}`: {}", layout, message))
            }
        }
    }
}

/// Fatal result of a build run
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", DuplicateSlugs(.0))]
    DuplicateSlugs(Vec<LoadError>),

    #[error("output path {} is produced by more than one page", .0.display())]
    OutputConflict(PathBuf),

    #[error("listing page {} failed to compose: {source}", path.display())]
    Listing {
        path: PathBuf,
        source: ComposeError,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("worker task failed: {0}")]
    Worker(String),
}

struct DuplicateSlugs<'a>(&'a [LoadError]);

impl fmt::Display for DuplicateSlugs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} duplicate slug(s)", self.0.len())?;
        for err in self.0 {
            write!(f, "\n  {}", err)?;
        }
        Ok(())
    }
}
