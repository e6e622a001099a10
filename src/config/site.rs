//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

lazy_static! {
    static ref PERMALINK_TOKEN: Regex = Regex::new(r":([a-z_]+)").unwrap();
}

/// Placeholders a permalink pattern may use
const PERMALINK_TOKENS: &[&str] = &["year", "month", "day", "i_month", "i_day", "slug"];

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub date_format: String,

    // URL
    pub url: String,
    pub root: String,
    pub permalink: String,

    // Directory
    pub tag_dir: String,
    pub archive_dir: String,

    // Pagination
    pub per_page: usize,
    pub pagination_dir: String,

    // Feed
    pub feed_limit: usize,
    pub feed_path: String,

    // Worker pool size; defaults to the number of available cores
    pub jobs: Option<usize>,

    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            description: String::new(),
            author: String::new(),
            date_format: "YYYY-MM-DD".to_string(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),
            permalink: ":year/:month/:day/:slug/".to_string(),

            tag_dir: "tags".to_string(),
            archive_dir: "archives".to_string(),

            per_page: 10,
            pagination_dir: "page".to_string(),

            feed_limit: 20,
            feed_path: "atom.xml".to_string(),

            jobs: None,

            highlight: HighlightConfig::default(),
            markdown: MarkdownConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Load `path` if given, else `_config.yml` in `dir` if present, else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let conventional = dir.join("_config.yml");
        if conventional.exists() {
            tracing::debug!("Using config {:?}", conventional);
            Self::load(&conventional)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings that would make the run itself mis-specified
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_page == 0 {
            return Err(ConfigError::InvalidPageSize);
        }
        if self.feed_limit == 0 {
            return Err(ConfigError::InvalidFeedLength);
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidJobs);
        }

        let invalid = |reason: &str| ConfigError::InvalidPermalink {
            pattern: self.permalink.clone(),
            reason: reason.to_string(),
        };

        // Slug uniqueness only guarantees distinct output paths when the
        // pattern includes the slug.
        let mut has_slug = false;
        for cap in PERMALINK_TOKEN.captures_iter(&self.permalink) {
            let token = &cap[1];
            if !PERMALINK_TOKENS.contains(&token) {
                return Err(invalid(&format!("unknown placeholder `:{}`", token)));
            }
            has_slug |= token == "slug";
        }
        if !has_slug {
            return Err(invalid("pattern must contain `:slug`"));
        }
        if self.permalink.split('/').any(|part| part == "..") {
            return Err(invalid("pattern must not contain `..`"));
        }

        Ok(())
    }

    /// Effective worker pool size
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub line_number: bool,
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            line_number: true,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}

/// Markdown rendering configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Pass raw HTML in markdown through instead of escaping it
    pub allow_html: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.per_page, 10);
        assert_eq!(config.feed_limit, 20);
        assert!(config.validate().is_ok());
        assert!(config.jobs() >= 1);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
title: My Notes
per_page: 3
highlight:
  line_number: false
github: someone
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Notes");
        assert_eq!(config.per_page, 3);
        assert!(config.highlight.enable);
        assert!(!config.highlight.line_number);
        assert_eq!(config.pagination_dir, "page");
        assert_eq!(
            config.extra.get("github").and_then(|v| v.as_str()),
            Some("someone")
        );
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = SiteConfig {
            per_page: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPageSize)));

        let config = SiteConfig {
            feed_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFeedLength)
        ));

        let config = SiteConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidJobs)));
    }

    #[test]
    fn test_validate_permalink() {
        let ok = SiteConfig {
            permalink: "posts/:slug/".to_string(),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        for pattern in [":year/:month/", ":year/:title/", "../:slug/"] {
            let config = SiteConfig {
                permalink: pattern.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidPermalink { .. })
                ),
                "{} should be rejected",
                pattern
            );
        }
    }

    #[test]
    fn test_discover_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiteConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.title, "Untitled");

        fs::write(dir.path().join("_config.yml"), "title: Found\n").unwrap();
        let config = SiteConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.title, "Found");
    }
}
