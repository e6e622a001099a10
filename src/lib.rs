//! quire: a static site builder for markdown post corpora
//!
//! Content units (markdown files or bundle directories with front matter) are
//! loaded, rendered to HTML, composed into layouts, indexed by date and tag,
//! and written to an output tree. Per-unit stages run on a bounded worker
//! pool; a unit that fails is skipped and reported while the rest of the site
//! still builds.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod index;
pub mod output;
pub mod pool;
pub mod render;
pub mod theme;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use error::{BuildError, ConfigError};
pub use generator::{BuildReport, Builder};

/// A content directory and where its site goes
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Content root
    pub content_dir: PathBuf,
    /// Output root
    pub output_dir: PathBuf,
    /// Directory of user layouts, if any
    pub layouts_dir: Option<PathBuf>,
}

impl Site {
    /// Open a site, loading `config_path` or the content root's `_config.yml`
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        content_dir: P,
        output_dir: Q,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let content_dir = content_dir.as_ref().to_path_buf();
        let config = config::SiteConfig::discover(config_path, &content_dir)?;

        Ok(Self {
            config,
            content_dir,
            output_dir: output_dir.as_ref().to_path_buf(),
            layouts_dir: None,
        })
    }

    /// Use layouts from `dir` on top of the built-in ones
    pub fn with_layouts_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.layouts_dir = dir;
        self
    }

    /// Builder for this site
    pub fn builder(&self) -> Result<Builder, ConfigError> {
        let builder = Builder::new(self.config.clone(), &self.content_dir, &self.output_dir)?;
        match &self.layouts_dir {
            Some(dir) => {
                let composer = theme::TeraComposer::from_dir(dir)?;
                tracing::debug!("Layouts: {:?}", composer.layouts());
                Ok(builder.with_composer(composer))
            }
            None => Ok(builder),
        }
    }

    /// Build the site
    pub async fn build(&self, clean: bool) -> Result<BuildReport, BuildError> {
        self.builder()?.clean(clean).run().await
    }

    /// Remove the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(&self.output_dir)
    }

    /// Scaffold a new post and return its path
    pub fn new_post(&self, title: &str, bundle: bool) -> Result<PathBuf> {
        commands::new::run(self, title, bundle)
    }
}
