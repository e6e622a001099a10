//! Build orchestrator - drives content through load, render, compose, index
//! and write
//!
//! Per-unit stages run on the worker pool. A unit that fails any stage is
//! dropped from every later stage and reported; anything that makes the run
//! itself invalid aborts before the first file is written.

mod feed;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::SiteConfig;
use crate::content::loader::{drop_unpublished, reject_duplicate_slugs};
use crate::content::{load_source, ContentLoader, ContentUnit, Rendered};
use crate::error::{BuildError, ConfigError, RenderError, UnitFailure};
use crate::helpers::{
    archive_list, escape_html, feed_tag, meta_generator, paginator, post_list, post_nav_link,
    tag_links, time_tag, url_for,
};
use crate::index::{build_index, paginate, IndexPage, SiteIndex};
use crate::output::{file_for, listing_path, listing_url, unit_output_dir, unit_output_path};
use crate::output::{FsWriter, OutputWriter};
use crate::pool::WorkerPool;
use crate::render::{MarkdownRenderer, Renderer};
use crate::theme::{Blocks, Composer, TeraComposer};

pub use feed::atom_feed;

/// Layout used for home, tag and archive pages
pub const LISTING_LAYOUT: &str = "index";

/// Page links shown on each side of the current page
const PAGINATOR_MID_SIZE: usize = 2;

/// Where a build run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Loading,
    Rendering,
    Composing,
    Indexing,
    Writing,
    Done,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Loading => "loading",
            BuildState::Rendering => "rendering",
            BuildState::Composing => "composing",
            BuildState::Indexing => "indexing",
            BuildState::Writing => "writing",
            BuildState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a build that reached `Done`
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Units whose page was written
    pub units_written: usize,
    /// Units excluded from the build, sorted by source path
    pub failures: Vec<UnitFailure>,
    /// Listing pages and the feed, relative to the output root
    pub generated_pages: Vec<PathBuf>,
    /// Every file written, post pages included
    pub files_written: usize,
    /// Bundle assets copied next to their post
    pub assets_copied: usize,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A finished file and where it goes
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the output root
    pub path: PathBuf,
    pub html: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, html: String) -> Self {
        Self {
            path: path.into(),
            html,
        }
    }
}

/// A bundle asset and its destination relative to the output root
#[derive(Debug, Clone)]
struct AssetCopy {
    from: PathBuf,
    to: PathBuf,
}

/// Runs one build of a content directory
pub struct Builder {
    config: SiteConfig,
    content_dir: PathBuf,
    renderer: Arc<dyn Renderer>,
    composer: Arc<dyn Composer>,
    writer: Arc<dyn OutputWriter>,
    pool: WorkerPool,
    clean: bool,
}

impl Builder {
    /// Builder with the markdown renderer, built-in layouts and a filesystem
    /// writer rooted at `output_dir`
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        config: SiteConfig,
        content_dir: P,
        output_dir: Q,
    ) -> Result<Self, ConfigError> {
        let renderer = MarkdownRenderer::from_config(&config);
        let composer = TeraComposer::new()?;
        let pool = WorkerPool::new(config.jobs());

        Ok(Self {
            content_dir: content_dir.as_ref().to_path_buf(),
            renderer: Arc::new(renderer),
            composer: Arc::new(composer),
            writer: Arc::new(FsWriter::new(output_dir)),
            pool,
            clean: false,
            config,
        })
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    pub fn with_composer(mut self, composer: impl Composer + 'static) -> Self {
        self.composer = Arc::new(composer);
        self
    }

    pub fn with_writer(mut self, writer: impl OutputWriter + 'static) -> Self {
        self.writer = Arc::new(writer);
        self
    }

    /// Empty the output root before writing
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    fn enter(&self, state: BuildState) {
        tracing::info!("Build state: {}", state);
    }

    /// Run the build
    pub async fn run(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        self.config.validate()?;
        self.composer.validate(LISTING_LAYOUT).map_err(ConfigError::from)?;

        tracing::debug!("Running stages on {} workers", self.pool.jobs());

        self.enter(BuildState::Loading);
        let (units, mut failures) = self.load().await?;
        self.validate_layouts(&units)?;

        self.enter(BuildState::Rendering);
        let units = self.render(units, &mut failures).await?;

        self.enter(BuildState::Composing);
        let (units, post_pages) = self.compose_posts(units, &mut failures).await?;

        self.enter(BuildState::Indexing);
        let index = build_index(&units);
        let mut documents: Vec<Document> = units
            .iter()
            .zip(post_pages)
            .map(|(unit, html)| Document::new(unit_output_path(&self.config, unit), html))
            .collect();
        let mut listings = self.compose_listings(&index).await?;
        listings.push(Document::new(
            file_for(&self.config.feed_path),
            atom_feed(&self.config, index.feed(self.config.feed_limit)),
        ));
        let generated_pages: Vec<PathBuf> = listings.iter().map(|d| d.path.clone()).collect();
        documents.extend(listings);
        let assets = self.bundle_assets(&units);
        check_output_paths(&documents, &assets)?;

        self.enter(BuildState::Writing);
        let files_written = documents.len();
        let assets_copied = assets.len();
        self.write(documents, assets).await?;

        failures.sort_by(|a, b| a.source_path().cmp(b.source_path()));
        let report = BuildReport {
            units_written: units.len(),
            failures,
            generated_pages,
            files_written,
            assets_copied,
        };

        self.enter(BuildState::Done);
        tracing::info!(
            "Built {} posts, {} files, {} assets in {:.2?} ({} skipped)",
            report.units_written,
            report.files_written,
            report.assets_copied,
            started.elapsed(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Load every source; duplicate slugs abort the run
    async fn load(&self) -> Result<(Vec<ContentUnit>, Vec<UnitFailure>), BuildError> {
        let loader = ContentLoader::new(&self.content_dir);
        let (sources, discover_errors) = loader.discover()?;
        tracing::debug!("Discovered {} content sources", sources.len());

        let mut failures: Vec<UnitFailure> =
            discover_errors.into_iter().map(UnitFailure::Load).collect();
        let mut units = Vec::with_capacity(sources.len());

        for result in self.pool.map(sources, |source| load_source(&source)).await? {
            match result {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    tracing::warn!("Skipping {}", e);
                    failures.push(UnitFailure::Load(e));
                }
            }
        }

        let (units, duplicates) = reject_duplicate_slugs(drop_unpublished(units));
        if !duplicates.is_empty() {
            return Err(BuildError::DuplicateSlugs(duplicates));
        }

        Ok((units, failures))
    }

    /// Every layout a unit uses must expose the content slot
    ///
    /// Layouts that do not exist are left to fail per unit at compose time.
    fn validate_layouts(&self, units: &[ContentUnit]) -> Result<(), ConfigError> {
        let layouts: BTreeSet<&str> = units.iter().map(|u| u.layout.as_str()).collect();
        for layout in layouts {
            if self.composer.has_layout(layout) {
                self.composer.validate(layout)?;
            }
        }
        Ok(())
    }

    async fn render(
        &self,
        units: Vec<ContentUnit>,
        failures: &mut Vec<UnitFailure>,
    ) -> Result<Vec<ContentUnit>, BuildError> {
        let renderer = Arc::clone(&self.renderer);
        let rendered = self
            .pool
            .map(units, move |unit| {
                let result = render_unit(renderer.as_ref(), &unit);
                (unit, result)
            })
            .await?;

        let mut survivors = Vec::with_capacity(rendered.len());
        for (unit, result) in rendered {
            match result {
                Ok(()) => survivors.push(unit),
                Err(e) => {
                    tracing::warn!("Skipping {}", e);
                    failures.push(UnitFailure::Render(e));
                }
            }
        }
        Ok(survivors)
    }

    /// Compose every post page against the index of the units that remain
    ///
    /// When a unit fails, the survivors are recomposed so that no page links
    /// to a post that will not be written.
    async fn compose_posts(
        &self,
        mut units: Vec<ContentUnit>,
        failures: &mut Vec<UnitFailure>,
    ) -> Result<(Vec<ContentUnit>, Vec<String>), BuildError> {
        loop {
            let jobs: Vec<(String, Blocks)> = {
                let index = build_index(&units);
                units
                    .iter()
                    .map(|unit| (unit.layout.clone(), self.post_blocks(&index, unit)))
                    .collect()
            };

            let composer = Arc::clone(&self.composer);
            let composed = self
                .pool
                .map(jobs, move |(layout, blocks)| composer.compose(&layout, &blocks))
                .await?;

            let mut survivors = Vec::with_capacity(units.len());
            let mut pages = Vec::with_capacity(units.len());
            let mut excluded = false;

            for (unit, result) in units.into_iter().zip(composed) {
                match result {
                    Ok(html) => {
                        survivors.push(unit);
                        pages.push(html);
                    }
                    Err(error) if error.is_configuration() => {
                        return Err(ConfigError::from(error).into());
                    }
                    Err(error) => {
                        tracing::warn!("Skipping {}: {}", unit.source_path.display(), error);
                        failures.push(UnitFailure::Compose {
                            source_path: unit.source_path.clone(),
                            error,
                        });
                        excluded = true;
                    }
                }
            }

            units = survivors;
            if !excluded {
                return Ok((units, pages));
            }
            tracing::debug!("Recomposing {} posts after exclusions", units.len());
        }
    }

    /// Slots shared by every page
    fn site_blocks(&self) -> Blocks {
        let config = &self.config;
        let mut blocks = Blocks::new();
        blocks.insert("site_title".into(), escape_html(&config.title));
        blocks.insert("site_url".into(), url_for(config, ""));
        blocks.insert("description".into(), escape_html(&config.description));
        blocks.insert(
            "head".into(),
            format!("{}\n{}", meta_generator(), feed_tag(config)),
        );
        blocks
    }

    fn post_blocks(&self, index: &SiteIndex, unit: &ContentUnit) -> Blocks {
        let config = &self.config;
        let neighbors = index.neighbors(&unit.slug);

        let mut blocks = self.site_blocks();
        blocks.insert(
            "content".into(),
            unit.rendered_body().unwrap_or_default().to_string(),
        );
        blocks.insert("title".into(), escape_html(&unit.title));
        blocks.insert("date".into(), time_tag(&unit.date, &config.date_format));
        blocks.insert("tags".into(), tag_links(config, &unit.tags));
        blocks.insert(
            "prev".into(),
            post_nav_link(config, neighbors.older, "post-nav-prev"),
        );
        blocks.insert(
            "next".into(),
            post_nav_link(config, neighbors.newer, "post-nav-next"),
        );

        for (key, value) in unit.scalar_extras() {
            let value = escape_html(&value);
            if key == "description" {
                blocks.insert("description".into(), value.clone());
            }
            blocks.insert(format!("meta_{}", key.replace('-', "_")), value);
        }

        blocks
    }

    /// Home, tag and archive pages
    async fn compose_listings(&self, index: &SiteIndex<'_>) -> Result<Vec<Document>, BuildError> {
        let config = &self.config;
        let mut jobs: Vec<(PathBuf, Blocks)> = Vec::new();

        let mut home = index.paginate(config.per_page)?;
        if home.is_empty() {
            home.push(IndexPage {
                number: 1,
                total: 1,
                units: Vec::new(),
            });
        }
        for page in &home {
            let title = if page.is_first() {
                String::new()
            } else {
                format!("Page {}", page.number)
            };
            jobs.push(self.listing_job("", &title, page));
        }

        for (slug, group) in index.tags() {
            let dir = format!("{}/{}", config.tag_dir, slug);
            let title = format!("Tag: {}", escape_html(&group.name));
            for page in paginate(&group.units, config.per_page)? {
                jobs.push(self.listing_job(&dir, &title, &page));
            }
        }

        let mut blocks = self.site_blocks();
        blocks.insert("title".into(), "Archives".into());
        blocks.insert("content".into(), archive_list(config, &index.archive()));
        jobs.push((listing_path(&config.archive_dir, &config.pagination_dir, 1), blocks));

        let composer = Arc::clone(&self.composer);
        let composed = self
            .pool
            .map(jobs, move |(path, blocks)| {
                let result = composer.compose(LISTING_LAYOUT, &blocks);
                (path, result)
            })
            .await?;

        composed
            .into_iter()
            .map(|(path, result)| match result {
                Ok(html) => Ok(Document::new(path, html)),
                Err(source) => Err(BuildError::Listing { path, source }),
            })
            .collect()
    }

    fn listing_job(&self, dir: &str, title: &str, page: &IndexPage) -> (PathBuf, Blocks) {
        let config = &self.config;
        let base_url = url_for(config, &listing_url(dir, &config.pagination_dir, 1));

        let mut blocks = self.site_blocks();
        blocks.insert("title".into(), title.to_string());
        blocks.insert("content".into(), post_list(config, &page.units));
        blocks.insert(
            "pagination".into(),
            paginator(
                page.number,
                page.total,
                &base_url,
                &config.pagination_dir,
                PAGINATOR_MID_SIZE,
            ),
        );

        (
            listing_path(dir, &config.pagination_dir, page.number),
            blocks,
        )
    }

    fn bundle_assets(&self, units: &[ContentUnit]) -> Vec<AssetCopy> {
        units
            .iter()
            .flat_map(|unit| {
                let dir = unit_output_dir(&self.config, unit);
                unit.relative_assets()
                    .map(move |(from, relative)| AssetCopy {
                        from: from.to_path_buf(),
                        to: dir.join(relative),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    async fn write(&self, documents: Vec<Document>, assets: Vec<AssetCopy>) -> Result<(), BuildError> {
        if self.clean {
            let root = self.writer.root();
            let content = self
                .content_dir
                .canonicalize()
                .unwrap_or_else(|_| self.content_dir.clone());
            let output = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
            if content.starts_with(&output) {
                return Err(ConfigError::OutputContainsContent(output).into());
            }
            self.writer.clean().map_err(|source| BuildError::Write {
                path: self.writer.root().to_path_buf(),
                source,
            })?;
        }
        self.writer.ensure_writable()?;

        let writer = Arc::clone(&self.writer);
        let written = self
            .pool
            .map(documents, move |doc| {
                writer
                    .write(&doc.path, doc.html.as_bytes())
                    .map_err(|source| BuildError::Write {
                        path: doc.path,
                        source,
                    })
            })
            .await?;
        written.into_iter().collect::<Result<Vec<()>, _>>()?;

        let writer = Arc::clone(&self.writer);
        let copied = self
            .pool
            .map(assets, move |asset| {
                writer
                    .copy(&asset.from, &asset.to)
                    .map_err(|source| BuildError::Write {
                        path: asset.to,
                        source,
                    })
            })
            .await?;
        copied.into_iter().collect::<Result<Vec<()>, _>>()?;

        Ok(())
    }
}

/// Render one unit's body and excerpt
fn render_unit(renderer: &dyn Renderer, unit: &ContentUnit) -> Result<(), RenderError> {
    let fail = |e: anyhow::Error| RenderError {
        source_path: unit.source_path.clone(),
        cause: format!("{:#}", e),
    };

    let body = renderer.render(&unit.raw_body).map_err(fail)?;
    let excerpt = unit
        .excerpt
        .as_deref()
        .map(|text| renderer.render(text))
        .transpose()
        .map_err(fail)?;

    // A unit is rendered once; a second result is dropped
    let _ = unit.set_rendered(Rendered { body, excerpt });
    Ok(())
}

/// No two outputs may land on the same path
fn check_output_paths(documents: &[Document], assets: &[AssetCopy]) -> Result<(), BuildError> {
    let mut seen = BTreeSet::new();
    let paths = documents
        .iter()
        .map(|d| &d.path)
        .chain(assets.iter().map(|a| &a.to));
    for path in paths {
        if !seen.insert(path) {
            return Err(BuildError::OutputConflict(path.clone()));
        }
    }
    Ok(())
}
