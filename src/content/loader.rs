//! Content loader - discovers content sources and parses them into units

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{ContentUnit, FrontMatter};
use crate::error::{ConfigError, LoadError, LoadErrorKind};
use crate::render::split_excerpt;

/// Names a bundle directory's markdown file may have
const BUNDLE_INDEX: &[&str] = &["index.md", "index.markdown"];

/// Where a content unit comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// A markdown file directly under the content root
    File(PathBuf),
    /// A directory holding an index markdown file plus sibling assets
    Bundle { dir: PathBuf, index: PathBuf },
}

impl ContentSource {
    /// The path reported in errors and stored on the unit
    pub fn path(&self) -> &Path {
        match self {
            ContentSource::File(path) => path,
            ContentSource::Bundle { dir, .. } => dir,
        }
    }

    /// The markdown file to parse
    pub fn markdown_path(&self) -> &Path {
        match self {
            ContentSource::File(path) => path,
            ContentSource::Bundle { index, .. } => index,
        }
    }

    /// File stem, or directory name for bundles
    fn stem(&self) -> String {
        let name = match self {
            ContentSource::File(path) => path.file_stem(),
            ContentSource::Bundle { dir, .. } => dir.file_name(),
        };
        name.map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of loading a whole content root
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Successfully loaded units, in discovery order
    pub units: Vec<ContentUnit>,
    /// One entry per source that failed
    pub errors: Vec<LoadError>,
}

impl LoadOutcome {
    /// Errors that make the whole build invalid
    pub fn duplicate_slugs(&self) -> impl Iterator<Item = &LoadError> {
        self.errors.iter().filter(|e| e.is_duplicate_slug())
    }
}

/// Loads content units from a content root
pub struct ContentLoader {
    root: PathBuf,
}

impl ContentLoader {
    /// Create a new content loader
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Load every content source under the root
    ///
    /// Bad sources are collected as errors; only a missing or unreadable root
    /// fails the call.
    pub fn load_all(&self) -> Result<LoadOutcome, ConfigError> {
        let (sources, mut errors) = self.discover()?;

        let mut units = Vec::with_capacity(sources.len());
        for source in &sources {
            match load_source(source) {
                Ok(unit) => units.push(unit),
                Err(e) => errors.push(e),
            }
        }

        let (units, duplicates) = reject_duplicate_slugs(drop_unpublished(units));
        errors.extend(duplicates);

        Ok(LoadOutcome { units, errors })
    }

    /// Enumerate content sources, sorted by file name
    pub fn discover(&self) -> Result<(Vec<ContentSource>, Vec<LoadError>), ConfigError> {
        if !self.root.is_dir() {
            return Err(ConfigError::MissingContentRoot(self.root.clone()));
        }
        fs::read_dir(&self.root).map_err(|source| ConfigError::UnreadableContentRoot {
            path: self.root.clone(),
            source,
        })?;

        let mut sources = Vec::new();
        let mut errors = Vec::new();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(&self.root).to_path_buf();
                    let io = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    errors.push(LoadError::new(path, LoadErrorKind::Unreadable(io)));
                    continue;
                }
            };

            let path = entry.path();
            if is_hidden(path) {
                continue;
            }

            if entry.file_type().is_dir() {
                match bundle_index(path) {
                    Some(index) => sources.push(ContentSource::Bundle {
                        dir: path.to_path_buf(),
                        index,
                    }),
                    None => tracing::debug!("Skipping directory without index: {:?}", path),
                }
            } else if is_markdown_file(path) {
                sources.push(ContentSource::File(path.to_path_buf()));
            } else {
                tracing::debug!("Skipping non-markdown file: {:?}", path);
            }
        }

        Ok((sources, errors))
    }
}

/// Load every content source under `root`
pub fn load_all<P: AsRef<Path>>(root: P) -> Result<LoadOutcome, ConfigError> {
    ContentLoader::new(root).load_all()
}

/// Load a single content source
pub fn load_source(source: &ContentSource) -> Result<ContentUnit, LoadError> {
    let fail = |reason| LoadError::new(source.path(), reason);

    let content = fs::read_to_string(source.markdown_path())
        .map_err(|e| fail(LoadErrorKind::Unreadable(e)))?;
    let (fm, body) = FrontMatter::parse(&content).map_err(fail)?;

    let title = fm.require_title().map_err(fail)?;
    let date = fm.require_date().map_err(fail)?;

    let raw_slug = fm.slug.clone().unwrap_or_else(|| source.stem());
    let slug = slug::slugify(&raw_slug);
    if slug.is_empty() {
        return Err(fail(LoadErrorKind::InvalidSlug(raw_slug)));
    }

    let (excerpt, full) = split_excerpt(body);

    let mut unit = ContentUnit::new(slug, title, date, source.path().to_path_buf());
    unit.raw_body = full;
    unit.excerpt = excerpt;
    unit.tags = fm
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if let Some(layout) = fm.layout {
        unit.layout = layout;
    }
    unit.published = fm.published;
    unit.extra = fm.extra;

    if let ContentSource::Bundle { dir, index } = source {
        unit.assets = bundle_assets(dir, index).map_err(fail)?;
    }

    Ok(unit)
}

/// Keep published units only
///
/// Runs before the slug check, so a draft never collides with a live post.
pub fn drop_unpublished(units: Vec<ContentUnit>) -> Vec<ContentUnit> {
    units
        .into_iter()
        .filter(|unit| {
            if !unit.published {
                tracing::debug!("Skipping unpublished {:?}", unit.source_path);
            }
            unit.published
        })
        .collect()
}

/// Remove every unit whose slug collides with another's
///
/// Each collision is reported once per extra source, naming the first source
/// that claimed the slug. None of the colliding units survive.
pub fn reject_duplicate_slugs(units: Vec<ContentUnit>) -> (Vec<ContentUnit>, Vec<LoadError>) {
    let mut by_slug: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, unit) in units.iter().enumerate() {
        by_slug.entry(unit.slug.as_str()).or_default().push(i);
    }

    let mut rejected = BTreeSet::new();
    let mut errors = Vec::new();
    for (slug, positions) in &by_slug {
        if let [first, rest @ ..] = positions.as_slice() {
            for other in rest {
                errors.push(LoadError::new(
                    units[*first].source_path.clone(),
                    LoadErrorKind::DuplicateSlug {
                        slug: slug.to_string(),
                        other: units[*other].source_path.clone(),
                    },
                ));
            }
            if !rest.is_empty() {
                rejected.extend(positions.iter().copied());
            }
        }
    }

    let survivors = units
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !rejected.contains(i))
        .map(|(_, unit)| unit)
        .collect();

    (survivors, errors)
}

/// Sibling files of a bundle, excluding the index file itself
fn bundle_assets(dir: &Path, index: &Path) -> Result<BTreeSet<PathBuf>, LoadErrorKind> {
    let mut assets = BTreeSet::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            LoadErrorKind::Unreadable(
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
            )
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path != index {
            assets.insert(path.to_path_buf());
        }
    }

    Ok(assets)
}

/// The index markdown file of a bundle directory, if it has one
fn bundle_index(dir: &Path) -> Option<PathBuf> {
    BUNDLE_INDEX
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

/// Dot-files and `_`-prefixed entries are not content
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') || n.starts_with('_'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn post(title: &str, date: &str) -> String {
        format!("---\ntitle: {}\ndate: {}\n---\n\nBody of {}.\n", title, date, title)
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_files_and_bundles() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "first-post.md", &post("First", "2020-01-01"));
        write(root, "Trip/index.md", &post("Trip", "2020-06-01"));
        write(root, "Trip/photo.jpg", "jpeg");
        write(root, "Trip/maps/route.gpx", "gpx");
        write(root, "Trip/.git/config", "[core]");
        write(root, "Trip/_private/notes.txt", "hidden");
        write(root, "Trip/.DS_Store", "junk");
        write(root, "notes.txt", "not content");
        write(root, "_drafts/wip.md", &post("WIP", "2020-02-02"));
        write(root, "empty-dir/readme.txt", "no index");

        let outcome = load_all(root).unwrap();
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);

        let slugs: Vec<_> = outcome.units.iter().map(|u| u.slug.as_str()).collect();
        // Discovery is sorted by byte order, so `Trip` precedes `first-post.md`
        assert_eq!(slugs, vec!["trip", "first-post"]);

        let trip = &outcome.units[0];
        assert_eq!(trip.title, "Trip");
        assert_eq!(trip.date, NaiveDate::from_ymd_opt(2020, 6, 1).unwrap());
        assert_eq!(trip.source_path, root.join("Trip"));
        let assets: Vec<_> = trip.relative_assets().map(|(_, r)| r.to_path_buf()).collect();
        assert_eq!(
            assets,
            vec![PathBuf::from("maps/route.gpx"), PathBuf::from("photo.jpg")]
        );
        assert!(outcome.units[1].assets.is_empty());
    }

    #[test]
    fn test_bad_units_are_collected_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "good.md", &post("Good", "2020-01-01"));
        write(root, "no-date.md", "---\ntitle: No Date\n---\nbody\n");
        write(root, "no-title.md", "---\ndate: 2020-01-01\n---\nbody\n");
        write(root, "bad-date.md", "---\ntitle: Bad\ndate: someday\n---\nbody\n");
        write(root, "plain.md", "no front matter at all\n");

        let outcome = load_all(root).unwrap();
        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].slug, "good");
        assert_eq!(outcome.errors.len(), 4);

        let reason_for = |name: &str| {
            outcome
                .errors
                .iter()
                .find(|e| e.source_path == root.join(name))
                .map(|e| &e.reason)
                .unwrap()
        };
        assert!(matches!(
            reason_for("no-date.md"),
            LoadErrorKind::MissingField("date")
        ));
        assert!(matches!(
            reason_for("no-title.md"),
            LoadErrorKind::MissingField("title")
        ));
        assert!(matches!(
            reason_for("bad-date.md"),
            LoadErrorKind::MalformedDate(_)
        ));
        assert!(matches!(
            reason_for("plain.md"),
            LoadErrorKind::MissingFrontMatter
        ));
    }

    #[test]
    fn test_unreadable_source_is_collected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "good.md", &post("Good", "2020-01-01"));
        fs::write(root.join("binary.md"), [0x2d, 0x2d, 0x2d, 0x0a, 0xff, 0xfe, 0xfd]).unwrap();

        let outcome = load_all(root).unwrap();
        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].slug, "good");
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].source_path, root.join("binary.md"));
        assert!(matches!(
            outcome.errors[0].reason,
            LoadErrorKind::Unreadable(_)
        ));
    }

    #[test]
    fn test_unpublished_sources_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "live.md", &post("Live", "2020-01-01"));
        write(
            root,
            "draft.md",
            "---\ntitle: Draft\ndate: 2020-02-02\npublished: false\n---\nwip\n",
        );
        // A draft sharing a slug with a live post does not collide with it
        write(
            root,
            "live-again.md",
            "---\ntitle: Again\ndate: 2020-03-03\nslug: live\npublished: false\n---\nwip\n",
        );

        let outcome = load_all(root).unwrap();
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let slugs: Vec<_> = outcome.units.iter().map(|u| u.slug.as_str()).collect();
        assert_eq!(slugs, vec!["live"]);
        assert!(outcome.units[0].published);
    }

    #[test]
    fn test_duplicate_slug_reports_both_sources() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "foo.md", &post("Foo file", "2020-01-01"));
        write(root, "Foo/index.md", &post("Foo bundle", "2020-02-01"));
        write(root, "bar.md", &post("Bar", "2020-03-01"));

        let outcome = load_all(root).unwrap();
        let slugs: Vec<_> = outcome.units.iter().map(|u| u.slug.as_str()).collect();
        assert_eq!(slugs, vec!["bar"]);

        let dups: Vec<_> = outcome.duplicate_slugs().collect();
        assert_eq!(dups.len(), 1);
        match &dups[0].reason {
            LoadErrorKind::DuplicateSlug { slug, other } => {
                assert_eq!(slug, "foo");
                let mut both = vec![dups[0].source_path.clone(), other.clone()];
                both.sort();
                assert_eq!(both, vec![root.join("Foo"), root.join("foo.md")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_explicit_slug_and_passthrough_fields() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "2020-01-01-whatever.md",
            "---\ntitle: Hi\ndate: 2020-01-01\nslug: Hello World\nlayout: page\ncover: a.png\n---\nIntro\n<!-- more -->\nRest\n",
        );

        let outcome = load_all(root).unwrap();
        let unit = &outcome.units[0];
        assert_eq!(unit.slug, "hello-world");
        assert_eq!(unit.layout, "page");
        assert_eq!(unit.excerpt.as_deref(), Some("Intro"));
        assert!(unit.raw_body.contains("Rest"));
        assert!(!unit.raw_body.contains("<!-- more -->"));
        assert_eq!(
            unit.extra.get("cover").and_then(|v| v.as_str()),
            Some("a.png")
        );
    }

    #[test]
    fn test_missing_root_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_all(tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingContentRoot(_)));
    }

    #[test]
    fn test_reject_duplicate_slugs_keeps_order() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let make = |slug: &str, src: &str| {
            ContentUnit::new(slug.to_string(), slug.to_string(), date, PathBuf::from(src))
        };
        let units = vec![
            make("c", "c.md"),
            make("a", "a.md"),
            make("a", "A"),
            make("a", "a.markdown"),
            make("b", "b.md"),
        ];

        let (survivors, errors) = reject_duplicate_slugs(units);
        let slugs: Vec<_> = survivors.iter().map(|u| u.slug.as_str()).collect();
        assert_eq!(slugs, vec!["c", "b"]);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.source_path == PathBuf::from("a.md")));
    }
}
