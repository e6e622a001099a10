//! Output writer - maps pages to paths under the output root and writes them

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::SiteConfig;
use crate::content::ContentUnit;
use crate::error::ConfigError;

/// Probe file used to check that the output root accepts writes
const WRITE_PROBE: &str = ".quire-write-probe";

/// Destination for generated files
///
/// Paths handed to a writer are relative to its root.
pub trait OutputWriter: Send + Sync {
    /// Write `bytes` to `relative`, creating parent directories
    fn write(&self, relative: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Copy the file at `from` to `relative`, creating parent directories
    fn copy(&self, from: &Path, relative: &Path) -> io::Result<()>;

    /// Check that files can be created under the root
    fn ensure_writable(&self) -> Result<(), ConfigError>;

    /// Remove everything previously written under the root
    fn clean(&self) -> io::Result<()>;

    /// Where output goes
    fn root(&self) -> &Path;
}

/// Writes into a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn prepare(&self, relative: &Path) -> io::Result<PathBuf> {
        let dest = self.root.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(dest)
    }
}

impl OutputWriter for FsWriter {
    fn write(&self, relative: &Path, bytes: &[u8]) -> io::Result<()> {
        let dest = self.prepare(relative)?;
        fs::write(&dest, bytes)?;
        tracing::debug!("Wrote {:?}", dest);
        Ok(())
    }

    fn copy(&self, from: &Path, relative: &Path) -> io::Result<()> {
        let dest = self.prepare(relative)?;
        fs::copy(from, &dest)?;
        tracing::debug!("Copied {:?} -> {:?}", from, dest);
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), ConfigError> {
        ensure_writable(&self.root)
    }

    fn clean(&self) -> io::Result<()> {
        clean_output(&self.root).map(|_| ())
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

/// Create `root` if needed and check a file can be written inside it
pub fn ensure_writable(root: &Path) -> Result<(), ConfigError> {
    let unwritable = |source| ConfigError::UnwritableOutput {
        path: root.to_path_buf(),
        source,
    };

    fs::create_dir_all(root).map_err(unwritable)?;
    let probe = root.join(WRITE_PROBE);
    fs::write(&probe, b"").map_err(unwritable)?;
    fs::remove_file(&probe).map_err(unwritable)?;
    Ok(())
}

/// Remove the output directory and everything in it
pub fn clean_output(root: &Path) -> io::Result<bool> {
    if root.exists() {
        fs::remove_dir_all(root)?;
        tracing::info!("Deleted: {:?}", root);
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Expand the permalink pattern for a post date and slug
///
/// The result is relative to the site root and never starts with `/`.
pub fn permalink(pattern: &str, date: &NaiveDate, slug: &str) -> String {
    pattern
        .replace(":year", &date.format("%Y").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":i_month", &date.format("%-m").to_string())
        .replace(":i_day", &date.format("%-d").to_string())
        .replace(":slug", slug)
        .trim_start_matches('/')
        .to_string()
}

/// Site-relative path of a unit's page
pub fn permalink_path(config: &SiteConfig, unit: &ContentUnit) -> String {
    permalink(&config.permalink, &unit.date, &unit.slug)
}

/// File a site-relative URL path is served from
///
/// Directory-style paths (`a/b/`) map to `a/b/index.html`.
pub fn file_for(path: &str) -> PathBuf {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        PathBuf::from(path).join("index.html")
    } else {
        PathBuf::from(path)
    }
}

/// Output file of a unit's page
pub fn unit_output_path(config: &SiteConfig, unit: &ContentUnit) -> PathBuf {
    file_for(&permalink_path(config, unit))
}

/// Directory of a unit's page, where its bundle assets go
pub fn unit_output_dir(config: &SiteConfig, unit: &ContentUnit) -> PathBuf {
    let file = unit_output_path(config, unit);
    file.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Site-relative URL path of a listing page
///
/// `dir` is the listing's base (`""` for the home page, `tags/rust/` for a
/// tag); page 1 lives at the base, later pages under `pagination_dir`.
pub fn listing_url(dir: &str, pagination_dir: &str, page: usize) -> String {
    let dir = dir.trim_matches('/');
    let base = if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    };

    if page <= 1 {
        base
    } else {
        format!("{}{}/{}/", base, pagination_dir.trim_matches('/'), page)
    }
}

/// Output file of a listing page
pub fn listing_path(dir: &str, pagination_dir: &str, page: usize) -> PathBuf {
    file_for(&listing_url(dir, pagination_dir, page))
}
