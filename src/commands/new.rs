//! Scaffold a new post

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Site;

/// Create a post dated today
pub fn run(site: &Site, title: &str, bundle: bool) -> Result<PathBuf> {
    let today = chrono::Local::now().date_naive();
    create_post(&site.content_dir, title, today, bundle)
}

/// Write a post skeleton under `content_dir`
///
/// A bundle post is `<slug>/index.md`, leaving room for sibling assets;
/// otherwise the post is `<slug>.md`.
pub fn create_post(content_dir: &Path, title: &str, date: NaiveDate, bundle: bool) -> Result<PathBuf> {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Title {:?} does not produce a usable slug", title);
    }

    let file_path = if bundle {
        content_dir.join(&slug).join("index.md")
    } else {
        content_dir.join(format!("{}.md", slug))
    };

    if file_path.exists() || content_dir.join(&slug).exists() {
        anyhow::bail!("Post already exists: {:?}", file_path);
    }

    let content = format!(
        "---\ntitle: {}\ndate: {}\ntags: []\n---\n\n",
        serde_yaml::to_string(title)?.trim_end(),
        date.format("%Y-%m-%d")
    );

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(&file_path, content).with_context(|| format!("Failed to write {:?}", file_path))?;

    println!("Created: {:?}", file_path);
    Ok(file_path)
}
