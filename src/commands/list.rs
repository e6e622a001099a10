//! List site content

use anyhow::Result;
use std::collections::BTreeMap;

use crate::content::{ContentLoader, LoadOutcome};
use crate::index::build_index;
use crate::output::permalink_path;
use crate::Site;

/// What to list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Posts,
    Tags,
}

impl std::str::FromStr for ListKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "post" | "posts" => Ok(ListKind::Posts),
            "tag" | "tags" => Ok(ListKind::Tags),
            _ => anyhow::bail!("Unknown type: {}. Available: post, tag", s),
        }
    }
}

/// Print site content; sources that fail to load go to stderr
pub fn run(site: &Site, kind: ListKind, json: bool) -> Result<()> {
    let outcome = ContentLoader::new(&site.content_dir).load_all()?;
    let output = if json {
        serde_json::to_string_pretty(&to_json(site, &outcome, kind))?
    } else {
        to_text(site, &outcome, kind)
    };
    println!("{}", output);

    for error in &outcome.errors {
        eprintln!("skipped: {}", error);
    }
    let duplicates = outcome.duplicate_slugs().count();
    if duplicates > 0 {
        eprintln!("{} duplicate slug(s): a build of this content will fail", duplicates);
    }
    Ok(())
}

fn to_text(site: &Site, outcome: &LoadOutcome, kind: ListKind) -> String {
    let index = build_index(&outcome.units);
    let mut lines = Vec::new();

    match kind {
        ListKind::Posts => {
            lines.push(format!("Posts ({}):", index.len()));
            for unit in index.ordered_units() {
                lines.push(format!(
                    "  {} - {} [{}] -> /{}",
                    unit.date.format("%Y-%m-%d"),
                    unit.title,
                    unit.slug,
                    permalink_path(&site.config, unit)
                ));
            }
        }
        ListKind::Tags => {
            let tags = index.tags();
            lines.push(format!("Tags ({}):", tags.len()));
            for (slug, group) in &tags {
                lines.push(format!("  {} [{}] ({})", group.name, slug, group.units.len()));
            }
        }
    }

    lines.join("\n")
}

fn to_json(site: &Site, outcome: &LoadOutcome, kind: ListKind) -> serde_json::Value {
    let index = build_index(&outcome.units);

    match kind {
        ListKind::Posts => serde_json::Value::Array(
            index
                .ordered_units()
                .iter()
                .map(|unit| {
                    serde_json::json!({
                        "slug": unit.slug,
                        "title": unit.title,
                        "date": unit.date.format("%Y-%m-%d").to_string(),
                        "tags": unit.tags,
                        "path": permalink_path(&site.config, unit),
                        "source": unit.source_path.display().to_string(),
                    })
                })
                .collect(),
        ),
        ListKind::Tags => {
            let counts: BTreeMap<String, usize> = index
                .tags()
                .into_iter()
                .map(|(slug, group)| (slug, group.units.len()))
                .collect();
            serde_json::json!(counts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> (TempDir, Site) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("a.md"),
            "---\ntitle: A\ndate: 2020-01-01\ntags: [Rust, Notes]\n---\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.md"),
            "---\ntitle: B\ndate: 2020-06-01\ntags: rust\n---\n",
        )
        .unwrap();
        fs::write(dir.path().join("broken.md"), "no front matter").unwrap();
        let site = Site::new(dir.path(), dir.path().join("public"), None).unwrap();
        (dir, site)
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("posts".parse::<ListKind>().unwrap(), ListKind::Posts);
        assert_eq!("tag".parse::<ListKind>().unwrap(), ListKind::Tags);
        assert!("category".parse::<ListKind>().is_err());
    }

    #[test]
    fn test_list_posts_text() {
        let (_dir, site) = site();
        let outcome = ContentLoader::new(&site.content_dir).load_all().unwrap();
        assert_eq!(outcome.errors.len(), 1);

        let text = to_text(&site, &outcome, ListKind::Posts);
        assert_eq!(
            text,
            "Posts (2):\n  2020-06-01 - B [b] -> /2020/06/01/b/\n  2020-01-01 - A [a] -> /2020/01/01/a/"
        );
    }

    #[test]
    fn test_list_tags_json() {
        let (_dir, site) = site();
        let outcome = ContentLoader::new(&site.content_dir).load_all().unwrap();
        let json = to_json(&site, &outcome, ListKind::Tags);
        assert_eq!(json, serde_json::json!({"notes": 1, "rust": 2}));
    }
}
