//! Site index - ordered, paginated and grouped views over content units
//!
//! The index borrows the units it orders and never caches anything on them;
//! navigation between posts is looked up on demand.

use chrono::Datelike;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::content::ContentUnit;
use crate::error::ConfigError;

/// Date-ordered view over a set of content units
#[derive(Debug, Clone, Default)]
pub struct SiteIndex<'a> {
    ordered_units: Vec<&'a ContentUnit>,
}

/// One page of a paginated listing
#[derive(Debug, Clone)]
pub struct IndexPage<'a> {
    /// 1-based page number
    pub number: usize,
    /// Total number of pages in this listing
    pub total: usize,
    pub units: Vec<&'a ContentUnit>,
}

impl IndexPage<'_> {
    pub fn is_first(&self) -> bool {
        self.number == 1
    }
}

/// Units sharing a tag
#[derive(Debug, Clone)]
pub struct TagGroup<'a> {
    /// Tag as first written in index order
    pub name: String,
    pub units: Vec<&'a ContentUnit>,
}

/// Units published in one year
#[derive(Debug, Clone)]
pub struct ArchiveYear<'a> {
    pub year: i32,
    pub units: Vec<&'a ContentUnit>,
}

/// Posts adjacent to one post in index order
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors<'a> {
    /// The next more recent post
    pub newer: Option<&'a ContentUnit>,
    /// The next older post
    pub older: Option<&'a ContentUnit>,
}

/// Date descending, then slug ascending
pub fn index_order(a: &ContentUnit, b: &ContentUnit) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug))
}

/// Build the index over `units`
pub fn build_index(units: &[ContentUnit]) -> SiteIndex<'_> {
    let mut ordered_units: Vec<&ContentUnit> = units.iter().collect();
    ordered_units.sort_by(|a, b| index_order(a, b));
    SiteIndex { ordered_units }
}

/// Split `units` into pages of `page_size`; the last page may be shorter
pub fn paginate<'a>(
    units: &[&'a ContentUnit],
    page_size: usize,
) -> Result<Vec<IndexPage<'a>>, ConfigError> {
    if page_size == 0 {
        return Err(ConfigError::InvalidPageSize);
    }

    let total = units.len().div_ceil(page_size);
    Ok(units
        .chunks(page_size)
        .enumerate()
        .map(|(i, chunk)| IndexPage {
            number: i + 1,
            total,
            units: chunk.to_vec(),
        })
        .collect())
}

impl<'a> SiteIndex<'a> {
    /// Units in index order
    pub fn ordered_units(&self) -> &[&'a ContentUnit] {
        &self.ordered_units
    }

    pub fn len(&self) -> usize {
        self.ordered_units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_units.is_empty()
    }

    /// Paginate the whole index
    pub fn paginate(&self, page_size: usize) -> Result<Vec<IndexPage<'a>>, ConfigError> {
        paginate(&self.ordered_units, page_size)
    }

    /// The `n` most recent units, or all of them if there are fewer
    pub fn feed(&self, n: usize) -> &[&'a ContentUnit] {
        &self.ordered_units[..n.min(self.ordered_units.len())]
    }

    /// Units grouped by tag slug; groups keep index order
    pub fn tags(&self) -> BTreeMap<String, TagGroup<'a>> {
        let mut groups: BTreeMap<String, TagGroup<'a>> = BTreeMap::new();

        for &unit in &self.ordered_units {
            let mut seen = Vec::new();
            for tag in &unit.tags {
                let key = slug::slugify(tag);
                // Skip tags that normalize to nothing, and repeats within one post
                if key.is_empty() || seen.contains(&key) {
                    continue;
                }
                seen.push(key.clone());

                groups
                    .entry(key)
                    .or_insert_with(|| TagGroup {
                        name: tag.clone(),
                        units: Vec::new(),
                    })
                    .units
                    .push(unit);
            }
        }

        groups
    }

    /// Units grouped by year, newest year first
    pub fn archive(&self) -> Vec<ArchiveYear<'a>> {
        let mut years: Vec<ArchiveYear<'a>> = Vec::new();

        for &unit in &self.ordered_units {
            let year = unit.date.year();
            match years.last_mut() {
                Some(last) if last.year == year => last.units.push(unit),
                _ => years.push(ArchiveYear {
                    year,
                    units: vec![unit],
                }),
            }
        }

        years
    }

    /// Posts around `slug`, or nothing if it is not indexed
    pub fn neighbors(&self, slug: &str) -> Neighbors<'a> {
        let Some(pos) = self.ordered_units.iter().position(|u| u.slug == slug) else {
            return Neighbors::default();
        };

        Neighbors {
            newer: pos
                .checked_sub(1)
                .and_then(|i| self.ordered_units.get(i))
                .copied(),
            older: self.ordered_units.get(pos + 1).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn unit(slug: &str, date: &str, tags: &[&str]) -> ContentUnit {
        let mut unit = ContentUnit::new(
            slug.to_string(),
            slug.to_uppercase(),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            PathBuf::from(format!("{}.md", slug)),
        );
        unit.tags = tags.iter().map(|t| t.to_string()).collect();
        unit
    }

    fn slugs(units: &[&ContentUnit]) -> Vec<String> {
        units.iter().map(|u| u.slug.clone()).collect()
    }

    fn corpus() -> Vec<ContentUnit> {
        vec![
            unit("a", "2020-01-01", &["Rust"]),
            unit("b", "2020-06-01", &["rust", "Life"]),
            unit("d", "2019-03-03", &[]),
            unit("c", "2020-06-01", &["Life", "life"]),
            unit("e", "2021-12-31", &["!!"]),
        ]
    }

    #[test]
    fn test_order_is_date_desc_then_slug() {
        let units = corpus();
        let index = build_index(&units);
        assert_eq!(slugs(index.ordered_units()), vec!["e", "b", "c", "a", "d"]);
        assert_eq!(index.len(), units.len());
    }

    #[test]
    fn test_order_ignores_input_order() {
        let mut units = corpus();
        let expected = slugs(build_index(&units).ordered_units());
        units.reverse();
        assert_eq!(slugs(build_index(&units).ordered_units()), expected);
    }

    #[test]
    fn test_two_post_example() {
        let units = vec![unit("a", "2020-01-01", &[]), unit("b", "2020-06-01", &[])];
        let index = build_index(&units);
        assert_eq!(slugs(index.ordered_units()), vec!["b", "a"]);
        assert_eq!(slugs(index.feed(1)), vec!["b"]);
    }

    #[test]
    fn test_empty_index() {
        let index = build_index(&[]);
        assert!(index.is_empty());
        assert!(index.paginate(3).unwrap().is_empty());
        assert!(index.feed(10).is_empty());
        assert!(index.tags().is_empty());
        assert!(index.archive().is_empty());
    }

    #[test]
    fn test_pagination_concatenates_to_index() {
        let units = corpus();
        let index = build_index(&units);

        for size in 1..=units.len() + 2 {
            let pages = index.paginate(size).unwrap();
            let joined: Vec<&ContentUnit> =
                pages.iter().flat_map(|p| p.units.iter().copied()).collect();
            assert_eq!(slugs(&joined), slugs(index.ordered_units()), "size {}", size);

            assert_eq!(pages.len(), units.len().div_ceil(size));
            for (i, page) in pages.iter().enumerate() {
                assert_eq!(page.number, i + 1);
                assert_eq!(page.total, pages.len());
                assert!(page.units.len() <= size && !page.units.is_empty());
            }
            assert!(pages[0].is_first());
            assert_eq!(pages[pages.len() - 1].number, pages.len());
        }
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let units = corpus();
        let index = build_index(&units);
        assert!(matches!(
            index.paginate(0),
            Err(ConfigError::InvalidPageSize)
        ));
    }

    #[test]
    fn test_feed_never_pads() {
        let units = corpus();
        let index = build_index(&units);
        assert_eq!(slugs(index.feed(2)), vec!["e", "b"]);
        assert_eq!(index.feed(100).len(), units.len());
    }

    #[test]
    fn test_tag_groups() {
        let units = corpus();
        let index = build_index(&units);
        let tags = index.tags();

        let keys: Vec<_> = tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["life", "rust"]);
        assert_eq!(tags["life"].name, "Life");
        assert_eq!(slugs(&tags["life"].units), vec!["b", "c"]);
        assert_eq!(tags["rust"].name, "rust");
        assert_eq!(slugs(&tags["rust"].units), vec!["b", "a"]);
    }

    #[test]
    fn test_archive_years() {
        let units = corpus();
        let index = build_index(&units);
        let archive = index.archive();
        let years: Vec<_> = archive.iter().map(|y| y.year).collect();
        assert_eq!(years, vec![2021, 2020, 2019]);
        assert_eq!(slugs(&archive[1].units), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_neighbors() {
        let units = corpus();
        let index = build_index(&units);

        let n = index.neighbors("c");
        assert_eq!(n.newer.map(|u| u.slug.as_str()), Some("b"));
        assert_eq!(n.older.map(|u| u.slug.as_str()), Some("a"));

        let first = index.neighbors("e");
        assert!(first.newer.is_none());
        assert_eq!(first.older.map(|u| u.slug.as_str()), Some("b"));

        let last = index.neighbors("d");
        assert!(last.older.is_none());

        let missing = index.neighbors("zzz");
        assert!(missing.newer.is_none() && missing.older.is_none());
    }
}
