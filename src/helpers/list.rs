//! List helper functions for listing pages, tag links and archives

use super::date::{format_date, time_tag};
use super::html::escape_html;
use super::url::url_for;
use crate::config::SiteConfig;
use crate::content::ContentUnit;
use crate::index::ArchiveYear;
use crate::output::permalink_path;

/// Generate post summaries for a listing page
///
/// Each entry shows the rendered excerpt when the post has one, otherwise
/// the full rendered body.
pub fn post_list(config: &SiteConfig, units: &[&ContentUnit]) -> String {
    let mut html = r#"<div class="post-list">"#.to_string();

    for unit in units {
        let url = url_for(config, &permalink_path(config, unit));
        let summary = unit
            .rendered()
            .map(|r| r.excerpt.as_deref().unwrap_or(&r.body))
            .unwrap_or_default();

        html.push_str(r#"<article class="post-list-item">"#);
        html.push_str(&format!(
            r#"<h2 class="post-list-title"><a class="post-list-link" href="{}">{}</a></h2>"#,
            escape_html(&url),
            escape_html(&unit.title)
        ));
        html.push_str(&time_tag(&unit.date, &config.date_format));
        html.push_str(&format!(r#"<div class="post-list-summary">{}</div>"#, summary));
        if unit.rendered().and_then(|r| r.excerpt.as_ref()).is_some() {
            html.push_str(&format!(
                r#"<a class="post-list-more" href="{}">Read more</a>"#,
                escape_html(&url)
            ));
        }
        html.push_str("</article>");
    }

    html.push_str("</div>");
    html
}

/// Generate links to the tag pages of a post's tags
pub fn tag_links(config: &SiteConfig, tags: &[String]) -> String {
    let mut items = String::new();

    for tag in tags {
        let slug = slug::slugify(tag);
        if slug.is_empty() {
            continue;
        }
        let url = url_for(config, &format!("{}/{}/", config.tag_dir, slug));
        items.push_str(&format!(
            r#"<li class="tag-list-item"><a class="tag-list-link" href="{}">{}</a></li>"#,
            escape_html(&url),
            escape_html(tag)
        ));
    }

    if items.is_empty() {
        return String::new();
    }
    format!(r#"<ul class="tag-list">{}</ul>"#, items)
}

/// Link to a neighboring post, or nothing
pub fn post_nav_link(config: &SiteConfig, unit: Option<&ContentUnit>, class: &str) -> String {
    match unit {
        Some(unit) => format!(
            r#"<a class="{}" href="{}" title="{}">{}</a>"#,
            class,
            escape_html(&url_for(config, &permalink_path(config, unit))),
            escape_html(&unit.title),
            escape_html(&unit.title)
        ),
        None => String::new(),
    }
}

/// Generate the yearly archive list
pub fn archive_list(config: &SiteConfig, years: &[ArchiveYear]) -> String {
    if years.is_empty() {
        return String::new();
    }

    let mut html = r#"<div class="archive-list">"#.to_string();

    for year in years {
        html.push_str(&format!(
            r#"<section class="archive-year"><h2 class="archive-year-title">{}<span class="archive-year-count">{}</span></h2><ul>"#,
            year.year,
            year.units.len()
        ));
        for unit in &year.units {
            html.push_str(&format!(
                r#"<li class="archive-list-item"><span class="archive-list-date">{}</span><a class="archive-list-link" href="{}">{}</a></li>"#,
                format_date(&unit.date, "MM-DD"),
                escape_html(&url_for(config, &permalink_path(config, unit))),
                escape_html(&unit.title)
            ));
        }
        html.push_str("</ul></section>");
    }

    html.push_str("</div>");
    html
}

/// Generate a paginator
///
/// `base_url` is the URL of the listing's first page and must end with `/`.
pub fn paginator(
    current: usize,
    total: usize,
    base_url: &str,
    pagination_dir: &str,
    mid_size: usize,
) -> String {
    if total <= 1 {
        return String::new();
    }

    let pagination_dir = pagination_dir.trim_matches('/');
    let page_url = |page: usize| {
        if page <= 1 {
            base_url.to_string()
        } else {
            format!("{}{}/{}/", base_url, pagination_dir, page)
        }
    };

    let mut html = r#"<nav class="pagination">"#.to_string();

    if current > 1 {
        html.push_str(&format!(
            r#"<a class="pagination-prev" href="{}">Newer</a>"#,
            page_url(current - 1)
        ));
    }

    html.push_str(r#"<span class="pagination-numbers">"#);

    let start = current.saturating_sub(mid_size).max(1);
    let end = (current + mid_size).min(total);

    if start > 1 {
        html.push_str(&format!(
            r#"<a class="pagination-number" href="{}">1</a>"#,
            page_url(1)
        ));
        if start > 2 {
            html.push_str(r#"<span class="pagination-ellipsis">&hellip;</span>"#);
        }
    }

    for page in start..=end {
        if page == current {
            html.push_str(&format!(
                r#"<span class="pagination-number current">{}</span>"#,
                page
            ));
        } else {
            html.push_str(&format!(
                r#"<a class="pagination-number" href="{}">{}</a>"#,
                page_url(page),
                page
            ));
        }
    }

    if end < total {
        if end + 1 < total {
            html.push_str(r#"<span class="pagination-ellipsis">&hellip;</span>"#);
        }
        html.push_str(&format!(
            r#"<a class="pagination-number" href="{}">{}</a>"#,
            page_url(total),
            total
        ));
    }

    html.push_str("</span>");

    if current < total {
        html.push_str(&format!(
            r#"<a class="pagination-next" href="{}">Older</a>"#,
            page_url(current + 1)
        ));
    }

    html.push_str("</nav>");
    html
}
