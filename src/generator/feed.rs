//! Atom feed generation

use crate::config::SiteConfig;
use crate::content::ContentUnit;
use crate::helpers::{date_xml, escape_xml, full_url_for, strip_invalid_xml_chars};
use crate::output::permalink_path;

/// Timestamp used when the feed has no entries
const EMPTY_FEED_UPDATED: &str = "1970-01-01T00:00:00Z";

/// Build an Atom feed over `units`, newest first
///
/// `updated` is the newest entry's date so the feed only changes when the
/// content does.
pub fn atom_feed(config: &SiteConfig, units: &[&ContentUnit]) -> String {
    let base_url = config.url.trim_end_matches('/');
    let home = full_url_for(config, "");

    let mut feed = String::new();
    feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    feed.push('\n');
    feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
    feed.push('\n');
    feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
    if !config.description.is_empty() {
        feed.push_str(&format!(
            "  <subtitle>{}</subtitle>\n",
            escape_xml(&config.description)
        ));
    }
    feed.push_str(&format!(
        "  <link href=\"{}\" rel=\"self\"/>\n",
        escape_xml(&full_url_for(config, &config.feed_path))
    ));
    feed.push_str(&format!("  <link href=\"{}\"/>\n", escape_xml(&home)));
    feed.push_str(&format!(
        "  <updated>{}</updated>\n",
        units
            .first()
            .map(|u| date_xml(&u.date))
            .unwrap_or_else(|| EMPTY_FEED_UPDATED.to_string())
    ));
    feed.push_str(&format!("  <id>{}</id>\n", escape_xml(&home)));
    if !config.author.is_empty() {
        feed.push_str(&format!(
            "  <author><name>{}</name></author>\n",
            escape_xml(&config.author)
        ));
    }

    for unit in units {
        let url = escape_xml(&full_url_for(config, &permalink_path(config, unit)));
        feed.push_str("  <entry>\n");
        feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&unit.title)));
        feed.push_str(&format!("    <link href=\"{}\"/>\n", url));
        feed.push_str(&format!("    <id>{}</id>\n", url));
        feed.push_str(&format!(
            "    <published>{}</published>\n",
            date_xml(&unit.date)
        ));
        feed.push_str(&format!("    <updated>{}</updated>\n", date_xml(&unit.date)));
        for tag in &unit.tags {
            feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
        }

        let content = unit
            .rendered()
            .map(|r| r.excerpt.as_deref().unwrap_or(&r.body))
            .unwrap_or_default();
        let content = strip_invalid_xml_chars(&absolutize_urls(content, base_url));
        feed.push_str(&format!(
            "    <content type=\"html\"><![CDATA[{}]]></content>\n",
            content.replace("]]>", "]]]]><![CDATA[>")
        ));
        feed.push_str("  </entry>\n");
    }

    feed.push_str("</feed>\n");
    feed
}

/// Rewrite root-relative `href`/`src` attributes against `base_url`
fn absolutize_urls(content: &str, base_url: &str) -> String {
    content
        .replace("href=\"/", &format!("href=\"{}/", base_url))
        .replace("src=\"/", &format!("src=\"{}/", base_url))
        .replace("href='/", &format!("href='{}/", base_url))
        .replace("src='/", &format!("src='{}/", base_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Rendered;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn unit(slug: &str, date: &str, body: &str) -> ContentUnit {
        let unit = ContentUnit::new(
            slug.to_string(),
            format!("Post <{}>", slug),
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            PathBuf::from(format!("{}.md", slug)),
        );
        unit.set_rendered(Rendered {
            body: body.to_string(),
            excerpt: None,
        })
        .unwrap();
        unit
    }

    #[test]
    fn test_feed_entries_and_updated() {
        let config = SiteConfig {
            url: "https://example.com".to_string(),
            ..Default::default()
        };
        let b = unit("b", "2020-06-01", r#"<p><a href="/about/">x</a></p>"#);
        let a = unit("a", "2020-01-01", "<p>a</p>");

        let feed = atom_feed(&config, &[&b, &a]);
        assert!(feed.contains("<updated>2020-06-01T00:00:00Z</updated>\n  <id>"));
        assert!(feed.contains("<title>Post &lt;b&gt;</title>"));
        assert!(feed.contains(r#"<link href="https://example.com/2020/06/01/b/"/>"#));
        assert!(feed.contains(r#"href="https://example.com/about/""#));
        assert_eq!(feed.matches("<entry>").count(), 2);
        assert!(feed.find("/2020/06/01/b/") < feed.find("/2020/01/01/a/"));
    }

    #[test]
    fn test_empty_feed_is_stable() {
        let config = SiteConfig::default();
        let feed = atom_feed(&config, &[]);
        assert!(feed.contains(EMPTY_FEED_UPDATED));
        assert!(!feed.contains("<entry>"));
        assert_eq!(feed, atom_feed(&config, &[]));
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        let config = SiteConfig::default();
        let a = unit("a", "2020-01-01", "<p>x]]>y</p>\u{1}");
        let feed = atom_feed(&config, &[&a]);
        assert!(feed.contains("x]]]]><![CDATA[>y"));
        assert!(!feed.contains('\u{1}'));
    }
}
