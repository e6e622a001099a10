//! Front-matter parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::error::LoadErrorKind;

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                vec.push(item);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Front-matter data from a content source
///
/// Only `title`, `date`, `slug`, `tags`, `layout` and `published` are
/// interpreted; every other key lands in `extra` in the order it was written.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    /// Kept as a raw value: YAML may hand back a string or a number here
    pub date: Option<serde_yaml::Value>,
    pub slug: Option<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    pub layout: Option<String>,
    /// Unpublished sources are left out of the site
    #[serde(default = "default_published")]
    pub published: bool,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

fn default_published() -> bool {
    true
}

impl Default for FrontMatter {
    fn default() -> Self {
        Self {
            title: None,
            date: None,
            slug: None,
            tags: Vec::new(),
            layout: None,
            published: default_published(),
            extra: IndexMap::new(),
        }
    }
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), LoadErrorKind> {
        let content = content.trim_start_matches('\u{feff}').trim_start();

        if content.starts_with("---") {
            return Self::parse_yaml(content);
        }

        if content.starts_with(";;;") {
            return Self::parse_json(content);
        }

        Err(LoadErrorKind::MissingFrontMatter)
    }

    fn parse_yaml(content: &str) -> Result<(Self, &str), LoadErrorKind> {
        let (yaml_content, remaining) = split_fenced(content, "---")?;

        if yaml_content.trim().is_empty() {
            return Ok((FrontMatter::default(), remaining));
        }

        let fm = serde_yaml::from_str::<FrontMatter>(yaml_content)
            .map_err(|e| LoadErrorKind::MalformedFrontMatter(e.to_string()))?;
        Ok((fm, remaining))
    }

    fn parse_json(content: &str) -> Result<(Self, &str), LoadErrorKind> {
        let (json_content, remaining) = split_fenced(content, ";;;")?;

        let fm: FrontMatter = serde_json::from_str(json_content)
            .map_err(|e| LoadErrorKind::MalformedFrontMatter(e.to_string()))?;
        Ok((fm, remaining))
    }

    /// The required title
    pub fn require_title(&self) -> Result<String, LoadErrorKind> {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => Ok(title.to_string()),
            _ => Err(LoadErrorKind::MissingField("title")),
        }
    }

    /// The required date, as a naive calendar date
    pub fn require_date(&self) -> Result<NaiveDate, LoadErrorKind> {
        let raw = match &self.date {
            None | Some(serde_yaml::Value::Null) => {
                return Err(LoadErrorKind::MissingField("date"))
            }
            Some(serde_yaml::Value::String(s)) => s.clone(),
            Some(serde_yaml::Value::Number(n)) => n.to_string(),
            Some(other) => {
                let shown = serde_yaml::to_string(other).unwrap_or_default();
                return Err(LoadErrorKind::MalformedDate(shown.trim().to_string()));
            }
        };

        parse_date_string(&raw).ok_or(LoadErrorKind::MalformedDate(raw))
    }
}

/// Split `content` (which starts with `fence`) into the fenced block and the
/// body that follows the closing fence line.
fn split_fenced<'a>(content: &'a str, fence: &str) -> Result<(&'a str, &'a str), LoadErrorKind> {
    let rest = &content[fence.len()..];
    let rest = rest.trim_start_matches([' ', '\t']);
    let rest = match rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
        Some(rest) => rest,
        None if rest.is_empty() => rest,
        None => {
            return Err(LoadErrorKind::MalformedFrontMatter(format!(
                "opening `{}` must be on its own line",
                fence
            )))
        }
    };

    // An immediately closed block has no leading newline before the fence
    if let Some(after) = rest.strip_prefix(fence) {
        return Ok(("", after.trim_start_matches(['\n', '\r'])));
    }

    let closing = format!("\n{}", fence);
    match rest.find(&closing) {
        Some(end_pos) => {
            let block = &rest[..end_pos];
            let remaining = &rest[end_pos + closing.len()..];
            Ok((block, remaining.trim_start_matches(['\n', '\r'])))
        }
        None => Err(LoadErrorKind::MalformedFrontMatter(format!(
            "missing closing `{}`",
            fence
        ))),
    }
}

/// Parse a date string in various formats, keeping only the calendar date
pub fn parse_date_string(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    // RFC 3339: keep the date as written, ignore the offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local().date());
    }

    None
}
