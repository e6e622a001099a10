//! Date helper functions

use chrono::NaiveDate;

/// Format a date using Moment.js-compatible format string
///
/// # Examples
/// ```ignore
/// format_date(&date, "YYYY-MM-DD") // -> "2024-01-15"
/// ```
pub fn format_date(date: &NaiveDate, format: &str) -> String {
    let chrono_format = moment_to_chrono_format(format);
    date.format(&chrono_format).to_string()
}

/// Format a date as an Atom/XML timestamp at midnight UTC
pub fn date_xml(date: &NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00Z").to_string()
}

/// Generate a <time> HTML element
pub fn time_tag(date: &NaiveDate, format: &str) -> String {
    format!(
        r#"<time datetime="{}">{}</time>"#,
        date.format("%Y-%m-%d"),
        format_date(date, format)
    )
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest patterns first within each group
    let replacements = [
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("DDDD", "%j"),
        ("DD", "%d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
