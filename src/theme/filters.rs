//! Tera filters available to layouts

use std::collections::HashMap;
use tera::{try_get_value, Value};

/// Strip HTML tags
pub fn strip_html(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = try_get_value!("strip_html", "value", String, value);
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    Ok(Value::String(result))
}

/// Truncate by character count, appending `omission` when cut
pub fn truncate_chars(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        return Ok(Value::String(s));
    }
    let truncated: String = s.chars().take(length).collect();
    Ok(Value::String(format!("{}{}", truncated.trim_end(), omission)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let out = strip_html(&Value::from("<p>Hi <b>there</b></p>"), &HashMap::new()).unwrap();
        assert_eq!(out, Value::from("Hi there"));
    }

    #[test]
    fn test_truncate_chars() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), Value::from(5));
        let out = truncate_chars(&Value::from("hello world"), &args).unwrap();
        assert_eq!(out, Value::from("hello..."));

        let out = truncate_chars(&Value::from("short"), &args).unwrap();
        assert_eq!(out, Value::from("short"));
    }
}
