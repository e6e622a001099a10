//! Markdown rendering with syntax highlighting

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::Renderer;
use crate::config::SiteConfig;
use crate::helpers::escape_html;

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    highlight: bool,
    line_numbers: bool,
    allow_html: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: "base16-ocean.dark".to_string(),
            highlight: true,
            line_numbers: true,
            allow_html: false,
        }
    }

    /// Create from the site's highlight and markdown settings
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            theme_name: config.highlight.theme.clone(),
            highlight: config.highlight.enable,
            line_numbers: config.highlight.line_number,
            allow_html: config.markdown.allow_html,
            ..Self::new()
        }
    }

    /// Pass raw HTML through instead of escaping it
    pub fn allow_html(mut self, allow: bool) -> Self {
        self.allow_html = allow;
        self
    }

    fn options() -> Options {
        // YAML metadata blocks stay off: front matter is stripped by the loader
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");
        let plain = || {
            format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                escape_html(lang),
                escape_html(code)
            )
        };

        if !self.highlight {
            return plain();
        }

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = match self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
        {
            Some(theme) => theme,
            None => return plain(),
        };

        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, lang),
            Ok(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                escape_html(lang),
                highlighted
            ),
            Err(_) => plain(),
        }
    }

    /// Add line numbers to highlighted code
    fn add_line_numbers(&self, code: &str, lang: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");
        let code_lines = lines.join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre>{}</pre></td></tr></table></figure>"#,
            escape_html(lang),
            gutter,
            code_lines
        )
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, markdown: &str) -> Result<String> {
        let parser = Parser::new_ext(markdown, Self::options());

        let mut events: Vec<Event> = Vec::new();
        // Some(lang) while inside a code block
        let mut code_block: Option<Option<String>> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|l| l.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block = Some(lang);
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = code_block.take().flatten();
                    let highlighted = self.highlight_code(&code_block_content, lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                }
                Event::Text(text) if code_block.is_some() => {
                    code_block_content.push_str(&text);
                }
                Event::Html(raw) | Event::InlineHtml(raw) if !self.allow_html => {
                    events.push(Event::Text(raw));
                }
                _ => events.push(event),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Hello World\n\nThis is a test.").unwrap();
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```").unwrap();
        assert!(html.contains("highlight rust"));
        assert!(html.contains("line-number"));
    }

    #[test]
    fn test_render_code_block_without_highlighting() {
        let config = SiteConfig {
            highlight: crate::config::HighlightConfig {
                enable: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let renderer = MarkdownRenderer::from_config(&config);
        let html = renderer.render("```\na < b\n```").unwrap();
        assert!(html.contains(r#"<pre><code class="language-text">a &lt; b"#));
    }

    #[test]
    fn test_raw_html_is_escaped_by_default() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("<script>alert(1)</script>\n\nText with <b>bold</b>.")
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_raw_html_passthrough_when_allowed() {
        let renderer = MarkdownRenderer::new().allow_html(true);
        let html = renderer.render("Text with <b>bold</b>.").unwrap();
        assert!(html.contains("<b>bold</b>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = MarkdownRenderer::new();
        let text = "# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```python\nprint('x')\n```\n";
        assert_eq!(renderer.render(text).unwrap(), renderer.render(text).unwrap());
    }

    #[test]
    fn test_relative_image_link_is_kept() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("![cat](cat.png)").unwrap();
        assert!(html.contains(r#"<img src="cat.png" alt="cat" />"#));
    }
}
