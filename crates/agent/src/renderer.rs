//! Response rendering — classifies raw output and normalizes it for display.
//!
//! Classification order (first match wins):
//!
//! 1. starts or ends with a code fence        → `CodeBlock`
//! 2. parses as a JSON object or array        → `Json`
//! 3. starts with an error/failure prefix     → `Error`
//! 4. anything else                           → `PlainText`
//!
//! The presentation surface is a markdown chat view, so prose is
//! HTML-escaped while fenced code bodies are kept verbatim.

use parley_core::error::{ChatUiError, RenderingError};
use parley_core::response::ContentType;

const FENCE: &str = "```";

const ERROR_PREFIXES: &[&str] = &["error:", "failed:", "failure:", "exception:", "fatal:"];

/// Stateless renderer. Create one and share it.
#[derive(Debug, Clone, Default)]
pub struct ResponseRenderer;

impl ResponseRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Classify text into a content type.
    pub fn detect_content_type(&self, text: &str) -> ContentType {
        let t = text.trim();
        if t.starts_with(FENCE) || t.ends_with(FENCE) {
            return ContentType::CodeBlock;
        }
        if (t.starts_with('{') || t.starts_with('['))
            && serde_json::from_str::<serde_json::Value>(t).is_ok()
        {
            return ContentType::Json;
        }
        if has_error_prefix(t) {
            return ContentType::Error;
        }
        ContentType::PlainText
    }

    /// Normalize `raw` as the given content type.
    pub fn render(&self, raw: &str, content_type: ContentType) -> Result<String, ChatUiError> {
        match content_type {
            ContentType::PlainText => Ok(escape_html(&normalize_prose(raw))),
            ContentType::Error => {
                let text = normalize_prose(raw);
                if has_error_prefix(&text) {
                    Ok(escape_html(&text))
                } else {
                    Ok(escape_html(&format!("Error: {text}")))
                }
            }
            ContentType::Json => {
                let value: serde_json::Value =
                    serde_json::from_str(raw.trim()).map_err(|e| RenderingError {
                        content: raw.to_string(),
                        reason: format!("invalid JSON: {e}"),
                    })?;
                serde_json::to_string_pretty(&value).map_err(|e| {
                    ChatUiError::from(RenderingError {
                        content: raw.to_string(),
                        reason: e.to_string(),
                    })
                })
            }
            ContentType::CodeBlock => render_fenced(raw).map_err(ChatUiError::from),
        }
    }

    /// Detect, then render.
    pub fn render_auto(&self, raw: &str) -> Result<(String, ContentType), ChatUiError> {
        let content_type = self.detect_content_type(raw);
        let rendered = self.render(raw, content_type)?;
        Ok((rendered, content_type))
    }
}

fn has_error_prefix(text: &str) -> bool {
    let head: String = text.chars().take(12).collect::<String>().to_lowercase();
    ERROR_PREFIXES.iter().any(|p| head.starts_with(p))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Unify line endings, strip trailing spaces, collapse blank runs and drop
/// leading/trailing blank lines.
fn normalize_prose(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = Vec::new();
    let mut last_blank = true;
    for line in unified.lines() {
        let line = line.trim_end();
        let blank = line.is_empty();
        if blank && last_blank {
            continue;
        }
        lines.push(line);
        last_blank = blank;
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Keep only characters that are plausible in a fence language tag.
fn sanitize_lang(tag: &str) -> String {
    tag.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '.' | '#'))
        .collect()
}

/// Render text containing one or more fenced blocks.
///
/// Prose around the blocks is escaped and normalized; block bodies are only
/// stripped of trailing whitespace.
fn render_fenced(raw: &str) -> Result<String, RenderingError> {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let mut out: Vec<String> = Vec::new();
    let mut in_block = false;
    let mut saw_block = false;
    let mut last_blank = true;

    for line in unified.lines() {
        let trimmed = line.trim();
        if in_block {
            if trimmed == FENCE {
                out.push(FENCE.to_string());
                in_block = false;
                last_blank = false;
            } else {
                out.push(line.trim_end().to_string());
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix(FENCE) {
            saw_block = true;
            last_blank = false;
            match rest.strip_suffix(FENCE) {
                // Single-line block: ```code```
                Some(body) if !rest.is_empty() && rest.len() >= FENCE.len() => {
                    out.push(FENCE.to_string());
                    out.push(body.trim().to_string());
                    out.push(FENCE.to_string());
                }
                _ => {
                    out.push(format!("{FENCE}{}", sanitize_lang(rest)));
                    in_block = true;
                }
            }
            continue;
        }

        let prose = line.trim_end();
        if prose.is_empty() {
            if !last_blank {
                out.push(String::new());
            }
            last_blank = true;
        } else {
            out.push(escape_html(prose));
            last_blank = false;
        }
    }

    if in_block {
        return Err(RenderingError {
            content: raw.to_string(),
            reason: "unterminated code fence".into(),
        });
    }
    if !saw_block {
        return Err(RenderingError {
            content: raw.to_string(),
            reason: "code fence marker not at the start of a line".into(),
        });
    }

    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    Ok(out.join("\n"))
}
