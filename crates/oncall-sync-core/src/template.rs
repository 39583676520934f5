//! Channel topic templates.
//!
//! A template is literal text with `{{.Key}}` field actions, for example
//! `primary: {{.Primary}} / secondary: {{ .Secondary }}`. Keys are the
//! sanitized schedule names produced by the reconciliation engine.

use crate::error::{Result, SyncError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
}

/// A topic template, parsed once at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl TopicTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let parse_err = |reason: String| SyncError::TemplateParse {
            template: source.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after_open = &rest[start + 2..];
            let offset = source.len() - rest.len() + start;
            let end = after_open
                .find("}}")
                .ok_or_else(|| parse_err(format!("unclosed action at offset {offset}")))?;
            let action = after_open[..end].trim();
            let key = action
                .strip_prefix('.')
                .ok_or_else(|| parse_err(format!("unsupported action {action:?}")))?;
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(parse_err(format!("invalid field name {key:?}")));
            }
            segments.push(Segment::Field(key.to_string()));
            rest = &after_open[end + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Field names referenced by the template, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(key) => Some(key.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn render(&self, values: &BTreeMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(key) => {
                    let value = values
                        .get(key)
                        .ok_or_else(|| SyncError::TemplateRender(key.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
