//! Tolerant parsing of the model's structured payload.
//!
//! The model is asked to return a recognizable JSON object embedded in
//! its text response. Individually malformed items are skipped with a
//! warning; a response yielding zero valid items is a parse failure, so
//! callers never see a partially-typed package.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use conclave_core::domain::package::{ItemData, ResolutionItem, ResolutionPackage};
use conclave_core::domain::session::Session;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in model response")]
    NoJsonObject,
    #[error("model response JSON is malformed: {0}")]
    MalformedJson(String),
    #[error("model response contains no usable items")]
    NoItems,
    #[error("duplicate item id `{0}` in model response")]
    DuplicateItemId(String),
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    data: ItemData,
    #[serde(default)]
    source_excerpt: String,
}

/// Parses a candidate model response into a package. Every parsed item
/// starts at `pending`.
pub fn parse_package(text: &str, session: &Session) -> Result<ResolutionPackage, ParseError> {
    let json = extract_json_object(text).ok_or(ParseError::NoJsonObject)?;
    let response: WireResponse =
        serde_json::from_str(json).map_err(|error| ParseError::MalformedJson(error.to_string()))?;

    let mut items = Vec::new();
    for (index, raw) in response.items.into_iter().enumerate() {
        let wire: WireItem = match serde_json::from_value(raw) {
            Ok(wire) => wire,
            Err(error) => {
                warn!(index, %error, "skipping unusable item in model response");
                continue;
            }
        };
        let id = wire
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("item-{}", index + 1));
        items.push(ResolutionItem::pending(id, wire.data, wire.source_excerpt));
    }

    if items.is_empty() {
        return Err(ParseError::NoItems);
    }

    let mut seen = std::collections::HashSet::new();
    for item in &items {
        if !seen.insert(item.id.clone()) {
            return Err(ParseError::DuplicateItemId(item.id.clone()));
        }
    }

    Ok(ResolutionPackage::new(
        Uuid::new_v4().to_string(),
        session.id.clone(),
        session.mode,
        items,
    ))
}

/// Pulls the first JSON object out of the response text: a fenced code
/// block when present, otherwise the first balanced brace span.
fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(fenced) = extract_fenced_block(text) {
        if let Some(object) = extract_braced_span(fenced) {
            return Some(object);
        }
    }
    extract_braced_span(text)
}

fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

fn extract_braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
