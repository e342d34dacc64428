//! Content composer
//!
//! Turns a document, its saved highlights and a style snapshot into one
//! self-contained HTML document for the rendering surface. The output is a
//! pure function of the inputs so the same article always produces the same
//! bytes.
//!
//! Highlights are applied independently: a record whose anchor cannot be
//! placed is dropped and reported, the rest of the article still renders.

use std::borrow::Cow;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ComposeError, Result};
use crate::types::{Document, HighlightRecord, StyleConfig};

/// Id of the element the liveness check looks for
pub const ROOT_MARKER_ID: &str = "root";

/// Class carried by every applied highlight
pub const HIGHLIGHT_CLASS: &str = "reader-highlight";

/// Why a highlight record was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Record did not match the highlight shape
    Malformed,
    /// `start >= end`
    EmptyRange,
    /// `end` lies past the content
    OutOfBounds,
    /// Offset splits a UTF-8 sequence
    NotCharBoundary,
    /// Range contains markup, starts inside a tag or splits a character
    /// reference
    StraddlesMarkup,
    /// Anchored text differs from the recorded quote
    QuoteMismatch,
    /// Range overlaps an earlier highlight
    Overlap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedHighlight {
    pub id: Option<String>,
    pub reason: DropReason,
}

/// Composed document ready to load into a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableMarkup {
    pub html: String,
    /// Ids of applied highlights in document order
    pub applied: Vec<String>,
    pub dropped: Vec<DroppedHighlight>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArticlePayload<'a> {
    id: &'a str,
    slug: &'a str,
    title: &'a str,
    url: &'a str,
    author: Option<&'a str>,
    highlights: Vec<&'a HighlightRecord>,
    font_size: u32,
    line_height: u32,
    margin: u32,
    font_family: &'a str,
    is_dark: bool,
}

/// Compose `document` with `style` into a complete HTML document
///
/// # Errors
///
/// Returns `ComposeError::EmptyContent` when the document has no content.
/// Highlight problems never fail the render.
pub fn compose(document: &Document, style: &StyleConfig) -> Result<RenderableMarkup> {
    if document.raw_content.trim().is_empty() {
        return Err(ComposeError::EmptyContent.into());
    }

    let (records, mut dropped) = parse_highlights(&document.highlights_json);
    let (accepted, rejected) = place_highlights(&document.raw_content, &records);
    dropped.extend(rejected);

    for drop in &dropped {
        warn!(
            item = %document.item.id,
            highlight = drop.id.as_deref().unwrap_or("<unknown>"),
            reason = ?drop.reason,
            "Dropping highlight"
        );
    }

    let body = apply_highlights(&document.raw_content, &accepted);

    let payload = ArticlePayload {
        id: &document.item.id,
        slug: &document.item.slug,
        title: &document.item.title,
        url: &document.item.original_url,
        author: document.item.author.as_deref(),
        highlights: accepted.clone(),
        font_size: style.font_size,
        line_height: style.line_height,
        margin: style.margin,
        font_family: style.font_family.as_str(),
        is_dark: style.color_scheme.is_dark(),
    };
    let payload = serde_json::to_string(&payload).map_err(ComposeError::Serialize)?;

    let html = render_document(document, style, &body, &payload);
    let applied: Vec<String> = accepted.iter().map(|h| h.id.clone()).collect();

    debug!(
        item = %document.item.id,
        applied = applied.len(),
        dropped = dropped.len(),
        bytes = html.len(),
        "Composed document"
    );

    Ok(RenderableMarkup {
        html,
        applied,
        dropped,
    })
}

fn parse_highlights(json: &str) -> (Vec<HighlightRecord>, Vec<DroppedHighlight>) {
    if json.trim().is_empty() {
        return (Vec::new(), Vec::new());
    }

    let items = match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("Highlights payload is not an array; rendering without highlights");
            return (Vec::new(), Vec::new());
        }
        Err(e) => {
            warn!("Highlights payload is not valid JSON ({}); rendering without highlights", e);
            return (Vec::new(), Vec::new());
        }
    };

    let mut records = Vec::with_capacity(items.len());
    let mut dropped = Vec::new();
    for item in items {
        let id = item.get("id").and_then(Value::as_str).map(str::to_string);
        match serde_json::from_value::<HighlightRecord>(item) {
            Ok(record) => records.push(record),
            Err(_) => dropped.push(DroppedHighlight {
                id,
                reason: DropReason::Malformed,
            }),
        }
    }
    (records, dropped)
}

fn check_anchor(content: &str, record: &HighlightRecord) -> std::result::Result<(), DropReason> {
    let (start, end) = (record.anchor.start, record.anchor.end);
    if start >= end {
        return Err(DropReason::EmptyRange);
    }
    if end > content.len() {
        return Err(DropReason::OutOfBounds);
    }
    if !content.is_char_boundary(start) || !content.is_char_boundary(end) {
        return Err(DropReason::NotCharBoundary);
    }
    let anchored = &content[start..end];
    if anchored.contains(['<', '>'])
        || inside_tag(content, start)
        || splits_entity(content, start)
        || splits_entity(content, end)
    {
        return Err(DropReason::StraddlesMarkup);
    }
    if !record.quote.is_empty() && record.quote != anchored {
        return Err(DropReason::QuoteMismatch);
    }
    Ok(())
}

/// Offset lies between a tag's `<` and its closing `>`
fn inside_tag(content: &str, at: usize) -> bool {
    let before = &content[..at];
    match (before.rfind('<'), before.rfind('>')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Offset falls inside a character reference such as `&amp;` or `&#8217;`
fn splits_entity(content: &str, at: usize) -> bool {
    let is_entity_char = |c: char| c.is_ascii_alphanumeric() || c == '#';
    let (before, after) = content.split_at(at);
    let Some(amp) = before.rfind('&') else {
        return false;
    };
    let head = &before[amp + 1..];
    if !head.chars().all(is_entity_char) {
        return false;
    }
    let tail = after.find(|c: char| !is_entity_char(c)).unwrap_or(after.len());
    head.len() + tail > 0 && after[tail..].starts_with(';')
}

fn place_highlights<'a>(
    content: &str,
    records: &'a [HighlightRecord],
) -> (Vec<&'a HighlightRecord>, Vec<DroppedHighlight>) {
    let mut dropped = Vec::new();
    let mut valid: Vec<&HighlightRecord> = Vec::with_capacity(records.len());

    for record in records {
        match check_anchor(content, record) {
            Ok(()) => valid.push(record),
            Err(reason) => dropped.push(DroppedHighlight {
                id: Some(record.id.clone()),
                reason,
            }),
        }
    }

    valid.sort_by(|a, b| {
        a.anchor
            .start
            .cmp(&b.anchor.start)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut accepted: Vec<&HighlightRecord> = Vec::with_capacity(valid.len());
    for record in valid {
        let overlaps = accepted
            .last()
            .is_some_and(|last| record.anchor.start < last.anchor.end);
        if overlaps {
            dropped.push(DroppedHighlight {
                id: Some(record.id.clone()),
                reason: DropReason::Overlap,
            });
        } else {
            accepted.push(record);
        }
    }

    (accepted, dropped)
}

/// Wrap each accepted range, copying everything else verbatim
///
/// `accepted` must be sorted and non-overlapping.
fn apply_highlights(content: &str, accepted: &[&HighlightRecord]) -> String {
    let mut body = String::with_capacity(content.len() + accepted.len() * 64);
    let mut cursor = 0;
    for record in accepted {
        body.push_str(&content[cursor..record.anchor.start]);
        body.push_str(&format!(
            "<mark class=\"{}\" data-highlight-id=\"{}\">",
            HIGHLIGHT_CLASS,
            escape(&record.id)
        ));
        body.push_str(&content[record.anchor.start..record.anchor.end]);
        body.push_str("</mark>");
        cursor = record.anchor.end;
    }
    body.push_str(&content[cursor..]);
    body
}

fn render_document(document: &Document, style: &StyleConfig, body: &str, payload: &str) -> String {
    let (background, foreground, highlight) = if style.color_scheme.is_dark() {
        ("#1f1f1f", "#e6e6e6", "rgba(255, 210, 52, 0.35)")
    } else {
        ("#ffffff", "#2a2a2a", "rgba(255, 210, 52, 0.55)")
    };

    let mut html = String::with_capacity(body.len() + payload.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1, maximum-scale=1, user-scalable=no\">\n",
    );
    html.push_str(&format!("<title>{}</title>\n", escape(&document.item.title)));
    if let Some(author) = &document.item.author {
        html.push_str(&format!("<meta name=\"author\" content=\"{}\">\n", escape(author)));
    }
    html.push_str("<style>\n:root {\n");
    html.push_str(&format!("  --font-size: {}px;\n", style.font_size));
    html.push_str(&format!("  --line-height: {}%;\n", style.line_height));
    html.push_str(&format!("  --max-width: {}px;\n", style.margin));
    html.push_str(&format!("  --font-family: {};\n", style.font_family.css_stack()));
    html.push_str(&format!("  --background: {};\n", background));
    html.push_str(&format!("  --foreground: {};\n", foreground));
    html.push_str(&format!("  --highlight: {};\n", highlight));
    html.push_str("}\n");
    html.push_str(
        "body { margin: 0; background: var(--background); color: var(--foreground); }\n",
    );
    html.push_str(
        "#article-container { max-width: var(--max-width); margin: 0 auto; padding: 0 16px; font-family: var(--font-family); font-size: var(--font-size); line-height: var(--line-height); }\n",
    );
    html.push_str(&format!("mark.{} {{ background: var(--highlight); color: inherit; }}\n", HIGHLIGHT_CLASS));
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str(&format!("<div id=\"{}\">\n", ROOT_MARKER_ID));
    html.push_str("<article id=\"article-container\">\n");
    html.push_str(body);
    html.push_str("\n</article>\n</div>\n");
    html.push_str(&format!("<script>window.readerArticle = {};</script>\n", escape_script(payload)));
    html.push_str("</body>\n</html>\n");
    html
}

fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['<', '>', '&', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Keep an inline JSON literal from closing its `<script>` element
fn escape_script(json: &str) -> Cow<'_, str> {
    if json.contains("</") {
        Cow::Owned(json.replace("</", "<\\/"))
    } else {
        Cow::Borrowed(json)
    }
}
