//! Composer integration tests
//!
//! These tests verify:
//! - Identical inputs produce byte-identical documents
//! - Bad highlight records are dropped without touching the article body
//! - Style and item identity reach the composed document

use anyhow::Result;
use libreader::compose::{compose, DropReason};
use libreader::types::{ColorScheme, Document, FontFamily, ItemIdentity, StyleConfig};
use serde_json::json;

const CONTENT: &str = "<h1>Field notes</h1>\n<p>Rivers carve canyons slowly.</p>\n<p>Wind shapes the dunes.</p>\n<p>Ice grinds the valleys wide.</p>";

fn item() -> ItemIdentity {
    ItemIdentity {
        id: "item-42".to_string(),
        slug: "field-notes".to_string(),
        title: "Field <notes>".to_string(),
        original_url: "https://example.com/field-notes".to_string(),
        author: Some("R. Stone".to_string()),
    }
}

fn anchored(id: &str, quote: &str) -> serde_json::Value {
    let start = CONTENT.find(quote).expect("quote in content");
    json!({
        "id": id,
        "quote": quote,
        "anchor": { "start": start, "end": start + quote.len() },
    })
}

/// Article body with every highlight wrapper removed
fn stripped_body(html: &str) -> String {
    let open = "<article id=\"article-container\">\n";
    let start = html.find(open).expect("article container") + open.len();
    let end = html.find("\n</article>").expect("article end");
    let mut body = html[start..end].to_string();

    while let Some(tag) = body.find("<mark class=\"reader-highlight\"") {
        let close = tag + body[tag..].find('>').expect("mark tag end") + 1;
        body.replace_range(tag..close, "");
    }
    body.replace("</mark>", "")
}

#[test]
fn test_composition_is_deterministic() -> Result<()> {
    let highlights = json!([anchored("a", "Rivers"), anchored("b", "dunes")]).to_string();
    let document = Document::new(CONTENT, highlights, item());
    let style = StyleConfig {
        font_size: 18,
        line_height: 140,
        margin: 420,
        color_scheme: ColorScheme::Dark,
        font_family: FontFamily::Lora,
    };

    let first = compose(&document, &style)?;
    let second = compose(&document, &style)?;

    assert_eq!(first.html, second.html);
    assert_eq!(first.applied, second.applied);
    Ok(())
}

#[test]
fn test_one_malformed_record_of_five() -> Result<()> {
    let highlights = json!([
        anchored("h1", "Field notes"),
        anchored("h2", "canyons"),
        { "id": "broken", "anchor": "not an anchor" },
        anchored("h3", "Wind shapes"),
        anchored("h4", "valleys"),
    ])
    .to_string();
    let document = Document::new(CONTENT, highlights, item());

    let markup = compose(&document, &StyleConfig::default())?;

    assert_eq!(markup.applied, vec!["h1", "h2", "h3", "h4"]);
    assert_eq!(markup.dropped.len(), 1);
    assert_eq!(markup.dropped[0].reason, DropReason::Malformed);
    assert_eq!(stripped_body(&markup.html), CONTENT);
    Ok(())
}

#[test]
fn test_invalid_payload_still_renders() -> Result<()> {
    let document = Document::new(CONTENT, "{ not json", item());

    let markup = compose(&document, &StyleConfig::default())?;

    assert!(markup.applied.is_empty());
    assert!(markup.html.contains("<div id=\"root\">"));
    assert_eq!(stripped_body(&markup.html), CONTENT);
    Ok(())
}

#[test]
fn test_style_and_identity_reach_document() -> Result<()> {
    let document = Document::new(CONTENT, "[]", item());
    let style = StyleConfig {
        font_size: 18,
        line_height: 150,
        margin: 360,
        color_scheme: ColorScheme::Light,
        font_family: FontFamily::System,
    };

    let html = compose(&document, &style)?.html;

    assert!(html.contains("--font-size: 18px;"));
    assert!(html.contains("--line-height: 150%;"));
    assert!(html.contains("--max-width: 360px;"));
    assert!(html.contains("<title>Field &lt;notes&gt;</title>"));
    assert!(html.contains(r#""slug":"field-notes""#));
    assert!(html.contains(r#""url":"https://example.com/field-notes""#));
    Ok(())
}
