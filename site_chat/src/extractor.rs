//! Markup to prompt-ready text.
//!
//! The output format is deterministic: title, description, headings,
//! paragraphs and list items, in that order, flattened into one
//! whitespace-collapsed string and capped in length.

use scraper::{ElementRef, Html, Node};
use tracing::debug;

use crate::error::ExtractError;
use crate::fetcher::RawContent;
use crate::Document;

/// Subtrees rooted at these tags never contribute text.
const REMOVED_TAGS: [&str; 5] = ["script", "style", "nav", "footer", "header"];
const HEADING_TAGS: [&str; 4] = ["h1", "h2", "h3", "h4"];

const MIN_HEADING_CHARS: usize = 3;
const MIN_PARAGRAPH_CHARS: usize = 30;
const MIN_LIST_ITEM_CHARS: usize = 10;

pub const MAX_DOCUMENT_CHARS: usize = 15_000;
pub const MIN_DOCUMENT_CHARS: usize = 200;
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

/// Extract a [`Document`] from fetched page content, decoded with the
/// page's declared charset.
pub fn extract(raw: &RawContent) -> Result<Document, ExtractError> {
    let text = extract_text(&raw.text())?;
    Ok(Document::new(raw.final_url.clone(), text))
}

/// Run the extraction pipeline over raw HTML.
pub fn extract_text(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);
    let elements: Vec<ElementRef<'_>> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_removed(*el))
        .collect();

    let mut fragments = Vec::new();

    if let Some(title) = elements
        .iter()
        .find(|el| el.value().name() == "title")
        .and_then(|el| single_string(*el))
        .filter(|title| !title.is_empty())
    {
        fragments.push(format!("TITLE: {}", title.trim()));
    }

    let description = elements
        .iter()
        .filter(|el| el.value().name() == "meta" && el.value().attr("name") == Some("description"))
        .filter_map(|el| el.value().attr("content"))
        .find(|content| !content.is_empty());
    if let Some(content) = description {
        fragments.push(format!("DESCRIPTION: {}", content.trim()));
    }

    for text in texts_longer_than(&elements, &HEADING_TAGS, MIN_HEADING_CHARS) {
        fragments.push(format!("\n{}", text));
    }
    fragments.extend(texts_longer_than(&elements, &["p"], MIN_PARAGRAPH_CHARS));
    for text in texts_longer_than(&elements, &["li"], MIN_LIST_ITEM_CHARS) {
        fragments.push(format!("• {}", text));
    }

    let joined = fragments.join("\n\n");
    let text = truncate_chars(
        collapse_whitespace(&joined).replace(". ", ".\n"),
        MAX_DOCUMENT_CHARS,
    );

    let chars = text.chars().count();
    debug!(fragments = fragments.len(), chars, "extracted page text");
    if chars < MIN_DOCUMENT_CHARS {
        return Err(ExtractError::InsufficientContent { chars });
    }
    Ok(text)
}

fn is_removed_tag(element: ElementRef<'_>) -> bool {
    REMOVED_TAGS.contains(&element.value().name())
}

/// True when the element or any of its ancestors is a removed tag.
fn is_removed(element: ElementRef<'_>) -> bool {
    is_removed_tag(element)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(is_removed_tag)
}

/// Text of every non-removed descendant text node, each trimmed, joined
/// without a separator.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let removed = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .map_or(false, is_removed);
                (!removed).then(|| text.trim())
            }
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect()
}

fn texts_longer_than(elements: &[ElementRef<'_>], tags: &[&str], min_chars: usize) -> Vec<String> {
    elements
        .iter()
        .filter(|el| tags.contains(&el.value().name()))
        .map(|el| element_text(*el))
        .filter(|text| text.chars().count() > min_chars)
        .collect()
}

/// The lone string beneath an element, following single-child chains.
/// Elements with several children have no single string.
fn single_string<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    let mut children = element.children();
    let only = children.next()?;
    if children.next().is_some() {
        return None;
    }
    match only.value() {
        Node::Text(text) => Some(&**text),
        Node::Element(_) => ElementRef::wrap(only).and_then(single_string),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILLER: &str = "Our engineers design, test and ship industrial widgets for factories on every continent, \
        with dedicated support teams in twelve countries and a spare parts catalogue covering every model we have \
        produced over three decades of continuous operation and growth";

    fn page(body: &str) -> String {
        format!(
            "<html><head><title>Acme</title></head><body>{}<p>{}</p></body></html>",
            body, FILLER
        )
    }

    #[test]
    fn test_acme_page() {
        let paragraph = "Acme provides widget manufacturing services to clients worldwide since 1990.";
        let html = page(&format!("<h1>Welcome to Acme</h1><p>{}</p>", paragraph));

        let text = extract_text(&html).unwrap();
        assert!(text.starts_with("TITLE: Acme"));
        assert!(text.contains("Welcome to Acme"));
        assert!(text.contains(paragraph));
    }

    #[test]
    fn test_short_acme_page_is_insufficient() {
        let html = "<html><title>Acme</title><body><h1>Welcome to Acme</h1><p>Acme provides widget \
            manufacturing services to clients worldwide since 1990.</p></body></html>";

        assert!(matches!(
            extract_text(html),
            Err(ExtractError::InsufficientContent { .. })
        ));
    }

    #[test]
    fn test_removed_subtrees_never_appear() {
        let html = page(
            "<header><p>Header paragraph that is definitely longer than thirty characters</p></header>\
             <nav><ul><li>Navigation item with long text</li></ul></nav>\
             <script>var secret = 'script body that should never be extracted';</script>\
             <style>.hidden { content: 'style body that should never be extracted'; }</style>\
             <p>Visible paragraph text <script>injectedScriptText()</script>that keeps going on</p>\
             <footer><h2>Footer heading</h2><li>Footer list item text</li></footer>",
        );

        let text = extract_text(&html).unwrap();
        assert!(!text.contains("Header paragraph"));
        assert!(!text.contains("Navigation item"));
        assert!(!text.contains("secret"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("injectedScriptText"));
        assert!(!text.contains("Footer"));
        assert!(text.contains("Visible paragraph text"));
    }

    #[test]
    fn test_thresholds_are_strict() {
        let html = page(
            "<h2>FAQ</h2><h3>Home</h3>\
             <p>exactly thirty characters long</p>\
             <p>thirty-one characters long, yes</p>\
             <li>ten chars!</li><li>eleven char</li>",
        );

        let text = extract_text(&html).unwrap();
        assert!(!text.contains("FAQ"));
        assert!(text.contains("Home"));
        assert!(!text.contains("exactly thirty characters long"));
        assert!(text.contains("thirty-one characters long, yes"));
        assert!(!text.contains("ten chars!"));
        assert!(text.contains("• eleven char"));
    }

    #[test]
    fn test_sections_follow_fixed_order() {
        let html = page(
            "<li>A list item that comes first</li>\
             <p>A paragraph placed before the heading in the markup</p>\
             <h4>Late heading</h4>",
        );

        let text = extract_text(&html).unwrap();
        let heading = text.find("Late heading").unwrap();
        let paragraph = text.find("A paragraph placed").unwrap();
        let item = text.find("• A list item").unwrap();
        assert!(heading < paragraph);
        assert!(paragraph < item);
    }

    #[test]
    fn test_description_uses_first_non_empty_meta() {
        let html = format!(
            "<html><head><title>Acme</title>\
             <meta name=\"description\" content=\"\">\
             <meta name=\"keywords\" content=\"widgets\">\
             <meta name=\"description\" content=\"  Widgets for everyone  \">\
             <meta name=\"description\" content=\"Second description\">\
             </head><body><p>{}</p></body></html>",
            FILLER
        );

        let text = extract_text(&html).unwrap();
        assert!(text.contains("DESCRIPTION: Widgets for everyone"));
        assert!(!text.contains("Second description"));
        assert!(!text.contains("keywords"));
    }

    #[test]
    fn test_inline_text_nodes_are_joined_trimmed() {
        let html = page("<p>Bold claims about <b>widgets</b> and <i>gadgets</i> made here</p>");

        let text = extract_text(&html).unwrap();
        assert!(text.contains("Bold claims aboutwidgetsandgadgetsmade here"));
    }

    #[test]
    fn test_sentences_are_split_onto_lines() {
        let html = page("<p>First sentence is here.   Second   sentence\n follows it.</p>");

        let text = extract_text(&html).unwrap();
        assert!(text.contains("First sentence is here.\nSecond sentence follows it."));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_long_pages_are_truncated_with_marker() {
        let paragraph = "Widgets and gadgets and gizmos for every need ".repeat(40);
        let body = format!("<p>{}</p>", paragraph).repeat(20);

        let text = extract_text(&page(&body)).unwrap();
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            text.chars().count(),
            MAX_DOCUMENT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let text = truncate_chars("ééééé".to_string(), 3);
        assert_eq!(text, format!("ééé{}", TRUNCATION_MARKER));

        let text = truncate_chars("short".to_string(), 10);
        assert_eq!(text, "short");
    }

    #[test]
    fn test_only_first_title_is_used() {
        let html = format!(
            "<html><body><svg><title>Icon</title><title>Second</title></svg><p>{}</p></body></html>",
            FILLER
        );
        let text = extract_text(&html).unwrap();
        assert!(text.starts_with("TITLE: Icon"));
        assert!(!text.contains("Second"));
    }

    #[test]
    fn test_empty_markup_is_insufficient() {
        assert_eq!(
            extract_text(""),
            Err(ExtractError::InsufficientContent { chars: 0 })
        );
    }

    #[test]
    fn test_extract_keeps_final_url() {
        let raw = RawContent::from_html("https://acme.test/about", &page(""));
        let document = extract(&raw).unwrap();
        assert_eq!(document.source_url, "https://acme.test/about");
        assert!(document.char_count() >= MIN_DOCUMENT_CHARS);
    }

    #[test]
    fn test_extract_decodes_meta_declared_latin1() {
        let mut body = b"<html><head><meta charset=\"iso-8859-1\"></head><body><p>Caf\xE9 menu: ".to_vec();
        body.extend_from_slice(&[b'x'; 240]);
        body.extend_from_slice(b"</p></body></html>");
        let raw = RawContent {
            final_url: "https://cafe.test/".to_string(),
            content_type: Some("text/html".to_string()),
            body,
        };

        let document = extract(&raw).unwrap();
        assert!(document.text.contains("Caf\u{e9} menu"));
        assert!(!document.text.contains('\u{FFFD}'));
    }
}
