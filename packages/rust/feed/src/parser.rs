//! RSS 2.0 export parser.
//!
//! Expected shape:
//! - root element (normally `<rss>`) containing a `<channel>`
//! - `<channel>` containing zero or more `<item>`
//! - each `<item>` with `title`, `pubDate`, `dc:date`, `content:encoded`, `category*`

use feedscribe_shared::{Feed, FeedscribeError, RawItem, Result};
use roxmltree::{Document, Node, ParsingOptions};

/// Dublin Core elements namespace (`dc:date`).
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";

/// RSS content module namespace (`content:encoded`).
pub const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a complete feed document.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<Feed> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FeedscribeError::parse(format!("feed is not valid UTF-8: {e}")))?;

    let mut opts = ParsingOptions::default();
    opts.allow_dtd = true;

    let doc = Document::parse_with_options(text, opts)
        .map_err(|e| FeedscribeError::parse(format!("malformed feed XML: {e}")))?;

    let root = doc.root_element();
    let channel = child_elements(root)
        .find(|n| is_plain(n, "channel"))
        .ok_or_else(|| {
            FeedscribeError::parse(format!(
                "no <channel> element under root <{}>",
                root.tag_name().name()
            ))
        })?;

    let mut feed = Feed::default();

    for node in child_elements(channel) {
        if is_plain(&node, "title") {
            feed.title = Some(element_text(node));
        } else if is_plain(&node, "link") {
            feed.link = Some(element_text(node));
        } else if is_plain(&node, "item") {
            feed.items.push(parse_item(node));
        }
    }

    Ok(feed)
}

/// Extract a [`RawItem`] from an `<item>` element.
///
/// Single-valued fields take the last matching element; categories accumulate.
fn parse_item(item: Node<'_, '_>) -> RawItem {
    let mut raw = RawItem::default();

    for node in child_elements(item) {
        let name = node.tag_name();
        match (name.namespace(), name.name()) {
            (None, "title") => raw.title = element_text(node),
            (None, "pubDate") => raw.published_at = element_text(node),
            (None, "category") => raw.categories.push(element_text(node)),
            (Some(DC_NS), "date") => raw.updated_at = element_text(node),
            (Some(CONTENT_NS), "encoded") => raw.body_html = element_text(node),
            _ => {}
        }
    }

    raw
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn child_elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

/// True for an element with the given local name and no namespace.
fn is_plain(node: &Node<'_, '_>, name: &str) -> bool {
    node.tag_name().namespace().is_none() && node.tag_name().name() == name
}

/// Concatenate the direct text and CDATA children of an element, untrimmed.
fn element_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
