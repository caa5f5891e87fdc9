//! Feed document decoding.
//!
//! Reads a blog export (RSS 2.0 with the `dc` and `content` modules) into a
//! [`Feed`] of [`RawItem`](feedscribe_shared::RawItem)s in document order.
//! The document is loaded fully before parsing; there is no streaming mode.

mod parser;

use std::path::Path;

use tracing::{debug, instrument};

use feedscribe_shared::{Feed, FeedscribeError, Result};

pub use parser::{CONTENT_NS, DC_NS};

/// Parse a feed document already held in memory.
///
/// Fails with [`FeedscribeError::Parse`] when the bytes are not well-formed XML
/// or the root element has no `<channel>`.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse_feed(bytes: &[u8]) -> Result<Feed> {
    let feed = parser::parse_document(bytes)?;

    debug!(
        channel = feed.title.as_deref().unwrap_or(""),
        items = feed.items.len(),
        "feed parsed"
    );

    Ok(feed)
}

/// Read a feed document from disk and parse it.
pub fn read_feed(path: &Path) -> Result<Feed> {
    let bytes = std::fs::read(path).map_err(|e| FeedscribeError::io(path, e))?;
    parse_feed(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    #[test]
    fn read_sample_fixture() {
        let feed = read_feed(&fixture_path("feeds/sample.xml")).unwrap();

        assert_eq!(feed.title.as_deref(), Some("Field Notes"));
        assert_eq!(feed.items.len(), 4);
        assert_eq!(feed.items[0].title, "Hello, World! 2024");
        assert_eq!(feed.items[0].categories, vec!["Tech", "Go"]);
        assert!(feed.items[1].updated_at.is_empty());
        assert!(feed.items[2].body_html.contains("<table>"));
    }

    #[test]
    fn read_missing_file_is_io_error() {
        let err = read_feed(&fixture_path("feeds/does-not-exist.xml")).unwrap_err();
        assert!(matches!(err, FeedscribeError::Io { .. }));
    }
}
