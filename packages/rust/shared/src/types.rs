//! Core domain types for feed conversion.

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// A parsed feed channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    /// Channel `<title>`, if present.
    pub title: Option<String>,
    /// Channel `<link>`, if present. Used as the base for relative body links.
    pub link: Option<String>,
    /// Items in document order.
    pub items: Vec<RawItem>,
}

/// One `<item>` exactly as it appears in the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    /// Post title. May be empty or contain characters unsafe for file names.
    pub title: String,
    /// `<pubDate>` text, in the feed's RFC 1123 layout. May be empty.
    pub published_at: String,
    /// `<dc:date>` text, same layout as `published_at`. May be empty.
    pub updated_at: String,
    /// `<content:encoded>` HTML body. May be empty.
    pub body_html: String,
    /// `<category>` labels in feed order.
    pub categories: Vec<String>,
}

// ---------------------------------------------------------------------------
// NormalizedItem
// ---------------------------------------------------------------------------

/// An item with dates canonicalized and categories formatted for the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: String,
    /// RFC 3339 timestamp, or the original text if it could not be parsed.
    pub published_at: String,
    /// RFC 3339 timestamp, the original text, or `published_at` when absent.
    pub updated_at: String,
    /// Tab-indented bullet block, one line per category. Empty for none.
    pub categories: String,
    pub body_html: String,
}

// ---------------------------------------------------------------------------
// OutputDocument
// ---------------------------------------------------------------------------

/// A fully assembled Markdown document: frontmatter, blank line, body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument(pub String);

impl OutputDocument {
    /// The document text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OutputDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<[u8]> for OutputDocument {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}
