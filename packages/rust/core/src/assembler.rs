//! Output document assembly: YAML frontmatter followed by the rendered body.

use feedscribe_shared::{NormalizedItem, OutputDocument};

/// Build the document for one item.
///
/// Layout:
/// ```text
/// ---
/// title: "<title>"
/// date: <published_at>
/// updated: <updated_at>
/// categories:
/// <category block>
/// ---
///
/// <body>
/// ```
/// An empty category block leaves `categories:` directly above the closing
/// delimiter. Dates and categories are embedded as given.
pub fn assemble_document(item: &NormalizedItem, body: &str) -> OutputDocument {
    let mut doc = String::with_capacity(body.len() + 128);

    doc.push_str("---\n");
    doc.push_str(&format!("title: \"{}\"\n", escape_yaml_string(&item.title)));
    doc.push_str(&format!("date: {}\n", item.published_at));
    doc.push_str(&format!("updated: {}\n", item.updated_at));
    doc.push_str("categories:\n");
    if !item.categories.is_empty() {
        doc.push_str(&item.categories);
        doc.push('\n');
    }
    doc.push_str("---\n\n");
    doc.push_str(body);

    OutputDocument(doc)
}

/// Escape a value for a double-quoted YAML scalar.
fn escape_yaml_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
