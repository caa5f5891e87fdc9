//! HTML-to-Markdown rendering of post bodies.
//!
//! The pipeline depends only on the [`MarkupRenderer`] trait. [`HtmdRenderer`]
//! is the default implementation: it converts with the `htmd` crate, then
//! tidies whitespace and resolves relative links in the result.
//!
//! Rendering never loses a body: [`render_or_original`] falls back to the
//! original HTML when a renderer fails.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use feedscribe_shared::{FeedscribeError, Result};

// ---------------------------------------------------------------------------
// Renderer contract
// ---------------------------------------------------------------------------

/// Converts an HTML fragment into Markdown.
pub trait MarkupRenderer {
    /// Render `html` to Markdown. Errors are reported as
    /// [`FeedscribeError::Conversion`].
    fn convert(&self, html: &str) -> Result<String>;
}

/// Outcome of [`render_or_original`].
#[derive(Debug)]
pub struct Rendered {
    /// The Markdown body, or the untouched input fragment when `error` is set.
    pub markdown: String,
    /// The renderer failure that forced the fallback, if any.
    pub error: Option<FeedscribeError>,
}

/// Render a fragment, degrading to the original fragment on failure.
///
/// The error is returned alongside rather than logged so the caller can
/// attribute it to an item.
pub fn render_or_original(renderer: &dyn MarkupRenderer, html: &str) -> Rendered {
    match renderer.convert(html) {
        Ok(markdown) => Rendered {
            markdown,
            error: None,
        },
        Err(e) => Rendered {
            markdown: html.to_string(),
            error: Some(e),
        },
    }
}

// ---------------------------------------------------------------------------
// htmd renderer
// ---------------------------------------------------------------------------

/// Options for [`HtmdRenderer`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Base for resolving relative links. `None` leaves links untouched.
    pub base_url: Option<Url>,
    /// Tags dropped together with their content.
    pub skip_tags: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            skip_tags: vec!["script".into(), "style".into(), "noscript".into()],
        }
    }
}

/// Default renderer backed by `htmd` plus cleanup passes.
pub struct HtmdRenderer {
    converter: htmd::HtmlToMarkdown,
    base_url: Option<Url>,
}

impl HtmdRenderer {
    pub fn new(opts: &RenderOptions) -> Self {
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(opts.skip_tags.iter().map(String::as_str).collect())
            .build();

        Self {
            converter,
            base_url: opts.base_url.clone(),
        }
    }
}

impl Default for HtmdRenderer {
    fn default() -> Self {
        Self::new(&RenderOptions::default())
    }
}

impl MarkupRenderer for HtmdRenderer {
    /// Convert a post body:
    /// 1. Swap HTML tables for placeholders and pre-render them as Markdown
    /// 2. Convert HTML → Markdown via `htmd`
    /// 3. Put the tables back
    /// 4. Run the cleanup pipeline
    #[instrument(skip_all, fields(len = html.len()))]
    fn convert(&self, html: &str) -> Result<String> {
        if html.trim().is_empty() {
            return Ok(String::new());
        }

        let (html, tables) = self.extract_tables(html)?;

        let mut markdown = self.convert_fragment(&html)?;
        for (i, table) in tables.iter().enumerate() {
            markdown = splice_table(&markdown, &table_placeholder(i), table);
        }

        debug!(raw_len = markdown.len(), tables = tables.len(), "htmd conversion complete");

        Ok(cleanup::run_pipeline(&markdown, self.base_url.as_ref()))
    }
}

impl HtmdRenderer {
    fn convert_fragment(&self, html: &str) -> Result<String> {
        self.converter
            .convert(html)
            .map_err(|e| FeedscribeError::Conversion(format!("htmd conversion failed: {e}")))
    }

    /// Replace each top-level `<table>` with a paragraph placeholder and return
    /// the Markdown rendering of every table in order.
    ///
    /// `htmd` 0.1 collapses table layout, so tables are rendered separately and
    /// spliced back in after conversion. Nested tables stay inside their
    /// outer table's cell.
    fn extract_tables(&self, html: &str) -> Result<(String, Vec<String>)> {
        static TABLE_TAG_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?i)<(/?)table\b[^>]*>").expect("valid regex"));

        let mut replaced = String::with_capacity(html.len());
        let mut tables = Vec::new();
        let mut depth = 0usize;
        let mut open_at = 0;
        let mut copied_to = 0;

        for caps in TABLE_TAG_RE.captures_iter(html) {
            let Some(tag) = caps.get(0) else { continue };

            if caps[1].is_empty() {
                if depth == 0 {
                    open_at = tag.start();
                }
                depth += 1;
            } else if depth > 0 {
                depth -= 1;
                if depth == 0 {
                    replaced.push_str(&html[copied_to..open_at]);
                    replaced.push_str(&format!("<p>{}</p>", table_placeholder(tables.len())));
                    tables.push(self.table_to_markdown(&html[open_at..tag.end()])?);
                    copied_to = tag.end();
                }
            }
        }

        // An unclosed table is left for htmd.
        replaced.push_str(&html[copied_to..]);
        Ok((replaced, tables))
    }

    /// Convert a single HTML table to a Markdown table, one line per row.
    fn table_to_markdown(&self, table_html: &str) -> Result<String> {
        let table_sel = Selector::parse("table").expect("valid selector");

        let doc = Html::parse_fragment(table_html);
        let Some(table) = doc.select(&table_sel).next() else {
            return Ok(String::new());
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut has_header = false;

        for tr in table_rows(table) {
            let cells: Vec<ElementRef<'_>> = child_elements(tr)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
                .collect();
            if cells.is_empty() {
                continue;
            }
            if rows.is_empty() && cells.iter().all(|c| c.value().name() == "th") {
                has_header = true;
            }
            rows.push(
                cells
                    .into_iter()
                    .map(|c| self.cell_to_markdown(c))
                    .collect::<Result<_>>()?,
            );
        }

        let col_count = rows.iter().map(Vec::len).max().unwrap_or(0);
        if col_count == 0 {
            return Ok(String::new());
        }

        for row in &mut rows {
            row.resize(col_count, String::new());
        }

        // Markdown tables need a header row; use an empty one if the source had none.
        let (header, data) = if has_header {
            (rows[0].clone(), &rows[1..])
        } else {
            (vec![String::new(); col_count], &rows[..])
        };

        let mut lines = Vec::with_capacity(data.len() + 2);
        lines.push(format!("| {} |", header.join(" | ")));
        lines.push(format!("| {} |", vec!["---"; col_count].join(" | ")));
        lines.extend(data.iter().map(|row| format!("| {} |", row.join(" | "))));

        Ok(lines.join("\n"))
    }

    /// Render a cell's content through `htmd` so links and emphasis survive,
    /// then fit it on one line.
    fn cell_to_markdown(&self, cell: ElementRef<'_>) -> Result<String> {
        let markdown = self.convert_fragment(&cell.inner_html())?;

        Ok(markdown
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("<br>")
            .replace('|', "\\|"))
    }
}

// ---------------------------------------------------------------------------
// Table helpers
// ---------------------------------------------------------------------------

fn table_placeholder(index: usize) -> String {
    format!("FEEDSCRIBETABLE{index}X")
}

fn child_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap)
}

/// Rows owned by `table` itself, skipping rows of nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|r| r.value().name() == "tr"));
            }
            _ => {}
        }
    }
    rows
}

/// Put a rendered table where its placeholder landed.
///
/// Rows after the first repeat the placeholder line's indentation so a table
/// inside a list item or block quote stays there. List markers are turned
/// into spaces; `>` is kept.
fn splice_table(markdown: &str, placeholder: &str, table: &str) -> String {
    let Some(pos) = markdown.find(placeholder) else {
        return markdown.to_string();
    };

    let line_start = markdown[..pos].rfind('\n').map_or(0, |i| i + 1);
    let continuation: String = markdown[line_start..pos]
        .chars()
        .map(|c| if c == '>' || c.is_whitespace() { c } else { ' ' })
        .collect();

    let rows = table.lines().collect::<Vec<_>>().join(&format!("\n{continuation}"));

    format!("{}{rows}{}", &markdown[..pos], &markdown[pos + placeholder.len()..])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingRenderer;

    impl MarkupRenderer for FailingRenderer {
        fn convert(&self, _html: &str) -> Result<String> {
            Err(FeedscribeError::Conversion("boom".into()))
        }
    }

    fn render(html: &str) -> String {
        HtmdRenderer::default().convert(html).unwrap()
    }

    #[test]
    fn convert_bold() {
        assert_eq!(render("<b>hi</b>").trim_end(), "**hi**");
    }

    #[test]
    fn convert_paragraphs_and_headings() {
        let md = render("<h2>Intro</h2><p>Some <em>text</em>.</p>");
        assert!(md.contains("## Intro"));
        assert!(md.contains("text"));
        assert!(!md.contains("<em>"));
        assert!(!md.contains("<p>"));
    }

    #[test]
    fn convert_lists() {
        let md = render("<ul><li>one</li><li>two</li></ul>");
        assert!(md.contains("one"));
        assert!(md.contains("two"));
        assert!(!md.contains("<li>"));
    }

    #[test]
    fn convert_skips_scripts() {
        let md = render("<p>Visible</p><script>alert('x')</script>");
        assert!(md.contains("Visible"));
        assert!(!md.contains("alert"));
    }

    #[test]
    fn convert_preserves_tables() {
        let md = render(
            "<p>Before</p><table><tr><th>Name</th><th>Value</th></tr>\
             <tr><td>foo</td><td>bar</td></tr></table><p>After</p>",
        );
        assert!(md.contains("| Name | Value |"));
        assert!(md.contains("| --- | --- |"));
        assert!(md.contains("| foo | bar |"));
        assert!(md.contains("Before"));
        assert!(md.contains("After"));
        assert!(!md.contains("FEEDSCRIBETABLE"));
    }

    #[test]
    fn table_without_header_gets_empty_header_row() {
        let md = HtmdRenderer::default()
            .table_to_markdown("<table><tr><td>a</td><td>b|c</td></tr></table>")
            .unwrap();
        assert_eq!(md, "|  |  |\n| --- | --- |\n| a | b\\|c |");
    }

    #[test]
    fn table_cells_keep_links() {
        let md = render(r#"<table><tr><td><a href="https://x.io/">x</a></td></tr></table>"#);
        assert_eq!(md, "|  |\n| --- |\n| [x](https://x.io/) |\n");
    }

    #[test]
    fn table_cells_resolve_relative_links() {
        let renderer = HtmdRenderer::new(&RenderOptions {
            base_url: Some(Url::parse("https://blog.example.com/").unwrap()),
            ..RenderOptions::default()
        });
        let md = renderer
            .convert(r#"<table><tr><th>Page</th></tr><tr><td><a href="/about">about</a></td></tr></table>"#)
            .unwrap();
        assert_eq!(md, "| Page |\n| --- |\n| [about](https://blog.example.com/about) |\n");
    }

    #[test]
    fn nested_table_stays_in_outer_cell() {
        let md = render(
            "<table><tr><td>outer<table><tr><td>inner</td></tr></table></td><td>x</td></tr></table>\
             <p>After</p>",
        );
        let rows: Vec<&str> = md.lines().filter(|l| l.starts_with('|')).collect();
        assert_eq!(rows.len(), 3, "{md}");
        assert!(rows[2].contains("outer"));
        assert!(rows[2].contains("inner"));
        assert!(rows[2].ends_with("| x |"));
        assert!(md.trim_end().ends_with("After"));
        assert!(!md.contains("<t"));
    }

    #[test]
    fn table_in_list_item_keeps_indentation() {
        let md = render(
            "<ul><li><p>Intro</p><table><tr><th>a</th></tr><tr><td>1</td></tr></table></li></ul>",
        );
        let lines: Vec<&str> = md.lines().collect();
        let header = lines
            .iter()
            .position(|l| l.trim_start() == "| a |")
            .unwrap_or_else(|| panic!("no table header in {md:?}"));
        let indent = &lines[header][..lines[header].len() - "| a |".len()];

        assert!(!indent.is_empty(), "{md:?}");
        assert_eq!(lines[header + 1], format!("{indent}| --- |"));
        assert_eq!(lines[header + 2], format!("{indent}| 1 |"));
    }

    #[test]
    fn splice_table_continues_prefix() {
        let table = "| a |\n| --- |";
        assert_eq!(
            splice_table("*   PH\nnext", "PH", table),
            "*   | a |\n    | --- |\nnext"
        );
        assert_eq!(splice_table("> PH", "PH", table), "> | a |\n> | --- |");
    }

    #[test]
    fn convert_keeps_tag_text_in_inline_code() {
        let md = render("<p>Wrap it in a <code>&lt;span&gt;</code> element.</p>");
        assert_eq!(md, "Wrap it in a `<span>` element.\n");
    }

    #[test]
    fn convert_keeps_hard_line_breaks() {
        assert_eq!(render("<p>line one<br>line two</p>"), "line one  \nline two\n");
    }

    #[test]
    fn convert_keeps_preformatted_code_verbatim() {
        let md = render("<pre><code>a\n\n\n\n\nb   \n</code></pre>");
        assert_eq!(md, "```\na\n\n\n\n\nb   \n```\n");
    }

    #[test]
    fn convert_resolves_relative_links() {
        let renderer = HtmdRenderer::new(&RenderOptions {
            base_url: Some(Url::parse("https://blog.example.com/").unwrap()),
            ..RenderOptions::default()
        });
        let md = renderer.convert(r#"<p><a href="/about">about</a></p>"#).unwrap();
        assert!(md.contains("[about](https://blog.example.com/about)"));
    }

    #[test]
    fn convert_empty_fragment() {
        assert_eq!(render(""), "");
        assert_eq!(render("  \n "), "");
    }

    #[test]
    fn render_or_original_passes_through_success() {
        let rendered = render_or_original(&HtmdRenderer::default(), "<i>x</i>");
        assert!(rendered.error.is_none());
        assert!(rendered.markdown.contains('x'));
        assert!(!rendered.markdown.contains("<i>"));
    }

    #[test]
    fn render_or_original_falls_back_on_failure() {
        let html = "<p>keep <b>me</b></p>";
        let rendered = render_or_original(&FailingRenderer, html);
        assert!(rendered.error.is_some());
        assert_eq!(rendered.markdown, html);
        assert!(matches!(rendered.error, Some(FeedscribeError::Conversion(_))));
    }
}
