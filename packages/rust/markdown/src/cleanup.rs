//! Post-conversion cleanup for rendered post bodies.
//!
//! The passes only reshape whitespace and link targets in prose. Fenced code
//! blocks are copied through byte for byte, and nothing is ever stripped.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the cleanup passes on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = String::with_capacity(md.len());

    for block in split_fenced_code(md) {
        match block {
            Block::Code(code) => result.push_str(code),
            Block::Prose(text) => {
                let text = trim_trailing_whitespace(text);
                let text = collapse_blank_lines(&text);
                result.push_str(&resolve_links(&text, base_url));
            }
        }
    }

    ensure_trailing_newline(&result)
}

// ---------------------------------------------------------------------------
// Fenced code detection
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Block<'a> {
    Prose(&'a str),
    /// Opening fence through closing fence, newlines included.
    Code(&'a str),
}

/// Split Markdown into prose and fenced code blocks.
///
/// Fences may be indented (list items) and use three or more backticks or
/// tildes. A fence closes on a line holding only the same character, at least
/// as many times. An unclosed fence runs to the end of the text.
fn split_fenced_code(md: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut block_start = 0;
    let mut offset = 0;
    let mut open_fence: Option<(char, usize)> = None;

    for line in md.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim();

        match open_fence {
            None => {
                if let Some(fence) = fence_marker(trimmed) {
                    if line_start > block_start {
                        blocks.push(Block::Prose(&md[block_start..line_start]));
                    }
                    block_start = line_start;
                    open_fence = Some(fence);
                }
            }
            Some((ch, len)) => {
                let closes = trimmed.len() >= len && trimmed.chars().all(|c| c == ch);
                if closes {
                    blocks.push(Block::Code(&md[block_start..offset]));
                    block_start = offset;
                    open_fence = None;
                }
            }
        }
    }

    if block_start < md.len() {
        let rest = &md[block_start..];
        blocks.push(if open_fence.is_some() {
            Block::Code(rest)
        } else {
            Block::Prose(rest)
        });
    }

    blocks
}

/// The fence character and run length if `line` opens a fenced code block.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let ch = line.chars().next().filter(|c| matches!(c, '`' | '~'))?;
    let len = line.chars().take_while(|&c| c == ch).count();
    (len >= 3).then_some((ch, len))
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line, except a two-space hard line break
/// (what `<br>` renders to) that is followed by more text.
fn trim_trailing_whitespace(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let trimmed = line.trim_end();
            let next_has_text = lines.get(i + 1).is_some_and(|next| !next.trim().is_empty());
            if line.ends_with("  ") && !trimmed.is_empty() && next_has_text {
                format!("{trimmed}  ")
            } else {
                trimmed.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of 3+ blank lines into exactly 2.
fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n\n").into_owned()
}

/// Ensure the body ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Relative links
// ---------------------------------------------------------------------------

/// Resolve relative URLs in Markdown links against the blog's base URL.
/// Images, absolute URLs, in-page anchors and inline code are left as-is.
fn resolve_links(text: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return text.to_string();
    };

    map_outside_code_spans(text, |prose| resolve_links_in(prose, base))
}

fn resolve_links_in(prose: &str, base: &Url) -> String {
    static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"\[([^\]]*)\]\(([^)\s]+)(\s+"[^"]*")?\)"#).expect("valid regex")
    });

    LINK_RE
        .replace_all(prose, |caps: &regex::Captures| {
            let whole = &caps[0];
            let href = &caps[2];

            let start = caps.get(0).map_or(0, |m| m.start());
            if start > 0 && prose.as_bytes()[start - 1] == b'!' {
                return whole.to_string();
            }

            if href.starts_with('#') || Url::parse(href).is_ok() {
                return whole.to_string();
            }

            match base.join(href) {
                Ok(resolved) => {
                    let title = caps.get(3).map_or("", |m| m.as_str());
                    format!("[{}]({resolved}{title})", &caps[1])
                }
                Err(_) => whole.to_string(),
            }
        })
        .into_owned()
}

/// Apply `f` to the parts of `text` outside inline code spans.
///
/// A span opens with a run of backticks and closes at the next run of the same
/// length; an unmatched run is literal text.
fn map_outside_code_spans(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let run = backtick_run(&bytes[i..]);
        match find_closing_run(&bytes[i + run..], run) {
            Some(close) => {
                let end = i + run + close + run;
                out.push_str(&f(&text[plain_start..i]));
                out.push_str(&text[i..end]);
                plain_start = end;
                i = end;
            }
            None => i += run,
        }
    }

    out.push_str(&f(&text[plain_start..]));
    out
}

fn backtick_run(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|&&b| b == b'`').count()
}

fn find_closing_run(bytes: &[u8], run: usize) -> Option<usize> {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let len = backtick_run(&bytes[i..]);
            if len == run {
                return Some(i);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
