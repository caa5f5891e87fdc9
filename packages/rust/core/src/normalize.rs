//! Field normalization: canonical dates and the header category block.

use chrono::{DateTime, SecondsFormat, Weekday};
use tracing::warn;

use feedscribe_shared::{FeedscribeError, NormalizedItem, RawItem, Result};

/// Everything after the `Mon, ` day-name prefix of an RFC 1123 date with a
/// numeric zone, e.g. `02 Jan 2006 15:04:05 -0700`.
const DATE_TIME_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Convert a feed timestamp (`Mon, 02 Jan 2006 15:04:05 -0700`) into RFC 3339,
/// keeping its offset.
///
/// The day name must be a three-letter abbreviation but is not checked
/// against the calendar date. Empty input maps to empty output; any other
/// mismatch is a [`FeedscribeError::DateFormat`].
pub fn normalize_date(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    let (day_name, rest) = raw
        .trim()
        .split_once(", ")
        .ok_or_else(|| FeedscribeError::date_format(raw, "missing day-name prefix"))?;

    if day_name.len() != 3 || day_name.parse::<Weekday>().is_err() {
        return Err(FeedscribeError::date_format(
            raw,
            format!("invalid day name '{day_name}'"),
        ));
    }

    let parsed = DateTime::parse_from_str(rest, DATE_TIME_FORMAT)
        .map_err(|e| FeedscribeError::date_format(raw, e.to_string()))?;

    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Render categories as the header block: one `\t- label` line each, feed order.
pub fn format_categories(labels: &[String]) -> String {
    labels
        .iter()
        .map(|label| format!("\t- {label}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize one item.
///
/// Unparseable dates are passed through verbatim; each one is logged and
/// returned so the caller can attach it to the item's outcome.
pub fn normalize_item(raw: &RawItem) -> (NormalizedItem, Vec<FeedscribeError>) {
    let mut diagnostics = Vec::new();

    let mut date_or_original = |field: &str, value: &str| match normalize_date(value) {
        Ok(date) => date,
        Err(e) => {
            warn!(title = %raw.title, field, error = %e, "keeping unparsed date");
            diagnostics.push(e);
            value.to_string()
        }
    };

    let published_at = date_or_original("pubDate", &raw.published_at);
    let mut updated_at = date_or_original("dc:date", &raw.updated_at);
    if updated_at.is_empty() {
        updated_at = published_at.clone();
    }

    let item = NormalizedItem {
        title: raw.title.clone(),
        published_at,
        updated_at,
        categories: format_categories(&raw.categories),
        body_html: raw.body_html.clone(),
    };

    (item, diagnostics)
}
