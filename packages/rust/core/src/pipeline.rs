//! End-to-end conversion: feed → normalize → render → assemble → write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use feedscribe_markdown::{HtmdRenderer, MarkupRenderer, RenderOptions, Rendered};
use feedscribe_shared::{AppConfig, Feed, FeedscribeError, RawItem, Result};

use crate::assembler::assemble_document;
use crate::normalize::normalize_item;
use crate::writer::{OutputWriter, file_name_for};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How output files are named.
#[derive(Debug, Clone)]
pub struct NamingOptions {
    /// Extension appended to each sanitized title, without the dot.
    pub extension: String,
    /// Stem for titles that sanitize to nothing.
    pub untitled_prefix: String,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            extension: "md".into(),
            untitled_prefix: "untitled".into(),
        }
    }
}

/// Runtime configuration for [`convert_feed`], merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Feed document to read.
    pub input_path: PathBuf,
    /// Directory receiving the documents.
    pub output_dir: PathBuf,
    pub naming: NamingOptions,
    /// Renderer options. A missing `base_url` is filled from the channel `<link>`.
    pub render: RenderOptions,
}

impl ConvertConfig {
    /// Build the runtime config from the file-level config.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let base_url = config
            .render
            .base_url
            .as_deref()
            .map(|u| {
                Url::parse(u).map_err(|e| {
                    FeedscribeError::config(format!("invalid render.base_url '{u}': {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            input_path: PathBuf::from(&config.defaults.input_path),
            output_dir: PathBuf::from(&config.defaults.output_dir),
            naming: NamingOptions {
                extension: config.output.extension.clone(),
                untitled_prefix: config.output.untitled_prefix.clone(),
            },
            render: RenderOptions {
                base_url,
                skip_tags: config.render.skip_tags.clone(),
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one item.
#[derive(Debug)]
pub struct ItemOutcome {
    /// 0-based position in the feed.
    pub index: usize,
    pub title: String,
    /// Path written, or the write error that made the item be skipped.
    pub result: Result<PathBuf>,
    /// Non-fatal problems: unparseable dates, renderer fallbacks.
    pub diagnostics: Vec<FeedscribeError>,
}

impl ItemOutcome {
    pub fn is_written(&self) -> bool {
        self.result.is_ok()
    }
}

/// Result of a full run, one outcome per item in feed order.
#[derive(Debug, Default)]
pub struct ConvertSummary {
    pub outcomes: Vec<ItemOutcome>,
    pub elapsed: Duration,
}

impl ConvertSummary {
    /// Number of items whose document was written.
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_written()).count()
    }

    /// Number of items skipped because their write failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.written()
    }

    /// Number of items carrying at least one diagnostic.
    pub fn degraded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !o.diagnostics.is_empty())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each item, whether or not it was written.
    fn item_converted(&self, title: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &ConvertSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_converted(&self, _title: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &ConvertSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full conversion with the default `htmd` renderer.
///
/// 1. Read and parse the feed (fatal on failure)
/// 2. Create the output directory (fatal on failure)
/// 3. Convert and write every item, continuing past per-item failures
#[instrument(skip_all, fields(input = %config.input_path.display(), out = %config.output_dir.display()))]
pub fn convert_feed(config: &ConvertConfig, progress: &dyn ProgressReporter) -> Result<ConvertSummary> {
    let start = Instant::now();
    let (feed, writer) = prepare(config, progress)?;

    let mut render = config.render.clone();
    if render.base_url.is_none() {
        render.base_url = feed.link.as_deref().and_then(|l| Url::parse(l.trim()).ok());
    }
    let renderer = HtmdRenderer::new(&render);

    Ok(finish(start, &feed, &writer, &renderer, config, progress))
}

/// Run the full conversion with a caller-supplied renderer.
#[instrument(skip_all, fields(input = %config.input_path.display(), out = %config.output_dir.display()))]
pub fn convert_feed_with(
    config: &ConvertConfig,
    renderer: &dyn MarkupRenderer,
    progress: &dyn ProgressReporter,
) -> Result<ConvertSummary> {
    let start = Instant::now();
    let (feed, writer) = prepare(config, progress)?;

    Ok(finish(start, &feed, &writer, renderer, config, progress))
}

/// Convert already-parsed items, in order, into `writer`'s directory.
///
/// Never fails as a whole: each item's outcome is recorded in the summary.
pub fn convert_items(
    items: &[RawItem],
    writer: &OutputWriter,
    renderer: &dyn MarkupRenderer,
    naming: &NamingOptions,
    progress: &dyn ProgressReporter,
) -> ConvertSummary {
    let start = Instant::now();
    let total = items.len();
    let mut outcomes = Vec::with_capacity(total);

    progress.phase("Converting posts");

    for (index, raw) in items.iter().enumerate() {
        let outcome = convert_item(index, raw, writer, renderer, naming);
        progress.item_converted(&outcome.title, index + 1, total);
        outcomes.push(outcome);
    }

    ConvertSummary {
        outcomes,
        elapsed: start.elapsed(),
    }
}

/// Convert and write a single item.
pub fn convert_item(
    index: usize,
    raw: &RawItem,
    writer: &OutputWriter,
    renderer: &dyn MarkupRenderer,
    naming: &NamingOptions,
) -> ItemOutcome {
    let (item, mut diagnostics) = normalize_item(raw);

    let Rendered { markdown, error } =
        feedscribe_markdown::render_or_original(renderer, &item.body_html);
    if let Some(e) = error {
        warn!(title = %item.title, error = %e, "rendering failed, keeping original HTML");
        diagnostics.push(e);
    }

    let doc = assemble_document(&item, &markdown);
    let file_name = file_name_for(&item.title, index, &naming.extension, &naming.untitled_prefix);

    let result = writer.write(&file_name, &doc);
    if let Err(e) = &result {
        warn!(title = %item.title, error = %e, "write failed, skipping item");
    }

    ItemOutcome {
        index,
        title: item.title,
        result,
        diagnostics,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load the feed and make sure the output directory exists.
fn prepare(config: &ConvertConfig, progress: &dyn ProgressReporter) -> Result<(Feed, OutputWriter)> {
    progress.phase("Reading feed");
    let feed = feedscribe_feed::read_feed(&config.input_path)?;

    info!(items = feed.items.len(), "feed loaded");

    progress.phase("Preparing output directory");
    let writer = OutputWriter::new(&config.output_dir);
    writer.ensure_dir()?;

    Ok((feed, writer))
}

fn finish(
    start: Instant,
    feed: &Feed,
    writer: &OutputWriter,
    renderer: &dyn MarkupRenderer,
    config: &ConvertConfig,
    progress: &dyn ProgressReporter,
) -> ConvertSummary {
    let mut summary = convert_items(&feed.items, writer, renderer, &config.naming, progress);
    summary.elapsed = start.elapsed();

    progress.done(&summary);

    info!(
        items = summary.outcomes.len(),
        written = summary.written(),
        failed = summary.failed(),
        degraded = summary.degraded(),
        elapsed_ms = summary.elapsed.as_millis(),
        "conversion complete"
    );

    summary
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
