//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use feedscribe_core::{ConvertConfig, ConvertSummary, ProgressReporter};
use feedscribe_shared::{AppConfig, init_config, init_config_at, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// feedscribe: turn a blog export into Markdown files.
#[derive(Parser)]
#[command(
    name = "feedscribe",
    version,
    about = "Convert an RSS blog export into one Markdown file per post.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.feedscribe/feedscribe.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert a feed document into Markdown files.
    Convert(ConvertArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `convert`. Each one overrides the matching config value.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct ConvertArgs {
    /// Feed document to read.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory for the Markdown files.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Base URL for resolving relative links (defaults to the channel link).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init {
        /// Replace an existing config file.
        #[arg(long)]
        force: bool,
    },
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "feedscribe=info",
        1 => "feedscribe=debug",
        _ => "feedscribe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Convert(args) => cmd_convert(&resolve_app_config(&cli)?, args),
        Command::Config { action } => match action {
            // Never loads the existing file, so a broken config can be replaced.
            ConfigAction::Init { force } => cmd_config_init(cli.config.as_deref(), *force),
            ConfigAction::Show => cmd_config_show(&resolve_app_config(&cli)?),
        },
    }
}

/// Load the config named by `--config`, or the default one.
fn resolve_app_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Merge `convert` flags over the loaded config.
fn resolve_convert_config(config: &AppConfig, args: &ConvertArgs) -> Result<ConvertConfig> {
    let mut resolved = ConvertConfig::from_app_config(config)?;

    if let Some(input) = &args.input {
        resolved.input_path = input.clone();
    }
    if let Some(out) = &args.out {
        resolved.output_dir = out.clone();
    }
    if let Some(base) = &args.base_url {
        let url = Url::parse(base).map_err(|e| eyre!("invalid --base-url '{base}': {e}"))?;
        resolved.render.base_url = Some(url);
    }

    Ok(resolved)
}

fn cmd_convert(config: &AppConfig, args: &ConvertArgs) -> Result<()> {
    let convert_config = resolve_convert_config(config, args)?;

    info!(
        input = %convert_config.input_path.display(),
        out = %convert_config.output_dir.display(),
        "converting feed"
    );

    let reporter = CliProgress::new();
    let summary = feedscribe_core::convert_feed(&convert_config, &reporter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&summary))?);
        return Ok(());
    }

    println!();
    println!("  Conversion finished.");
    println!("  Posts:    {}", summary.outcomes.len());
    println!("  Written:  {}", summary.written());
    println!("  Failed:   {}", summary.failed());
    println!("  Degraded: {}", summary.degraded());
    println!("  Output:   {}", convert_config.output_dir.display());
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    for outcome in summary.outcomes.iter().filter(|o| !o.is_written()) {
        if let Err(e) = &outcome.result {
            println!("  ! #{} {:?}: {e}", outcome.index + 1, outcome.title);
        }
    }
    println!();

    Ok(())
}

/// Build the `--json` report.
fn summary_json(summary: &ConvertSummary) -> serde_json::Value {
    let items: Vec<serde_json::Value> = summary
        .outcomes
        .iter()
        .map(|o| {
            serde_json::json!({
                "index": o.index,
                "title": o.title,
                "path": o.result.as_ref().ok().map(|p| p.display().to_string()),
                "error": o.result.as_ref().err().map(ToString::to_string),
                "diagnostics": o.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({
        "written": summary.written(),
        "failed": summary.failed(),
        "degraded": summary.degraded(),
        "elapsed_ms": summary.elapsed.as_millis() as u64,
        "items": items,
    })
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_converted(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {title}"));
    }

    fn done(&self, _summary: &ConvertSummary) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Fatal errors skip `done`; don't leave the spinner ticking.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

fn cmd_config_init(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => {
            init_config_at(path, force)?;
            path.to_path_buf()
        }
        None => init_config(force)?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
