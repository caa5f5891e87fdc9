//! Application configuration for feedscribe.
//!
//! User config lives at `~/.feedscribe/feedscribe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FeedscribeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "feedscribe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".feedscribe";

// ---------------------------------------------------------------------------
// Config structs (matching feedscribe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input and output locations.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Output file naming.
    #[serde(default)]
    pub output: OutputConfig,

    /// HTML-to-Markdown rendering.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Feed document to convert.
    #[serde(default = "default_input_path")]
    pub input_path: String,

    /// Directory that receives one document per item.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_input_path() -> String {
    "data/content.xml".into()
}
fn default_output_dir() -> String {
    "output".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File extension appended to every sanitized title (without the dot).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Stem used when a title sanitizes to nothing; the 1-based item index is appended.
    #[serde(default = "default_untitled_prefix")]
    pub untitled_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            untitled_prefix: default_untitled_prefix(),
        }
    }
}

fn default_extension() -> String {
    "md".into()
}
fn default_untitled_prefix() -> String {
    "untitled".into()
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Base URL for resolving relative links. Falls back to the channel `<link>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// HTML tags dropped entirely during conversion.
    #[serde(default = "default_skip_tags")]
    pub skip_tags: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            skip_tags: default_skip_tags(),
        }
    }
}

fn default_skip_tags() -> Vec<String> {
    vec!["script".into(), "style".into(), "noscript".into()]
}

impl AppConfig {
    /// Reject values that would make every output name invalid.
    pub fn validate(&self) -> Result<()> {
        let ext = &self.output.extension;
        if ext.is_empty() || ext.contains(['/', '\\', '.']) {
            return Err(FeedscribeError::config(format!(
                "output.extension must be a bare extension like \"md\", got {ext:?}"
            )));
        }
        if self.output.untitled_prefix.is_empty() {
            return Err(FeedscribeError::config("output.untitled_prefix must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.feedscribe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FeedscribeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.feedscribe/feedscribe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FeedscribeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        FeedscribeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Write a default config file at `~/.feedscribe/feedscribe.toml`.
/// Returns the path to the created file.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path, force)?;
    Ok(path)
}

/// Write a default config file at `path`, creating missing parent directories.
///
/// An existing file is only replaced when `force` is set. The existing file is
/// never read, so a malformed config can always be re-initialized.
pub fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(FeedscribeError::config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| FeedscribeError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| FeedscribeError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| FeedscribeError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}
