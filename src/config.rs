use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::engine::geometry::GeometryOptions;
use crate::errors::{DeckError, Result};

/// Prefix of every environment variable read by [`RenderConfig::from_env`].
pub const ENV_PREFIX: &str = "DECK_RENDER_";

/// A headless-browser engine able to print the markup document to PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrowserKind {
    /// Chrome or Chromium in `--headless` mode with `--print-to-pdf`.
    Chromium,
    /// The WeasyPrint command line renderer.
    Weasyprint,
}

impl BrowserKind {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Weasyprint => "weasyprint",
        }
    }
}

/// Settings for one render call. Every field has a default, so an empty JSON object
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub geometry: GeometryOptions,
    /// Download remote images and icons. When off, image frames stay empty.
    pub fetch_images: bool,
    pub image_timeout_secs: u64,
    /// Images larger than this are skipped.
    pub max_image_bytes: usize,
    /// Browser engines tried in order for Hi-Fi PDF output.
    pub browsers: Vec<BrowserKind>,
    pub browser_timeout_secs: u64,
    /// Executable for [`BrowserKind::Chromium`].
    pub chromium_bin: String,
    /// Executable for [`BrowserKind::Weasyprint`].
    pub weasyprint_bin: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            geometry: GeometryOptions::default(),
            fetch_images: true,
            image_timeout_secs: 10,
            max_image_bytes: 8 * 1024 * 1024,
            browsers: vec![BrowserKind::Chromium, BrowserKind::Weasyprint],
            browser_timeout_secs: 60,
            chromium_bin: "chromium".to_string(),
            weasyprint_bin: "weasyprint".to_string(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DeckError::Config(format!(
            "{}{} must be a boolean, got '{}'",
            ENV_PREFIX, name, raw
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        DeckError::Config(format!(
            "{}{} must be a number, got '{}'",
            ENV_PREFIX, name, raw
        ))
    })
}

impl RenderConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            DeckError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Builds a configuration from the environment.
    ///
    /// Starts from `DECK_RENDER_CONFIG` (a JSON file) when set, or from the defaults,
    /// then applies the individual overrides:
    ///
    /// * `DECK_RENDER_FETCH_IMAGES` (bool)
    /// * `DECK_RENDER_IMAGE_TIMEOUT_SECS`, `DECK_RENDER_MAX_IMAGE_BYTES`
    /// * `DECK_RENDER_BROWSERS` (comma-separated, e.g. `weasyprint,chromium`)
    /// * `DECK_RENDER_BROWSER_TIMEOUT_SECS`
    /// * `DECK_RENDER_CHROMIUM_BIN`, `DECK_RENDER_WEASYPRINT_BIN`
    pub fn from_env() -> Result<Self> {
        let mut config = match env_var("CONFIG") {
            Some(path) => {
                debug!("Loading render config from {}", path);
                RenderConfig::from_file(path)?
            }
            None => RenderConfig::default(),
        };

        if let Some(raw) = env_var("FETCH_IMAGES") {
            config.fetch_images = parse_bool("FETCH_IMAGES", &raw)?;
        }
        if let Some(raw) = env_var("IMAGE_TIMEOUT_SECS") {
            config.image_timeout_secs = parse_number("IMAGE_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = env_var("MAX_IMAGE_BYTES") {
            config.max_image_bytes = parse_number("MAX_IMAGE_BYTES", &raw)?;
        }
        if let Some(raw) = env_var("BROWSER_TIMEOUT_SECS") {
            config.browser_timeout_secs = parse_number("BROWSER_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = env_var("BROWSERS") {
            config.browsers = raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| {
                    serde_json::from_value(serde_json::Value::String(name.to_ascii_lowercase()))
                        .map_err(|_| {
                            DeckError::Config(format!("Unknown browser engine '{}'", name))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
        }
        if let Some(bin) = env_var("CHROMIUM_BIN") {
            config.chromium_bin = bin;
        }
        if let Some(bin) = env_var("WEASYPRINT_BIN") {
            config.weasyprint_bin = bin;
        }

        if config.browsers.is_empty() {
            warn!("No browser engines configured; Hi-Fi PDF export will always fail");
        }
        Ok(config)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs.max(1))
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_timeout_secs.max(1))
    }

    /// Executable configured for a browser engine.
    pub fn browser_binary(&self, kind: BrowserKind) -> &str {
        match kind {
            BrowserKind::Chromium => &self.chromium_bin,
            BrowserKind::Weasyprint => &self.weasyprint_bin,
        }
    }
}
