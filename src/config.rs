use serde::Deserialize;
use std::fs;
use std::path::Path;

use log::warn;

/// Appearance knobs the template's style catalog cannot express.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub links: LinksConfig,
    pub code: CodeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub color: String,
    pub underline: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            color: "#1a4f8b".to_string(),
            underline: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    /// Monospace font applied to inline code and fallback code blocks.
    pub font: String,
    /// Shading fill used when no Code style is available.
    pub shading: String,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            font: "Consolas".to_string(),
            shading: "F0F0F0".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!("ignoring malformed config {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}
