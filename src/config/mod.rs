//! Application Configuration
//!
//! User settings stored in TOML format. Every section is optional; missing
//! values fall back to their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::analysis::ReportFormat;
use crate::vision::OcrBackend;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Comparison session settings
    pub session: SessionSettings,
    /// Text recognition settings
    pub recognizer: RecognizerSettings,
    /// Report output settings
    pub report: ReportSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Labels of the two capture paths
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Label of the custom camera pipeline capture
    pub first_label: String,
    /// Label of the native camera app capture
    pub second_label: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            first_label: "CameraX".to_string(),
            second_label: "Camera Intent".to_string(),
        }
    }
}

/// Recognition backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    /// OCR backend to use
    pub backend: OcrBackend,
    /// Tesseract executable
    pub tesseract_binary: PathBuf,
    /// Tesseract language (e.g., "eng")
    pub language: String,
    /// Recorded detections per capture label (replay backend)
    pub recordings: HashMap<String, PathBuf>,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            tesseract_binary: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            recordings: HashMap::new(),
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub format: ReportFormat,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {:?}", path))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
