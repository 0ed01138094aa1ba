//! Storage Layer
//!
//! Locates the configuration directory and persists rendered reports.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "capturerank", "capture-rank")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Default location of the configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Write a rendered report, creating parent directories as needed
pub fn save_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {:?}", parent))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write report {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_report_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run1").join("report.txt");

        save_report(&path, "OCR QUALITY ANALYSIS & RANKING\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "OCR QUALITY ANALYSIS & RANKING\n"
        );
    }

    #[test]
    fn test_save_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        save_report(&path, "{}").unwrap();
        save_report(&path, "{\"winner\":\"CameraX\"}").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"winner\":\"CameraX\"}"
        );
    }

    #[test]
    fn test_save_report_into_missing_root_fails() {
        let result = save_report(Path::new("/proc/nonexistent/report.txt"), "x");
        assert!(result.is_err());
    }
}
