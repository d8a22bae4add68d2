use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use rmhf_core::{InputError, Margins, DEFAULT_SUFFIX};
use rmhf_pdf::RedactOptions;
use rmhf_render::RenderOptions;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Header height in points.
    pub top_margin: f32,
    /// Footer height in points.
    pub bottom_margin: f32,
    pub suffix: String,
    pub preview_scale: f32,
    pub highlight: [u8; 4],
    /// Directory holding the pdfium shared library.
    pub pdfium_dir: Option<PathBuf>,
    pub stamp_producer: bool,
    pub verify_output: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let margins = Margins::default();
        let render = RenderOptions::default();
        Self {
            top_margin: margins.top,
            bottom_margin: margins.bottom,
            suffix: DEFAULT_SUFFIX.to_string(),
            preview_scale: render.scale,
            highlight: render.highlight,
            pdfium_dir: None,
            stamp_producer: true,
            verify_output: true,
        }
    }
}

impl AppConfig {
    /// Margins from the command line where given, otherwise from the config.
    ///
    /// Command-line values are parsed as text so that a malformed value is
    /// rejected before any document is opened.
    pub fn margins(&self, top: Option<&str>, bottom: Option<&str>) -> Result<Margins, InputError> {
        let top = top.map(str::to_owned).unwrap_or_else(|| self.top_margin.to_string());
        let bottom = bottom
            .map(str::to_owned)
            .unwrap_or_else(|| self.bottom_margin.to_string());
        Margins::parse(&top, &bottom)
    }

    pub fn redact_options(&self) -> RedactOptions {
        RedactOptions {
            suffix: self.suffix.clone(),
            stamp_producer: self.stamp_producer,
            ..RedactOptions::default()
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            scale: self.preview_scale,
            highlight: self.highlight,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config dir unavailable")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    let base = directories::BaseDirs::new().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.config_dir().join("rmhf").join("config.json"))
}

/// Reads the config at `path`, or the default location. A missing file
/// yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_config(path: Option<&Path>, config: &AppConfig) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let raw = serde_json::to_string_pretty(config)?;
    fs::write(&path, raw)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("none.json"))).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.top_margin, 75.0);
        assert_eq!(config.suffix, "_rmhf");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            top_margin: 40.0,
            pdfium_dir: Some(PathBuf::from("/opt/pdfium")),
            verify_output: false,
            ..AppConfig::default()
        };
        assert_eq!(save_config(Some(&path), &config).unwrap(), path);
        assert_eq!(load_config(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "bottomMargin": 30, "suffix": "_clean" }"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.bottom_margin, 30.0);
        assert_eq!(config.top_margin, 75.0);
        assert_eq!(config.redact_options().suffix, "_clean");
    }

    #[test]
    fn test_malformed_config_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_cli_margins_override_config() {
        let config = AppConfig::default();
        assert_eq!(
            config.margins(Some("20"), None).unwrap(),
            Margins::new(20.0, 75.0).unwrap()
        );
        assert_eq!(config.margins(None, None).unwrap(), Margins::default());
        assert!(config.margins(Some("abc"), None).is_err());
    }
}
