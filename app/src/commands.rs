use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use rmhf_pdf::{RedactOutcome, Redactor};
use rmhf_render::preview_file;
use rmhf_verify::{verify_output, VerifyOptions};

use crate::config::AppConfig;

/// Default location of the preview image for `input`.
pub fn default_preview_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    std::env::temp_dir().join(format!("{}_preview.png", stem))
}

pub fn preview(
    config: &AppConfig,
    input: &Path,
    top: Option<&str>,
    bottom: Option<&str>,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let margins = config.margins(top, bottom)?;
    let image = preview_file(
        input,
        margins,
        &config.render_options(),
        config.pdfium_dir.as_deref(),
    )?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_preview_path(input));
    image.save_png(&path)?;
    Ok(path)
}

pub fn redact(
    config: &AppConfig,
    input: &Path,
    top: Option<&str>,
    bottom: Option<&str>,
    verify: bool,
) -> Result<RedactOutcome> {
    let margins = config.margins(top, bottom)?;
    let outcome = Redactor::new(config.redact_options()).redact_file(input, margins)?;

    if verify && config.verify_output {
        let options = VerifyOptions {
            text_search: Some(margins),
            ..VerifyOptions::default()
        };
        let result = verify_output(input, &outcome.output_path, &options)
            .with_context(|| format!("verifying {}", outcome.output_path.display()))?;
        if !result.ok {
            bail!(
                "{} failed verification: {}",
                outcome.output_path.display(),
                result.warnings.join("; ")
            );
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmhf_core::{CoreError, ErrorKind};

    #[test]
    fn test_default_preview_path_uses_stem() {
        let path = default_preview_path(Path::new("/docs/report.pdf"));
        assert_eq!(path, std::env::temp_dir().join("report_preview.png"));
    }

    #[test]
    fn test_bad_margin_is_rejected_before_open() {
        let err = redact(
            &AppConfig::default(),
            Path::new("/nonexistent/report.pdf"),
            Some("abc"),
            None,
            true,
        )
        .unwrap_err();
        let core = err.downcast_ref::<rmhf_core::InputError>();
        assert!(core.is_some(), "{err:#}");
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = redact(
            &AppConfig::default(),
            Path::new("/nonexistent/report.pdf"),
            None,
            None,
            true,
        )
        .unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert_eq!(core.kind(), ErrorKind::Input);
    }
}
