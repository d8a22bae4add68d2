//! Post-redaction checks on the saved output.

use serde::{Deserialize, Serialize};
use std::path::Path;

use rmhf_core::{Document, Margins, Result};
use rmhf_pdf::{text_in_bands, PdfDocument};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerifyOptions {
    /// Allowed page size difference, in points.
    pub tolerance: f32,
    /// When set, look for glyphs still drawn inside these bands.
    pub text_search: Option<Margins>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            text_search: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyResult {
    pub ok: bool,
    pub warnings: Vec<String>,
}

impl VerifyResult {
    fn fail(&mut self, warning: String) {
        log::warn!("[Verify] {}", warning);
        self.ok = false;
        self.warnings.push(warning);
    }
}

/// Compares `output` against the `input` it was produced from.
///
/// Failing checks are reported in the result; only unreadable documents
/// are errors.
pub fn verify_output(input: &Path, output: &Path, options: &VerifyOptions) -> Result<VerifyResult> {
    let source = PdfDocument::load(input)?;
    let redacted = PdfDocument::load(output)?;
    let mut result = VerifyResult {
        ok: true,
        warnings: Vec::new(),
    };

    if source.page_count() != redacted.page_count() {
        result.fail(format!(
            "page count changed from {} to {}",
            source.page_count(),
            redacted.page_count()
        ));
        return Ok(result);
    }

    for index in 0..redacted.page_count() {
        let before = source.page_size(index)?;
        let after = redacted.page_size(index)?;
        if !before.approx_eq(&after, options.tolerance) {
            result.fail(format!(
                "page {} size changed from {}x{} to {}x{}",
                index, before.width, before.height, after.width, after.height
            ));
        }

        if let Some(margins) = options.text_search {
            let remaining = text_in_bands(&redacted, index, margins)?;
            if remaining > 0 {
                result.fail(format!(
                    "page {} still draws {} glyph(s) inside the removed bands",
                    index, remaining
                ));
            }
        }
    }

    log::info!(
        "[Verify] {}: {} page(s) checked, {}",
        output.display(),
        redacted.page_count(),
        if result.ok { "ok" } else { "FAILED" }
    );
    Ok(result)
}
