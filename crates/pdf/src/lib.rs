//! PDF header/footer redaction on top of lopdf.

pub mod content;
pub mod document;
mod metadata;
pub mod redaction;
mod scan;

pub use document::{PageBox, PdfDocument};
pub use metadata::stamp_producer;
pub use redaction::{
    redact_file, FillColor, PageRedaction, PageReport, PageState, RedactOptions, RedactOutcome,
    RedactionMark, Redactor,
};

use rmhf_core::{redaction_bands, Margins, Result};

/// Number of non-blank glyphs still drawn inside the redaction bands of
/// page `index`.
pub fn text_in_bands(doc: &PdfDocument, index: usize, margins: Margins) -> Result<usize> {
    let page_box = doc.page_box(index)?;
    let bands: Vec<_> = redaction_bands(page_box.size()?, margins)
        .iter()
        .map(|rect| page_box.to_user(rect))
        .collect();
    if bands.is_empty() {
        return Ok(0);
    }
    let parts = content::page_parts(doc.inner(), doc.page_id(index)?)?;
    let streams: Vec<&[u8]> = parts.iter().map(|part| part.data.as_slice()).collect();
    content::count_text(&streams, &bands)
}
