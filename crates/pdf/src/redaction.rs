//! The redaction engine.
//!
//! Each page moves through `Pending -> Marked -> Applied`. Marking only
//! records rectangles; applying rewrites the page content so the removal
//! is part of the saved document rather than an annotation on top of it.

use lopdf::{Document as LoDocument, ObjectId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use rmhf_core::{
    output_path_for, redaction_bands, BandRect, Document, InputError, Margins, PageSize, Result,
    DEFAULT_SUFFIX,
};

use crate::content;
use crate::document::{PageBox, PdfDocument};
use crate::metadata;

/// Device RGB fill, components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl FillColor {
    pub const WHITE: FillColor = FillColor {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const BLACK: FillColor = FillColor {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
}

impl Default for FillColor {
    fn default() -> Self {
        FillColor::WHITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Pending,
    Marked,
    Applied,
}

/// One registered redaction instruction, page-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedactionMark {
    pub rect: BandRect,
    pub fill: FillColor,
}

/// What applying a page changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub index: usize,
    pub bands_applied: usize,
    pub glyphs_erased: usize,
}

pub struct PageRedaction {
    index: usize,
    page_box: PageBox,
    size: PageSize,
    state: PageState,
    marks: Vec<RedactionMark>,
}

impl PageRedaction {
    pub fn new(index: usize, page_box: PageBox) -> Result<Self> {
        Ok(Self {
            index,
            page_box,
            size: page_box.size()?,
            state: PageState::Pending,
            marks: Vec::new(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn marks(&self) -> &[RedactionMark] {
        &self.marks
    }

    /// Registers `rect` for removal, clamped to the page.
    ///
    /// Rectangles with no area left after clamping are skipped, as are
    /// marks on a page that has already been applied. Returns whether the
    /// mark was registered.
    pub fn mark(&mut self, rect: BandRect, fill: FillColor) -> bool {
        if self.state == PageState::Applied {
            log::warn!(
                "[Redact] page {} already applied, ignoring {} band",
                self.index,
                rect.band
            );
            return false;
        }
        match rect.clamp_to(self.size) {
            Some(rect) => {
                self.marks.push(RedactionMark { rect, fill });
                self.state = PageState::Marked;
                true
            }
            None => {
                log::debug!(
                    "[Redact] page {}: {} band {:?} is empty, skipped",
                    self.index,
                    rect.band,
                    rect.to_array()
                );
                false
            }
        }
    }

    /// Commits every mark into the page content of `doc`.
    ///
    /// A page with no marks is left untouched.
    pub fn apply(&mut self, doc: &mut LoDocument, page_id: ObjectId) -> Result<PageReport> {
        let mut report = PageReport {
            index: self.index,
            ..PageReport::default()
        };
        if self.state != PageState::Marked {
            self.state = PageState::Applied;
            return Ok(report);
        }

        let fills: Vec<(BandRect, FillColor)> = self
            .marks
            .iter()
            .map(|m| (self.page_box.to_user(&m.rect), m.fill))
            .collect();
        let glyphs = content::redact_page_content(doc, page_id, &fills)?;

        self.state = PageState::Applied;
        report.bands_applied = fills.len();
        report.glyphs_erased = glyphs;
        log::debug!(
            "[Redact] page {}: {} band(s) applied, {} glyph(s) erased",
            self.index,
            report.bands_applied,
            report.glyphs_erased
        );
        Ok(report)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedactOptions {
    /// Appended to the input file stem to name the output.
    pub suffix: String,
    pub fill: FillColor,
    /// Record the tool and time in the output's Info dictionary.
    pub stamp_producer: bool,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            fill: FillColor::WHITE,
            stamp_producer: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactOutcome {
    pub output_path: PathBuf,
    pub page_count: usize,
    pub bands_applied: usize,
    pub glyphs_erased: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Redactor {
    options: RedactOptions,
}

impl Redactor {
    pub fn new(options: RedactOptions) -> Self {
        Self { options }
    }

    /// Builds the marked state for one page.
    pub fn plan_page(
        &self,
        doc: &PdfDocument,
        index: usize,
        margins: Margins,
    ) -> Result<PageRedaction> {
        let page_box = doc.page_box(index)?;
        let mut page = PageRedaction::new(index, page_box)?;
        for rect in redaction_bands(page.size, margins) {
            page.mark(rect, self.options.fill);
        }
        Ok(page)
    }

    /// Redacts every page of `doc` in place.
    pub fn redact_document(&self, doc: &mut PdfDocument, margins: Margins) -> Result<Vec<PageReport>> {
        let mut reports = Vec::with_capacity(doc.page_count());
        for index in 0..doc.page_count() {
            let rotation = doc.rotation(index)?;
            if rotation != 0 {
                log::warn!(
                    "[Redact] page {} is rotated by {} degrees, bands follow the unrotated page",
                    index,
                    rotation
                );
            }
            let mut page = self.plan_page(doc, index, margins)?;
            let page_id = doc.page_id(index)?;
            reports.push(page.apply(doc.inner_mut(), page_id)?);
        }
        Ok(reports)
    }

    /// Opens `input`, redacts it and saves `<stem><suffix>.pdf` beside it.
    ///
    /// An existing output file is overwritten. The input is never written.
    pub fn redact_file(&self, input: &Path, margins: Margins) -> Result<RedactOutcome> {
        let output_path = output_path_for(input, &self.options.suffix);
        if same_file(input, &output_path) {
            return Err(InputError::OutputIsInput(output_path.display().to_string()).into());
        }

        let mut doc = PdfDocument::load(input)?;
        log::info!(
            "[Redact] {}: {} page(s), margins top={} bottom={}",
            input.display(),
            doc.page_count(),
            margins.top,
            margins.bottom
        );

        let reports = self.redact_document(&mut doc, margins)?;
        if self.options.stamp_producer {
            metadata::stamp_producer(doc.inner_mut());
        }
        doc.save(&output_path)?;

        let outcome = RedactOutcome {
            output_path,
            page_count: reports.len(),
            bands_applied: reports.iter().map(|r| r.bands_applied).sum(),
            glyphs_erased: reports.iter().map(|r| r.glyphs_erased).sum(),
        };
        log::info!(
            "[Redact] saved {} ({} band(s), {} glyph(s) erased)",
            outcome.output_path.display(),
            outcome.bands_applied,
            outcome.glyphs_erased
        );
        Ok(outcome)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Redacts `input` with default options.
pub fn redact_file(input: &Path, margins: Margins) -> Result<RedactOutcome> {
    Redactor::default().redact_file(input, margins)
}
