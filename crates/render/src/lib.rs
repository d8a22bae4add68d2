//! Preview rendering: rasterize the representative page and highlight the
//! bands that would be removed.

pub mod overlay;
pub mod pdfium;

pub use overlay::composite_bands;
pub use pdfium::{bind_pdfium, preview_file, PdfiumRasterizer};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

use rmhf_core::{
    preview_bands, representative_page, BandRect, CoreError, InputError, Margins, PageSize, Result,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Pixels per point.
    pub scale: f32,
    /// RGBA highlight drawn over each band.
    pub highlight: [u8; 4],
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            highlight: [255, 0, 0, 120],
        }
    }
}

/// Something that can turn a page into pixels.
pub trait PageRasterizer {
    fn page_count(&self) -> usize;

    fn page_size(&self, index: usize) -> Result<PageSize>;

    /// Renders page `index` at `scale` pixels per point.
    fn rasterize(&self, index: usize, scale: f32) -> Result<RgbaImage>;

    /// Clockwise display rotation of page `index`, in degrees.
    fn rotation(&self, _index: usize) -> Result<u16> {
        Ok(0)
    }
}

pub struct PreviewImage {
    pub page_index: usize,
    pub image: RgbaImage,
    /// Highlighted bands, in points.
    pub bands: Vec<BandRect>,
    /// Display rotation of the page, in degrees.
    pub rotation: u16,
}

impl PreviewImage {
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| CoreError::io("write preview", e))?;
        log::info!("[Preview] wrote {}", path.display());
        Ok(())
    }
}

/// Renders the middle page of `source` with the preview bands highlighted.
pub fn render_preview<R: PageRasterizer>(
    source: &R,
    margins: Margins,
    options: &RenderOptions,
) -> Result<PreviewImage> {
    let page_index = representative_page(source.page_count())
        .ok_or_else(|| InputError::EmptyDocument("preview source".into()))?;
    if !(options.scale.is_finite() && options.scale > 0.0) {
        return Err(CoreError::Geometry(format!(
            "preview scale must be positive, got {}",
            options.scale
        )));
    }

    let size = source.page_size(page_index)?;
    let bands = preview_bands(size, margins);
    let page = source.rasterize(page_index, options.scale)?;
    let rotation = source.rotation(page_index)?;
    if rotation != 0 {
        log::warn!(
            "[Preview] page {} is rotated by {} degrees, bands are highlighted on the rotated view but removal works on the unrotated page",
            page_index,
            rotation
        );
    }
    log::debug!(
        "[Preview] page {} of {}: {}x{} pt -> {}x{} px",
        page_index,
        source.page_count(),
        size.width,
        size.height,
        page.width(),
        page.height()
    );

    let image = composite_bands(page, &bands, options.scale, options.highlight);
    Ok(PreviewImage {
        page_index,
        image,
        bands,
        rotation,
    })
}
