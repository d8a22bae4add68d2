//! pdfium-backed page rasterization.

use image::RgbaImage;
use pdfium_render::prelude::{
    PdfDocument, PdfPage, PdfPageRenderRotation, PdfRenderConfig, Pdfium,
};
use std::path::{Path, PathBuf};

use rmhf_core::{CoreError, InputError, Margins, PageSize, Result};

use crate::{render_preview, PageRasterizer, PreviewImage, RenderOptions};

/// Extra directory searched for the pdfium library before the defaults.
pub const PDFIUM_DIR_ENV: &str = "RMHF_PDFIUM_DIR";

fn pdfium_search_paths(extra_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = extra_dir {
        paths.push(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(PDFIUM_DIR_ENV) {
        paths.push(PathBuf::from(dir));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());

            #[cfg(target_os = "macos")]
            {
                if let Some(contents_dir) = exe_dir.parent() {
                    paths.push(contents_dir.join("Resources").join("libs"));
                }
            }
        }
    }

    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));
    paths
}

/// Binds the pdfium shared library, trying `extra_dir`, `$RMHF_PDFIUM_DIR`,
/// the directories next to the executable and finally the system library.
pub fn bind_pdfium(extra_dir: Option<&Path>) -> Result<Pdfium> {
    for path in pdfium_search_paths(extra_dir) {
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(&path);
        log::debug!("[Pdfium] trying {:?}", lib_path);

        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            log::info!("[Pdfium] loaded from {:?}", path);
            return Ok(Pdfium::new(bindings));
        }
    }

    log::debug!("[Pdfium] trying system library");
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            CoreError::io_message(
                "load pdfium",
                format!("{} (set {} or pdfiumDir in the config)", e, PDFIUM_DIR_ENV),
            )
        })
}

/// A document opened read-only through pdfium.
pub struct PdfiumRasterizer<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumRasterizer<'a> {
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InputError::MissingFile(path.display().to_string()).into());
        }
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| CoreError::io_message("open document", e))?;
        Ok(Self { document })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'a>> {
        let index = u16::try_from(index)
            .map_err(|_| CoreError::Geometry(format!("page index {} out of range", index)))?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| CoreError::io_message("read page", e))
    }
}

impl PageRasterizer for PdfiumRasterizer<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        let page = self.page(index)?;
        PageSize::new(page.width().value, page.height().value)
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<RgbaImage> {
        let page = self.page(index)?;
        let target_width = (page.width().value * scale).round().max(1.0) as i32;
        let target_height = (page.height().value * scale).round().max(1.0) as i32;

        let config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_target_height(target_height);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| CoreError::io_message("render page", e))?;
        Ok(bitmap.as_image().to_rgba8())
    }

    fn rotation(&self, index: usize) -> Result<u16> {
        let rotation = self
            .page(index)?
            .rotation()
            .map_err(|e| CoreError::io_message("read page rotation", e))?;
        Ok(match rotation {
            PdfPageRenderRotation::None => 0,
            PdfPageRenderRotation::Degrees90 => 90,
            PdfPageRenderRotation::Degrees180 => 180,
            PdfPageRenderRotation::Degrees270 => 270,
        })
    }
}

/// Opens `path` with pdfium and renders its preview.
///
/// The document is closed again before this returns.
pub fn preview_file(
    path: &Path,
    margins: Margins,
    options: &RenderOptions,
    pdfium_dir: Option<&Path>,
) -> Result<PreviewImage> {
    if !path.is_file() {
        return Err(InputError::MissingFile(path.display().to_string()).into());
    }
    let pdfium = bind_pdfium(pdfium_dir)?;
    let source = PdfiumRasterizer::open(&pdfium, path)?;
    if source.page_count() == 0 {
        return Err(InputError::EmptyDocument(path.display().to_string()).into());
    }
    log::info!(
        "[Preview] {}: {} page(s), margins top={} bottom={}",
        path.display(),
        source.page_count(),
        margins.top,
        margins.bottom
    );
    render_preview(&source, margins, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_paths_start_with_explicit_dir() {
        let paths = pdfium_search_paths(Some(Path::new("/opt/pdfium")));
        assert_eq!(paths[0], PathBuf::from("/opt/pdfium"));
        assert_eq!(paths.last(), Some(&PathBuf::from("./")));
    }

    #[test]
    fn test_preview_missing_file_fails_before_binding() {
        let err = preview_file(
            Path::new("/nonexistent/missing.pdf"),
            Margins::default(),
            &RenderOptions::default(),
            None,
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), rmhf_core::ErrorKind::Input);
    }
}
