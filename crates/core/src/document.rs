//! Shared document interface.
//!
//! Every PDF backend exposes its pages through the `Document` trait so the
//! geometry can be computed without knowing how the file was parsed.

use std::path::{Path, PathBuf};

use crate::geometry::PageSize;
use crate::Result;

/// Suffix appended to the input file stem to name the redacted copy.
pub const DEFAULT_SUFFIX: &str = "_rmhf";

pub trait Document {
    /// Opens the document at `path`.
    ///
    /// Implementations release the underlying file handle before
    /// returning; the loaded value owns everything it needs.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;

    fn page_count(&self) -> usize;

    /// Size of the page at zero-based `index`, in points.
    fn page_size(&self, index: usize) -> Result<PageSize>;

    fn page_sizes(&self) -> Result<Vec<PageSize>> {
        (0..self.page_count()).map(|i| self.page_size(i)).collect()
    }
}

/// Index of the page shown in previews: the middle one.
///
/// The first and last pages are the least representative of running
/// headers and footers (title pages, back matter).
pub fn representative_page(page_count: usize) -> Option<usize> {
    if page_count == 0 {
        None
    } else {
        Some(page_count / 2)
    }
}

/// Output path for a redacted copy: `<dir>/<stem><suffix>.pdf`.
pub fn output_path_for(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{suffix}.pdf"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_representative_page() {
        assert_eq!(representative_page(0), None);
        assert_eq!(representative_page(1), Some(0));
        assert_eq!(representative_page(2), Some(1));
        assert_eq!(representative_page(5), Some(2));
        assert_eq!(representative_page(6), Some(3));
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("/data/scans/report.pdf"), DEFAULT_SUFFIX),
            PathBuf::from("/data/scans/report_rmhf.pdf")
        );
        assert_eq!(
            output_path_for(Path::new("Report.PDF"), DEFAULT_SUFFIX),
            PathBuf::from("Report_rmhf.pdf")
        );
        assert_eq!(
            output_path_for(Path::new("dir/annual.report.pdf"), "-clean"),
            PathBuf::from("dir/annual.report-clean.pdf")
        );
    }

    #[test]
    fn test_output_path_without_extension() {
        assert_eq!(
            output_path_for(Path::new("notes"), DEFAULT_SUFFIX),
            PathBuf::from("notes_rmhf.pdf")
        );
    }

    struct Fixed(Vec<PageSize>);

    impl Document for Fixed {
        fn load(_path: &Path) -> Result<Self> {
            Ok(Fixed(Vec::new()))
        }

        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_size(&self, index: usize) -> Result<PageSize> {
            self.0
                .get(index)
                .copied()
                .ok_or_else(|| crate::CoreError::Geometry(format!("no page {index}")))
        }
    }

    #[test]
    fn test_page_sizes_collects_all() {
        let a = PageSize::new(612.0, 792.0).unwrap();
        let b = PageSize::new(595.0, 842.0).unwrap();
        let doc = Fixed(vec![a, b]);
        assert_eq!(doc.page_sizes().unwrap(), vec![a, b]);
        assert!(Fixed::load(Path::new("x.pdf")).unwrap().page_sizes().unwrap().is_empty());
    }
}
