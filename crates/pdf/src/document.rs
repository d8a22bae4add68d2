//! lopdf-backed document handle.

use lopdf::{Document as LoDocument, Object, ObjectId};
use std::fs;
use std::path::Path;

use rmhf_core::{BandRect, CoreError, Document, InputError, PageSize, Result};

/// Guard against cyclic /Parent chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// The effective visible box of a page in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter, used when a page carries no usable box at all.
    pub const LETTER: PageBox = PageBox {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    fn from_corners(a: f32, b: f32, c: f32, d: f32) -> Self {
        PageBox {
            llx: a.min(c),
            lly: b.min(d),
            urx: a.max(c),
            ury: b.max(d),
        }
    }

    pub fn size(&self) -> Result<PageSize> {
        PageSize::new(self.urx - self.llx, self.ury - self.lly)
    }

    /// Moves a page-relative rectangle into absolute user space.
    pub fn to_user(&self, rect: &BandRect) -> BandRect {
        BandRect {
            band: rect.band,
            x0: rect.x0 + self.llx,
            y0: rect.y0 + self.lly,
            x1: rect.x1 + self.llx,
            y1: rect.y1 + self.lly,
        }
    }
}

/// A PDF loaded fully into memory.
///
/// The source file is closed as soon as parsing finishes, so holding a
/// `PdfDocument` never pins an open file handle.
pub struct PdfDocument {
    inner: LoDocument,
    page_ids: Vec<ObjectId>,
}

impl PdfDocument {
    pub fn from_lopdf(inner: LoDocument) -> Self {
        let page_ids = inner.get_pages().into_values().collect();
        Self { inner, page_ids }
    }

    pub fn inner(&self) -> &LoDocument {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut LoDocument {
        &mut self.inner
    }

    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            CoreError::Geometry(format!(
                "page index {index} out of range ({} pages)",
                self.page_ids.len()
            ))
        })
    }

    /// CropBox if present, else MediaBox, both inheritable through the page
    /// tree. Falls back to Letter with a warning.
    pub fn page_box(&self, index: usize) -> Result<PageBox> {
        let page_id = self.page_id(index)?;
        for key in [&b"CropBox"[..], &b"MediaBox"[..]] {
            if let Some(Object::Array(arr)) = inherited_attr(&self.inner, page_id, key) {
                if let Some(page_box) = box_from_array(&self.inner, arr) {
                    log::debug!(
                        "[PageBox] page {}: {} {:?}",
                        index,
                        String::from_utf8_lossy(key),
                        page_box
                    );
                    return Ok(page_box);
                }
            }
        }
        log::warn!("[PageBox] page {} has no usable box, assuming Letter", index);
        Ok(PageBox::LETTER)
    }

    /// The /Rotate value of a page, normalised to 0..360.
    pub fn rotation(&self, index: usize) -> Result<i64> {
        let page_id = self.page_id(index)?;
        let rotate = inherited_attr(&self.inner, page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        Ok(rotate.rem_euclid(360))
    }

    /// Writes the document to `path`, replacing any existing file.
    ///
    /// Objects no longer referenced (such as replaced content streams) are
    /// dropped first so the erased text does not linger in the file.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.inner.prune_objects();
        self.inner.compress();
        let mut file = fs::File::create(path).map_err(|e| CoreError::io("create output file", e))?;
        self.inner
            .save_to(&mut file)
            .map_err(|e| CoreError::io("save document", e))?;
        Ok(())
    }
}

impl Document for PdfDocument {
    fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InputError::MissingFile(path.display().to_string()).into());
        }
        let mut inner = LoDocument::load(path).map_err(|e| CoreError::io("open document", e))?;
        // Owner-password-only files open with the empty user password.
        if inner.is_encrypted() {
            inner
                .decrypt("")
                .map_err(|e| CoreError::io("decrypt document", e))?;
            inner.trailer.remove(b"Encrypt");
            log::info!("[Redact] {}: decrypted with the empty user password", path.display());
        }
        Ok(Self::from_lopdf(inner))
    }

    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize> {
        self.page_box(index)?.size()
    }
}

fn resolve<'a>(doc: &'a LoDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Looks `key` up on the page and then on each ancestor in the page tree.
pub(crate) fn inherited_attr<'a>(
    doc: &'a LoDocument,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}

fn box_from_array(doc: &LoDocument, arr: &[Object]) -> Option<PageBox> {
    let values: Vec<f32> = arr
        .iter()
        .filter_map(|o| resolve(doc, o).as_float().ok())
        .collect();
    match values.as_slice() {
        [a, b, c, d] => Some(PageBox::from_corners(*a, *b, *c, *d)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn two_page_tree() -> (LoDocument, ObjectId, ObjectId) {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let first = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        let second = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "CropBox" => vec![10.into(), 20.into(), 510.into(), 720.into()],
            "Rotate" => -90,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![first.into(), second.into()],
                "Count" => 2,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, first, second)
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let (doc, _, _) = two_page_tree();
        let doc = PdfDocument::from_lopdf(doc);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_box(0).unwrap(), PageBox::LETTER);
        assert_eq!(doc.page_size(0).unwrap(), PageSize::new(612.0, 792.0).unwrap());
    }

    #[test]
    fn test_crop_box_wins_over_media_box() {
        let (doc, _, _) = two_page_tree();
        let doc = PdfDocument::from_lopdf(doc);
        let page_box = doc.page_box(1).unwrap();
        assert_eq!(page_box.llx, 10.0);
        assert_eq!(page_box.lly, 20.0);
        assert_eq!(doc.page_size(1).unwrap(), PageSize::new(500.0, 700.0).unwrap());
        assert_eq!(doc.rotation(1).unwrap(), 270);
        assert_eq!(doc.rotation(0).unwrap(), 0);
    }

    #[test]
    fn test_page_index_out_of_range() {
        let (doc, _, _) = two_page_tree();
        let doc = PdfDocument::from_lopdf(doc);
        assert!(doc.page_box(2).is_err());
    }

    #[test]
    fn test_inverted_box_is_normalised() {
        let mut doc = LoDocument::with_version("1.5");
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![612.into(), 792.into(), 0.into(), 0.into()],
        });
        let page_box = box_from_array(
            &doc,
            doc.get_dictionary(page)
                .unwrap()
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(page_box, PageBox::LETTER);
    }

    #[test]
    fn test_to_user_offsets_by_origin() {
        let page_box = PageBox::from_corners(10.0, 20.0, 510.0, 720.0);
        let rect = BandRect {
            band: rmhf_core::Band::Bottom,
            x0: 0.0,
            y0: 0.0,
            x1: 500.0,
            y1: 50.0,
        };
        assert_eq!(page_box.to_user(&rect).to_array(), [10.0, 20.0, 510.0, 70.0]);
    }

    #[test]
    fn test_load_missing_file_is_input_error() {
        let err = PdfDocument::load(Path::new("/nonexistent/never.pdf"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), rmhf_core::ErrorKind::Input);
    }
}
