//! Page stores
//!
//! The engine never owns page content. It reads sizes, rotations and
//! rendered content through [`PageStore`], which the host implements over
//! whatever document model it has.

mod image_store;
mod pdf_store;

pub use image_store::{ImagePage, ImagePageStore};
pub use pdf_store::PdfPageStore;

use kurbo::Size;
use lopdf::{Document, ObjectId};
use tiny_skia::Pixmap;

use crate::types::{MarginError, PageRotation, Result};

/// Read access to a paginated document
pub trait PageStore: Send + Sync {
    /// Number of pages
    fn page_count(&self) -> usize;

    /// Declared (unrotated) page size in points
    fn native_size(&self, index: usize) -> Option<Size>;

    /// Declared display rotation
    fn rotation(&self, index: usize) -> PageRotation;

    /// Rasterize one page, already rotated, at exactly `width` x `height`
    /// pixels. `None` when the content is not available.
    fn render_content(&self, index: usize, width: u32, height: u32) -> Option<Pixmap>;

    /// The PDF page behind `index`, for stores backed by a PDF document
    fn pdf_page(&self, _index: usize) -> Option<(&Document, ObjectId)> {
        None
    }

    /// Page size with the declared rotation applied. All geometry is
    /// computed against this box.
    fn effective_size(&self, index: usize) -> Option<Size> {
        self.native_size(index)
            .map(|size| self.rotation(index).apply_to(size))
    }
}

/// Fail with `PageOutOfRange` unless `index` names a page of `store`
pub fn check_index<S: PageStore + ?Sized>(store: &S, index: usize) -> Result<()> {
    let count = store.page_count();
    if index < count {
        Ok(())
    } else {
        Err(MarginError::PageOutOfRange { page: index, count })
    }
}
