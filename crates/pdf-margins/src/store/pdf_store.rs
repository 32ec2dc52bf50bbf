//! PDF-backed page store

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use hayro::RenderSettings;
use hayro::hayro_interpret::InterpreterSettings;
use hayro::hayro_syntax::Pdf;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use kurbo::Size;
use log::warn;
use lopdf::{Document, ObjectId};
use tiny_skia::Pixmap;

use super::PageStore;
use super::image_store::rgba_to_pixmap;
use crate::render::{page_media_box, page_rotation};
use crate::types::{PageRotation, Result};

/// Page store over a parsed PDF document
///
/// Sizes come from each page's (possibly inherited) `MediaBox` and rotations
/// from its `Rotate` entry. Page content is available both as PDF objects
/// through [`PageStore::pdf_page`] and rasterized with hayro.
#[derive(Clone)]
pub struct PdfPageStore {
    document: Document,
    /// Serialized form of `document`, parsed by the rasterizer
    bytes: Arc<Vec<u8>>,
    page_ids: Vec<ObjectId>,
    sizes: Vec<Size>,
    rotations: Vec<PageRotation>,
}

impl PdfPageStore {
    pub fn from_document(mut document: Document) -> Self {
        let bytes = crate::export::export_to_bytes(&mut document).unwrap_or_else(|e| {
            warn!("Could not serialize document for rasterizing: {}", e);
            Vec::new()
        });
        Self::with_bytes(document, bytes)
    }

    /// Parse a PDF held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let document = Document::load_mem(&bytes)?;
        Ok(Self::with_bytes(document, bytes))
    }

    fn with_bytes(document: Document, bytes: Vec<u8>) -> Self {
        let page_ids: Vec<ObjectId> = document.get_pages().values().copied().collect();

        let sizes = page_ids
            .iter()
            .map(|&id| page_media_box(&document, id).size())
            .collect();
        let rotations = page_ids
            .iter()
            .map(|&id| page_rotation(&document, id))
            .collect();

        Self {
            document,
            bytes: Arc::new(bytes),
            page_ids,
            sizes,
            rotations,
        }
    }

    /// Load a PDF file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        tokio::task::spawn_blocking(move || Self::from_bytes(bytes)).await?
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }
}

impl fmt::Debug for PdfPageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfPageStore")
            .field("pages", &self.page_ids.len())
            .field("bytes", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

impl PageStore for PdfPageStore {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn native_size(&self, index: usize) -> Option<Size> {
        self.sizes.get(index).copied()
    }

    fn rotation(&self, index: usize) -> PageRotation {
        self.rotations.get(index).copied().unwrap_or_default()
    }

    /// Rasterize a page with hayro, which applies the page's rotation itself
    fn render_content(&self, index: usize, width: u32, height: u32) -> Option<Pixmap> {
        if width == 0 || height == 0 || index >= self.page_ids.len() {
            return None;
        }

        let pdf = match Pdf::new(self.bytes.clone()) {
            Ok(pdf) => pdf,
            Err(e) => {
                warn!("Could not parse page {} for rasterizing: {:?}", index, e);
                return None;
            }
        };
        let pages = pdf.pages();
        let page = pages.get(index)?;

        let (page_width, page_height) = page.render_dimensions();
        if page_width <= 0.0 || page_height <= 0.0 {
            return None;
        }
        let settings = RenderSettings {
            x_scale: width as f32 / page_width,
            y_scale: height as f32 / page_height,
            ..Default::default()
        };
        let rendered = hayro::render(page, &InterpreterSettings::default(), &settings);

        let (rendered_width, rendered_height) =
            (u32::from(rendered.width()), u32::from(rendered.height()));
        let raw: Vec<u8> = rendered
            .take_unpremultiplied()
            .into_iter()
            .flat_map(|px| [px.r, px.g, px.b, px.a])
            .collect();
        let mut image = RgbaImage::from_raw(rendered_width, rendered_height, raw)?;

        // hayro rounds the output size, the caller wants it exact
        if image.dimensions() != (width, height) {
            image = imageops::resize(&image, width, height, FilterType::Triangle);
        }
        rgba_to_pixmap(&image)
    }

    fn pdf_page(&self, index: usize) -> Option<(&Document, ObjectId)> {
        self.page_ids.get(index).map(|&id| (&self.document, id))
    }
}
