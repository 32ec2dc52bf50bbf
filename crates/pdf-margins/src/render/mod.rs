//! Dual-layer compositing
//!
//! This module handles turning a page plus its two ink layers into output:
//! - The fixed layer order shared by every back end ([`composite`])
//! - Raster back end (tiny-skia pixmaps, supersampled)
//! - Vector back end (PDF content streams with the page as a Form XObject)
//! - Assembling composited pages and N-up sheets into an output PDF

mod output;
mod pdf;
mod raster;
mod xobject;

pub use output::{OutputDocument, SheetItem};
pub use pdf::{FormUse, PageContent, PdfSink};
pub use raster::{RasterSink, RasterSurface, compose_sheet_raster};
pub use xobject::{copy_object_deep, create_page_xobject, page_media_box, page_rotation};

use kurbo::Rect;

use crate::constants::FRAME_BORDER_WIDTH;
use crate::geometry::{CanvasGeometry, denormalize, resolve};
use crate::ink::{PageInk, StrokeCollection};
use crate::options::{CompositeOptions, MarginConfig};
use crate::store::{PageStore, check_index};
use crate::types::{MarginError, Result, Rgba};

/// A drawing target the compositor paints layers onto
///
/// All coordinates are logical canvas units (y-down).
pub trait LayerSink {
    type Output;

    /// Fill the whole canvas
    fn fill_background(&mut self, canvas: Rect, color: Rgba);

    /// Draw the source page's own content placed per `geometry`
    fn draw_page(&mut self, page_index: usize, geometry: &CanvasGeometry) -> Result<()>;

    /// Draw canvas-space strokes over the whole canvas
    fn draw_strokes(&mut self, strokes: &StrokeCollection);

    /// Outline a rectangle
    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Rgba);

    fn finish(self) -> Result<Self::Output>;
}

/// Which ink layers take part in a composite
#[derive(Debug, Clone, Copy, Default)]
pub struct InkLayers<'a> {
    /// Document-anchored ink, normalized to the page frame
    pub document: Option<&'a StrokeCollection>,
    /// Margin ink, in canvas space
    pub margin: Option<&'a StrokeCollection>,
}

impl<'a> InkLayers<'a> {
    pub fn all(ink: &'a PageInk) -> Self {
        Self {
            document: Some(&ink.document),
            margin: Some(&ink.margin),
        }
    }

    pub fn margin_only(ink: &'a PageInk) -> Self {
        Self {
            document: None,
            margin: Some(&ink.margin),
        }
    }
}

/// Paint one page onto `sink`, in order: background, page content,
/// document ink, margin ink, then the frame separator when the page is shrunk.
pub fn composite<K: LayerSink>(
    mut sink: K,
    page_index: usize,
    geometry: &CanvasGeometry,
    ink: InkLayers<'_>,
    options: &CompositeOptions,
) -> Result<K::Output> {
    sink.fill_background(geometry.canvas_rect(), options.background);
    sink.draw_page(page_index, geometry)?;

    if let Some(document_ink) = ink.document.filter(|ink| !ink.is_empty()) {
        sink.draw_strokes(&denormalize(document_ink, geometry.page_frame));
    }
    if let Some(margin_ink) = ink.margin.filter(|ink| !ink.is_empty()) {
        sink.draw_strokes(margin_ink);
    }

    if options.frame_border && geometry.is_shrunk() {
        sink.stroke_rect(geometry.page_frame, FRAME_BORDER_WIDTH, options.frame_color);
    }

    sink.finish()
}

/// Geometry for one page of a store under `config`
pub fn page_geometry<S: PageStore + ?Sized>(
    store: &S,
    page_index: usize,
    config: &MarginConfig,
) -> Result<CanvasGeometry> {
    check_index(store, page_index)?;
    let size = store
        .effective_size(page_index)
        .ok_or(MarginError::MissingPageContent { page: page_index })?;
    Ok(resolve(size, config, None))
}

/// Composite one page of `store` into a raster surface
pub fn composite_raster<S: PageStore + ?Sized>(
    store: &S,
    page_index: usize,
    config: &MarginConfig,
    ink: InkLayers<'_>,
    options: &CompositeOptions,
) -> Result<RasterSurface> {
    let geometry = page_geometry(store, page_index, config)?;
    let sink = RasterSink::new(store, geometry.canvas_size, options.supersample)?;
    composite(sink, page_index, &geometry, ink, options)
}

/// Composite one page of a PDF-backed `store` into vector page content
pub fn composite_vector<S: PageStore + ?Sized>(
    store: &S,
    page_index: usize,
    config: &MarginConfig,
    ink: InkLayers<'_>,
    options: &CompositeOptions,
) -> Result<PageContent> {
    let geometry = page_geometry(store, page_index, config)?;
    let sink = PdfSink::new(store, geometry.canvas_size);
    composite(sink, page_index, &geometry, ink, options)
}
