//! Batch export
//!
//! This module drives whole-document output:
//! - Per-page rendering in parallel, in page order
//! - Failure isolation (a failing page is substituted or skipped)
//! - Cooperative cancellation between pages
//! - N-up sheet assembly and the print callback

mod io;
mod sheet;

pub use io::{export_to_bytes, load_pdf, save_pdf};
pub use sheet::{compose_sheets, paper_rect, sheet_count, sheet_layout};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use lopdf::Document;
use rayon::prelude::*;

use crate::document::DocumentSnapshot;
use crate::ink::PageInk;
use crate::options::{CompositeOptions, ExportOptions, MarginConfig};
use crate::render::{
    InkLayers, OutputDocument, PageContent, RasterSurface, SheetItem, composite_raster,
    composite_vector,
};
use crate::store::{PageStore, check_index};
use crate::types::*;

/// Shared flag for stopping an export between pages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation so the token can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MarginError::CancelledExport)
        } else {
            Ok(())
        }
    }
}

/// One page's contribution to an export
#[derive(Debug, Clone)]
pub enum RenderedPage {
    Vector(PageContent),
    Raster(RasterSurface),
    /// The source page, copied unchanged
    Original(usize),
}

impl RenderedPage {
    fn as_sheet_item(&self) -> Option<SheetItem<'_>> {
        match self {
            RenderedPage::Vector(content) => Some(SheetItem::Vector(content)),
            RenderedPage::Raster(surface) => Some(SheetItem::Raster(surface)),
            RenderedPage::Original(_) => None,
        }
    }
}

// =============================================================================
// Single Page
// =============================================================================

/// Composite one page with every layer, as the export would in `Both` mode
pub fn composite_single<S: PageStore + ?Sized>(
    store: &S,
    pages: &DocumentSnapshot,
    page_index: usize,
    options: &CompositeOptions,
) -> Result<RasterSurface> {
    let ink = pages.ink(page_index);
    composite_raster(
        store,
        page_index,
        &pages.margin_config(page_index),
        InkLayers::all(&ink),
        options,
    )
}

/// Render one page for export, without failure handling
fn render_page<S: PageStore + ?Sized>(
    store: &S,
    pages: &DocumentSnapshot,
    page_index: usize,
    options: &ExportOptions,
    on_sheet: bool,
) -> Result<RenderedPage> {
    check_index(store, page_index)?;

    let empty = PageInk::default();
    let ink = pages.ink_ref(page_index).unwrap_or(&empty);
    let layers = match options.mode {
        ExportMode::PageOnly => return render_original(store, page_index, options, on_sheet),
        ExportMode::MarginOnly => InkLayers::margin_only(ink),
        ExportMode::Both => InkLayers::all(ink),
    };
    let config = pages.margin_config(page_index);

    if store.pdf_page(page_index).is_some() {
        composite_vector(store, page_index, &config, layers, &options.composite)
            .map(RenderedPage::Vector)
    } else {
        composite_raster(store, page_index, &config, layers, &options.composite)
            .map(RenderedPage::Raster)
    }
}

/// The unmodified page. PDF pages are copied as they are unless they have
/// to be placed on a sheet.
fn render_original<S: PageStore + ?Sized>(
    store: &S,
    page_index: usize,
    options: &ExportOptions,
    on_sheet: bool,
) -> Result<RenderedPage> {
    let is_pdf = store.pdf_page(page_index).is_some();
    if is_pdf && !on_sheet {
        return Ok(RenderedPage::Original(page_index));
    }

    let config = MarginConfig::default();
    let composite = CompositeOptions {
        frame_border: false,
        ..options.composite
    };
    if is_pdf {
        composite_vector(store, page_index, &config, InkLayers::default(), &composite)
            .map(RenderedPage::Vector)
    } else {
        composite_raster(store, page_index, &config, InkLayers::default(), &composite)
            .map(RenderedPage::Raster)
    }
}

/// Render a page, applying the failure policy when it cannot be composited.
/// `Ok(None)` means the page is left out.
fn render_isolated<S: PageStore + ?Sized>(
    store: &S,
    pages: &DocumentSnapshot,
    page_index: usize,
    options: &ExportOptions,
    on_sheet: bool,
) -> Result<Option<RenderedPage>> {
    let err = match render_page(store, pages, page_index, options, on_sheet) {
        Ok(page) => return Ok(Some(page)),
        Err(e) if !e.is_page_local() => return Err(e),
        Err(e) => e,
    };

    match options.failure_policy {
        FailurePolicy::Skip => {
            warn!("Skipping page {}: {}", page_index, err);
            Ok(None)
        }
        FailurePolicy::SubstituteOriginal => {
            match render_original(store, page_index, options, on_sheet) {
                Ok(page) => {
                    warn!("Page {} could not be composited ({}), using the original", page_index, err);
                    Ok(Some(page))
                }
                Err(original_err) => {
                    warn!(
                        "Skipping page {}: {}; original unavailable: {}",
                        page_index, err, original_err
                    );
                    Ok(None)
                }
            }
        }
    }
}

/// Render every page in parallel. Results keep page order; cancellation is
/// checked before each page starts.
pub fn render_pages<S: PageStore + ?Sized>(
    store: &S,
    pages: &DocumentSnapshot,
    options: &ExportOptions,
    cancel: &CancellationToken,
) -> Result<Vec<RenderedPage>> {
    let page_count = store.page_count();
    if page_count == 0 {
        return Err(MarginError::NoPages);
    }
    let on_sheet = options.effective_pages_per_sheet() > 1;

    let rendered: Vec<Option<RenderedPage>> = (0..page_count)
        .into_par_iter()
        .map(|page_index| {
            cancel.check()?;
            debug!("Rendering page {}", page_index);
            render_isolated(store, pages, page_index, options, on_sheet)
        })
        .collect::<Result<_>>()?;

    // A cancel that lands while the last pages finish still discards them
    cancel.check()?;

    let rendered: Vec<RenderedPage> = rendered.into_iter().flatten().collect();
    if rendered.is_empty() {
        return Err(MarginError::NoPages);
    }
    Ok(rendered)
}

// =============================================================================
// Whole Document
// =============================================================================

/// Export a document on the current thread (page work still runs on rayon)
pub fn export_document_sync<S: PageStore + ?Sized>(
    store: &S,
    pages: &DocumentSnapshot,
    options: &ExportOptions,
    cancel: &CancellationToken,
) -> Result<Document> {
    options.validate()?;
    let rendered = render_pages(store, pages, options, cancel)?;

    let mut output = OutputDocument::new();
    let pages_per_sheet = options.effective_pages_per_sheet();

    if pages_per_sheet == 1 {
        for page in &rendered {
            match page {
                RenderedPage::Vector(content) => output.push_content(store, content)?,
                RenderedPage::Raster(surface) => output.push_raster(surface),
                RenderedPage::Original(index) => output.push_pdf_page(store, *index)?,
            }
        }
    } else {
        let layout = sheet_layout(options);
        for chunk in rendered.chunks(pages_per_sheet) {
            cancel.check()?;
            let items: Vec<SheetItem<'_>> =
                chunk.iter().filter_map(RenderedPage::as_sheet_item).collect();
            output.push_sheet(store, &layout, &items)?;
        }
    }

    info!(
        "Exported {} pages into {} output pages",
        rendered.len(),
        output.page_count()
    );
    Ok(output.finish())
}

/// Export a document without blocking the async runtime
pub async fn export_document<S: PageStore + ?Sized + 'static>(
    store: Arc<S>,
    pages: DocumentSnapshot,
    options: ExportOptions,
    cancel: CancellationToken,
) -> Result<Document> {
    tokio::task::spawn_blocking(move || {
        export_document_sync(store.as_ref(), &pages, &options, &cancel)
    })
    .await?
}

// =============================================================================
// Printing
// =============================================================================

/// Compose raster N-up sheets and hand each one to `print_sheet` with its
/// sheet index.
///
/// Pages that fail to rasterize are handled by the failure policy.
pub fn print_sheets<S, F>(
    store: &S,
    pages: &DocumentSnapshot,
    options: &ExportOptions,
    cancel: &CancellationToken,
    mut print_sheet: F,
) -> Result<usize>
where
    S: PageStore + ?Sized,
    F: FnMut(usize, &RasterSurface) -> Result<()>,
{
    options.validate()?;
    let page_count = store.page_count();
    if page_count == 0 {
        return Err(MarginError::NoPages);
    }

    let surfaces: Vec<Option<RasterSurface>> = (0..page_count)
        .into_par_iter()
        .map(|page_index| {
            cancel.check()?;
            Ok(print_page(store, pages, page_index, options))
        })
        .collect::<Result<_>>()?;
    let surfaces: Vec<RasterSurface> = surfaces.into_iter().flatten().collect();
    if surfaces.is_empty() {
        return Err(MarginError::NoPages);
    }

    let layout = sheet_layout(options);
    let mut printed = 0;
    for (sheet_index, chunk) in surfaces.chunks(layout.pages_per_sheet).enumerate() {
        cancel.check()?;
        let refs: Vec<&RasterSurface> = chunk.iter().collect();
        let sheet =
            crate::render::compose_sheet_raster(&refs, &layout, options.composite.supersample)?;
        print_sheet(sheet_index, &sheet)?;
        printed += 1;
    }
    Ok(printed)
}

fn print_page<S: PageStore + ?Sized>(
    store: &S,
    pages: &DocumentSnapshot,
    page_index: usize,
    options: &ExportOptions,
) -> Option<RasterSurface> {
    let ink = pages.ink(page_index);
    let (config, layers) = match options.mode {
        ExportMode::PageOnly => (MarginConfig::default(), InkLayers::default()),
        ExportMode::MarginOnly => (pages.margin_config(page_index), InkLayers::margin_only(&ink)),
        ExportMode::Both => (pages.margin_config(page_index), InkLayers::all(&ink)),
    };

    let err = match composite_raster(store, page_index, &config, layers, &options.composite) {
        Ok(surface) => return Some(surface),
        Err(err) => err,
    };

    if options.failure_policy == FailurePolicy::SubstituteOriginal {
        let composite = CompositeOptions {
            frame_border: false,
            ..options.composite
        };
        let original = composite_raster(
            store,
            page_index,
            &MarginConfig::default(),
            InkLayers::default(),
            &composite,
        );
        if let Ok(surface) = original {
            warn!("Page {} could not be composited ({}), printing the original", page_index, err);
            return Some(surface);
        }
    }
    warn!("Skipping page {} in print: {}", page_index, err);
    None
}
