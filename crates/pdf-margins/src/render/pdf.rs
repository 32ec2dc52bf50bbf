//! Vector back end
//!
//! Produces a PDF content stream for one composited page. The source page is
//! referenced as a Form XObject placeholder ([`FormUse`]) so pages can be
//! composited in parallel without touching the output document; the
//! placeholders are materialized by [`super::OutputDocument`].

use std::fmt::Write as _;

use kurbo::{Affine, Point, Rect, Size};

use super::{LayerSink, page_media_box};
use crate::geometry::CanvasGeometry;
use crate::ink::StrokeCollection;
use crate::store::PageStore;
use crate::types::{MarginError, PageRotation, Result, Rgba};

/// A source page referenced by a content stream
#[derive(Debug, Clone, PartialEq)]
pub struct FormUse {
    /// Resource name used in the content stream (without the slash)
    pub name: String,
    pub page_index: usize,
}

/// A composited page as PDF content, not yet attached to a document
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page size in points
    pub size: Size,
    /// Content stream operators
    pub operations: String,
    /// Source pages drawn as Form XObjects
    pub forms: Vec<FormUse>,
    /// Alpha values of the `GS{n}` graphics states used by the stream
    pub alphas: Vec<f32>,
}

impl PageContent {
    pub fn graphics_state_name(index: usize) -> String {
        format!("GS{}", index)
    }
}

/// Writes composite layers as PDF operators
pub struct PdfSink<'a, S: PageStore + ?Sized> {
    store: &'a S,
    canvas_size: Size,
    ops: String,
    forms: Vec<FormUse>,
    alphas: Vec<f32>,
}

impl<'a, S: PageStore + ?Sized> PdfSink<'a, S> {
    pub fn new(store: &'a S, canvas_size: Size) -> Self {
        // Everything below is drawn in y-down canvas units
        let mut ops = String::from("q\n");
        let _ = writeln!(ops, "1 0 0 -1 0 {} cm", num(canvas_size.height));
        Self {
            store,
            canvas_size,
            ops,
            forms: Vec::new(),
            alphas: Vec::new(),
        }
    }

    /// Select a graphics state for `color`'s alpha when it is not opaque
    fn set_alpha(&mut self, color: Rgba) {
        if color.is_opaque() {
            return;
        }
        let alpha = color.a as f32 / 255.0;
        let index = match self.alphas.iter().position(|&a| a == alpha) {
            Some(index) => index,
            None => {
                self.alphas.push(alpha);
                self.alphas.len() - 1
            }
        };
        let _ = writeln!(self.ops, "/{} gs", PageContent::graphics_state_name(index));
    }
}

impl<S: PageStore + ?Sized> LayerSink for PdfSink<'_, S> {
    type Output = PageContent;

    fn fill_background(&mut self, canvas: Rect, color: Rgba) {
        let (r, g, b) = color.pdf_components();
        self.ops.push_str("q\n");
        self.set_alpha(color);
        let _ = writeln!(self.ops, "{} {} {} rg", r, g, b);
        let _ = writeln!(self.ops, "{} re f", rect_operands(canvas));
        self.ops.push_str("Q\n");
    }

    fn draw_page(&mut self, page_index: usize, geometry: &CanvasGeometry) -> Result<()> {
        let (doc, page_id) = self
            .store
            .pdf_page(page_index)
            .ok_or(MarginError::MissingPageContent { page: page_index })?;

        let media_box = page_media_box(doc, page_id);
        let rotation = self.store.rotation(page_index);
        let transform = page_to_canvas(media_box, rotation, geometry);

        let name = format!("P{}", self.forms.len());
        let _ = writeln!(self.ops, "q {} cm /{} Do Q", affine_operands(transform), name);
        self.forms.push(FormUse { name, page_index });
        Ok(())
    }

    fn draw_strokes(&mut self, strokes: &StrokeCollection) {
        for stroke in strokes {
            if stroke.points.is_empty() {
                continue;
            }
            let (r, g, b) = stroke.color.pdf_components();

            self.ops.push_str("q\n");
            self.set_alpha(stroke.color);
            let _ = writeln!(self.ops, "{} {} {} RG", r, g, b);
            let _ = writeln!(self.ops, "{} w 1 J 1 j", num(stroke.width));

            let first = stroke.points[0];
            let _ = writeln!(self.ops, "{} m", point_operands(first));
            if stroke.points.len() == 1 {
                // Zero-length segment with round caps renders as a dot
                let _ = writeln!(self.ops, "{} l", point_operands(first));
            } else {
                for &p in &stroke.points[1..] {
                    let _ = writeln!(self.ops, "{} l", point_operands(p));
                }
            }
            self.ops.push_str("S\nQ\n");
        }
    }

    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Rgba) {
        let (r, g, b) = color.pdf_components();
        self.ops.push_str("q\n");
        self.set_alpha(color);
        let _ = writeln!(self.ops, "{} {} {} RG {} w", r, g, b, num(width));
        let _ = writeln!(self.ops, "{} re S", rect_operands(rect));
        self.ops.push_str("Q\n");
    }

    fn finish(mut self) -> Result<PageContent> {
        self.ops.push_str("Q\n");
        Ok(PageContent {
            size: self.canvas_size,
            operations: self.ops,
            forms: self.forms,
            alphas: self.alphas,
        })
    }
}

// =============================================================================
// Transforms
// =============================================================================

/// Map from PDF page space (y-up, MediaBox units) into y-down canvas space.
///
/// The declared rotation is applied first so the page is placed with the
/// same effective size the geometry was resolved against.
pub(crate) fn page_to_canvas(
    media_box: Rect,
    rotation: PageRotation,
    geometry: &CanvasGeometry,
) -> Affine {
    let (w, h) = (media_box.width(), media_box.height());
    let effective = rotation.apply_to(Size::new(w, h));

    let rotate = match rotation {
        PageRotation::None => Affine::IDENTITY,
        PageRotation::Clockwise90 => Affine::new([0.0, -1.0, 1.0, 0.0, 0.0, w]),
        PageRotation::Clockwise180 => Affine::new([-1.0, 0.0, 0.0, -1.0, w, h]),
        PageRotation::Clockwise270 => Affine::new([0.0, 1.0, -1.0, 0.0, h, 0.0]),
    };
    let flip = flip_y(effective.height);

    geometry.display_transform()
        * flip
        * rotate
        * Affine::translate((-media_box.x0, -media_box.y0))
}

/// Mirror a y-up box of the given height into y-down space (or back)
pub(crate) fn flip_y(height: f64) -> Affine {
    Affine::new([1.0, 0.0, 0.0, -1.0, 0.0, height])
}

// =============================================================================
// Operand Formatting
// =============================================================================

/// Format a number for a content stream: at most four decimals, no
/// trailing zeros, never `-0`
pub(crate) fn num(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 || !rounded.is_finite() {
        return "0".to_string();
    }
    let text = format!("{:.4}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub(crate) fn affine_operands(affine: Affine) -> String {
    affine
        .as_coeffs()
        .iter()
        .map(|&c| num(c))
        .collect::<Vec<_>>()
        .join(" ")
}

fn point_operands(p: Point) -> String {
    format!("{} {}", num(p.x), num(p.y))
}

pub(crate) fn rect_operands(rect: Rect) -> String {
    format!(
        "{} {} {} {}",
        num(rect.x0),
        num(rect.y0),
        num(rect.width()),
        num(rect.height())
    )
}
