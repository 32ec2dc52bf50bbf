//! Raster back end (tiny-skia)
//!
//! Everything is computed in logical units. The supersampling factor is only
//! applied through the final transform handed to tiny-skia, so rounding
//! never compounds across layers.

use std::io::Cursor;

use image::RgbaImage;
use kurbo::{Affine, Rect, Size};
use tiny_skia::{
    FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use super::LayerSink;
use crate::geometry::CanvasGeometry;
use crate::ink::StrokeCollection;
use crate::layout::{GridLayout, place_in_cell};
use crate::store::PageStore;
use crate::types::{MarginError, Result, Rgba};

// =============================================================================
// Raster Surface
// =============================================================================

/// A rendered page or sheet
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixmap: Pixmap,
    logical_size: Size,
    supersample: f32,
}

impl RasterSurface {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Size in logical units (points)
    pub fn logical_size(&self) -> Size {
        self.logical_size
    }

    /// Pixels per logical unit
    pub fn supersample(&self) -> f32 {
        self.supersample
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Straight-alpha copy of the pixels
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.pixmap.width(), self.pixmap.height());
        for (dst, src) in out.pixels_mut().zip(self.pixmap.pixels()) {
            let c = src.demultiply();
            *dst = image::Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        out
    }

    /// RGB bytes, row-major, alpha composited over white
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixmap.pixels().len() * 3);
        for px in self.pixmap.pixels() {
            // Premultiplied: over white is c + (255 - a)
            let white = 255 - px.alpha();
            rgb.extend_from_slice(&[
                px.red().saturating_add(white),
                px.green().saturating_add(white),
                px.blue().saturating_add(white),
            ]);
        }
        rgb
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.to_rgba_image()
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

// =============================================================================
// Raster Sink
// =============================================================================

/// Paints composite layers into a pixmap
pub struct RasterSink<'a, S: PageStore + ?Sized> {
    store: &'a S,
    pixmap: Pixmap,
    logical_size: Size,
    supersample: f32,
}

impl<'a, S: PageStore + ?Sized> RasterSink<'a, S> {
    pub fn new(store: &'a S, logical_size: Size, supersample: f32) -> Result<Self> {
        let pixmap = new_pixmap(logical_size, supersample)?;
        Ok(Self {
            store,
            pixmap,
            logical_size,
            supersample,
        })
    }

    fn base(&self) -> Transform {
        Transform::from_scale(self.supersample, self.supersample)
    }
}

impl<S: PageStore + ?Sized> LayerSink for RasterSink<'_, S> {
    type Output = RasterSurface;

    fn fill_background(&mut self, canvas: Rect, color: Rgba) {
        let base = self.base();
        fill_rect(&mut self.pixmap, canvas, color, base);
    }

    fn draw_page(&mut self, page_index: usize, geometry: &CanvasGeometry) -> Result<()> {
        let native = geometry.native_size;
        let (width, height) = pixel_size(native, self.supersample);

        let content = self
            .store
            .render_content(page_index, width, height)
            .ok_or(MarginError::MissingPageContent { page: page_index })?;

        // Content pixels -> native units -> canvas -> raster
        let to_native = Transform::from_scale(
            (native.width / content.width() as f64) as f32,
            (native.height / content.height() as f64) as f32,
        );
        let transform = self
            .base()
            .pre_concat(to_skia(geometry.display_transform()))
            .pre_concat(to_native);

        let paint = PixmapPaint {
            quality: FilterQuality::Bicubic,
            ..Default::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, content.as_ref(), &paint, transform, None);
        Ok(())
    }

    fn draw_strokes(&mut self, strokes: &StrokeCollection) {
        let base = self.base();
        for stroke in strokes {
            draw_stroke(&mut self.pixmap, &stroke.points, stroke.width, stroke.color, base);
        }
    }

    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Rgba) {
        let base = self.base();
        outline_rect(&mut self.pixmap, rect, width, color, base);
    }

    fn finish(self) -> Result<RasterSurface> {
        Ok(RasterSurface {
            pixmap: self.pixmap,
            logical_size: self.logical_size,
            supersample: self.supersample,
        })
    }
}

// =============================================================================
// N-up Sheets
// =============================================================================

/// Compose raster pages onto one sheet following `layout`.
///
/// Pages fill cells in order; surplus cells stay blank. Borders are drawn
/// around occupied cells only.
pub fn compose_sheet_raster(
    pages: &[&RasterSurface],
    layout: &GridLayout,
    supersample: f32,
) -> Result<RasterSurface> {
    let paper = layout.paper;
    let mut pixmap = new_pixmap(paper.size(), supersample)?;
    let base = Transform::from_scale(supersample, supersample)
        .pre_translate(-paper.x0 as f32, -paper.y0 as f32);

    fill_rect(&mut pixmap, paper, Rgba::WHITE, base);

    let paint = PixmapPaint {
        quality: FilterQuality::Bicubic,
        ..Default::default()
    };

    for (page, cell) in pages.iter().zip(&layout.cells) {
        let placement = place_in_cell(*cell, page.logical_size());
        if placement.scale <= 0.0 {
            continue;
        }

        let transform = base
            .pre_concat(to_skia(
                Affine::translate(placement.rect.origin().to_vec2())
                    * Affine::scale(placement.scale),
            ))
            .pre_scale(1.0 / page.supersample(), 1.0 / page.supersample());
        pixmap.draw_pixmap(0, 0, page.pixmap().as_ref(), &paint, transform, None);

        if let Some(width) = layout.border.line_width() {
            for rect in layout.border.rects(*cell) {
                outline_rect(&mut pixmap, rect, width, Rgba::BLACK, base);
            }
        }
    }

    Ok(RasterSurface {
        pixmap,
        logical_size: paper.size(),
        supersample,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn pixel_size(size: Size, supersample: f32) -> (u32, u32) {
    let scale = supersample as f64;
    (
        (size.width * scale).ceil().max(1.0) as u32,
        (size.height * scale).ceil().max(1.0) as u32,
    )
}

fn new_pixmap(size: Size, supersample: f32) -> Result<Pixmap> {
    let (width, height) = pixel_size(size, supersample);
    Pixmap::new(width, height).ok_or_else(|| {
        MarginError::InvalidGeometry(format!(
            "cannot allocate a {}x{} raster ({}x{} at {}x)",
            width, height, size.width, size.height, supersample
        ))
    })
}

fn to_skia(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn solid_paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn fill_rect(pixmap: &mut Pixmap, rect: Rect, color: Rgba, transform: Transform) {
    let Some(rect) = skia_rect(rect) else {
        return;
    };
    pixmap.fill_rect(rect, &solid_paint(color), transform, None);
}

fn outline_rect(pixmap: &mut Pixmap, rect: Rect, width: f64, color: Rgba, transform: Transform) {
    let Some(rect) = skia_rect(rect) else {
        return;
    };
    let path = PathBuilder::from_rect(rect);
    let stroke = Stroke {
        width: width as f32,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &solid_paint(color), &stroke, transform, None);
}

fn draw_stroke(
    pixmap: &mut Pixmap,
    points: &[kurbo::Point],
    width: f64,
    color: Rgba,
    transform: Transform,
) {
    let paint = solid_paint(color);

    match points {
        [] => {}
        [dot] => {
            let radius = (width / 2.0).max(0.0) as f32;
            if let Some(path) = PathBuilder::from_circle(dot.x as f32, dot.y as f32, radius) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
            }
        }
        [first, rest @ ..] => {
            let mut builder = PathBuilder::new();
            builder.move_to(first.x as f32, first.y as f32);
            for p in rest {
                builder.line_to(p.x as f32, p.y as f32);
            }
            let Some(path) = builder.finish() else {
                return;
            };
            let stroke = Stroke {
                width: width as f32,
                line_cap: LineCap::Round,
                line_join: LineJoin::Round,
                ..Default::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
    }
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BorderStyle, create_grid_layout};

    fn solid_surface(size: Size, color: Rgba) -> RasterSurface {
        let mut pixmap = new_pixmap(size, 1.0).unwrap();
        pixmap.fill(color.to_skia());
        RasterSurface {
            pixmap,
            logical_size: size,
            supersample: 1.0,
        }
    }

    #[test]
    fn test_pixel_size_rounds_up() {
        assert_eq!(pixel_size(Size::new(612.0, 792.0), 2.0), (1224, 1584));
        assert_eq!(pixel_size(Size::new(10.2, 0.0), 1.0), (11, 1));
    }

    #[test]
    fn test_rgb_bytes_over_white() {
        let mut surface = solid_surface(Size::new(2.0, 1.0), Rgba::new(0, 0, 0, 0));
        surface.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        assert_eq!(surface.to_rgb_bytes(), vec![255; 6]);
    }

    #[test]
    fn test_sheet_places_pages_in_cells() {
        let layout = create_grid_layout(
            Rect::new(0.0, 0.0, 612.0, 792.0),
            2,
            BorderStyle::SingleThin,
        );
        let red = solid_surface(Size::new(100.0, 100.0), Rgba::new(255, 0, 0, 255));
        let sheet = compose_sheet_raster(&[&red], &layout, 1.0).unwrap();

        assert_eq!((sheet.width(), sheet.height()), (612, 792));

        // Center of the first cell is red, center of the empty second cell white
        let first = layout.cells[0].center();
        let second = layout.cells[1].center();
        let px = sheet.pixmap().pixel(first.x as u32, first.y as u32).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (255, 0, 0));
        let px = sheet.pixmap().pixel(second.x as u32, second.y as u32).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (255, 255, 255));
    }

    #[test]
    fn test_sink_background_and_outline_follow_supersample() {
        let store = crate::store::ImagePageStore::new(Vec::new());
        let mut sink = RasterSink::new(&store, Size::new(20.0, 10.0), 2.0).unwrap();
        sink.fill_background(Rect::new(0.0, 0.0, 20.0, 10.0), Rgba::WHITE);
        sink.stroke_rect(Rect::new(2.0, 2.0, 18.0, 8.0), 1.0, Rgba::BLACK);
        let surface = sink.finish().unwrap();

        assert_eq!((surface.width(), surface.height()), (40, 20));
        // Outline runs along logical x = 2, which is pixel column 4
        let edge = surface.pixmap().pixel(4, 10).unwrap();
        assert_eq!((edge.red(), edge.green(), edge.blue()), (0, 0, 0));
        let inside = surface.pixmap().pixel(20, 10).unwrap();
        assert_eq!((inside.red(), inside.green(), inside.blue()), (255, 255, 255));
    }
}
