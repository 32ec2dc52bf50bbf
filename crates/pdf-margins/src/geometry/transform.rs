//! Coordinate conversion between view, canvas and document space
//!
//! - View space: what the user sees, affected by zoom and pan.
//! - Canvas space: the stable logical frame (y-down, origin top-left).
//! - Document space: normalized `0..1` coordinates relative to the page frame.

use kurbo::{Affine, Point, Rect, Vec2};

use super::canvas::{CanvasGeometry, MarginSide};
use crate::constants::MIN_ZOOM;
use crate::ink::StrokeCollection;
use crate::types::{MarginError, Result};

/// Zoom and pan of a view onto the canvas
///
/// `canvas = (view + offset) / zoom`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f64,
    pub offset: Vec2,
}

impl ViewTransform {
    /// Build a view transform; zoom is kept strictly positive.
    pub fn new(zoom: f64, offset: Vec2) -> Self {
        let zoom = if zoom.is_finite() { zoom.max(MIN_ZOOM) } else { 1.0 };
        Self { zoom, offset }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Largest zoom at which `canvas` fits inside `view`, centered.
    ///
    /// `view` is given in the view's own coordinates.
    pub fn fit_to_view(canvas: Rect, view: Rect) -> Self {
        if canvas.width() <= 0.0 || canvas.height() <= 0.0 {
            return Self::default();
        }

        let zoom = (view.width() / canvas.width())
            .min(view.height() / canvas.height())
            .max(MIN_ZOOM);

        // Pick the offset so that the canvas center lands on the view center:
        // view = canvas * zoom - offset
        let offset = canvas.center().to_vec2() * zoom - view.center().to_vec2();
        Self::new(zoom, offset)
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

/// Classification of a canvas point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Inside the placed page
    Page,
    /// Inside one of the margin rectangles
    Margin(MarginSide),
    /// Outside the canvas
    Outside,
}

/// Converts points and ink between the three coordinate spaces of one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransformer {
    geometry: CanvasGeometry,
    view_rect: Rect,
    view: ViewTransform,
}

impl CoordinateTransformer {
    pub fn new(geometry: CanvasGeometry, view_rect: Rect, view: ViewTransform) -> Self {
        Self {
            geometry,
            view_rect,
            view,
        }
    }

    /// Transformer whose view shows the whole canvas centered in `view_rect`
    pub fn fitted(geometry: CanvasGeometry, view_rect: Rect) -> Self {
        let view = ViewTransform::fit_to_view(geometry.canvas_rect(), view_rect);
        Self::new(geometry, view_rect, view)
    }

    pub fn geometry(&self) -> &CanvasGeometry {
        &self.geometry
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn view_rect(&self) -> Rect {
        self.view_rect
    }

    /// Replace zoom/pan, e.g. after a pinch gesture
    pub fn set_view(&mut self, view: ViewTransform) {
        self.view = view;
    }

    pub fn view_to_canvas(&self, p: Point) -> Point {
        ((p.to_vec2() + self.view.offset) / self.view.zoom).to_point()
    }

    pub fn canvas_to_view(&self, p: Point) -> Point {
        (p.to_vec2() * self.view.zoom - self.view.offset).to_point()
    }

    /// Canvas rectangle currently visible through the view rectangle
    pub fn visible_canvas_rect(&self) -> Rect {
        let a = self.view_to_canvas(Point::new(self.view_rect.x0, self.view_rect.y0));
        let b = self.view_to_canvas(Point::new(self.view_rect.x1, self.view_rect.y1));
        Rect::from_points(a, b)
    }

    /// Which part of the canvas a point falls in. The page frame wins over
    /// margins on shared edges; empty margin rectangles never match.
    pub fn region(&self, canvas_point: Point) -> Region {
        if contains_inclusive(self.geometry.page_frame, canvas_point) {
            return Region::Page;
        }

        self.geometry
            .margin_regions()
            .iter()
            .find(|(_, rect)| rect.area() > 0.0 && contains_inclusive(*rect, canvas_point))
            .map(|(side, _)| Region::Margin(side))
            .unwrap_or(Region::Outside)
    }

    /// Keep a view point on the drawable canvas. Points inside the page or
    /// a margin are returned unchanged; others snap to the nearest canvas edge.
    pub fn clamp_to_drawable(&self, view_point: Point) -> Point {
        let canvas_point = self.view_to_canvas(view_point);
        if self.region(canvas_point) != Region::Outside {
            return view_point;
        }

        let canvas = self.geometry.canvas_rect();
        let clamped = Point::new(
            canvas_point.x.clamp(canvas.x0, canvas.x1),
            canvas_point.y.clamp(canvas.y0, canvas.y1),
        );
        self.canvas_to_view(clamped)
    }

    /// Canvas point to document space
    pub fn canvas_to_document(&self, p: Point) -> Point {
        normalize_point(p, self.geometry.page_frame)
    }

    /// Document-space point to canvas space
    pub fn document_to_canvas(&self, p: Point) -> Point {
        denormalize_point(p, self.geometry.page_frame)
    }

    /// Canvas-space ink to document space, against this page's frame
    pub fn normalize(&self, strokes: &StrokeCollection) -> StrokeCollection {
        normalize(strokes, self.geometry.page_frame)
    }

    /// Document-space ink to canvas space, against this page's frame
    pub fn denormalize(&self, strokes: &StrokeCollection) -> StrokeCollection {
        denormalize(strokes, self.geometry.page_frame)
    }

    /// Native page coordinates to canvas coordinates
    pub fn display_transform(&self) -> Affine {
        self.geometry.display_transform()
    }
}

/// Map canvas-space strokes into document space relative to `frame`.
///
/// A zero-extent frame leaves the strokes unchanged.
pub fn normalize(strokes: &StrokeCollection, frame: Rect) -> StrokeCollection {
    if let Err(e) = check_frame(frame) {
        log::warn!("{e}; leaving ink unnormalized");
        return strokes.clone();
    }

    strokes.map_points(|p| normalize_point(p, frame), |w| w / frame.width())
}

/// Map document-space strokes back into canvas space relative to `frame`.
///
/// A zero-extent frame leaves the strokes unchanged.
pub fn denormalize(strokes: &StrokeCollection, frame: Rect) -> StrokeCollection {
    if let Err(e) = check_frame(frame) {
        log::warn!("{e}; leaving ink undenormalized");
        return strokes.clone();
    }

    strokes.map_points(|p| denormalize_point(p, frame), |w| w * frame.width())
}

fn check_frame(frame: Rect) -> Result<()> {
    if frame.width() == 0.0 || frame.height() == 0.0 {
        Err(MarginError::DegenerateFrame)
    } else {
        Ok(())
    }
}

fn normalize_point(p: Point, frame: Rect) -> Point {
    if check_frame(frame).is_err() {
        return p;
    }
    Point::new(
        (p.x - frame.x0) / frame.width(),
        (p.y - frame.y0) / frame.height(),
    )
}

fn denormalize_point(p: Point, frame: Rect) -> Point {
    if check_frame(frame).is_err() {
        return p;
    }
    Point::new(
        p.x * frame.width() + frame.x0,
        p.y * frame.height() + frame.y0,
    )
}

fn contains_inclusive(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::resolve;
    use crate::ink::InkStroke;
    use crate::options::MarginConfig;
    use crate::types::{Anchor, Rgba};
    use kurbo::Size;

    fn transformer(anchor: Anchor, scale: f64) -> CoordinateTransformer {
        let geometry = resolve(
            Size::new(612.0, 792.0),
            &MarginConfig::new(anchor, scale),
            None,
        );
        CoordinateTransformer::new(
            geometry,
            Rect::new(0.0, 0.0, 800.0, 600.0),
            ViewTransform::new(1.5, Vec2::new(20.0, -35.0)),
        )
    }

    #[test]
    fn test_view_round_trip() {
        let t = transformer(Anchor::Center, 0.8);
        for p in [
            Point::new(0.0, 0.0),
            Point::new(123.4, 567.8),
            Point::new(-40.0, 1e4),
        ] {
            let back = t.canvas_to_view(t.view_to_canvas(p));
            assert!((back - p).hypot() < 1e-9, "{p:?} -> {back:?}");
        }
    }

    #[test]
    fn test_zero_zoom_is_clamped() {
        let view = ViewTransform::new(0.0, Vec2::ZERO);
        assert!(view.zoom() > 0.0);
    }

    #[test]
    fn test_region_prefers_page_on_shared_edge() {
        let t = transformer(Anchor::Center, 0.8);
        let frame = t.geometry().page_frame;
        assert_eq!(t.region(Point::new(frame.x0, frame.y0)), Region::Page);
        assert_eq!(t.region(frame.center()), Region::Page);
        assert_eq!(
            t.region(Point::new(10.0, 10.0)),
            Region::Margin(MarginSide::Top)
        );
        assert_eq!(
            t.region(Point::new(10.0, 400.0)),
            Region::Margin(MarginSide::Left)
        );
        assert_eq!(
            t.region(Point::new(600.0, 400.0)),
            Region::Margin(MarginSide::Right)
        );
        assert_eq!(
            t.region(Point::new(300.0, 790.0)),
            Region::Margin(MarginSide::Bottom)
        );
        assert_eq!(t.region(Point::new(-1.0, 400.0)), Region::Outside);
    }

    #[test]
    fn test_clamp_to_drawable() {
        let t = transformer(Anchor::TopLeft, 0.5);

        let inside = t.canvas_to_view(Point::new(500.0, 100.0));
        assert_eq!(t.clamp_to_drawable(inside), inside);

        let outside = t.canvas_to_view(Point::new(700.0, -50.0));
        let clamped = t.view_to_canvas(t.clamp_to_drawable(outside));
        assert!((clamped - Point::new(612.0, 0.0)).hypot() < 1e-9);
    }

    #[test]
    fn test_normalize_round_trip_and_width() {
        let frame = Rect::new(61.2, 79.2, 550.8, 712.8);
        let strokes: StrokeCollection = vec![InkStroke::new(
            vec![Point::new(61.2, 79.2), Point::new(300.0, 400.0)],
            4.896,
            Rgba::BLACK,
        )]
        .into();

        let normalized = normalize(&strokes, frame);
        let first = &normalized.iter().next().unwrap();
        assert!((first.points[0] - Point::ORIGIN).hypot() < 1e-12);
        assert!((first.width - 0.01).abs() < 1e-12);

        let back = denormalize(&normalized, frame);
        for (a, b) in back.iter().zip(strokes.iter()) {
            for (pa, pb) in a.points.iter().zip(&b.points) {
                assert!((*pa - *pb).hypot() < 1e-6);
            }
            assert!((a.width - b.width).abs() < 1e-6);
        }
    }

    #[test]
    fn test_degenerate_frame_is_identity() {
        let strokes: StrokeCollection =
            vec![InkStroke::new(vec![Point::new(5.0, 6.0)], 1.0, Rgba::BLACK)].into();
        let frame = Rect::new(10.0, 10.0, 10.0, 50.0);
        assert_eq!(normalize(&strokes, frame), strokes);
        assert_eq!(denormalize(&strokes, frame), strokes);
    }

    #[test]
    fn test_visible_rect_follows_zoom_and_pan() {
        let geometry = resolve(Size::new(612.0, 792.0), &MarginConfig::default(), None);
        let t = CoordinateTransformer::new(
            geometry,
            Rect::new(0.0, 0.0, 200.0, 100.0),
            ViewTransform::new(2.0, Vec2::new(50.0, 10.0)),
        );
        assert_eq!(t.visible_canvas_rect(), Rect::new(25.0, 5.0, 125.0, 55.0));
    }

    #[test]
    fn test_fit_to_view_centers_canvas() {
        let canvas = Rect::new(0.0, 0.0, 612.0, 792.0);
        let view_rect = Rect::new(0.0, 0.0, 400.0, 400.0);
        let view = ViewTransform::fit_to_view(canvas, view_rect);
        let geometry = resolve(
            Size::new(612.0, 792.0),
            &MarginConfig::default(),
            None,
        );
        let t = CoordinateTransformer::new(geometry, view_rect, view);

        let center = t.canvas_to_view(canvas.center());
        assert!((center - view_rect.center()).hypot() < 1e-9);
        assert!((view.zoom() - 400.0 / 792.0).abs() < 1e-12);
    }
}
