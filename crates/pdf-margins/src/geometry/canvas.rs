//! Canvas geometry resolution
//!
//! Places a (possibly shrunk) page inside a logical canvas according to a
//! [`MarginConfig`], and splits the rest of the canvas into margin regions.

use kurbo::{Affine, Point, Rect, Size};

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::options::MarginConfig;
use crate::types::{MarginError, Result};

/// Resolved placement of a page inside its canvas
///
/// Derived on demand from a margin configuration and a page size; never
/// cached across configuration changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasGeometry {
    /// Size of the logical drawing surface
    pub canvas_size: Size,
    /// Effective (rotation-aware) size of the source page
    pub native_size: Size,
    /// Scale the page is drawn at
    pub scale: f64,
    /// `native_size * scale`
    pub scaled_page_size: Size,
    /// Top-left corner of the placed page
    pub page_offset: Point,
    /// Rectangle the page occupies on the canvas
    pub page_frame: Rect,
}

/// The four canvas regions around the page frame
///
/// Together with the page frame they tile the canvas exactly: top and bottom
/// span the full canvas width, left and right span the frame's height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginRegions {
    pub top: Rect,
    pub bottom: Rect,
    pub left: Rect,
    pub right: Rect,
}

impl MarginRegions {
    /// Regions in a fixed order: top, bottom, left, right
    pub fn iter(&self) -> impl Iterator<Item = (MarginSide, Rect)> {
        [
            (MarginSide::Top, self.top),
            (MarginSide::Bottom, self.bottom),
            (MarginSide::Left, self.left),
            (MarginSide::Right, self.right),
        ]
        .into_iter()
    }
}

/// Which margin region a point falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// Resolve the page placement for a page of `native_size` inside a canvas.
///
/// `canvas_size` defaults to the native size so that no page area is lost.
/// Invalid sizes never propagate: a non-positive native size falls back to
/// US Letter and a non-positive canvas size falls back to the native size.
/// If a custom canvas is too small for the configured scale, the scale is
/// reduced until the page fits.
pub fn resolve(native_size: Size, config: &MarginConfig, canvas_size: Option<Size>) -> CanvasGeometry {
    let native_size = validate_size(native_size).unwrap_or_else(|e| {
        log::warn!("{e}; using default page size");
        Size::new(DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1)
    });

    let canvas_size = match canvas_size.map(validate_size) {
        Some(Ok(size)) => size,
        Some(Err(e)) => {
            log::warn!("{e}; using page size for the canvas");
            native_size
        }
        None => native_size,
    };

    let scale = config
        .effective_scale()
        .min(canvas_size.width / native_size.width)
        .min(canvas_size.height / native_size.height);

    let scaled_page_size = Size::new(native_size.width * scale, native_size.height * scale);

    let page_offset = Point::new(
        config
            .anchor
            .column()
            .offset(canvas_size.width, scaled_page_size.width)
            .max(0.0),
        config
            .anchor
            .row()
            .offset(canvas_size.height, scaled_page_size.height)
            .max(0.0),
    );

    CanvasGeometry {
        canvas_size,
        native_size,
        scale,
        scaled_page_size,
        page_offset,
        page_frame: Rect::from_origin_size(page_offset, scaled_page_size),
    }
}

/// Reject sizes that would poison downstream math
pub fn validate_size(size: Size) -> Result<Size> {
    if size.width.is_finite() && size.height.is_finite() && size.width > 0.0 && size.height > 0.0
    {
        Ok(size)
    } else {
        Err(MarginError::InvalidGeometry(format!(
            "size must be positive and finite, got {}x{}",
            size.width, size.height
        )))
    }
}

impl CanvasGeometry {
    /// The whole canvas as a rectangle at the origin
    pub fn canvas_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ORIGIN, self.canvas_size)
    }

    /// Whether the page is drawn smaller than its native size
    pub fn is_shrunk(&self) -> bool {
        self.scale < 1.0
    }

    /// Canvas area outside the page frame, as four disjoint rectangles
    pub fn margin_regions(&self) -> MarginRegions {
        let canvas = self.canvas_rect();
        let frame = self.page_frame;

        MarginRegions {
            top: Rect::new(canvas.x0, canvas.y0, canvas.x1, frame.y0),
            bottom: Rect::new(canvas.x0, frame.y1, canvas.x1, canvas.y1),
            left: Rect::new(canvas.x0, frame.y0, frame.x0, frame.y1),
            right: Rect::new(frame.x1, frame.y0, canvas.x1, frame.y1),
        }
    }

    /// Transform from native page coordinates to canvas coordinates:
    /// translate to the frame origin, then scale.
    ///
    /// Used both to draw the page content and to place document ink.
    pub fn display_transform(&self) -> Affine {
        Affine::translate(self.page_offset.to_vec2()) * Affine::scale(self.scale)
    }
}
