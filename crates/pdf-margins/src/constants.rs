//! Shared constants for margin compositing and N-up layout
//!
//! This module centralizes magic numbers and constants used throughout
//! the engine.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f64 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * POINTS_PER_MM
}

/// Convert points to millimeters
#[inline]
pub fn pt_to_mm(pt: f64) -> f64 {
    pt / POINTS_PER_MM
}

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f64 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f64 = 792.0;

/// Default page dimensions as tuple (width, height)
pub const DEFAULT_PAGE_DIMENSIONS: (f64, f64) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Margin Scale
// =============================================================================

/// Lowest scale the user may pick by default
pub const DEFAULT_MIN_SCALE: f64 = 0.10;

/// Highest scale the user may pick by default
pub const DEFAULT_MAX_SCALE: f64 = 1.0;

/// Hard floor for any configured scale bound
pub const ABSOLUTE_MIN_SCALE: f64 = 0.01;

/// Hard ceiling for any configured scale bound
pub const ABSOLUTE_MAX_SCALE: f64 = 1.0;

/// Scale given to a page when margins are first enabled
pub const DEFAULT_SCALE: f64 = 1.0;

// =============================================================================
// View Transform
// =============================================================================

/// Smallest zoom a view transform accepts; keeps view/canvas math finite
pub const MIN_ZOOM: f64 = 1e-3;

// =============================================================================
// Compositing
// =============================================================================

/// Width of the separator drawn around a shrunk page (logical units)
pub const FRAME_BORDER_WIDTH: f64 = 0.5;

/// Upper bound for the supersampling factor
pub const MAX_SUPERSAMPLE: f32 = 8.0;

/// Most pages placed on one N-up sheet
pub const MAX_PAGES_PER_SHEET: usize = 64;

// =============================================================================
// N-up Layout
// =============================================================================

/// Inset between the paper edge and the cell grid (points)
pub const SHEET_INSET: f64 = 18.0;

/// Gap between neighbouring cells (points)
pub const CELL_SPACING: f64 = 8.0;

/// Stroke width of hairline borders (points)
pub const HAIRLINE_WIDTH: f64 = 0.25;

/// Stroke width of thin borders (points)
pub const THIN_LINE_WIDTH: f64 = 0.75;

/// Inset of the inner rectangle of a double border (points)
pub const DOUBLE_BORDER_INSET: f64 = 2.0;
