use kurbo::Size;
use thiserror::Error;

use crate::constants::mm_to_pt;

#[derive(Error, Debug)]
pub enum MarginError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Page {page} content is not available")]
    MissingPageContent { page: usize },
    #[error("Page frame has zero extent")]
    DegenerateFrame,
    #[error("Export was cancelled")]
    CancelledExport,
    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
    #[error("No pages to export")]
    NoPages,
}

impl MarginError {
    /// Whether the error only affects a single page and can be recovered
    /// from by substituting or skipping that page.
    pub fn is_page_local(&self) -> bool {
        !matches!(
            self,
            MarginError::CancelledExport | MarginError::Config(_) | MarginError::NoPages
        )
    }
}

pub type Result<T> = std::result::Result<T, MarginError>;

/// Position along one axis of the anchor grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorAxis {
    Start,
    Center,
    End,
}

impl AnchorAxis {
    /// Offset that places an extent of `inner` inside `outer` at this position.
    pub fn offset(self, outer: f64, inner: f64) -> f64 {
        match self {
            AnchorAxis::Start => 0.0,
            AnchorAxis::Center => (outer - inner) / 2.0,
            AnchorAxis::End => outer - inner,
        }
    }
}

/// Where the scaled page sits inside the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Anchor {
    pub const ALL: [Anchor; 9] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::CenterLeft,
        Anchor::Center,
        Anchor::CenterRight,
        Anchor::BottomLeft,
        Anchor::BottomCenter,
        Anchor::BottomRight,
    ];

    /// Horizontal position (left / center / right)
    pub fn column(self) -> AnchorAxis {
        match self {
            Anchor::TopLeft | Anchor::CenterLeft | Anchor::BottomLeft => AnchorAxis::Start,
            Anchor::TopCenter | Anchor::Center | Anchor::BottomCenter => AnchorAxis::Center,
            Anchor::TopRight | Anchor::CenterRight | Anchor::BottomRight => AnchorAxis::End,
        }
    }

    /// Vertical position (top / center / bottom)
    pub fn row(self) -> AnchorAxis {
        match self {
            Anchor::TopLeft | Anchor::TopCenter | Anchor::TopRight => AnchorAxis::Start,
            Anchor::CenterLeft | Anchor::Center | Anchor::CenterRight => AnchorAxis::Center,
            Anchor::BottomLeft | Anchor::BottomCenter | Anchor::BottomRight => AnchorAxis::End,
        }
    }
}

/// Rotation a source page declares for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageRotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Clockwise270,
}

impl PageRotation {
    /// Build from a declared degree value. Values are normalized modulo 360;
    /// anything that is not a right angle is treated as unrotated.
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => PageRotation::Clockwise90,
            180 => PageRotation::Clockwise180,
            270 => PageRotation::Clockwise270,
            0 => PageRotation::None,
            other => {
                log::warn!("Ignoring non-right-angle page rotation of {other} degrees");
                PageRotation::None
            }
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            PageRotation::None => 0,
            PageRotation::Clockwise90 => 90,
            PageRotation::Clockwise180 => 180,
            PageRotation::Clockwise270 => 270,
        }
    }

    /// Quarter turns swap the width and height of the displayed page
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, PageRotation::Clockwise90 | PageRotation::Clockwise270)
    }

    /// Size of the rotated bounding box for a page of the given raw size
    pub fn apply_to(self, size: Size) -> Size {
        if self.swaps_dimensions() {
            Size::new(size.height, size.width)
        } else {
            size
        }
    }
}

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// Portrait: height > width (default for most paper sizes)
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    #[default]
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Paper size in points with orientation applied
    pub fn size_pt(self, orientation: Orientation) -> Size {
        let (w, h) = self.dimensions_with_orientation(orientation);
        Size::new(mm_to_pt(w as f64), mm_to_pt(h as f64))
    }
}

/// Straight-alpha RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// Components as PDF colour operands (0.0..=1.0)
    pub(crate) fn pdf_components(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::BLACK
    }
}

/// What a batch export writes for each page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExportMode {
    /// Original pages, copied without compositing
    PageOnly,
    /// The margin canvas with the page and margin ink, without document ink
    MarginOnly,
    /// Every layer: page, document ink and margin ink
    #[default]
    Both,
}

/// What happens to a page whose composite fails during a batch export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePolicy {
    /// Write the unmodified original page in its place
    #[default]
    SubstituteOriginal,
    /// Leave the page out of the output
    Skip,
}

/// Statistics about an export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportStatistics {
    /// Total number of source pages
    pub source_pages: usize,
    /// Number of N-up sheets (equal to output pages)
    pub sheets: usize,
    /// Output page count
    pub output_pages: usize,
    /// Grid cells left empty across all sheets
    pub blank_cells: usize,
}
