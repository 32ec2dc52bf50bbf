//! Layout data types for N-up sheets

use kurbo::Rect;

use crate::constants::{DOUBLE_BORDER_INSET, HAIRLINE_WIDTH, THIN_LINE_WIDTH};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Border drawn around each cell of an N-up sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BorderStyle {
    #[default]
    None,
    SingleHairline,
    SingleThin,
    DoubleHairline,
    DoubleThin,
}

impl BorderStyle {
    /// Stroke width in points, `None` when no border is drawn
    pub fn line_width(self) -> Option<f64> {
        match self {
            BorderStyle::None => None,
            BorderStyle::SingleHairline | BorderStyle::DoubleHairline => Some(HAIRLINE_WIDTH),
            BorderStyle::SingleThin | BorderStyle::DoubleThin => Some(THIN_LINE_WIDTH),
        }
    }

    pub fn is_double(self) -> bool {
        matches!(self, BorderStyle::DoubleHairline | BorderStyle::DoubleThin)
    }

    /// Rectangles to stroke for a cell: the cell itself, plus an inner
    /// rectangle for double borders.
    pub fn rects(self, cell: Rect) -> Vec<Rect> {
        match self {
            BorderStyle::None => Vec::new(),
            _ if self.is_double() => {
                let inner = cell.inset(-DOUBLE_BORDER_INSET);
                if inner.width() > 0.0 && inner.height() > 0.0 {
                    vec![cell, inner]
                } else {
                    vec![cell]
                }
            }
            _ => vec![cell],
        }
    }
}

/// Cell grid for one N-up sheet
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Number of rows in the grid
    pub rows: usize,
    /// Number of columns in the grid
    pub cols: usize,
    /// Source pages consumed per sheet
    pub pages_per_sheet: usize,
    /// Cell rectangles, row-major with the top row first
    pub cells: Vec<Rect>,
    /// Paper rectangle the grid was laid out on
    pub paper: Rect,
    /// Border drawn around each occupied cell
    pub border: BorderStyle,
}

impl GridLayout {
    /// Total number of cells in the grid
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Width of every cell
    pub fn cell_width(&self) -> f64 {
        self.cells.first().map(Rect::width).unwrap_or(0.0)
    }

    /// Height of every cell
    pub fn cell_height(&self) -> f64 {
        self.cells.first().map(Rect::height).unwrap_or(0.0)
    }
}

/// A source page fitted into a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Where the page lands on the sheet
    pub rect: Rect,
    /// Uniform scale applied to the page
    pub scale: f64,
}
