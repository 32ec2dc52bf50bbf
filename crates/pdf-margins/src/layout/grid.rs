//! Grid layout calculation
//!
//! This module handles the geometric layout of the N-up grid on a sheet:
//! row/column selection and cell rectangles.

use kurbo::Rect;

use crate::constants::{CELL_SPACING, SHEET_INSET};

use super::{BorderStyle, GridLayout};

// =============================================================================
// Grid Dimensions
// =============================================================================

/// Rows and columns for a pages-per-sheet count.
///
/// Common counts use a fixed table; anything else gets
/// `rows = ceil(sqrt(n))`, `cols = ceil(n / rows)`. Zero is treated as one.
pub fn grid_dimensions(pages_per_sheet: usize) -> (usize, usize) {
    match pages_per_sheet.max(1) {
        1 => (1, 1),
        2 => (1, 2),
        4 => (2, 2),
        6 => (2, 3),
        8 => (2, 4),
        n => {
            let rows = (n as f64).sqrt().ceil() as usize;
            let cols = n.div_ceil(rows);
            (rows, cols)
        }
    }
}

// =============================================================================
// Grid Creation
// =============================================================================

/// Create the cell grid for `pages_per_sheet` pages on `paper`.
///
/// The paper is inset by a fixed outer margin, then tiled into equal cells
/// separated by a fixed spacing. Cells are ordered row-major, top row first.
pub fn create_grid_layout(paper: Rect, pages_per_sheet: usize, border: BorderStyle) -> GridLayout {
    let pages_per_sheet = pages_per_sheet.max(1);
    let (rows, cols) = grid_dimensions(pages_per_sheet);

    let inset = paper.inset(-SHEET_INSET);
    let inset_width = inset.width().max(0.0);
    let inset_height = inset.height().max(0.0);

    let cell_width = ((inset_width - CELL_SPACING * (cols - 1) as f64) / cols as f64).max(0.0);
    let cell_height = ((inset_height - CELL_SPACING * (rows - 1) as f64) / rows as f64).max(0.0);

    let cells = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .map(|(row, col)| {
            let x = inset.x0 + col as f64 * (cell_width + CELL_SPACING);
            let y = inset.y0 + row as f64 * (cell_height + CELL_SPACING);
            Rect::new(x, y, x + cell_width, y + cell_height)
        })
        .collect();

    GridLayout {
        rows,
        cols,
        pages_per_sheet,
        cells,
        paper,
        border,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn letter() -> Rect {
        Rect::new(0.0, 0.0, 612.0, 792.0)
    }

    #[test]
    fn test_fixed_table() {
        assert_eq!(grid_dimensions(1), (1, 1));
        assert_eq!(grid_dimensions(2), (1, 2));
        assert_eq!(grid_dimensions(4), (2, 2));
        assert_eq!(grid_dimensions(6), (2, 3));
        assert_eq!(grid_dimensions(8), (2, 4));
    }

    #[test]
    fn test_fallback_dimensions() {
        assert_eq!(grid_dimensions(3), (2, 2));
        assert_eq!(grid_dimensions(5), (3, 2));
        assert_eq!(grid_dimensions(9), (3, 3));
        assert_eq!(grid_dimensions(16), (4, 4));
    }

    #[test]
    fn test_zero_pages_per_sheet_is_one() {
        assert_eq!(grid_dimensions(0), (1, 1));
        let grid = create_grid_layout(letter(), 0, BorderStyle::None);
        assert_eq!(grid.pages_per_sheet, 1);
        assert_eq!(grid.cell_count(), 1);
    }

    #[test]
    fn test_four_up_letter() {
        let grid = create_grid_layout(letter(), 4, BorderStyle::None);

        assert_eq!(grid.rows, 2);
        assert_eq!(grid.cols, 2);
        assert_eq!(grid.cell_width(), 284.0);
        assert_eq!(grid.cell_height(), 374.0);

        // Top-left then top-right, then the second row
        assert_eq!(grid.cells[0], Rect::new(18.0, 18.0, 302.0, 392.0));
        assert_eq!(grid.cells[1].x0, 310.0);
        assert_eq!(grid.cells[2].y0, 400.0);
        assert_eq!(grid.cells[3].x1, 594.0);
        assert_eq!(grid.cells[3].y1, 774.0);
    }

    #[test]
    fn test_tiny_paper_never_goes_negative() {
        let grid = create_grid_layout(Rect::new(0.0, 0.0, 20.0, 20.0), 8, BorderStyle::None);
        assert!(grid.cells.iter().all(|c| c.width() >= 0.0 && c.height() >= 0.0));
    }
}
