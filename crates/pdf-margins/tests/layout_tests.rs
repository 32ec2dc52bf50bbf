use kurbo::{Rect, Size};
use pdf_margins::constants::MAX_PAGES_PER_SHEET;
use pdf_margins::layout::*;

fn letter() -> Rect {
    Rect::new(0.0, 0.0, 612.0, 792.0)
}

#[test]
fn test_grid_table() {
    assert_eq!(grid_dimensions(1), (1, 1));
    assert_eq!(grid_dimensions(2), (1, 2));
    assert_eq!(grid_dimensions(4), (2, 2));
    assert_eq!(grid_dimensions(6), (2, 3));
    assert_eq!(grid_dimensions(8), (2, 4));
}

#[test]
fn test_grid_fallback_covers_count() {
    for n in [3, 5, 7, 9, 10, 12, 16, 17, 25] {
        let (rows, cols) = grid_dimensions(n);
        assert_eq!(rows, (n as f64).sqrt().ceil() as usize);
        assert!(rows * cols >= n, "{}x{} cannot hold {}", rows, cols, n);
    }
}

#[test]
fn test_grid_wastes_less_than_one_line() {
    for n in 1..=MAX_PAGES_PER_SHEET {
        let (rows, cols) = grid_dimensions(n);
        assert!(rows * cols >= n);
        assert!(
            rows * cols < n + rows.max(cols),
            "{}x{} wastes a full line for {}",
            rows,
            cols,
            n
        );

        let layout = create_grid_layout(letter(), n, BorderStyle::None);
        assert_eq!(layout.cell_count(), rows * cols);
    }
}

#[test]
fn test_zero_pages_per_sheet_is_one_up() {
    let layout = create_grid_layout(letter(), 0, BorderStyle::None);
    assert_eq!((layout.rows, layout.cols), (1, 1));
    assert_eq!(layout.cells.len(), 1);
}

#[test]
fn test_cells_respect_inset_and_spacing() {
    let layout = create_grid_layout(letter(), 4, BorderStyle::SingleThin);
    assert_eq!(layout.cells.len(), 4);

    // Row-major, top row first
    let first = layout.cells[0];
    let second = layout.cells[1];
    let third = layout.cells[2];
    assert_eq!(first.origin(), kurbo::Point::new(18.0, 18.0));
    assert!((second.x0 - first.x1 - 8.0).abs() < 1e-9);
    assert!((third.y0 - first.y1 - 8.0).abs() < 1e-9);
    assert!((first.width() - 284.0).abs() < 1e-9);
    assert!((first.height() - 374.0).abs() < 1e-9);

    let last = layout.cells[3];
    assert!((last.x1 - 594.0).abs() < 1e-9);
    assert!((last.y1 - 774.0).abs() < 1e-9);
}

#[test]
fn test_cells_never_overlap() {
    for n in 1..=12 {
        let layout = create_grid_layout(letter(), n, BorderStyle::None);
        for (i, a) in layout.cells.iter().enumerate() {
            for b in &layout.cells[i + 1..] {
                assert!(a.intersect(*b).area() <= 1e-9);
            }
        }
    }
}

#[test]
fn test_placement_fits_and_centers() {
    let cell = Rect::new(18.0, 18.0, 302.0, 392.0);
    let placement = place_in_cell(cell, Size::new(612.0, 792.0));

    assert!(placement.rect.width() <= cell.width() + 1e-9);
    assert!(placement.rect.height() <= cell.height() + 1e-9);
    assert!((placement.rect.center() - cell.center()).hypot() < 1e-9);
    assert!((placement.scale - (284.0 / 612.0)).abs() < 1e-9);
}

#[test]
fn test_border_styles() {
    assert_eq!(BorderStyle::None.line_width(), None);
    assert_eq!(BorderStyle::SingleHairline.line_width(), Some(0.25));
    assert_eq!(BorderStyle::DoubleThin.line_width(), Some(0.75));

    let cell = Rect::new(10.0, 10.0, 110.0, 210.0);
    assert!(BorderStyle::None.rects(cell).is_empty());
    assert_eq!(BorderStyle::SingleThin.rects(cell), vec![cell]);
    assert_eq!(BorderStyle::DoubleHairline.rects(cell).len(), 2);
}
