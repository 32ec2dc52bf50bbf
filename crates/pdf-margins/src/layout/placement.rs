//! Fitting source pages into grid cells

use kurbo::{Rect, Size};

use super::Placement;

/// Fit a page of `page_size` into `cell`, preserving aspect ratio and
/// centering it. A degenerate page collapses to the cell center.
pub fn place_in_cell(cell: Rect, page_size: Size) -> Placement {
    let scale = calculate_fit_scale(page_size, cell.size());

    let scaled = Size::new(page_size.width * scale, page_size.height * scale);
    let center = cell.center();

    Placement {
        rect: Rect::from_center_size(center, scaled),
        scale,
    }
}

/// Uniform scale that fits `source` inside `target`.
fn calculate_fit_scale(source: Size, target: Size) -> f64 {
    if source.width <= 0.0 || source.height <= 0.0 {
        return 0.0;
    }
    let scale_w = target.width / source.width;
    let scale_h = target.height / source.height;
    scale_w.min(scale_h).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_limited_fit() {
        let cell = Rect::new(18.0, 18.0, 302.0, 392.0);
        let placement = place_in_cell(cell, Size::new(792.0, 612.0));

        assert!((placement.scale - 284.0 / 792.0).abs() < 1e-12);
        assert!((placement.rect.width() - 284.0).abs() < 1e-9);
        assert!((placement.rect.center().y - cell.center().y).abs() < 1e-9);
    }

    #[test]
    fn test_height_limited_fit_is_centered() {
        let cell = Rect::new(0.0, 0.0, 400.0, 400.0);
        let placement = place_in_cell(cell, Size::new(400.0, 800.0));

        assert!((placement.scale - 0.5).abs() < 1e-12);
        assert_eq!(placement.rect, Rect::new(100.0, 0.0, 300.0, 400.0));
    }

    #[test]
    fn test_degenerate_page() {
        let cell = Rect::new(0.0, 0.0, 100.0, 100.0);
        let placement = place_in_cell(cell, Size::new(0.0, 100.0));
        assert_eq!(placement.scale, 0.0);
        assert_eq!(placement.rect.center(), cell.center());
    }
}
