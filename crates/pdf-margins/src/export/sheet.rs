//! N-up sheet pagination

use kurbo::Rect;

use crate::layout::{GridLayout, create_grid_layout};
use crate::options::ExportOptions;
use crate::render::{RasterSurface, compose_sheet_raster};
use crate::types::Result;

/// Paper rectangle for `options`, origin at the top-left
pub fn paper_rect(options: &ExportOptions) -> Rect {
    let size = options.paper.size_pt(options.orientation);
    Rect::from_origin_size((0.0, 0.0), size)
}

/// Grid layout every sheet of an export uses
pub fn sheet_layout(options: &ExportOptions) -> GridLayout {
    create_grid_layout(
        paper_rect(options),
        options.effective_pages_per_sheet(),
        options.border,
    )
}

/// Number of sheets needed for `page_count` pages
pub fn sheet_count(page_count: usize, pages_per_sheet: usize) -> usize {
    page_count.div_ceil(pages_per_sheet.max(1))
}

/// Compose raster pages onto as many sheets as needed, in page order
pub fn compose_sheets(pages: &[RasterSurface], options: &ExportOptions) -> Result<Vec<RasterSurface>> {
    let layout = sheet_layout(options);
    pages
        .chunks(layout.pages_per_sheet)
        .map(|chunk| {
            let refs: Vec<&RasterSurface> = chunk.iter().collect();
            compose_sheet_raster(&refs, &layout, options.composite.supersample)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_count() {
        assert_eq!(sheet_count(0, 4), 0);
        assert_eq!(sheet_count(5, 4), 2);
        assert_eq!(sheet_count(8, 4), 2);
        assert_eq!(sheet_count(3, 0), 3);
    }

    #[test]
    fn test_compose_sheets_paginates() {
        use crate::render::{LayerSink, RasterSink};
        use crate::store::ImagePageStore;
        use crate::types::Rgba;

        let store = ImagePageStore::default();
        let page = |color| {
            let mut sink = RasterSink::new(&store, kurbo::Size::new(100.0, 140.0), 1.0).unwrap();
            sink.fill_background(Rect::new(0.0, 0.0, 100.0, 140.0), color);
            sink.finish().unwrap()
        };
        let pages: Vec<RasterSurface> = (0..5).map(|_| page(Rgba::BLACK)).collect();
        let options = ExportOptions {
            pages_per_sheet: 2,
            ..Default::default()
        };

        let sheets = compose_sheets(&pages, &options).unwrap();
        assert_eq!(sheets.len(), 3);
        assert_eq!(sheets[0].logical_size(), paper_rect(&options).size());
    }

    #[test]
    fn test_landscape_paper_rect() {
        let options = ExportOptions {
            orientation: crate::types::Orientation::Landscape,
            ..Default::default()
        };
        let paper = paper_rect(&options);
        assert!(paper.width() > paper.height());
        assert_eq!(paper.origin(), kurbo::Point::ORIGIN);
    }
}
