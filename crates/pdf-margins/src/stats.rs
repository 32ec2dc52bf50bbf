use crate::constants::MAX_PAGES_PER_SHEET;
use crate::export::{sheet_count, sheet_layout};
use crate::options::ExportOptions;
use crate::types::*;

/// Calculate statistics for exporting `page_count` pages, assuming every
/// page renders
pub fn calculate_statistics(page_count: usize, options: &ExportOptions) -> Result<ExportStatistics> {
    if page_count == 0 {
        return Err(MarginError::NoPages);
    }

    if options.pages_per_sheet > MAX_PAGES_PER_SHEET {
        return Err(MarginError::Config(format!(
            "Pages per sheet must be at most {}, got {}",
            MAX_PAGES_PER_SHEET, options.pages_per_sheet
        )));
    }

    let pages_per_sheet = options.effective_pages_per_sheet();
    let sheets = sheet_count(page_count, pages_per_sheet);
    // Grids can hold more cells than pages per sheet (3-up is 2x2)
    let blank_cells = sheets * sheet_layout(options).cell_count() - page_count;

    Ok(ExportStatistics {
        source_pages: page_count,
        sheets,
        output_pages: sheets,
        blank_cells,
    })
}
