//! Layout calculation modules for N-up sheets
//!
//! This module handles all the geometric calculations for placing several
//! logical pages on one physical sheet:
//! - Grid layout (row/column counts, cell rectangles)
//! - Content placement (aspect-preserving fit, centering)
//! - Cell border styles

mod grid;
mod placement;
mod types;

pub use grid::*;
pub use placement::*;
pub use types::*;
