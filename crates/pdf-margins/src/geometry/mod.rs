//! Canvas geometry and coordinate conversion
//!
//! This module handles all the geometric calculations for margin canvases:
//! - Placing a scaled page inside its canvas (anchor + scale)
//! - Splitting the remaining canvas into margin regions
//! - Converting points and ink between view, canvas and document space

mod canvas;
mod transform;

pub use canvas::*;
pub use transform::*;
