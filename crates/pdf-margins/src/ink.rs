//! Vector ink model
//!
//! Strokes are plain geometric payloads to the engine. Each page carries two
//! collections: document-anchored ink, stored normalized to the placed page
//! frame, and margin ink, stored directly in canvas coordinates.

use kurbo::{Point, Rect};

use crate::types::Rgba;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single freehand stroke
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InkStroke {
    pub points: Vec<Point>,
    pub width: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub color: Rgba,
}

impl InkStroke {
    pub fn new(points: Vec<Point>, width: f64, color: Rgba) -> Self {
        Self {
            points,
            width,
            color,
        }
    }

    /// Bounding box of the stroke's points, ignoring width
    pub fn bounds(&self) -> Option<Rect> {
        let mut points = self.points.iter();
        let first = points.next()?;
        Some(points.fold(Rect::from_points(*first, *first), |rect, p| {
            rect.union_pt(*p)
        }))
    }
}

/// Ordered sequence of strokes
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct StrokeCollection(Vec<InkStroke>);

impl StrokeCollection {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, stroke: InkStroke) {
        self.0.push(stroke);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InkStroke> {
        self.0.iter()
    }

    /// Union of all stroke bounds
    pub fn bounds(&self) -> Option<Rect> {
        self.0
            .iter()
            .filter_map(InkStroke::bounds)
            .reduce(|a, b| a.union(b))
    }

    /// Build a new collection by mapping every point and every width.
    /// The receiver is left untouched.
    pub fn map_points(
        &self,
        point: impl Fn(Point) -> Point,
        width: impl Fn(f64) -> f64,
    ) -> StrokeCollection {
        self.0
            .iter()
            .map(|stroke| InkStroke {
                points: stroke.points.iter().map(|p| point(*p)).collect(),
                width: width(stroke.width),
                color: stroke.color,
            })
            .collect()
    }
}

impl FromIterator<InkStroke> for StrokeCollection {
    fn from_iter<T: IntoIterator<Item = InkStroke>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<InkStroke>> for StrokeCollection {
    fn from(strokes: Vec<InkStroke>) -> Self {
        Self(strokes)
    }
}

impl<'a> IntoIterator for &'a StrokeCollection {
    type Item = &'a InkStroke;
    type IntoIter = std::slice::Iter<'a, InkStroke>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Both ink layers of one page
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageInk {
    /// Document-anchored ink, normalized to the page frame (0..1)
    pub document: StrokeCollection,
    /// Margin ink in canvas coordinates
    pub margin: StrokeCollection,
}

impl PageInk {
    pub fn is_empty(&self) -> bool {
        self.document.is_empty() && self.margin.is_empty()
    }
}

/// Ink and margin settings for a whole document, as stored on disk
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InkFile {
    pub pages: std::collections::BTreeMap<usize, InkFilePage>,
}

/// One page entry of an [`InkFile`]
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InkFilePage {
    pub margin_config: Option<crate::options::MarginConfig>,
    pub ink: PageInk,
}

#[cfg(feature = "serde")]
impl InkFile {
    /// Load an ink file from JSON
    pub async fn load(path: impl AsRef<std::path::Path>) -> crate::types::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            crate::types::MarginError::Config(format!("Failed to parse ink file: {}", e))
        })
    }

    /// Save an ink file as JSON
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> crate::types::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            crate::types::MarginError::Config(format!("Failed to serialize ink file: {}", e))
        })?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_cover_all_strokes() {
        let strokes: StrokeCollection = vec![
            InkStroke::new(vec![Point::new(1.0, 2.0), Point::new(5.0, 3.0)], 1.0, Rgba::BLACK),
            InkStroke::new(vec![Point::new(-2.0, 8.0)], 1.0, Rgba::BLACK),
        ]
        .into();

        let bounds = strokes.bounds().unwrap();
        assert_eq!(bounds, Rect::new(-2.0, 2.0, 5.0, 8.0));
    }

    #[test]
    fn test_empty_stroke_has_no_bounds() {
        let stroke = InkStroke::new(Vec::new(), 1.0, Rgba::BLACK);
        assert!(stroke.bounds().is_none());
        assert!(StrokeCollection::new().bounds().is_none());
    }

    #[test]
    fn test_map_points_leaves_input_untouched() {
        let original: StrokeCollection =
            vec![InkStroke::new(vec![Point::new(1.0, 1.0)], 2.0, Rgba::BLACK)].into();
        let mapped = original.map_points(|p| Point::new(p.x * 2.0, p.y * 2.0), |w| w * 2.0);

        assert_eq!(original.iter().next().unwrap().points[0], Point::new(1.0, 1.0));
        let stroke = mapped.iter().next().unwrap();
        assert_eq!(stroke.points[0], Point::new(2.0, 2.0));
        assert_eq!(stroke.width, 4.0);
    }
}
