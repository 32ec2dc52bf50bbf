use crate::constants::*;
use crate::layout::BorderStyle;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Range a margin scale is clamped into
///
/// Deserialized bounds go through [`ScaleBounds::new`] like any other.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "RawScaleBounds"))]
pub struct ScaleBounds {
    min: f64,
    max: f64,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawScaleBounds {
    min: f64,
    max: f64,
}

#[cfg(feature = "serde")]
impl From<RawScaleBounds> for ScaleBounds {
    fn from(raw: RawScaleBounds) -> Self {
        Self::new(raw.min, raw.max)
    }
}

impl ScaleBounds {
    /// Build bounds inside `[0.01, 1.0]`, swapping them if given out of order.
    pub fn new(min: f64, max: f64) -> Self {
        let clamp = |v: f64| {
            if v.is_finite() {
                v.clamp(ABSOLUTE_MIN_SCALE, ABSOLUTE_MAX_SCALE)
            } else {
                ABSOLUTE_MAX_SCALE
            }
        };
        let (a, b) = (clamp(min), clamp(max));
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Clamp a scale into the bounds. NaN maps to the upper bound.
    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            self.max
        } else {
            scale.max(self.min).min(self.max)
        }
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_SCALE,
            max: DEFAULT_MAX_SCALE,
        }
    }
}

/// Per-page margin settings
///
/// Always handled by value: every page owns its own copy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MarginConfig {
    pub enabled: bool,
    pub anchor: Anchor,
    scale: f64,
    pub applied_to_all_pages: bool,
    pub bounds: ScaleBounds,
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            anchor: Anchor::Center,
            scale: DEFAULT_SCALE,
            applied_to_all_pages: false,
            bounds: ScaleBounds::default(),
        }
    }
}

impl MarginConfig {
    /// Enabled margins with the given anchor and scale
    pub fn new(anchor: Anchor, scale: f64) -> Self {
        Self {
            enabled: true,
            anchor,
            ..Default::default()
        }
        .with_scale(scale)
    }

    /// The configured scale, clamped into the bounds
    pub fn scale(&self) -> f64 {
        self.bounds.clamp(self.scale)
    }

    /// Scale the page is drawn at: the configured scale when enabled,
    /// otherwise the page fills the canvas.
    pub fn effective_scale(&self) -> f64 {
        if self.enabled { self.scale() } else { 1.0 }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = self.bounds.clamp(scale);
        self
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = self.bounds.clamp(scale);
    }

    pub fn with_bounds(mut self, bounds: ScaleBounds) -> Self {
        self.bounds = bounds;
        self.scale = bounds.clamp(self.scale);
        self
    }

    /// Re-apply the clamp, e.g. after deserializing hand-edited settings
    pub fn clamped(self) -> Self {
        let bounds = ScaleBounds::new(self.bounds.min, self.bounds.max);
        self.with_bounds(bounds)
    }
}

/// Options for compositing a single page
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CompositeOptions {
    /// Raster pixels per logical unit
    pub supersample: f32,
    /// Colour the canvas is filled with before anything else is drawn
    pub background: Rgba,
    /// Draw a separator around the page frame when the page is shrunk
    pub frame_border: bool,
    /// Colour of the page frame separator
    pub frame_color: Rgba,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            supersample: 2.0,
            background: Rgba::WHITE,
            frame_border: true,
            frame_color: Rgba::new(200, 200, 200, 255),
        }
    }
}

/// Complete batch export configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExportOptions {
    pub mode: ExportMode,
    pub composite: CompositeOptions,

    // N-up output
    pub pages_per_sheet: usize,
    pub paper: PaperSize,
    pub orientation: Orientation,
    pub border: BorderStyle,

    pub failure_policy: FailurePolicy,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode: ExportMode::Both,
            composite: CompositeOptions::default(),
            pages_per_sheet: 1,
            paper: PaperSize::Letter,
            orientation: Orientation::Portrait,
            border: BorderStyle::None,
            failure_policy: FailurePolicy::SubstituteOriginal,
        }
    }
}

impl ExportOptions {
    /// Load options from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let options = serde_json::from_slice(&bytes)
            .map_err(|e| MarginError::Config(format!("Failed to parse config: {}", e)))?;
        Ok(options)
    }

    /// Save options to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MarginError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        let supersample = self.composite.supersample;
        if !(supersample > 0.0 && supersample <= MAX_SUPERSAMPLE) {
            return Err(MarginError::Config(format!(
                "Supersample factor must be in (0, {}], got {}",
                MAX_SUPERSAMPLE, supersample
            )));
        }

        if self.pages_per_sheet == 0 {
            return Err(MarginError::Config(
                "Pages per sheet must be at least 1".to_string(),
            ));
        }
        if self.pages_per_sheet > MAX_PAGES_PER_SHEET {
            return Err(MarginError::Config(format!(
                "Pages per sheet must be at most {}, got {}",
                MAX_PAGES_PER_SHEET, self.pages_per_sheet
            )));
        }

        let (w, h) = self.paper.dimensions_mm();
        if !(w > 0.0 && h > 0.0) {
            return Err(MarginError::Config(format!(
                "Paper size must be positive, got {}x{} mm",
                w, h
            )));
        }

        Ok(())
    }

    /// Pages per sheet with the zero case folded to one
    pub fn effective_pages_per_sheet(&self) -> usize {
        self.pages_per_sheet.max(1)
    }
}
