use std::collections::BTreeMap;

use kurbo::Point;
use pdf_margins::layout::BorderStyle;
use pdf_margins::*;
use tempfile::NamedTempFile;

#[test]
fn test_default_options_are_valid() {
    let options = ExportOptions::default();
    assert!(options.validate().is_ok());
    assert_eq!(options.mode, ExportMode::Both);
    assert_eq!(options.failure_policy, FailurePolicy::SubstituteOriginal);
    assert!(options.composite.frame_border);
}

#[test]
fn test_validate_rejects_bad_values() {
    let mut options = ExportOptions::default();
    options.composite.supersample = 9.0;
    assert!(options.validate().is_err());

    let options = ExportOptions {
        pages_per_sheet: 0,
        ..Default::default()
    };
    assert!(options.validate().is_err());
    assert_eq!(options.effective_pages_per_sheet(), 1);

    let options = ExportOptions {
        paper: PaperSize::Custom {
            width_mm: 0.0,
            height_mm: 100.0,
        },
        ..Default::default()
    };
    assert!(options.validate().is_err());
}

#[test]
fn test_validate_caps_pages_per_sheet() {
    let options = ExportOptions {
        pages_per_sheet: constants::MAX_PAGES_PER_SHEET,
        ..Default::default()
    };
    assert!(options.validate().is_ok());

    let options = ExportOptions {
        pages_per_sheet: constants::MAX_PAGES_PER_SHEET + 1,
        ..Default::default()
    };
    assert!(matches!(options.validate(), Err(MarginError::Config(_))));

    let options = ExportOptions {
        pages_per_sheet: usize::MAX,
        ..Default::default()
    };
    assert!(options.validate().is_err());
}

#[test]
fn test_inverted_bounds_from_json_are_ordered() {
    let config: MarginConfig =
        serde_json::from_str(r#"{"enabled":true,"bounds":{"min":0.9,"max":0.2}}"#).unwrap();
    assert_eq!(config.bounds, ScaleBounds::new(0.2, 0.9));

    // Clamping against the stored bounds must not panic
    assert!((0.2..=0.9).contains(&config.scale()));
    let geometry = geometry::resolve(kurbo::Size::new(612.0, 792.0), &config, None);
    assert!(geometry.page_frame.width() <= 612.0);

    let config: MarginConfig =
        serde_json::from_str(r#"{"bounds":{"min":-3.0,"max":40.0}}"#).unwrap();
    assert_eq!(config.bounds.min(), constants::ABSOLUTE_MIN_SCALE);
    assert_eq!(config.bounds.max(), constants::ABSOLUTE_MAX_SCALE);
}

#[tokio::test]
async fn test_options_json_round_trip() {
    let options = ExportOptions {
        mode: ExportMode::MarginOnly,
        pages_per_sheet: 6,
        paper: PaperSize::A4,
        orientation: Orientation::Landscape,
        border: BorderStyle::DoubleHairline,
        failure_policy: FailurePolicy::Skip,
        ..Default::default()
    };

    let temp = NamedTempFile::new().unwrap();
    options.save(temp.path()).await.unwrap();
    let loaded = ExportOptions::load(temp.path()).await.unwrap();
    assert_eq!(loaded, options);
}

#[tokio::test]
async fn test_partial_options_use_defaults() {
    let temp = NamedTempFile::new().unwrap();
    std::fs::write(temp.path(), r#"{ "pages_per_sheet": 2 }"#).unwrap();

    let loaded = ExportOptions::load(temp.path()).await.unwrap();
    assert_eq!(loaded.pages_per_sheet, 2);
    assert_eq!(loaded.mode, ExportMode::Both);
}

#[tokio::test]
async fn test_malformed_options_are_config_errors() {
    let temp = NamedTempFile::new().unwrap();
    std::fs::write(temp.path(), "not json").unwrap();

    let result = ExportOptions::load(temp.path()).await;
    assert!(matches!(result, Err(MarginError::Config(_))));
}

#[tokio::test]
async fn test_ink_file_round_trip() {
    let stroke = InkStroke::new(
        vec![Point::new(10.0, 20.0), Point::new(30.0, 40.0)],
        1.5,
        Rgba::new(20, 40, 60, 128),
    );
    let mut pages = BTreeMap::new();
    pages.insert(
        2,
        InkFilePage {
            margin_config: Some(MarginConfig::new(Anchor::BottomLeft, 0.6)),
            ink: PageInk {
                document: StrokeCollection::new(),
                margin: vec![stroke].into(),
            },
        },
    );
    let file = InkFile { pages };

    let temp = NamedTempFile::new().unwrap();
    file.save(temp.path()).await.unwrap();
    let loaded = InkFile::load(temp.path()).await.unwrap();
    assert_eq!(loaded, file);
}
