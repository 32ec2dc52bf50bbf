use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kurbo::{Rect, Size};
use pdf_margins::constants::pt_to_mm;
use pdf_margins::geometry::resolve;
use pdf_margins::layout::BorderStyle;
use pdf_margins::store::PageStore;
use pdf_margins::{
    AnnotatedDocument, CancellationToken, ExportOptions, ImagePageStore, InkFile, MarginConfig,
    PdfPageStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pdft", about = "Margin canvas and N-up export tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export an annotated document to PDF
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Write one PNG per N-up sheet
    Print {
        #[command(flatten)]
        source: SourceArgs,

        /// Directory the sheet images are written to
        #[arg(long)]
        out_dir: PathBuf,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Show export statistics
    Stats {
        /// Input PDF file, or one image per page
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Logical pages per output sheet
        #[arg(long)]
        pages_per_sheet: Option<usize>,
    },

    /// Print the resolved canvas geometry for a page size
    Geometry {
        /// Page width in points
        #[arg(long)]
        width: f64,

        /// Page height in points
        #[arg(long)]
        height: f64,

        /// Declared page rotation in degrees
        #[arg(long, default_value = "0")]
        rotation: i64,

        #[arg(long, default_value = "center", value_enum)]
        anchor: AnchorArg,

        /// Page scale inside the canvas
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Input PDF file, or one image per page
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Ink and per-page margin settings (JSON)
    #[arg(long)]
    ink: Option<PathBuf>,

    /// Anchor applied to every page
    #[arg(long, value_enum)]
    anchor: Option<AnchorArg>,

    /// Page scale applied to every page
    #[arg(long)]
    scale: Option<f64>,
}

#[derive(Args)]
struct LayoutArgs {
    /// Load export options from a JSON file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Logical pages per output sheet
    #[arg(long)]
    pages_per_sheet: Option<usize>,

    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    #[arg(long, value_enum)]
    border: Option<BorderArg>,

    /// Raster pixels per point
    #[arg(long)]
    supersample: Option<f32>,

    /// Drop pages that fail to composite instead of using the original
    #[arg(long)]
    skip_failed: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum AnchorArg {
    TopLeft,
    Top,
    TopRight,
    Left,
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    PageOnly,
    MarginOnly,
    Both,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum BorderArg {
    None,
    Hairline,
    Thin,
    DoubleHairline,
    DoubleThin,
}

impl From<AnchorArg> for pdf_margins::Anchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::TopLeft => Self::TopLeft,
            AnchorArg::Top => Self::TopCenter,
            AnchorArg::TopRight => Self::TopRight,
            AnchorArg::Left => Self::CenterLeft,
            AnchorArg::Center => Self::Center,
            AnchorArg::Right => Self::CenterRight,
            AnchorArg::BottomLeft => Self::BottomLeft,
            AnchorArg::Bottom => Self::BottomCenter,
            AnchorArg::BottomRight => Self::BottomRight,
        }
    }
}

impl From<ModeArg> for pdf_margins::ExportMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::PageOnly => Self::PageOnly,
            ModeArg::MarginOnly => Self::MarginOnly,
            ModeArg::Both => Self::Both,
        }
    }
}

impl From<PaperArg> for pdf_margins::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<OrientationArg> for pdf_margins::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<BorderArg> for BorderStyle {
    fn from(arg: BorderArg) -> Self {
        match arg {
            BorderArg::None => Self::None,
            BorderArg::Hairline => Self::SingleHairline,
            BorderArg::Thin => Self::SingleThin,
            BorderArg::DoubleHairline => Self::DoubleHairline,
            BorderArg::DoubleThin => Self::DoubleThin,
        }
    }
}

impl LayoutArgs {
    async fn export_options(&self) -> Result<ExportOptions> {
        let mut options = match &self.config {
            Some(path) => ExportOptions::load(path)
                .await
                .with_context(|| format!("loading {}", path.display()))?,
            None => ExportOptions::default(),
        };

        if let Some(mode) = self.mode {
            options.mode = mode.into();
        }
        if let Some(pages_per_sheet) = self.pages_per_sheet {
            options.pages_per_sheet = pages_per_sheet;
        }
        if let Some(paper) = self.paper {
            options.paper = paper.into();
        }
        if let Some(orientation) = self.orientation {
            options.orientation = orientation.into();
        }
        if let Some(border) = self.border {
            options.border = border.into();
        }
        if let Some(supersample) = self.supersample {
            options.composite.supersample = supersample;
        }
        if self.skip_failed {
            options.failure_policy = pdf_margins::FailurePolicy::Skip;
        }

        options.validate()?;
        Ok(options)
    }
}

/// Open the inputs as a page store: a single PDF, or images one per page
async fn load_store(inputs: &[PathBuf]) -> Result<Arc<dyn PageStore>> {
    let is_pdf = |path: &Path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    };

    let store: Arc<dyn PageStore> = match inputs {
        [single] if is_pdf(single) => Arc::new(PdfPageStore::load(single).await?),
        _ if inputs.iter().any(|path| is_pdf(path)) => {
            bail!("PDF input must be a single file")
        }
        _ => Arc::new(ImagePageStore::load(inputs).await?),
    };
    log::debug!("Loaded {} pages", store.page_count());
    Ok(store)
}

/// Build the annotation state from command-line settings and the ink file
async fn load_annotations(source: &SourceArgs, page_count: usize) -> Result<AnnotatedDocument> {
    let mut document = AnnotatedDocument::new(page_count);

    if source.anchor.is_some() || source.scale.is_some() {
        let anchor: pdf_margins::Anchor = source.anchor.map(Into::into).unwrap_or_default();
        let mut config = MarginConfig::new(anchor, source.scale.unwrap_or(1.0));
        config.applied_to_all_pages = true;
        if page_count > 0 {
            document.apply_margin_settings(0, config)?;
        }
    }

    if let Some(path) = &source.ink {
        let ink_file = InkFile::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?;
        for (page_index, page) in ink_file.pages {
            if page_index >= page_count {
                log::warn!("Ink for page {} ignored: document has {} pages", page_index, page_count);
                continue;
            }
            if let Some(config) = page.margin_config {
                document.apply_margin_settings(page_index, config)?;
            }
            document.set_ink(page_index, page.ink)?;
        }
    }

    Ok(document)
}

fn print_geometry(native: Size, rotation: i64, anchor: AnchorArg, scale: f64, json: bool) -> Result<()> {
    let rotation = pdf_margins::PageRotation::from_degrees(rotation);
    let effective = rotation.apply_to(native);
    let config = MarginConfig::new(anchor.into(), scale);
    let geometry = resolve(effective, &config, None);
    let margins = geometry.margin_regions();

    if json {
        let rect = |r: Rect| serde_json::json!([r.x0, r.y0, r.x1, r.y1]);
        let value = serde_json::json!({
            "canvas": [geometry.canvas_size.width, geometry.canvas_size.height],
            "scale": geometry.scale,
            "page_frame": rect(geometry.page_frame),
            "margins": {
                "top": rect(margins.top),
                "bottom": rect(margins.bottom),
                "left": rect(margins.left),
                "right": rect(margins.right),
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let describe = |r: Rect| {
        format!(
            "({:.2}, {:.2}) {:.2} x {:.2} pt ({:.1} x {:.1} mm)",
            r.x0,
            r.y0,
            r.width(),
            r.height(),
            pt_to_mm(r.width()),
            pt_to_mm(r.height())
        )
    };
    println!("Canvas Geometry:");
    println!(
        "  Canvas: {:.2} x {:.2} pt",
        geometry.canvas_size.width, geometry.canvas_size.height
    );
    println!("  Scale: {:.3}", geometry.scale);
    println!("  Page frame: {}", describe(geometry.page_frame));
    for (side, region) in margins.iter() {
        println!("  {:?} margin: {}", side, describe(region));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            source,
            output,
            layout,
        } => {
            let options = layout.export_options().await?;
            let store = load_store(&source.input).await?;
            let document = load_annotations(&source, store.page_count()).await?;

            let stats = pdf_margins::calculate_statistics(store.page_count(), &options)?;
            let exported = pdf_margins::export_document(
                store,
                document.snapshot(),
                options,
                CancellationToken::new(),
            )
            .await?;
            let pages = exported.get_pages().len();
            pdf_margins::save_pdf(exported, &output).await?;
            println!(
                "Exported {} pages onto {} sheets → {}",
                stats.source_pages,
                pages,
                output.display()
            );
        }

        Commands::Print {
            source,
            out_dir,
            layout,
        } => {
            let options = layout.export_options().await?;
            let store = load_store(&source.input).await?;
            let document = load_annotations(&source, store.page_count()).await?;
            tokio::fs::create_dir_all(&out_dir).await?;

            let snapshot = document.snapshot();
            let dir = out_dir.clone();
            let printed = tokio::task::spawn_blocking(move || {
                pdf_margins::print_sheets(
                    store.as_ref(),
                    &snapshot,
                    &options,
                    &CancellationToken::new(),
                    |index, sheet| {
                        let path = dir.join(format!("sheet-{:03}.png", index + 1));
                        std::fs::write(&path, sheet.encode_png()?)?;
                        log::info!("Wrote {}", path.display());
                        Ok(())
                    },
                )
            })
            .await??;
            println!("Printed {} sheets → {}", printed, out_dir.display());
        }

        Commands::Stats {
            input,
            pages_per_sheet,
        } => {
            let store = load_store(&input).await?;
            let options = ExportOptions {
                pages_per_sheet: pages_per_sheet.unwrap_or(1),
                ..Default::default()
            };
            let stats = pdf_margins::calculate_statistics(store.page_count(), &options)?;
            println!("Export Statistics:");
            println!("  Source pages: {}", stats.source_pages);
            println!("  Sheets: {}", stats.sheets);
            println!("  Output pages: {}", stats.output_pages);
            println!("  Blank cells: {}", stats.blank_cells);
        }

        Commands::Geometry {
            width,
            height,
            rotation,
            anchor,
            scale,
            json,
        } => {
            print_geometry(Size::new(width, height), rotation, anchor, scale, json)?;
        }
    }

    Ok(())
}
