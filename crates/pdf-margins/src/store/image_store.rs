//! In-memory raster pages

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use kurbo::Size;
use tiny_skia::{ColorU8, IntSize, Pixmap};

use super::PageStore;
use crate::types::{PageRotation, Result};

/// A raster page with its declared geometry
#[derive(Debug, Clone)]
pub struct ImagePage {
    pub image: RgbaImage,
    /// Unrotated page size in points
    pub size: Size,
    pub rotation: PageRotation,
}

impl ImagePage {
    /// Page whose size is the image's pixel size at 72 dpi
    pub fn from_image(image: RgbaImage) -> Self {
        let size = Size::new(image.width() as f64, image.height() as f64);
        Self {
            image,
            size,
            rotation: PageRotation::None,
        }
    }

    pub fn with_rotation(mut self, rotation: PageRotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }
}

/// Page store over decoded images, one image per page
#[derive(Debug, Clone, Default)]
pub struct ImagePageStore {
    pages: Vec<ImagePage>,
}

impl ImagePageStore {
    pub fn new(pages: Vec<ImagePage>) -> Self {
        Self { pages }
    }

    /// Load PNG/JPEG files, one page per file, in order
    pub async fn load(paths: &[impl AsRef<Path>]) -> Result<Self> {
        let mut pages = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = tokio::fs::read(path.as_ref()).await?;
            let image =
                tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
            pages.push(ImagePage::from_image(image.to_rgba8()));
        }
        Ok(Self { pages })
    }

    pub fn pages(&self) -> &[ImagePage] {
        &self.pages
    }
}

impl PageStore for ImagePageStore {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn native_size(&self, index: usize) -> Option<Size> {
        self.pages.get(index).map(|page| page.size)
    }

    fn rotation(&self, index: usize) -> PageRotation {
        self.pages
            .get(index)
            .map(|page| page.rotation)
            .unwrap_or_default()
    }

    fn render_content(&self, index: usize, width: u32, height: u32) -> Option<Pixmap> {
        let page = self.pages.get(index)?;
        if width == 0 || height == 0 || page.image.width() == 0 || page.image.height() == 0 {
            return None;
        }

        let rotated = match page.rotation {
            PageRotation::None => page.image.clone(),
            PageRotation::Clockwise90 => imageops::rotate90(&page.image),
            PageRotation::Clockwise180 => imageops::rotate180(&page.image),
            PageRotation::Clockwise270 => imageops::rotate270(&page.image),
        };
        let resized = imageops::resize(&rotated, width, height, FilterType::Triangle);

        rgba_to_pixmap(&resized)
    }
}

/// Convert straight-alpha RGBA pixels into a premultiplied pixmap
pub(crate) fn rgba_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut pixmap = Pixmap::new(size.width(), size.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}
