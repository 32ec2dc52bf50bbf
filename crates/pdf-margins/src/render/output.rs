//! Output PDF assembly

use std::collections::HashMap;

use kurbo::{Affine, Rect, Size};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::pdf::{affine_operands, flip_y, num, rect_operands};
use super::xobject::{copy_page, create_form_xobject, create_image_xobject, create_page_xobject};
use super::{PageContent, RasterSurface};
use crate::layout::{GridLayout, place_in_cell};
use crate::store::PageStore;
use crate::types::{MarginError, Result};

/// One item placed on an N-up sheet
#[derive(Debug, Clone, Copy)]
pub enum SheetItem<'a> {
    Vector(&'a PageContent),
    Raster(&'a RasterSurface),
}

impl SheetItem<'_> {
    /// Size in points
    pub fn size(&self) -> Size {
        match self {
            SheetItem::Vector(content) => content.size,
            SheetItem::Raster(surface) => surface.logical_size(),
        }
    }
}

/// An output document under construction
///
/// Source pages drawn more than once share one Form XObject.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    form_cache: HashMap<usize, ObjectId>,
    object_cache: HashMap<ObjectId, ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            form_cache: HashMap::new(),
            object_cache: HashMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Copy a source page unchanged
    pub fn push_pdf_page<S: PageStore + ?Sized>(&mut self, store: &S, page_index: usize) -> Result<()> {
        let (source, page_id) = store
            .pdf_page(page_index)
            .ok_or(MarginError::MissingPageContent { page: page_index })?;
        let id = copy_page(
            &mut self.doc,
            source,
            page_id,
            self.pages_id,
            &mut self.object_cache,
        )?;
        self.kids.push(Object::Reference(id));
        Ok(())
    }

    /// Add a composited vector page
    pub fn push_content<S: PageStore + ?Sized>(&mut self, store: &S, content: &PageContent) -> Result<()> {
        let resources = self.content_resources(store, content)?;
        let page_box = Rect::from_origin_size((0.0, 0.0), content.size);
        self.push_page(page_box, content.operations.clone().into_bytes(), resources);
        Ok(())
    }

    /// Add a raster surface as a full-page image
    pub fn push_raster(&mut self, surface: &RasterSurface) {
        let image_id = create_image_xobject(&mut self.doc, surface);
        let size = surface.logical_size();

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let ops = format!(
            "q {} 0 0 {} 0 0 cm /Im0 Do Q\n",
            num(size.width),
            num(size.height)
        );
        self.push_page(
            Rect::from_origin_size((0.0, 0.0), size),
            ops.into_bytes(),
            resources,
        );
    }

    /// Add one N-up sheet. Items fill `layout`'s cells in order; borders are
    /// drawn around occupied cells.
    pub fn push_sheet<S: PageStore + ?Sized>(
        &mut self,
        store: &S,
        layout: &GridLayout,
        items: &[SheetItem<'_>],
    ) -> Result<()> {
        let paper = layout.paper;
        let mut xobjects = Dictionary::new();

        // Sheet content is written in y-down paper units
        let mut ops = format!("q\n{} cm\n", affine_operands(flip_y(paper.height())));

        for (index, (item, cell)) in items.iter().zip(&layout.cells).enumerate() {
            let placement = place_in_cell(*cell, item.size());
            if placement.scale <= 0.0 {
                continue;
            }
            let size = item.size();
            let origin = placement.rect.origin() - paper.origin();
            let place = Affine::translate(origin) * Affine::scale(placement.scale);

            let name = format!("S{}", index);
            let (xobject_id, local) = match item {
                SheetItem::Vector(content) => {
                    let resources = self.content_resources(store, content)?;
                    let id = create_form_xobject(
                        &mut self.doc,
                        Rect::from_origin_size((0.0, 0.0), size),
                        content.operations.clone().into_bytes(),
                        resources,
                    );
                    (id, flip_y(size.height))
                }
                SheetItem::Raster(surface) => {
                    let id = create_image_xobject(&mut self.doc, surface);
                    // Unit square, top image row at y = 1
                    (id, Affine::new([size.width, 0.0, 0.0, -size.height, 0.0, size.height]))
                }
            };
            xobjects.set(name.as_bytes(), Object::Reference(xobject_id));
            ops.push_str(&format!(
                "q {} cm /{} Do Q\n",
                affine_operands(place * local),
                name
            ));

            if let Some(width) = layout.border.line_width() {
                for rect in layout.border.rects(*cell) {
                    let rect = rect - paper.origin().to_vec2();
                    ops.push_str(&format!(
                        "q 0 0 0 RG {} w {} re S Q\n",
                        num(width),
                        rect_operands(rect)
                    ));
                }
            }
        }
        ops.push_str("Q\n");

        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        self.push_page(
            Rect::from_origin_size((0.0, 0.0), paper.size()),
            ops.into_bytes(),
            resources,
        );
        Ok(())
    }

    /// Build the pages tree and catalog
    pub fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }

    fn push_page(&mut self, media_box: Rect, content: Vec<u8>, resources: Dictionary) {
        let mut stream = Stream::new(Dictionary::new(), content);
        let _ = stream.compress();
        let content_id = self.doc.add_object(stream);

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            ("MediaBox", super::xobject::rect_array(media_box)),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        let page_id = self.doc.add_object(page);
        self.kids.push(Object::Reference(page_id));
    }

    /// Materialize the Form XObjects and graphics states a content stream uses
    fn content_resources<S: PageStore + ?Sized>(
        &mut self,
        store: &S,
        content: &PageContent,
    ) -> Result<Dictionary> {
        let mut xobjects = Dictionary::new();
        for form in &content.forms {
            let id = self.page_form(store, form.page_index)?;
            xobjects.set(form.name.as_bytes(), Object::Reference(id));
        }

        let mut states = Dictionary::new();
        for (index, &alpha) in content.alphas.iter().enumerate() {
            let state = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"ExtGState".to_vec())),
                ("CA", Object::Real(alpha)),
                ("ca", Object::Real(alpha)),
            ]);
            states.set(
                PageContent::graphics_state_name(index).as_bytes(),
                Object::Dictionary(state),
            );
        }

        let mut resources = Dictionary::new();
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }
        if !states.is_empty() {
            resources.set("ExtGState", Object::Dictionary(states));
        }
        Ok(resources)
    }

    fn page_form<S: PageStore + ?Sized>(&mut self, store: &S, page_index: usize) -> Result<ObjectId> {
        if let Some(&id) = self.form_cache.get(&page_index) {
            return Ok(id);
        }
        let (source, page_id) = store
            .pdf_page(page_index)
            .ok_or(MarginError::MissingPageContent { page: page_index })?;
        let id = create_page_xobject(&mut self.doc, source, page_id, &mut self.object_cache)?;
        self.form_cache.insert(page_index, id);
        Ok(id)
    }
}
