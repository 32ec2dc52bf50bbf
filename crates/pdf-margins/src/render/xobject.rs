//! PDF object plumbing for the vector back end
//!
//! Embeds source pages as Form XObjects, raster surfaces as image
//! XObjects, and copies whole pages between documents.

use std::collections::HashMap;

use kurbo::Rect;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::RasterSurface;
use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::{PageRotation, Result};

/// Page tree nesting deeper than this is treated as malformed
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Page keys that must not be followed when copying a page: they point back
/// into the source page tree.
const PAGE_BACK_REFERENCES: [&[u8]; 4] = [b"Parent", b"Annots", b"B", b"StructParents"];

// =============================================================================
// Page Attributes
// =============================================================================

/// Look up a page attribute, following `Parent` links for inheritable keys.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Page MediaBox in PDF user space (y-up). Falls back to US Letter.
pub fn page_media_box(doc: &Document, page_id: ObjectId) -> Rect {
    let default = Rect::new(0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1);

    let Some(Ok(values)) = inherited_attribute(doc, page_id, b"MediaBox").map(Object::as_array)
    else {
        return default;
    };

    let numbers: Vec<f64> = values
        .iter()
        .filter_map(|obj| resolve(doc, obj).and_then(extract_number))
        .collect();

    match numbers.as_slice() {
        [x0, y0, x1, y1] => {
            let rect = Rect::new(*x0, *y0, *x1, *y1).abs();
            if rect.width() > 0.0 && rect.height() > 0.0 {
                rect
            } else {
                default
            }
        }
        _ => default,
    }
}

/// Declared page rotation from the (possibly inherited) `Rotate` entry
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> PageRotation {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(PageRotation::from_degrees)
        .unwrap_or_default()
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

// =============================================================================
// XObject Creation
// =============================================================================

/// Create a Form XObject from a source page.
///
/// The form's BBox is the page MediaBox, so callers must translate by the
/// MediaBox origin when placing it. `cache` maps source object ids to their
/// copies in `output`.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let media_box = page_media_box(source, page_id);

    let content_data = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("BBox", rect_array(media_box));
    xobject_dict.set("FormType", Object::Integer(1));

    if let Some(resources) = inherited_attribute(source, page_id, b"Resources") {
        xobject_dict.set(
            "Resources",
            copy_object_deep(output, source, resources, cache)?,
        );
    }

    let mut stream = Stream::new(xobject_dict, content_data);
    // Already-filtered content stays as it is
    let _ = stream.compress();
    Ok(output.add_object(stream))
}

/// Create a Form XObject from freshly generated content
pub(crate) fn create_form_xobject(
    output: &mut Document,
    bbox: Rect,
    content: Vec<u8>,
    resources: Dictionary,
) -> ObjectId {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set("BBox", rect_array(bbox));
    dict.set("FormType", Object::Integer(1));
    dict.set("Resources", Object::Dictionary(resources));

    let mut stream = Stream::new(dict, content);
    let _ = stream.compress();
    output.add_object(stream)
}

/// Embed a raster surface as an RGB image XObject
pub(crate) fn create_image_xobject(output: &mut Document, surface: &RasterSurface) -> ObjectId {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(surface.width() as i64));
    dict.set("Height", Object::Integer(surface.height() as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));

    let mut stream = Stream::new(dict, surface.to_rgb_bytes());
    let _ = stream.compress();
    output.add_object(stream)
}

pub(crate) fn rect_array(rect: Rect) -> Object {
    Object::Array(vec![
        Object::Real(rect.x0 as f32),
        Object::Real(rect.y0 as f32),
        Object::Real(rect.x1 as f32),
        Object::Real(rect.y1 as f32),
    ])
}

// =============================================================================
// Page Copy
// =============================================================================

/// Copy a page unchanged into `output` under `parent`.
///
/// Inheritable attributes are resolved onto the copy so it no longer
/// depends on the source page tree. Annotations are not carried over.
pub(crate) fn copy_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent: ObjectId,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;

    let mut copy = Dictionary::new();
    for (key, value) in page_dict.iter() {
        if PAGE_BACK_REFERENCES.contains(&key.as_slice()) {
            continue;
        }
        copy.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }

    copy.set("MediaBox", rect_array(page_media_box(source, page_id)));
    let rotation = page_rotation(source, page_id);
    if rotation != PageRotation::None {
        copy.set("Rotate", Object::Integer(rotation.degrees() as i64));
    }
    if !copy.has(b"Resources") {
        if let Some(resources) = inherited_attribute(source, page_id, b"Resources") {
            copy.set(
                "Resources",
                copy_object_deep(output, source, resources, cache)?,
            );
        }
    }
    copy.set("Parent", Object::Reference(parent));

    Ok(output.add_object(copy))
}

// =============================================================================
// Page Content Extraction
// =============================================================================

/// Get the content stream data from a page.
fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let Ok(contents) = page_dict.get(b"Contents") else {
        return Ok(Vec::new()); // No content = blank page
    };

    let streams: Vec<ObjectId> = match contents {
        Object::Reference(id) => vec![*id],
        Object::Array(refs) => refs
            .iter()
            .filter_map(|obj| obj.as_reference().ok())
            .collect(),
        _ => Vec::new(),
    };

    let mut result = Vec::new();
    for id in streams {
        if let Ok(stream) = doc.get_object(id)?.as_stream() {
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            result.extend_from_slice(&content);
            result.push(b'\n');
        }
    }

    Ok(result)
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Uses a cache to avoid copying the same object multiple times.
pub fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    let copy_dict = |output: &mut Document,
                     cache: &mut HashMap<ObjectId, ObjectId>,
                     dict: &Dictionary|
     -> Result<Dictionary> {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
        }
        Ok(new_dict)
    };

    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            // Reserve the id first so reference cycles terminate
            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let referenced = source.get_object(*id)?;
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dict(output, cache, dict)?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => {
            let mut copied = Stream::new(copy_dict(output, cache, &stream.dict)?, stream.content.clone());
            copied.allows_compression = stream.allows_compression;
            Ok(Object::Stream(copied))
        }
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_inherited_attributes() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(595.0),
                        Object::Integer(842),
                    ]),
                ),
                ("Rotate", Object::Integer(-90)),
            ])),
        );
        (doc, page_id)
    }

    #[test]
    fn test_inherited_media_box_and_rotation() {
        let (doc, page_id) = doc_with_inherited_attributes();
        assert_eq!(page_media_box(&doc, page_id), Rect::new(0.0, 0.0, 595.0, 842.0));
        assert_eq!(page_rotation(&doc, page_id), PageRotation::Clockwise270);
    }

    #[test]
    fn test_missing_media_box_defaults_to_letter() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(Dictionary::from_iter(vec![(
            "Type",
            Object::Name(b"Page".to_vec()),
        )]));
        assert_eq!(page_media_box(&doc, page_id), Rect::new(0.0, 0.0, 612.0, 792.0));
        assert_eq!(page_rotation(&doc, page_id), PageRotation::None);
    }

    #[test]
    fn test_copy_page_resolves_inherited_keys() {
        let (source, page_id) = doc_with_inherited_attributes();
        let mut output = Document::with_version("1.7");
        let parent = output.new_object_id();
        let mut cache = HashMap::new();

        let copy_id = copy_page(&mut output, &source, page_id, parent, &mut cache).unwrap();
        let copy = output.get_dictionary(copy_id).unwrap();

        assert_eq!(copy.get(b"Rotate").unwrap().as_i64().unwrap(), 270);
        assert_eq!(copy.get(b"Parent").unwrap().as_reference().unwrap(), parent);
        assert_eq!(copy.get(b"MediaBox").unwrap().as_array().unwrap().len(), 4);
    }
}
