//! lopdf object-graph helpers shared by the PDF strategies.

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

/// US Letter, used when a page has no usable `/MediaBox`.
pub const DEFAULT_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

/// Follow references until a direct object is reached.
pub fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    // Bounded so reference cycles cannot spin forever.
    for _ in 0..32 {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM or PDFDocEncoding.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    // PDFDocEncoding agrees with Latin-1 on every printable code we care about.
    bytes.iter().map(|&b| b as char).collect()
}

/// Page attribute, honouring inheritance through `/Parent`.
pub fn inherited<'a>(doc: &'a LopdfDocument, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..32 {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        dict = resolve_dict(doc, dict.get(b"Parent").ok()?)?;
    }
    None
}

/// Page width and height in points from `/MediaBox`.
pub fn page_size(doc: &LopdfDocument, page_id: ObjectId) -> (f64, f64) {
    let media_box = inherited(doc, page_id, b"MediaBox").and_then(|obj| match obj {
        Object::Array(values) if values.len() == 4 => {
            let coords: Vec<f64> = values
                .iter()
                .filter_map(|v| resolve(doc, v).and_then(number))
                .collect();
            (coords.len() == 4).then(|| ((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()))
        }
        _ => None,
    });
    match media_box {
        Some((w, h)) if w > 0.0 && h > 0.0 => (w, h),
        _ => DEFAULT_PAGE_SIZE,
    }
}

pub fn page_resources(doc: &LopdfDocument, page_id: ObjectId) -> Option<&Dictionary> {
    match inherited(doc, page_id, b"Resources")? {
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum XObjectKind {
    Image { width: u32, height: u32, format: &'static str },
    Form,
    Other,
}

/// Named entry of a page's `/XObject` resource dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct XObjectInfo {
    pub name: String,
    pub kind: XObjectKind,
}

/// XObjects declared by the page, in dictionary order.
pub fn page_xobjects(doc: &LopdfDocument, page_id: ObjectId) -> Vec<XObjectInfo> {
    let Some(xobjects) = page_resources(doc, page_id)
        .and_then(|res| res.get(b"XObject").ok())
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let dict = resolve_dict(doc, obj)?;
            let subtype = dict.get(b"Subtype").ok().and_then(|s| s.as_name().ok());
            let kind = match subtype {
                Some(b"Image") => {
                    let dimension = |key: &[u8]| {
                        dict.get(key)
                            .ok()
                            .and_then(|v| resolve(doc, v))
                            .and_then(number)
                            .map_or(0, |n| n.max(0.0) as u32)
                    };
                    XObjectKind::Image {
                        width: dimension(b"Width"),
                        height: dimension(b"Height"),
                        format: image_format(doc, dict.get(b"Filter").ok()),
                    }
                }
                Some(b"Form") => XObjectKind::Form,
                _ => XObjectKind::Other,
            };
            Some(XObjectInfo {
                name: String::from_utf8_lossy(name).into_owned(),
                kind,
            })
        })
        .collect()
}

/// File type an image would be saved as, judged by its last stream filter.
pub fn image_format(doc: &LopdfDocument, filter: Option<&Object>) -> &'static str {
    let last = match filter.and_then(|f| resolve(doc, f)) {
        Some(Object::Name(name)) => Some(name.as_slice()),
        Some(Object::Array(filters)) => filters
            .iter()
            .rev()
            .find_map(|f| resolve(doc, f).and_then(|f| f.as_name().ok())),
        _ => None,
    };
    match last {
        Some(b"DCTDecode") => "jpeg",
        Some(b"JPXDecode") => "jpx",
        Some(b"JBIG2Decode") => "jbig2",
        Some(b"CCITTFaxDecode") => "tiff",
        _ => "png",
    }
}

/// Counts of `(links, other annotations)` in the page's `/Annots`.
pub fn annotation_counts(doc: &LopdfDocument, page_id: ObjectId) -> (usize, usize) {
    let Some(Object::Array(annots)) = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"Annots").ok())
        .and_then(|obj| resolve(doc, obj))
    else {
        return (0, 0);
    };

    annots
        .iter()
        .filter_map(|annot| resolve_dict(doc, annot))
        .fold((0, 0), |(links, others), annot| {
            match annot.get(b"Subtype").ok().and_then(|s| s.as_name().ok()) {
                Some(b"Link") => (links + 1, others),
                // Popups belong to their parent markup annotation.
                Some(b"Popup") => (links, others),
                _ => (links, others + 1),
            }
        })
}

/// Test fixtures built directly with lopdf.
#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream, dictionary};

    /// One page per entry; each entry lists `(x, y, text)` runs in PDF space.
    pub fn text_pdf(pages: &[&[(i64, i64, &str)]]) -> LopdfDocument {
        let mut doc = LopdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for runs in pages {
            let mut operations = Vec::new();
            for (x, y, text) in runs.iter() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations };
            let encoded = content.encode().unwrap_or_default();
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    /// Attach an image XObject named `name` to the shared page resources.
    pub fn add_image(doc: &mut LopdfDocument, name: &str, width: i64, height: i64, filter: &str) {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "Filter" => filter,
            },
            vec![0u8; 4],
        ));
        let resources_id = doc
            .objects
            .values()
            .find_map(|obj| match obj {
                Object::Dictionary(d) if d.has(b"Kids") => d.get(b"Resources").ok()?.as_reference().ok(),
                _ => None,
            })
            .unwrap();
        let resources = doc.get_dictionary_mut(resources_id).unwrap();
        let mut xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        xobjects.set(name, image_id);
        resources.set("XObject", xobjects);
    }

    /// Add annotations of the given subtypes to page `index` (0-based).
    pub fn add_annotations(doc: &mut LopdfDocument, index: usize, subtypes: &[&str]) {
        let annots: Vec<Object> = subtypes
            .iter()
            .map(|subtype| {
                Object::Reference(doc.add_object(dictionary! {
                    "Type" => "Annot",
                    "Subtype" => *subtype,
                }))
            })
            .collect();
        let page_id = *doc.get_pages().values().nth(index).unwrap();
        doc.get_dictionary_mut(page_id).unwrap().set("Annots", annots);
    }

    /// Serialize to bytes, as a file on disk would hold them.
    pub fn to_bytes(doc: &mut LopdfDocument) -> Vec<u8> {
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_decode_pdf_string() {
        assert_eq!(decode_pdf_string(b"plain"), "plain");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, b'h', 0x00, b'i']), "hi");
        assert_eq!(decode_pdf_string(&[0xEF, 0xBB, 0xBF, b'o', b'k']), "ok");
        assert_eq!(decode_pdf_string(&[b'c', b'a', b'f', 0xE9]), "café");
    }

    #[test]
    fn test_page_size_is_inherited() {
        let doc = text_pdf(&[&[(72, 700, "Hello")]]);
        let page_id = *doc.get_pages().values().next().unwrap();
        assert_eq!(page_size(&doc, page_id), (595.0, 842.0));
        assert!(page_resources(&doc, page_id).is_some());
    }

    #[test]
    fn test_page_xobjects() {
        let mut doc = text_pdf(&[&[(72, 700, "Hello")]]);
        add_image(&mut doc, "Im1", 640, 480, "DCTDecode");
        add_image(&mut doc, "Im2", 10, 20, "FlateDecode");
        let page_id = *doc.get_pages().values().next().unwrap();

        let xobjects = page_xobjects(&doc, page_id);
        assert_eq!(xobjects.len(), 2);
        assert_eq!(xobjects[0].name, "Im1");
        assert_eq!(
            xobjects[0].kind,
            XObjectKind::Image {
                width: 640,
                height: 480,
                format: "jpeg"
            }
        );
        assert!(matches!(xobjects[1].kind, XObjectKind::Image { format: "png", .. }));
    }

    #[test]
    fn test_annotation_counts_separate_links() {
        let mut doc = text_pdf(&[&[(72, 700, "Hello")]]);
        add_annotations(&mut doc, 0, &["Link", "Link", "Text", "Popup", "Highlight"]);
        let page_id = *doc.get_pages().values().next().unwrap();
        assert_eq!(annotation_counts(&doc, page_id), (2, 2));
    }
}
