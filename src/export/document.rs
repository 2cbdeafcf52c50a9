//! Low-level page access on top of `lopdf`.
//!
//! Everything here treats the page tree as untrusted input: missing or
//! malformed attributes fall back to defaults instead of failing the export.

use super::ExportError;
use crate::draw::{PageInfo, PageInfoMap};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use log::{debug, warn};

/// US Letter, used when a page has no usable MediaBox.
const FALLBACK_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

/// Guards against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Parses document bytes.
pub fn load(bytes: &[u8]) -> Result<Document, ExportError> {
    let doc = Document::load_mem(bytes)?;
    debug!("Loaded document with {} pages", doc.get_pages().len());
    Ok(doc)
}

/// Stamps `/ModDate` and serializes the document.
pub fn save(doc: &mut Document, compress: bool) -> Result<Vec<u8>, ExportError> {
    stamp_mod_date(doc);
    if compress {
        doc.compress();
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(output)
}

/// Reads `{width, height, userUnit}` for every page of `bytes`.
pub fn read_page_infos(bytes: &[u8]) -> Result<PageInfoMap, ExportError> {
    Ok(page_infos(&load(bytes)?))
}

/// Page geometry for every page, keyed by 1-based page number.
pub fn page_infos(doc: &Document) -> PageInfoMap {
    doc.get_pages()
        .into_iter()
        .map(|(number, page_id)| (number, page_info(doc, page_id)))
        .collect()
}

/// Geometry of one page: MediaBox size (inherited through the page tree)
/// plus `/UserUnit` when present.
pub fn page_info(doc: &Document, page_id: ObjectId) -> PageInfo {
    let (width, height) = match media_box(doc, page_id) {
        Some([x0, y0, x1, y1]) => ((x1 - x0).abs(), (y1 - y0).abs()),
        None => {
            warn!("Page {:?} has no usable MediaBox, assuming US Letter", page_id);
            FALLBACK_PAGE_SIZE
        }
    };

    let user_unit = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| page.get(b"UserUnit").ok())
        .and_then(|value| resolve(doc, value))
        .and_then(|value| value.as_float().ok())
        .map(f64::from)
        .filter(|unit| *unit > 0.0);

    PageInfo {
        width,
        height,
        user_unit,
    }
}

/// `[x0, y0, x1, y1]` of the page's MediaBox, if it has a valid one.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Option<[f64; 4]> {
    let array = inherited(doc, page_id, b"MediaBox")?.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let mut rect = [0.0; 4];
    for (slot, value) in rect.iter_mut().zip(array) {
        *slot = f64::from(resolve(doc, value)?.as_float().ok()?);
    }
    Some(rect)
}

/// Registers `value` under a fresh name in the page's `category` resource
/// dictionary (`ExtGState`, `XObject`, ...) and returns that name.
///
/// Inherited or shared resource dictionaries are copied onto the page first,
/// so other pages never see the new entry.
pub fn add_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    prefix: &str,
    value: Object,
) -> Result<String, ExportError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|object| resolve(doc, object))
        .and_then(|object| object.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut index = entries.len() + 1;
    let mut name = format!("{prefix}{index}");
    while entries.has(name.as_bytes()) {
        index += 1;
        name = format!("{prefix}{index}");
    }

    entries.set(name.clone(), value);
    resources.set(category, Object::Dictionary(entries));
    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Appends `content` after the page's existing content streams.
///
/// The original content is wrapped in `q ... Q` so whatever graphics state it
/// leaves behind cannot leak into the appended operators.
pub fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), ExportError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| update_error(page_id, e))?;
    let existing = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let open = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut body = b"Q\n".to_vec();
    body.extend_from_slice(&content);
    let close = doc.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open));
    contents.extend(existing);
    contents.push(Object::Reference(close));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ExportError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| update_error(page_id, e))
}

fn update_error(page_id: ObjectId, err: lopdf::Error) -> ExportError {
    ExportError::Encode(format!(
        "cannot update page object {} {}: {err}",
        page_id.0, page_id.1
    ))
}

/// Sets `/ModDate` in the document information dictionary, creating it if needed.
pub fn stamp_mod_date(doc: &mut Document) {
    let date = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();

    let info_id = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| object.as_reference().ok());
    if let Some(id) = info_id {
        if let Ok(info) = doc.get_object_mut(id).and_then(|object| object.as_dict_mut()) {
            info.set("ModDate", Object::string_literal(date));
            return;
        }
    }

    if let Ok(Object::Dictionary(info)) = doc.trailer.get_mut(b"Info") {
        info.set("ModDate", Object::string_literal(date));
        return;
    }

    let id = doc.add_object(dictionary! {
        "ModDate" => Object::string_literal(date),
    });
    doc.trailer.set("Info", id);
}

/// Looks up a page attribute, walking up `/Parent` for inheritable keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Follows one level of indirection.
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{blank_pdf, page_operators};
    use super::*;

    #[test]
    fn reads_page_sizes() {
        let infos = read_page_infos(&blank_pdf(&[(600.0, 800.0), (842.0, 595.0)])).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[&1], PageInfo::new(600.0, 800.0));
        assert_eq!(infos[&2], PageInfo::new(842.0, 595.0));
    }

    #[test]
    fn media_box_and_user_unit_come_from_the_tree() {
        let mut doc = load(&blank_pdf(&[(100.0, 100.0)])).unwrap();
        let page_id = doc.get_pages()[&1];
        let parent = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Parent")
            .unwrap()
            .as_reference()
            .unwrap();

        // Move the MediaBox up to /Pages and give the page a UserUnit.
        let page = doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
        page.remove(b"MediaBox");
        page.set("UserUnit", Object::Real(2.0));
        doc.get_object_mut(parent)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "MediaBox",
                vec![
                    Object::Integer(10),
                    Object::Integer(20),
                    Object::Integer(310),
                    Object::Integer(420),
                ],
            );

        let info = page_info(&doc, page_id);
        assert_eq!((info.width, info.height), (300.0, 400.0));
        assert_eq!(info.user_unit, Some(2.0));
        assert_eq!(media_box(&doc, page_id), Some([10.0, 20.0, 310.0, 420.0]));
    }

    #[test]
    fn resource_names_never_collide() {
        let mut doc = load(&blank_pdf(&[(100.0, 100.0)])).unwrap();
        let page_id = doc.get_pages()[&1];

        let first = add_page_resource(&mut doc, page_id, "ExtGState", "GS", dictionary! {}.into())
            .unwrap();
        let second = add_page_resource(&mut doc, page_id, "ExtGState", "GS", dictionary! {}.into())
            .unwrap();

        assert_ne!(first, second);
        let resources = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap();
        let states = resources.get(b"ExtGState").unwrap().as_dict().unwrap();
        assert!(states.has(first.as_bytes()) && states.has(second.as_bytes()));
    }

    #[test]
    fn appended_content_follows_wrapped_original() {
        let mut doc = load(&blank_pdf(&[(100.0, 100.0)])).unwrap();
        let page_id = doc.get_pages()[&1];
        append_page_content(&mut doc, page_id, b"1 0 0 RG 0 0 m 5 5 l S".to_vec()).unwrap();
        let bytes = save(&mut doc, false).unwrap();

        let ops: Vec<String> = page_operators(&bytes, 1)
            .into_iter()
            .map(|op| op.operator)
            .collect();
        assert_eq!(
            ops,
            ["q", "RG", "m", "l", "S", "Q", "RG", "m", "l", "S"]
        );
    }

    #[test]
    fn save_stamps_mod_date() {
        let mut doc = load(&blank_pdf(&[(100.0, 100.0)])).unwrap();
        let bytes = save(&mut doc, true).unwrap();

        let reloaded = load(&bytes).unwrap();
        let info_id = reloaded.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = reloaded.get_dictionary(info_id).unwrap();
        assert!(info.has(b"ModDate"));
    }

    #[test]
    fn updating_a_missing_page_is_an_encode_error() {
        let mut doc = load(&blank_pdf(&[(100.0, 100.0)])).unwrap();
        let missing = (9999, 0);

        let err = add_page_resource(&mut doc, missing, "XObject", "Im", Object::Null).unwrap_err();
        assert!(matches!(err, ExportError::Encode(_)), "{err}");

        let err = append_page_content(&mut doc, missing, b"S".to_vec()).unwrap_err();
        assert!(matches!(err, ExportError::Encode(_)), "{err}");
        assert!(err.to_string().contains("9999 0"));
    }

    #[test]
    fn malformed_bytes_fail_to_decode() {
        let err = load(b"definitely not a document").unwrap_err();
        assert!(matches!(err, ExportError::Decode(_)));
    }
}
