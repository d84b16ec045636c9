use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Page attributes a page may take from any ancestor `Pages` node.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Concatenates the pages of `inputs`, in order, into a single PDF at `dest`.
/// Returns the number of pages written. The inputs are only read.
pub fn merge(inputs: &[PathBuf], dest: &Path) -> Result<usize> {
    if inputs.is_empty() {
        return Err(Error::Merge("no documents to merge".to_string()));
    }

    let documents = inputs
        .iter()
        .map(|path| {
            Document::load(path)
                .map_err(|e| Error::Merge(format!("cannot read {}: {}", path.display(), e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut merged = concat(documents)?;
    let pages = merged.get_pages().len();

    merged
        .save(dest)
        .map_err(|e| Error::Merge(format!("cannot write {}: {}", dest.display(), e)))?;
    info!(path = %dest.display(), pages, "merged documents");
    Ok(pages)
}

fn concat(documents: Vec<Document>) -> Result<Document> {
    let mut max_id = 1;
    let mut pages = Vec::<(ObjectId, Dictionary)>::new();
    let mut objects = BTreeMap::<ObjectId, Object>::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            let mut page = doc
                .get_dictionary(page_id)
                .map_err(|e| Error::Merge(e.to_string()))?
                .clone();
            // the page leaves its own tree, so it must carry what it inherited
            inherit_attributes(&doc, &mut page);
            pages.push((page_id, page));
        }
        objects.extend(doc.objects);
    }

    if pages.is_empty() {
        return Err(Error::Merge("no pages found".to_string()));
    }

    let mut output = Document::with_version("1.5");
    for (id, object) in objects {
        let kind = type_name(&object).map(|name| name.to_vec());
        match kind.as_deref() {
            // replaced by a fresh page tree and catalog below
            Some(b"Catalog") | Some(b"Pages") | Some(b"Page") => {}
            Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                output.objects.insert(id, object);
            }
        }
    }

    let pages_id: ObjectId = (max_id, 0);
    let catalog_id: ObjectId = (max_id + 1, 0);

    let mut kids = Vec::with_capacity(pages.len());
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        output.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }
    debug!(pages = kids.len(), "collected pages");

    output.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    output.objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        }),
    );

    output.trailer.set("Root", catalog_id);
    output.max_id = catalog_id.0;
    output.renumber_objects();
    output.compress();

    Ok(output)
}

/// Copies inheritable attributes the page lacks from the nearest ancestor
/// that defines them.
fn inherit_attributes(doc: &Document, page: &mut Dictionary) {
    let mut seen = HashSet::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(id) = parent {
        if !seen.insert(id) {
            break;
        }
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key, value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .ok()?
        .get(b"Type")
        .ok()?
        .as_name()
        .ok()
}
