//! Append donor PDFs after the rendered image pages.
//!
//! Donor pages are copied as-is: their objects are renumbered past the output
//! document's highest id, and each page is re-parented onto the output page
//! tree. Attributes a page inherited from its old tree (`MediaBox`,
//! `Resources`, `CropBox`, `Rotate`) are copied onto the page itself first,
//! since its old ancestors are dropped.

use super::assembler::{build_document, save};
use super::{ExternalPdf, ImageForPdf, PdfError, PdfSettings};
use crate::imaging::{ImageBackend, ImageCodec};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use thiserror::Error;

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];
/// Guard against cyclic `Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// Build `images` and append every page of each donor in `externals`.
pub fn merge(
    images: &[ImageForPdf],
    externals: &[ExternalPdf],
    settings: &PdfSettings,
) -> Result<Vec<u8>, PdfError> {
    merge_with(&ImageCodec::new(), images, externals, settings)
}

pub fn merge_with<B: ImageBackend>(
    codec: &ImageCodec<B>,
    images: &[ImageForPdf],
    externals: &[ExternalPdf],
    settings: &PdfSettings,
) -> Result<Vec<u8>, PdfError> {
    if images.is_empty() && externals.is_empty() {
        return Err(PdfError::NoContent);
    }

    let mut output = if images.is_empty() {
        empty_document()
    } else {
        match build_document(codec, images, settings) {
            Ok(mut doc) if externals.is_empty() => return save(&mut doc),
            Ok(doc) => doc,
            Err(PdfError::EmptyDocument) if !externals.is_empty() => empty_document(),
            Err(e) => return Err(e),
        }
    };

    let mut appended = 0;
    for external in externals {
        match append_document(&mut output, external) {
            Ok(pages) => {
                log::debug!("Appended {pages} page(s) from {}", external.name);
                appended += pages;
            }
            Err(e) => log::warn!("Skipping {}: {e}", external.name),
        }
    }

    if output.get_pages().is_empty() {
        return Err(PdfError::EmptyDocument);
    }
    log::debug!("Merged {appended} donor page(s)");
    output.compress();
    save(&mut output)
}

fn empty_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

fn pages_root(doc: &Document) -> Result<ObjectId, lopdf::Error> {
    doc.catalog()?.get(b"Pages")?.as_reference()
}

fn type_is(dict: &Dictionary, name: &[u8]) -> bool {
    dict.get(b"Type").and_then(Object::as_name).ok() == Some(name)
}

#[derive(Error, Debug)]
enum AppendError {
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
    #[error("encrypted documents are not supported")]
    Encrypted,
}

/// Look `key` up on the page's ancestors.
fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Copy every page of `external` onto the end of `output`. Returns the number
/// of pages added; `output` is untouched on error.
fn append_document(output: &mut Document, external: &ExternalPdf) -> Result<usize, AppendError> {
    let mut donor = Document::load_mem(&external.bytes)?;
    if donor.is_encrypted() {
        return Err(AppendError::Encrypted);
    }
    donor.renumber_objects_with(output.max_id + 1);

    let donor_pages: Vec<ObjectId> = donor.get_pages().into_values().collect();
    let output_root = pages_root(output)?;

    let mut pages = Vec::with_capacity(donor_pages.len());
    for &page_id in &donor_pages {
        let mut page = donor.get_dictionary(page_id)?.clone();
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited(&donor, &page, key) {
                    page.set(key, value);
                }
            }
        }
        page.set("Parent", output_root);
        pages.push((page_id, page));
    }

    for (id, object) in donor.objects {
        let skip = match &object {
            Object::Dictionary(dict) => type_is(dict, b"Catalog") || type_is(dict, b"Pages"),
            Object::Stream(stream) => {
                type_is(&stream.dict, b"XRef") || type_is(&stream.dict, b"ObjStm")
            }
            _ => false,
        };
        if !skip {
            output.objects.insert(id, object);
        }
    }
    let count = pages.len();
    for (id, page) in pages {
        output.objects.insert(id, Object::Dictionary(page));
    }
    output.max_id = output.max_id.max(donor.max_id);

    let root = output.get_dictionary_mut(output_root)?;
    let mut kids = root
        .get(b"Kids")
        .and_then(Object::as_array)
        .cloned()
        .unwrap_or_default();
    kids.extend(donor_pages.into_iter().map(Object::Reference));
    let total = kids.len() as i64;
    root.set("Kids", kids);
    root.set("Count", total);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::build;
    use crate::test_helpers::{
        corrupt_png_bytes, nested_tree_pdf_bytes, page_texts, png_bytes, text_pdf_bytes,
        tiny_pdf_bytes,
    };

    fn img(name: &str) -> ImageForPdf {
        ImageForPdf::new(name, png_bytes(30, 20))
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn nothing_to_merge_is_no_content() {
        assert!(matches!(
            merge(&[], &[], &PdfSettings::default()),
            Err(PdfError::NoContent)
        ));
    }

    #[test]
    fn images_only_matches_build() {
        let settings = PdfSettings::default();
        let images = vec![img("a.png")];
        assert_eq!(
            merge(&images, &[], &settings).unwrap(),
            build(&images, &settings).unwrap()
        );
    }

    #[test]
    fn donor_pages_follow_image_pages() {
        let settings = PdfSettings {
            add_page_numbers: true,
            ..PdfSettings::default()
        };
        let externals = vec![
            ExternalPdf::new("one.pdf", text_pdf_bytes(&["donor-1a", "donor-1b"])),
            ExternalPdf::new("two.pdf", text_pdf_bytes(&["donor-2a"])),
        ];
        let bytes = merge(&[img("a.png"), img("b.png")], &externals, &settings).unwrap();
        let texts = page_texts(&bytes);
        assert_eq!(
            texts,
            vec![
                vec!["1 / 2".to_string()],
                vec!["2 / 2".to_string()],
                vec!["donor-1a".to_string()],
                vec!["donor-1b".to_string()],
                vec!["donor-2a".to_string()],
            ]
        );
    }

    #[test]
    fn donors_only_start_from_empty_document() {
        let externals = vec![ExternalPdf::new("doc.pdf", text_pdf_bytes(&["x", "y"]))];
        let bytes = merge(&[], &externals, &PdfSettings::default()).unwrap();
        assert_eq!(page_texts(&bytes), vec![vec!["x".to_string()], vec!["y".to_string()]]);
    }

    #[test]
    fn unreadable_donor_is_skipped() {
        let externals = vec![
            ExternalPdf::new("bad.pdf", b"%PDF-1.4 garbage".to_vec()),
            ExternalPdf::new("good.pdf", tiny_pdf_bytes()),
        ];
        let bytes = merge(&[img("a.png")], &externals, &PdfSettings::default()).unwrap();
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn all_donors_failing_without_images_is_empty_document() {
        let externals = vec![ExternalPdf::new("bad.pdf", b"not a pdf".to_vec())];
        assert!(matches!(
            merge(&[], &externals, &PdfSettings::default()),
            Err(PdfError::EmptyDocument)
        ));
    }

    #[test]
    fn failed_images_still_allow_donor_pages() {
        let images = vec![ImageForPdf::new("bad.png", corrupt_png_bytes())];
        let externals = vec![ExternalPdf::new("doc.pdf", tiny_pdf_bytes())];
        let bytes = merge(&images, &externals, &PdfSettings::default()).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn inherited_attributes_move_onto_pages() {
        let externals = vec![ExternalPdf::new("nested.pdf", nested_tree_pdf_bytes())];
        let bytes = merge(&[img("a.png")], &externals, &PdfSettings::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(pages.len(), 2);

        let donor_page = doc.get_dictionary(pages[1]).unwrap();
        let media_box = donor_page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 300.0);
        assert_eq!(donor_page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        assert!(donor_page.get(b"Resources").is_ok());

        let parent = donor_page.get(b"Parent").unwrap().as_reference().unwrap();
        assert_eq!(parent, pages_root(&doc).unwrap());
        assert_eq!(page_texts(&bytes)[1], ["nested"]);
    }

    #[test]
    fn page_count_is_updated() {
        let externals = vec![ExternalPdf::new("doc.pdf", text_pdf_bytes(&["p1", "p2", "p3"]))];
        let bytes = merge(&[img("a.png")], &externals, &PdfSettings::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let root = doc.get_dictionary(pages_root(&doc).unwrap()).unwrap();
        assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 4);
    }
}
