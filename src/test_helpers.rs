//! Shared test utilities for the photopro test suite.
//!
//! Fixtures are generated in memory rather than read from disk: small
//! synthetic images in each input container, and minimal PDFs built with
//! `lopdf` whose pages carry a single line of text so page order can be
//! asserted after a merge.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let bytes = merge(&[ImageForPdf::new("a.png", png_bytes(30, 20))],
//!                   &[ExternalPdf::new("doc.pdf", text_pdf_bytes(&["p1"]))],
//!                   &PdfSettings::default()).unwrap();
//! assert_eq!(page_texts(&bytes), vec![vec![], vec!["p1".to_string()]]);
//! ```

use crate::loading::LoadingSignal;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::io::Cursor;
use std::sync::Mutex;

// =========================================================================
// Image fixtures
// =========================================================================

fn pattern(x: u32, y: u32) -> [u8; 3] {
    [
        (x * 7 + y * 3) as u8,
        (y * 11 ^ x * 5) as u8,
        ((x + y) * 13) as u8,
    ]
}

fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// Opaque patterned PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b] = pattern(x, y);
        Rgba([r, g, b, 255])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Single-color PNG, alpha included.
pub fn rgba_png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// Patterned baseline JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb(pattern(x, y)));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// PNG signature followed by a truncated stream: sniffs as PNG, fails to decode.
pub fn corrupt_png_bytes() -> Vec<u8> {
    let mut bytes = png_bytes(16, 16);
    bytes.truncate(40);
    bytes
}

// =========================================================================
// PDF fixtures
// =========================================================================

fn text_page_content(text: &str) -> Vec<u8> {
    Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    }
    .encode()
    .unwrap()
}

fn font_resources(doc: &mut Document) -> lopdf::Dictionary {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    dictionary! { "Font" => dictionary! { "F1" => font_id } }
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// A PDF with one page per entry, each showing that text.
pub fn text_pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources = font_resources(&mut doc);

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content_id = doc.add_object(Stream::new(dictionary! {}, text_page_content(text)));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources.clone(),
            })
            .into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    finish(doc, pages_id)
}

/// A one-page PDF.
pub fn tiny_pdf_bytes() -> Vec<u8> {
    text_pdf_bytes(&["tiny"])
}

/// One page two levels deep; `MediaBox` (300×400), `Rotate` (90) and
/// `Resources` live only on the root `Pages` node.
pub fn nested_tree_pdf_bytes() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let middle_id = doc.new_object_id();
    let resources = font_resources(&mut doc);

    let content_id = doc.add_object(Stream::new(dictionary! {}, text_page_content("nested")));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => middle_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        middle_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(middle_id)],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            "Rotate" => 90,
            "Resources" => resources,
        }),
    );
    finish(doc, root_id)
}

/// Every `Tj` string on every page, in page order.
pub fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            Content::decode(&content)
                .unwrap()
                .operations
                .into_iter()
                .filter(|op| op.operator == "Tj")
                .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
                .collect()
        })
        .collect()
}

// =========================================================================
// Loading signal recorder
// =========================================================================

/// Records `show:{message}` / `hide` events in order.
#[derive(Default)]
pub struct RecordingSignal {
    events: Mutex<Vec<String>>,
}

impl RecordingSignal {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl LoadingSignal for RecordingSignal {
    fn show(&self, message: &str) {
        self.events.lock().unwrap().push(format!("show:{message}"));
    }

    fn hide(&self) {
        self.events.lock().unwrap().push("hide".into());
    }
}
