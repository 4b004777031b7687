//! Render images onto pages.
//!
//! ## Pipeline
//!
//! 1. **Prepare** (parallel): decode each image, flatten alpha onto white,
//!    encode as JPEG at `settings.quality`. Results are collected in plan
//!    order regardless of which worker finishes first.
//! 2. **Lay out** (sequential): optional cover page, then one page per
//!    prepared image with the image placed by [`place_image`] and an optional
//!    `"n / total"` footer.
//! 3. **Write**: compress content streams and serialize.
//!
//! An image that fails to prepare is logged and gets no page. The footer's
//! `n` counts rendered image pages while `total` is the number of image
//! entries in the plan; the cover page is never numbered.

use super::geometry::{mm_to_pt, page_dimensions, place_image};
use super::text::{self, FONT_RESOURCE};
use super::{ImageForPdf, PdfError, PdfSettings};
use crate::imaging::{
    CodecError, EncodeSettings, ImageBackend, ImageCodec, OutputFormat, PixelBuffer,
};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use rayon::prelude::*;
use thiserror::Error;

const PDF_VERSION: &str = "1.5";
const COVER_FONT_SIZE: f64 = 24.0;
const PAGE_NUMBER_FONT_SIZE: f64 = 10.0;
/// Page-number baseline, from the bottom edge.
const PAGE_NUMBER_OFFSET_MM: f64 = 10.0;
const IMAGE_RESOURCE: &str = "Im0";

#[derive(Error, Debug)]
enum PrepareError {
    #[error(transparent)]
    Decode(#[from] CodecError),
    #[error("JPEG encoder unavailable, got {0}")]
    NotJpeg(OutputFormat),
}

/// An image ready to embed.
struct PreparedImage {
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
}

/// Assemble `images` with the default codec.
pub fn build(images: &[ImageForPdf], settings: &PdfSettings) -> Result<Vec<u8>, PdfError> {
    build_with(&ImageCodec::new(), images, settings)
}

pub fn build_with<B: ImageBackend>(
    codec: &ImageCodec<B>,
    images: &[ImageForPdf],
    settings: &PdfSettings,
) -> Result<Vec<u8>, PdfError> {
    let mut doc = build_document(codec, images, settings)?;
    save(&mut doc)
}

pub(crate) fn save(doc: &mut Document) -> Result<Vec<u8>, PdfError> {
    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

pub(crate) fn build_document<B: ImageBackend>(
    codec: &ImageCodec<B>,
    images: &[ImageForPdf],
    settings: &PdfSettings,
) -> Result<Document, PdfError> {
    if images.is_empty() {
        return Err(PdfError::NoContent);
    }
    settings.validate()?;

    let prepared: Vec<PreparedImage> = images
        .par_iter()
        .map(|image| (image, prepare(codec, image, settings)))
        .collect::<Vec<_>>()
        .into_iter()
        .filter_map(|(image, result)| match result {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("Skipping {}: {e}", image.name);
                None
            }
        })
        .collect();

    if prepared.is_empty() && !settings.add_cover_page {
        return Err(PdfError::EmptyDocument);
    }

    let (page_w, page_h) = page_dimensions(settings.page_size, settings.orientation);
    let mut writer = DocumentWriter::new(page_w, page_h);

    if settings.add_cover_page {
        let ops = text::centered_line(
            settings.cover_title(),
            COVER_FONT_SIZE,
            mm_to_pt(page_w) / 2.0,
            mm_to_pt(page_h) / 2.0,
        );
        writer.add_page(ops, None)?;
    }

    let total = images.len();
    let rendered = prepared.len();
    for (index, image) in prepared.into_iter().enumerate() {
        let placement = place_image(
            f64::from(image.width),
            f64::from(image.height),
            page_w,
            page_h,
            settings.margin,
            settings.fit_mode,
        );
        let (x, y, w, h) = placement.to_points(page_h);
        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w as f32),
                    0.into(),
                    0.into(),
                    Object::Real(h as f32),
                    Object::Real(x as f32),
                    Object::Real(y as f32),
                ],
            ),
            Operation::new("Do", vec![IMAGE_RESOURCE.into()]),
            Operation::new("Q", vec![]),
        ];
        if settings.add_page_numbers {
            ops.extend(text::centered_line(
                &format!("{} / {total}", index + 1),
                PAGE_NUMBER_FONT_SIZE,
                mm_to_pt(page_w) / 2.0,
                mm_to_pt(PAGE_NUMBER_OFFSET_MM),
            ));
        }
        writer.add_page(ops, Some(image))?;
    }

    log::debug!(
        "Assembled {} page(s), {rendered} of {total} image(s)",
        writer.page_count()
    );
    Ok(writer.finish())
}

fn prepare<B: ImageBackend>(
    codec: &ImageCodec<B>,
    image: &ImageForPdf,
    settings: &PdfSettings,
) -> Result<PreparedImage, PrepareError> {
    let decoded = codec.decode(&image.bytes)?;
    let pixels = flatten_on_white(decoded.pixels);
    let encoded = codec.encode(
        &pixels,
        EncodeSettings {
            format: OutputFormat::Jpeg,
            quality: settings.quality,
        },
    );
    if encoded.format != OutputFormat::Jpeg {
        return Err(PrepareError::NotJpeg(encoded.format));
    }
    Ok(PreparedImage {
        jpeg: encoded.bytes,
        width: encoded.width,
        height: encoded.height,
    })
}

/// Composite onto an opaque white background.
fn flatten_on_white(mut pixels: PixelBuffer) -> PixelBuffer {
    for px in pixels.pixels_mut() {
        let alpha = u32::from(px[3]);
        if alpha == 255 {
            continue;
        }
        for channel in &mut px.0[..3] {
            *channel = ((u32::from(*channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        }
        px[3] = 255;
    }
    pixels
}

/// Accumulates pages under a single page tree.
struct DocumentWriter {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
    media_box: Vec<Object>,
}

impl DocumentWriter {
    fn new(page_w_mm: f64, page_h_mm: f64) -> Self {
        let mut doc = Document::with_version(PDF_VERSION);
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(text::font_dictionary());
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
            media_box: vec![
                0.into(),
                0.into(),
                Object::Real(mm_to_pt(page_w_mm) as f32),
                Object::Real(mm_to_pt(page_h_mm) as f32),
            ],
        }
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn add_page(
        &mut self,
        operations: Vec<Operation>,
        image: Option<PreparedImage>,
    ) -> Result<(), PdfError> {
        let mut resources = dictionary! {
            "Font" => dictionary! { FONT_RESOURCE => self.font_id },
        };
        if let Some(image) = image {
            let image_id = self.doc.add_object(image_stream(image));
            resources.set("XObject", dictionary! { IMAGE_RESOURCE => image_id });
        }

        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Document {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
            "MediaBox" => self.media_box,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        self.doc
    }
}

/// JPEG bytes as a DCT image XObject, drawn without interpolation.
fn image_stream(image: PreparedImage) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width),
        "Height" => i64::from(image.height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
        "Interpolate" => false,
    };
    Stream::new(dict, image.jpeg).with_compression(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::pdf::{FitMode, Orientation, PageSize};
    use crate::test_helpers::{corrupt_png_bytes, jpeg_bytes, page_texts, png_bytes, rgba_png_bytes};

    fn images(n: usize) -> Vec<ImageForPdf> {
        (0..n)
            .map(|i| ImageForPdf::new(format!("img{i}.png"), png_bytes(40 + i as u32, 30)))
            .collect()
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn one_page_per_image() {
        let bytes = build(&images(3), &PdfSettings::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 3);
    }

    #[test]
    fn empty_input_is_no_content() {
        assert!(matches!(
            build(&[], &PdfSettings::default()),
            Err(PdfError::NoContent)
        ));
    }

    #[test]
    fn corrupt_image_is_skipped() {
        let entries = vec![
            ImageForPdf::new("a.png", png_bytes(20, 20)),
            ImageForPdf::new("broken.png", corrupt_png_bytes()),
            ImageForPdf::new("c.jpg", jpeg_bytes(20, 20)),
        ];
        let bytes = build(&entries, &PdfSettings::default()).unwrap();
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn all_images_failing_is_empty_document() {
        let entries = vec![ImageForPdf::new("broken.png", corrupt_png_bytes())];
        assert!(matches!(
            build(&entries, &PdfSettings::default()),
            Err(PdfError::EmptyDocument)
        ));
    }

    #[test]
    fn cover_page_is_first_and_unnumbered() {
        let settings = PdfSettings {
            add_cover_page: true,
            add_page_numbers: true,
            ..PdfSettings::default()
        };
        let bytes = build(&images(3), &settings).unwrap();
        let texts = page_texts(&bytes);
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], ["My PDF"]);
        assert_eq!(texts[1], ["1 / 3"]);
        assert_eq!(texts[2], ["2 / 3"]);
        assert_eq!(texts[3], ["3 / 3"]);
    }

    #[test]
    fn custom_cover_title() {
        let settings = PdfSettings {
            add_cover_page: true,
            cover_title: Some("Summer 2024".into()),
            ..PdfSettings::default()
        };
        let texts = page_texts(&build(&images(1), &settings).unwrap());
        assert_eq!(texts[0], ["Summer 2024"]);
        assert!(texts[1].is_empty());
    }

    #[test]
    fn page_numbers_without_cover() {
        let settings = PdfSettings {
            add_page_numbers: true,
            ..PdfSettings::default()
        };
        let texts = page_texts(&build(&images(2), &settings).unwrap());
        assert_eq!(texts, vec![vec!["1 / 2".to_string()], vec!["2 / 2".to_string()]]);
    }

    #[test]
    fn page_total_counts_every_image_entry() {
        let settings = PdfSettings {
            add_page_numbers: true,
            ..PdfSettings::default()
        };
        let entries = vec![
            ImageForPdf::new("a.png", png_bytes(10, 10)),
            ImageForPdf::new("bad.png", corrupt_png_bytes()),
            ImageForPdf::new("c.png", png_bytes(10, 10)),
        ];
        let texts = page_texts(&build(&entries, &settings).unwrap());
        assert_eq!(texts, vec![vec!["1 / 3".to_string()], vec!["2 / 3".to_string()]]);
    }

    #[test]
    fn margin_wider_than_page_is_rejected() {
        let settings = PdfSettings {
            margin: 150.0,
            ..PdfSettings::default()
        };
        let result = build(&images(1), &settings);
        assert!(matches!(result, Err(PdfError::InvalidSettings(_))));
    }

    #[test]
    fn pages_follow_plan_order() {
        let entries: Vec<ImageForPdf> = (1..=6)
            .map(|i| ImageForPdf::new(format!("{i}.png"), png_bytes(i * 10, 5)))
            .collect();
        let bytes = build(&entries, &PdfSettings::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let widths: Vec<i64> = doc
            .get_pages()
            .values()
            .map(|&page_id| {
                let page = doc.get_dictionary(page_id).unwrap();
                let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
                let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
                let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
                let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
                stream.dict.get(b"Width").unwrap().as_i64().unwrap()
            })
            .collect();
        assert_eq!(widths, vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn image_xobject_is_dct_without_interpolation() {
        let bytes = build(&images(1), &PdfSettings::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let image = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(&b"Image"[..]))
            .unwrap();
        assert_eq!(image.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert!(!image.dict.get(b"Interpolate").unwrap().as_bool().unwrap());
        assert!(image.content.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn media_box_follows_page_size_and_orientation() {
        let settings = PdfSettings {
            page_size: PageSize::Letter,
            orientation: Orientation::Landscape,
            fit_mode: FitMode::Original,
            ..PdfSettings::default()
        };
        let bytes = build(&images(1), &settings).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let pages_id = doc
            .get_dictionary(root)
            .unwrap()
            .get(b"Pages")
            .unwrap()
            .as_reference()
            .unwrap();
        let media_box = doc
            .get_dictionary(pages_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        let w = media_box[2].as_float().unwrap();
        let h = media_box[3].as_float().unwrap();
        assert!((w - 279.0 * 72.0 / 25.4).abs() < 0.01);
        assert!((h - 216.0 * 72.0 / 25.4).abs() < 0.01);
    }

    #[test]
    fn transparency_is_flattened_on_white() {
        let flattened = flatten_on_white(PixelBuffer::from_pixel(1, 1, image::Rgba([0, 0, 0, 0])));
        assert_eq!(flattened.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let half = flatten_on_white(PixelBuffer::from_pixel(1, 1, image::Rgba([0, 0, 0, 128])));
        assert_eq!(half.get_pixel(0, 0).0, [127, 127, 127, 255]);

        let bytes = build(
            &[ImageForPdf::new("clear.png", rgba_png_bytes(8, 8, [0, 0, 0, 0]))],
            &PdfSettings::default(),
        )
        .unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn embedded_images_use_pdf_quality() {
        let codec = ImageCodec::with_backend(MockBackend::new());
        let settings = PdfSettings {
            quality: crate::imaging::Quality::new(55),
            ..PdfSettings::default()
        };
        build_with(&codec, &images(2), &settings).unwrap();
        let ops = codec.backend().get_operations();
        let jpeg_qualities: Vec<u32> = ops
            .iter()
            .filter_map(|op| match op {
                crate::imaging::backend::tests::RecordedOp::Encode {
                    format: OutputFormat::Jpeg,
                    quality,
                    ..
                } => Some(*quality),
                _ => None,
            })
            .collect();
        assert_eq!(jpeg_qualities, vec![55, 55]);
    }

    #[test]
    fn failing_jpeg_encoder_skips_the_image() {
        let codec = ImageCodec::with_backend(MockBackend::failing(&[OutputFormat::Jpeg]));
        let result = build_with(&codec, &images(1), &PdfSettings::default());
        assert!(matches!(result, Err(PdfError::EmptyDocument)));
    }

    #[test]
    fn identical_input_gives_identical_bytes() {
        let a = build(&images(2), &PdfSettings::default()).unwrap();
        let b = build(&images(2), &PdfSettings::default()).unwrap();
        assert_eq!(a, b);
    }
}
