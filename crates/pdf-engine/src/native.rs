//! Native annotation objects managed by the editor.
//!
//! Text annotations are `/FreeText` dictionaries with a generated appearance
//! stream. Image stamps are `/Stamp` dictionaries whose normal appearance draws
//! one RGB image XObject with a grayscale soft mask. Anything else found in a
//! page's `/Annots` array is left untouched.

use crate::{PageBox, PdfEngineError, RgbaImage};
use image::Rgba;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::sync::Arc;

/// `/F` bit that marks an annotation as printable.
const PRINT_FLAG: i64 = 4;

const LINE_HEIGHT_MULTIPLIER: f32 = 1.2;

/// Inset of the first text line inside a free text appearance box.
const TEXT_INSET: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct NativeFreeText {
    pub rect: PageBox,
    pub contents: String,
    pub font_family: String,
    pub font_size: f32,
    /// RGB components in 0.0..=1.0.
    pub text_color: [f32; 3],
    pub background: Option<[f32; 3]>,
    pub printable: bool,
    /// Laid-out lines used for the appearance stream.
    pub lines: Vec<String>,
    pub line_height: f32,
}

#[derive(Debug, Clone)]
pub struct NativeStamp {
    pub rect: PageBox,
    pub image: Arc<RgbaImage>,
    pub printable: bool,
}

#[derive(Debug, Clone)]
pub enum NativeAnnotation {
    FreeText(NativeFreeText),
    Stamp(NativeStamp),
}

impl NativeAnnotation {
    pub fn rect(&self) -> PageBox {
        match self {
            NativeAnnotation::FreeText(text) => text.rect,
            NativeAnnotation::Stamp(stamp) => stamp.rect,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageAnnotations {
    pub page_index: u32,
    pub annotations: Vec<NativeAnnotation>,
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn name_of(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

fn float_of(doc: &Document, object: &Object) -> Option<f32> {
    resolve(doc, object).as_float().ok()
}

fn rect_from_object(doc: &Document, object: &Object) -> Option<PageBox> {
    let array = resolve(doc, object).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }

    let x0 = float_of(doc, &array[0])?;
    let y0 = float_of(doc, &array[1])?;
    let x1 = float_of(doc, &array[2])?;
    let y1 = float_of(doc, &array[3])?;
    Some(PageBox::from_corners(x0, y0, x1, y1))
}

fn rect_object(rect: PageBox) -> Object {
    Object::Array(vec![
        Object::Real(rect.x),
        Object::Real(rect.y),
        Object::Real(rect.max_x()),
        Object::Real(rect.max_y()),
    ])
}

fn color_of(doc: &Document, object: &Object) -> Option<[f32; 3]> {
    let array = resolve(doc, object).as_array().ok()?;
    match array.as_slice() {
        [gray] => {
            let gray = float_of(doc, gray)?;
            Some([gray, gray, gray])
        }
        [r, g, b] => Some([float_of(doc, r)?, float_of(doc, g)?, float_of(doc, b)?]),
        _ => None,
    }
}

fn color_object(color: [f32; 3]) -> Object {
    Object::Array(color.iter().map(|component| Object::Real(*component)).collect())
}

/// Look up a page box key, walking up the page tree for inherited values.
pub(crate) fn inherited_box(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<PageBox> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        let dict = doc.get_dictionary(id).ok()?;
        if let Some(found) = dict.get(key).ok().and_then(|object| rect_from_object(doc, object)) {
            return Some(found);
        }

        current = match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => Some(*parent),
            _ => None,
        };

        depth += 1;
        if depth > 32 {
            break;
        }
    }

    None
}

/// Decode a PDF text string (UTF-16BE with BOM, otherwise PDFDocEncoding).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> =
            utf16.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]])).collect();
        return String::from_utf16_lossy(&units);
    }

    bytes.iter().map(|byte| *byte as char).collect()
}

fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

fn string_of(doc: &Document, object: &Object) -> Option<String> {
    match resolve(doc, object) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// Content-stream literal for a line of text in a WinAnsi-encoded font.
fn content_literal(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + 2);
    bytes.push(b'(');
    for ch in text.chars() {
        let code = u32::from(ch);
        let byte = if code <= 0xFF { code as u8 } else { b'?' };
        if matches!(byte, b'(' | b')' | b'\\') {
            bytes.push(b'\\');
        }
        bytes.push(byte);
    }
    bytes.push(b')');
    bytes
}

/// Standard 14 font resource name and base font for a family.
fn font_resource(family: &str) -> (&'static str, &'static str) {
    let lower = family.to_ascii_lowercase();
    if lower.starts_with("courier") {
        ("Cour", "Courier")
    } else if lower.starts_with("times") {
        ("TiRo", "Times-Roman")
    } else {
        ("Helv", "Helvetica")
    }
}

fn family_for_resource(resource: &str) -> String {
    match resource {
        "Helv" => "Helvetica".to_owned(),
        "Cour" => "Courier".to_owned(),
        "TiRo" => "Times-Roman".to_owned(),
        other => other.to_owned(),
    }
}

/// Parse a `/DA` string such as `/Helv 12 Tf 0 0 1 rg`.
fn parse_default_appearance(da: &str) -> (String, f32, [f32; 3]) {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let mut family = "Helvetica".to_owned();
    let mut size = 12.0;
    let mut color = [0.0; 3];

    for (index, token) in tokens.iter().enumerate() {
        match *token {
            "Tf" if index >= 2 => {
                family = family_for_resource(tokens[index - 2].trim_start_matches('/'));
                size = tokens[index - 1].parse().unwrap_or(size);
            }
            "rg" if index >= 3 => {
                for (slot, value) in color.iter_mut().zip(&tokens[index - 3..index]) {
                    *slot = value.parse().unwrap_or(0.0);
                }
            }
            "g" if index >= 1 => {
                let gray = tokens[index - 1].parse().unwrap_or(0.0);
                color = [gray, gray, gray];
            }
            _ => {}
        }
    }

    (family, size, color)
}

fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

fn int_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|object| resolve(doc, object).as_i64().ok())
}

fn decode_image(doc: &Document, stream: &Stream) -> Option<RgbaImage> {
    let width = u32::try_from(int_of(doc, &stream.dict, b"Width")?).ok()?;
    let height = u32::try_from(int_of(doc, &stream.dict, b"Height")?).ok()?;
    if int_of(doc, &stream.dict, b"BitsPerComponent")? != 8 {
        return None;
    }
    if stream.dict.get(b"ColorSpace").ok().and_then(name_of)? != b"DeviceRGB" {
        return None;
    }

    let pixels = width as usize * height as usize;
    let rgb = stream_bytes(stream)?;
    if rgb.len() < pixels * 3 {
        return None;
    }

    let alpha = stream
        .dict
        .get(b"SMask")
        .ok()
        .and_then(|object| resolve(doc, object).as_stream().ok())
        .and_then(stream_bytes)
        .filter(|alpha| alpha.len() >= pixels);

    Some(RgbaImage::from_fn(width, height, |x, y| {
        let index = (y * width + x) as usize;
        let a = alpha.as_ref().map(|alpha| alpha[index]).unwrap_or(255);
        Rgba([rgb[index * 3], rgb[index * 3 + 1], rgb[index * 3 + 2], a])
    }))
}

fn parse_stamp_image(doc: &Document, dict: &Dictionary) -> Option<RgbaImage> {
    let appearance = resolve(doc, dict.get(b"AP").ok()?).as_dict().ok()?;
    let normal = resolve(doc, appearance.get(b"N").ok()?).as_stream().ok()?;
    let resources = resolve(doc, normal.dict.get(b"Resources").ok()?).as_dict().ok()?;
    let xobjects = resolve(doc, resources.get(b"XObject").ok()?).as_dict().ok()?;

    xobjects.iter().find_map(|(_, object)| {
        let stream = resolve(doc, object).as_stream().ok()?;
        if stream.dict.get(b"Subtype").ok().and_then(name_of)? != b"Image" {
            return None;
        }
        decode_image(doc, stream)
    })
}

fn parse_free_text(doc: &Document, dict: &Dictionary, rect: PageBox, printable: bool) -> NativeFreeText {
    let contents =
        dict.get(b"Contents").ok().and_then(|object| string_of(doc, object)).unwrap_or_default();
    let (font_family, font_size, text_color) = dict
        .get(b"DA")
        .ok()
        .and_then(|object| string_of(doc, object))
        .map(|da| parse_default_appearance(&da))
        .unwrap_or_else(|| ("Helvetica".to_owned(), 12.0, [0.0; 3]));
    let background = dict.get(b"C").ok().and_then(|object| color_of(doc, object));
    let lines = contents.lines().map(str::to_owned).collect();

    NativeFreeText {
        rect,
        contents,
        font_family,
        font_size,
        text_color,
        background,
        printable,
        lines,
        line_height: font_size * LINE_HEIGHT_MULTIPLIER,
    }
}

fn parse_annotation(doc: &Document, dict: &Dictionary) -> Option<NativeAnnotation> {
    let rect = rect_from_object(doc, dict.get(b"Rect").ok()?)?;
    let printable = int_of(doc, dict, b"F").map(|flags| flags & PRINT_FLAG != 0).unwrap_or(false);

    match name_of(resolve(doc, dict.get(b"Subtype").ok()?))? {
        b"FreeText" => Some(NativeAnnotation::FreeText(parse_free_text(doc, dict, rect, printable))),
        b"Stamp" => parse_stamp_image(doc, dict).map(|image| {
            NativeAnnotation::Stamp(NativeStamp { rect, image: Arc::new(image), printable })
        }),
        _ => None,
    }
}

fn annotation_entries(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };

    match page.get(b"Annots") {
        Ok(object) => resolve(doc, object).as_array().map(|array| array.to_vec()).unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}

pub(crate) fn read_page_annotations(doc: &Document, page_id: ObjectId) -> Vec<NativeAnnotation> {
    annotation_entries(doc, page_id)
        .iter()
        .filter_map(|entry| {
            let dict = resolve(doc, entry).as_dict().ok()?;
            parse_annotation(doc, dict)
        })
        .collect()
}

fn free_text_appearance(text: &NativeFreeText, resource: &str) -> Vec<u8> {
    let [r, g, b] = text.text_color;
    let mut content = Vec::new();

    if let Some([br, bg, bb]) = text.background {
        content.extend_from_slice(
            format!("{br} {bg} {bb} rg\n0 0 {} {} re f\n", text.rect.width, text.rect.height)
                .as_bytes(),
        );
    }

    content.extend_from_slice(format!("BT\n/{resource} {} Tf\n{r} {g} {b} rg\n", text.font_size).as_bytes());

    let mut baseline = text.rect.height - TEXT_INSET - text.font_size * 0.8;
    for line in &text.lines {
        content.extend_from_slice(format!("1 0 0 1 {TEXT_INSET} {baseline} Tm\n").as_bytes());
        content.extend_from_slice(&content_literal(line));
        content.extend_from_slice(b" Tj\n");
        baseline -= text.line_height;
    }

    content.extend_from_slice(b"ET\n");
    content
}

fn add_free_text(doc: &mut Document, text: &NativeFreeText) -> ObjectId {
    let (resource, base_font) = font_resource(&text.font_family);
    let [r, g, b] = text.text_color;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    });

    let appearance = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => rect_object(PageBox::new(0.0, 0.0, text.rect.width, text.rect.height)),
            "Resources" => dictionary! {
                "Font" => dictionary! { resource => font_id },
            },
        },
        free_text_appearance(text, resource),
    );
    let appearance_id = doc.add_object(appearance);

    let default_appearance = format!("/{resource} {} Tf {r} {g} {b} rg", text.font_size);
    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "FreeText",
        "Rect" => rect_object(text.rect),
        "Contents" => Object::String(encode_text_string(&text.contents), StringFormat::Literal),
        "DA" => Object::String(default_appearance.into_bytes(), StringFormat::Literal),
        "F" => if text.printable { PRINT_FLAG } else { 0 },
        "Border" => Object::Array(vec![Object::Integer(0); 3]),
        "AP" => dictionary! { "N" => appearance_id },
    };
    if let Some(background) = text.background {
        annot.set("C", color_object(background));
    }

    doc.add_object(annot)
}

/// Bytes needed for `channels` samples per pixel, computed without `u32` overflow.
fn sample_count(width: u32, height: u32, channels: usize) -> usize {
    width as usize * height as usize * channels
}

fn add_stamp(doc: &mut Document, stamp: &NativeStamp) -> Result<ObjectId, PdfEngineError> {
    let (width, height) = stamp.image.dimensions();
    let mut rgb = Vec::with_capacity(sample_count(width, height, 3));
    let mut alpha = Vec::with_capacity(sample_count(width, height, 1));
    for pixel in stamp.image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut smask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    );
    smask.compress()?;
    let smask_id = doc.add_object(smask);

    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    );
    image.compress()?;
    let image_id = doc.add_object(image);

    // The image occupies the unit square; the viewer maps BBox onto Rect.
    let appearance = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => rect_object(PageBox::new(0.0, 0.0, 1.0, 1.0)),
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        },
        b"q\n1 0 0 1 0 0 cm\n/Im0 Do\nQ\n".to_vec(),
    );
    let appearance_id = doc.add_object(appearance);

    Ok(doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Stamp",
        "Rect" => rect_object(stamp.rect),
        "F" => if stamp.printable { PRINT_FLAG } else { 0 },
        "AP" => dictionary! { "N" => appearance_id },
    }))
}

/// Replace the editor-managed annotations of a page, keeping foreign ones.
pub(crate) fn replace_page_annotations(
    doc: &mut Document,
    page_id: ObjectId,
    annotations: &[NativeAnnotation],
) -> Result<(), PdfEngineError> {
    let reader: &Document = doc;
    let mut entries: Vec<Object> = annotation_entries(reader, page_id)
        .into_iter()
        .filter(|entry| {
            resolve(reader, entry)
                .as_dict()
                .ok()
                .and_then(|dict| parse_annotation(reader, dict))
                .is_none()
        })
        .collect();

    for annotation in annotations {
        let id = match annotation {
            NativeAnnotation::FreeText(text) => add_free_text(doc, text),
            NativeAnnotation::Stamp(stamp) => add_stamp(doc, stamp)?,
        };
        entries.push(Object::Reference(id));
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    if entries.is_empty() {
        page.remove(b"Annots");
    } else {
        page.set("Annots", Object::Array(entries));
    }

    Ok(())
}
