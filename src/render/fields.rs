//! Form fields: the labelled box every body draws, and the AcroForm
//! post-pass that turns placed fields into live widgets.
//!
//! printpdf has no form support, so widgets are added with `lopdf` on the
//! saved bytes, at exactly the coordinates the static boxes were drawn.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;

use super::foundation::{Canvas, Tint};
use super::layout::Rect;
use super::text::{self, Face};
use super::RenderError;
use crate::models::FieldStyle;

const MM_TO_PT: f32 = 72.0 / 25.4;
const LABEL_PT: f32 = 8.0;
/// Space reserved above a box for its label.
pub const LABEL_BAND_MM: f32 = 5.0;
pub const CHECKBOX_MM: f32 = 5.0;

/// PDF field flag bit 13: multiline text.
const FF_MULTILINE: i64 = 1 << 12;
/// PDF annotation flag bit 3: print.
const ANNOT_PRINT: i64 = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    pub style: FieldStyle,
    /// Input box, without the label band.
    pub rect: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<u32>,
}

impl FieldSpec {
    pub fn new(id: &str, label: &str, style: FieldStyle, rect: Rect) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            style,
            rect,
            value: None,
            max_len: None,
        }
    }

    pub fn with_max_len(mut self, max_len: u32) -> Self {
        self.max_len = Some(max_len);
        self
    }
}

/// Split a slot into (label band, input box).
pub fn label_and_box(slot: Rect) -> (Rect, Rect) {
    slot.split_top(LABEL_BAND_MM)
}

/// Draw a field's label and border. Identical whether or not it goes live.
pub fn draw_field(canvas: &Canvas, field: &FieldSpec, accent: Tint) {
    let label = text::ellipsize(&field.label, LABEL_PT, Face::Bold, field.rect.w);
    match field.style {
        FieldStyle::Checkbox => {
            canvas.stroke_rect(field.rect, accent, 0.8);
            canvas.text(
                &label,
                LABEL_PT,
                field.rect.right() + 2.0,
                field.rect.y + 1.2,
                Face::Bold,
                Tint::INK,
            );
        }
        FieldStyle::Text | FieldStyle::Multiline => {
            canvas.text(&label, LABEL_PT, field.rect.x, field.rect.top() + 1.5, Face::Bold, Tint::MUTED);
            canvas.fill_rect(field.rect, Tint::WHITE);
            canvas.stroke_rect(field.rect, Tint::RULE, 0.6);
        }
    }
}

fn pdf_rect(rect: Rect) -> Vec<Object> {
    [rect.x, rect.y, rect.right(), rect.top()]
        .iter()
        .map(|mm| Object::Integer((mm * MM_TO_PT).round() as i64))
        .collect()
}

/// Appearance streams for a checkbox: a cross when on, nothing when off.
fn checkbox_appearance(doc: &mut Document, rect: Rect) -> Object {
    let w = (rect.w * MM_TO_PT).round() as i64;
    let h = (rect.h * MM_TO_PT).round() as i64;
    let bbox = || {
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(w),
            Object::Integer(h),
        ])
    };
    let on = format!(
        "q 0 G 1 w 2 2 m {} {} l S 2 {} m {} 2 l S Q",
        w - 2,
        h - 2,
        h - 2,
        w - 2
    );
    let on_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "XObject", "Subtype" => "Form", "BBox" => bbox() },
        on.into_bytes(),
    ));
    let off_id = doc.add_object(Stream::new(
        dictionary! { "Type" => "XObject", "Subtype" => "Form", "BBox" => bbox() },
        Vec::new(),
    ));
    Object::Dictionary(dictionary! {
        "N" => dictionary! { "Yes" => on_id, "Off" => off_id },
    })
}

fn widget(doc: &mut Document, field: &FieldSpec, page_id: ObjectId) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal(field.id.as_str()),
        "TU" => Object::string_literal(text::sanitize(&field.label)),
        "Rect" => pdf_rect(field.rect),
        "F" => ANNOT_PRINT,
        "P" => page_id,
    };
    match field.style {
        FieldStyle::Checkbox => {
            dict.set("FT", "Btn");
            dict.set("V", "Off");
            dict.set("AS", "Off");
            dict.set("AP", checkbox_appearance(doc, field.rect));
        }
        FieldStyle::Text | FieldStyle::Multiline => {
            dict.set("FT", "Tx");
            dict.set("DA", Object::string_literal("/Helv 10 Tf 0 g"));
            if field.style == FieldStyle::Multiline {
                dict.set("Ff", FF_MULTILINE);
            }
            if let Some(value) = &field.value {
                dict.set("V", Object::string_literal(text::sanitize(value)));
            }
            if let Some(max_len) = field.max_len {
                dict.set("MaxLen", max_len as i64);
            }
        }
    }
    doc.add_object(dict)
}

fn lopdf_err(e: lopdf::Error) -> RenderError {
    RenderError::Fields(e.to_string())
}

/// Register `fields` as AcroForm widgets on the first page of `pdf`.
pub fn inject_widgets(pdf: &[u8], fields: &[FieldSpec]) -> Result<Vec<u8>, RenderError> {
    if fields.is_empty() {
        return Ok(pdf.to_vec());
    }
    let mut doc = Document::load_mem(pdf).map_err(lopdf_err)?;
    let page_id = *doc
        .get_pages()
        .values()
        .next()
        .ok_or_else(|| RenderError::Fields("document has no pages".into()))?;

    let helv = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let widget_ids: Vec<ObjectId> = fields.iter().map(|f| widget(&mut doc, f, page_id)).collect();
    let refs: Vec<Object> = widget_ids.iter().map(|id| Object::Reference(*id)).collect();

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(lopdf_err)?;
    let mut annots = match page.get(b"Annots") {
        Ok(Object::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };
    annots.extend(refs.iter().cloned());
    page.set("Annots", annots);

    let acroform = doc.add_object(dictionary! {
        "Fields" => refs,
        "NeedAppearances" => true,
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => helv } },
    });
    let root_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(lopdf_err)?;
    doc.get_object_mut(root_id)
        .and_then(Object::as_dict_mut)
        .map_err(lopdf_err)?
        .set("AcroForm", acroform);

    let mut out = Vec::with_capacity(pdf.len() + fields.len() * 256);
    doc.save_to(&mut out).map_err(|e| RenderError::Fields(e.to_string()))?;
    Ok(out)
}

/// Widget rectangles (PDF points) keyed by field name, read back from a PDF.
#[cfg(test)]
pub(crate) fn read_widgets(pdf: &[u8]) -> Vec<(String, [f32; 4])> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let Ok(annots) = page.get(b"Annots").and_then(Object::as_array) else {
        return Vec::new();
    };
    annots
        .iter()
        .map(|r| {
            let dict = doc
                .get_object(r.as_reference().unwrap())
                .unwrap()
                .as_dict()
                .unwrap();
            let name = String::from_utf8_lossy(dict.get(b"T").unwrap().as_str().unwrap()).into_owned();
            let rect = dict.get(b"Rect").unwrap().as_array().unwrap();
            let n: Vec<f32> = rect.iter().map(|o| o.as_float().unwrap()).collect();
            (name, [n[0], n[1], n[2], n[3]])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_band_sits_above_box() {
        let slot = Rect::new(20.0, 50.0, 80.0, 30.0);
        let (label, input) = label_and_box(slot);
        assert_eq!(label.h, LABEL_BAND_MM);
        assert_eq!(input.top(), label.y);
        assert_eq!(input.h, 30.0 - LABEL_BAND_MM);
    }

    #[test]
    fn pdf_rect_converts_millimetres() {
        let rect: Vec<i64> = pdf_rect(Rect::new(25.4, 0.0, 25.4, 50.8))
            .iter()
            .map(|o| o.as_i64().unwrap())
            .collect();
        assert_eq!(rect, vec![72, 0, 144, 144]);
    }

    #[test]
    fn injection_without_fields_is_identity() {
        let bytes = b"%PDF-1.3 whatever".to_vec();
        assert_eq!(inject_widgets(&bytes, &[]).unwrap(), bytes);
    }

    #[test]
    fn garbage_input_is_a_field_error() {
        let field = FieldSpec::new("a", "A", FieldStyle::Text, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(matches!(
            inject_widgets(b"not a pdf", &[field]),
            Err(RenderError::Fields(_))
        ));
    }
}
