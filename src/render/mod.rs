//! Template engine: one runtime record + options → single-page PDF bytes.
//!
//! Layout is a shared foundation (background, frame, watermark, header,
//! footer) plus a body picked from [`bodies::DISPATCH`]. Fields are always
//! drawn; they become live AcroForm widgets only for records that are both
//! interactive and fillable.

pub mod bodies;
pub mod fields;
pub mod foundation;
pub mod layout;
pub mod text;

pub use fields::FieldSpec;
pub use layout::{Margins, Rect};

use std::io::BufWriter;

use chrono::NaiveDate;
use printpdf::{BuiltinFont, CustomPdfConformance, Mm, PdfConformance, PdfDocument};
use thiserror::Error;

use crate::models::{AssetTier, PaperFormat, QualityTier, RuntimeAssetRecord};
use bodies::BodyLayout;
use foundation::Canvas;
use layout::PageLayout;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Unsupported paper format '{0}' (expected A4, Letter or A3)")]
    UnsupportedPaperFormat(String),

    #[error("Unknown quality tier '{0}' (expected draft, standard or premium)")]
    UnknownQuality(String),

    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Save(String),

    #[error("Form field injection failed: {0}")]
    Fields(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub paper: PaperFormat,
    pub quality: QualityTier,
    /// Drives the watermark and accent colour only.
    pub presentation_tier: AssetTier,
    pub margins: Margins,
    pub interactive: bool,
    pub fillable: bool,
    pub brand: String,
    pub date: NaiveDate,
}

impl RenderOptions {
    /// Options taken from the record itself, on today's date.
    pub fn for_record(record: &RuntimeAssetRecord, brand: &str) -> Self {
        Self {
            paper: record.paper_variant.unwrap_or_default(),
            quality: QualityTier::default(),
            presentation_tier: record.tier,
            margins: Margins::default(),
            interactive: record.interactive,
            fillable: record.fillable,
            brand: brand.to_string(),
            date: chrono::Utc::now().date_naive(),
        }
    }

    pub fn live_fields(&self) -> bool {
        self.interactive && self.fillable
    }
}

/// Parse a paper label; the only hard configuration error in rendering.
pub fn parse_paper(raw: &str) -> Result<PaperFormat, RenderError> {
    raw.trim()
        .parse()
        .map_err(|_| RenderError::UnsupportedPaperFormat(raw.to_string()))
}

pub fn parse_quality(raw: &str) -> Result<QualityTier, RenderError> {
    raw.trim()
        .parse()
        .map_err(|_| RenderError::UnknownQuality(raw.to_string()))
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub warnings: Vec<String>,
    pub fields: Vec<FieldSpec>,
    /// True when `fields` were registered as live widgets.
    pub interactive: bool,
}

/// Print-ready output: embedded output-intent ICC profile plus XMP metadata.
/// Builtin fonts and layers stay allowed.
fn print_conformance() -> PdfConformance {
    PdfConformance::Custom(CustomPdfConformance {
        identifier: "Folio print".into(),
        requires_xmp_metadata: true,
        requires_icc_profile: true,
        allows_default_fonts: true,
        ..CustomPdfConformance::default()
    })
}

/// Render one record. Never fails on content; oversize margins and
/// overflowing text come back as warnings.
pub fn render(
    record: &RuntimeAssetRecord,
    options: &RenderOptions,
) -> Result<RenderedDocument, RenderError> {
    let mut warnings = Vec::new();
    let page = PageLayout::new(options.paper, options.margins, &mut warnings);

    let title = text::sanitize(&record.title);
    let (doc, page1, layer1) =
        PdfDocument::new(&title, Mm(page.width), Mm(page.height), "Layer 1");
    let doc = doc.with_conformance(print_conformance());
    let layer = doc.get_page(page1).get_layer(layer1);
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| RenderError::Font(e.to_string()))?;
    let canvas = Canvas::new(layer, regular, bold);

    let body_area = foundation::draw(&canvas, &page, record, options, &mut warnings);

    let body = bodies::layout_for(record.asset_type).unwrap_or_else(|| {
        warnings.push(format!(
            "no body layout for type '{}', using narrative",
            record.asset_type
        ));
        BodyLayout::Narrative
    });
    let accent = foundation::tier_accent(options.presentation_tier);
    let placed = bodies::draw(&canvas, body, body_area, record, accent, &mut warnings);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| RenderError::Save(e.to_string()))?;
    let mut bytes = buf
        .into_inner()
        .map_err(|e| RenderError::Save(e.to_string()))?;

    let live = options.live_fields() && !placed.is_empty();
    if live {
        bytes = fields::inject_widgets(&bytes, &placed)?;
    }

    for warning in &warnings {
        tracing::warn!(asset_id = %record.id, warning = %warning, "Render warning");
    }

    Ok(RenderedDocument {
        bytes,
        page_count: 1,
        warnings,
        fields: placed,
        interactive: live,
    })
}
