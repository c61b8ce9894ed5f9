//! Shared single-page foundation: background, frame, tier watermark,
//! header and footer. Bodies draw inside the rectangle this returns.

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    Color, IndirectFontRef, Line, Mm, PdfLayerReference, Point, Polygon, Pt, Rgb, TextMatrix,
};

use super::layout::{PageLayout, Rect};
use super::text::{self, Face};
use super::RenderOptions;
use crate::models::{AssetTier, QualityTier, RuntimeAssetRecord};

const MM_TO_PT: f32 = 72.0 / 25.4;

const TITLE_PT: f32 = 18.0;
const TITLE_MAX_LINES: usize = 2;
const META_PT: f32 = 8.5;
const FOOTER_PT: f32 = 8.0;
const FOOTER_HEIGHT_MM: f32 = 12.0;
const WATERMARK_PT: f32 = 54.0;
/// Padding between the frame and anything drawn inside it.
pub const FRAME_PADDING_MM: f32 = 6.0;

/// RGB colour, components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint(pub f32, pub f32, pub f32);

impl Tint {
    pub const INK: Tint = Tint(0.13, 0.14, 0.16);
    pub const MUTED: Tint = Tint(0.42, 0.44, 0.48);
    pub const RULE: Tint = Tint(0.78, 0.79, 0.81);
    pub const PAPER: Tint = Tint(0.985, 0.98, 0.965);
    pub const WHITE: Tint = Tint(1.0, 1.0, 1.0);

    /// Blend towards white; `amount` 1.0 is white.
    pub fn lighten(self, amount: f32) -> Tint {
        let mix = |c: f32| c + (1.0 - c) * amount;
        Tint(mix(self.0), mix(self.1), mix(self.2))
    }

    fn color(self) -> Color {
        Color::Rgb(Rgb::new(self.0, self.1, self.2, None))
    }
}

/// Accent colour per tier.
pub fn tier_accent(tier: AssetTier) -> Tint {
    match tier {
        AssetTier::Free => Tint(0.27, 0.42, 0.56),
        AssetTier::Member => Tint(0.10, 0.52, 0.48),
        AssetTier::Architect => Tint(0.33, 0.29, 0.62),
        AssetTier::InnerCircle => Tint(0.62, 0.45, 0.12),
    }
}

/// Thin drawing surface over one printpdf layer.
pub struct Canvas {
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x), Mm(y)), false)
}

fn corners(rect: Rect) -> Vec<(Point, bool)> {
    vec![
        point(rect.x, rect.y),
        point(rect.right(), rect.y),
        point(rect.right(), rect.top()),
        point(rect.x, rect.top()),
    ]
}

impl Canvas {
    pub fn new(layer: PdfLayerReference, regular: IndirectFontRef, bold: IndirectFontRef) -> Self {
        Self {
            layer,
            regular,
            bold,
        }
    }

    fn font(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
        }
    }

    pub fn fill_rect(&self, rect: Rect, tint: Tint) {
        self.layer.set_fill_color(tint.color());
        self.layer.add_polygon(Polygon {
            rings: vec![corners(rect)],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }

    pub fn stroke_rect(&self, rect: Rect, tint: Tint, thickness_pt: f32) {
        self.layer.set_outline_color(tint.color());
        self.layer.set_outline_thickness(thickness_pt);
        self.layer.add_line(Line {
            points: corners(rect),
            is_closed: true,
        });
    }

    pub fn hline(&self, x1: f32, x2: f32, y: f32, tint: Tint, thickness_pt: f32) {
        self.layer.set_outline_color(tint.color());
        self.layer.set_outline_thickness(thickness_pt);
        self.layer.add_line(Line {
            points: vec![point(x1, y), point(x2, y)],
            is_closed: false,
        });
    }

    /// Single line of text with its baseline at `y`.
    pub fn text(&self, value: &str, size_pt: f32, x: f32, y: f32, face: Face, tint: Tint) {
        self.layer.set_fill_color(tint.color());
        self.layer
            .use_text(text::sanitize(value), size_pt, Mm(x), Mm(y), self.font(face));
    }

    /// Text rotated counter-clockwise by `degrees` around its start point.
    pub fn rotated_text(&self, value: &str, size_pt: f32, x: f32, y: f32, degrees: f32, tint: Tint) {
        let font = self.font(Face::Bold);
        self.layer.set_fill_color(tint.color());
        self.layer.begin_text_section();
        self.layer.set_font(font, size_pt);
        self.layer.set_text_matrix(TextMatrix::TranslateRotate(
            Pt(x * MM_TO_PT),
            Pt(y * MM_TO_PT),
            degrees,
        ));
        self.layer.write_text(text::sanitize(value), font);
        self.layer.end_text_section();
    }

    /// Right-aligned single line ending at `right`.
    pub fn text_right(&self, value: &str, size_pt: f32, right: f32, y: f32, face: Face, tint: Tint) {
        let width = text::text_width_mm(&text::sanitize(value), size_pt, face);
        self.text(value, size_pt, right - width, y, face, tint);
    }
}

/// Draw everything shared by all document types. Returns the body area.
pub fn draw(
    canvas: &Canvas,
    layout: &PageLayout,
    record: &RuntimeAssetRecord,
    options: &RenderOptions,
    warnings: &mut Vec<String>,
) -> Rect {
    let accent = tier_accent(options.presentation_tier);
    let frame = layout.content;

    if options.quality != QualityTier::Draft {
        canvas.fill_rect(layout.page(), Tint::PAPER);
    }
    draw_watermark(canvas, layout, options);

    canvas.stroke_rect(frame, accent, 0.8);
    if options.quality == QualityTier::Premium {
        canvas.stroke_rect(frame.inset(2.0), accent.lighten(0.4), 0.25);
    }

    let inner = frame.inset(FRAME_PADDING_MM);
    let after_header = draw_header(canvas, inner, record, accent, warnings);
    let (footer, body) = after_header.split_bottom(FOOTER_HEIGHT_MM);
    draw_footer(canvas, footer, options);

    let (_, body) = body.split_top(4.0);
    body
}

/// Diagonal tier label across the page. Pale enough to read as translucent
/// under the body; draft output drops the tier colour.
fn draw_watermark(canvas: &Canvas, layout: &PageLayout, options: &RenderOptions) {
    let label = options.presentation_tier.label();
    let tint = match options.quality {
        QualityTier::Draft => Tint::RULE.lighten(0.5),
        _ => tier_accent(options.presentation_tier).lighten(0.86),
    };
    let angle = layout.height.atan2(layout.width).to_degrees();
    let width = text::text_width_mm(label, WATERMARK_PT, Face::Bold);
    let (sin, cos) = angle.to_radians().sin_cos();
    // Start point chosen so the label's midpoint sits on the page centre.
    let x = layout.width / 2.0 - cos * width / 2.0;
    let y = layout.height / 2.0 - sin * width / 2.0;
    canvas.rotated_text(label, WATERMARK_PT, x, y, angle, tint);
}

fn draw_header(
    canvas: &Canvas,
    area: Rect,
    record: &RuntimeAssetRecord,
    accent: Tint,
    warnings: &mut Vec<String>,
) -> Rect {
    let (lines, truncated) =
        text::wrap_limited(&record.title, TITLE_PT, Face::Bold, area.w, TITLE_MAX_LINES);
    if truncated {
        warnings.push(format!("title of '{}' truncated to {TITLE_MAX_LINES} lines", record.id));
    }

    let title_lh = text::line_height_mm(TITLE_PT);
    let mut y = area.top() - title_lh * 0.8;
    for line in &lines {
        canvas.text(line, TITLE_PT, area.x, y, Face::Bold, Tint::INK);
        y -= title_lh;
    }

    let meta = format!(
        "{}  |  {}  |  {}  |  v{}",
        record.id,
        record.asset_type.as_str().to_uppercase(),
        record.tier.label(),
        record.version
    );
    let meta = text::ellipsize(&text::sanitize(&meta), META_PT, Face::Regular, area.w);
    y -= 1.0;
    canvas.text(&meta, META_PT, area.x, y, Face::Regular, Tint::MUTED);

    y -= 3.5;
    canvas.hline(area.x, area.right(), y, accent, 1.2);

    Rect::new(area.x, area.y, area.w, y - area.y)
}

fn draw_footer(canvas: &Canvas, area: Rect, options: &RenderOptions) {
    canvas.hline(area.x, area.right(), area.top() - 2.0, Tint::RULE, 0.5);
    let baseline = area.y + 2.0;
    let brand = text::ellipsize(&options.brand, FOOTER_PT, Face::Bold, area.w * 0.6);
    canvas.text(&brand, FOOTER_PT, area.x, baseline, Face::Bold, Tint::MUTED);
    canvas.text_right(
        &format!("Generated {}", options.date.format("%Y-%m-%d")),
        FOOTER_PT,
        area.right(),
        baseline,
        Face::Regular,
        Tint::MUTED,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lighten_moves_towards_white() {
        let t = Tint(0.2, 0.4, 0.6).lighten(0.5);
        assert!((t.0 - 0.6).abs() < 1e-6);
        assert!((t.2 - 0.8).abs() < 1e-6);
        let white = Tint::INK.lighten(1.0);
        assert!((white.0 - Tint::WHITE.0).abs() < 1e-6);
    }

    #[test]
    fn every_tier_has_a_distinct_accent() {
        let accents: Vec<_> = AssetTier::all().iter().map(|t| tier_accent(*t)).collect();
        for (i, a) in accents.iter().enumerate() {
            assert!(!accents[i + 1..].contains(a));
        }
    }
}
