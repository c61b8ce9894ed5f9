//! Body layouts and the type → layout dispatch table.

use super::fields::{self, FieldSpec, CHECKBOX_MM};
use super::foundation::{Canvas, Tint};
use super::layout::{grid, Rect};
use super::text::{self, Face};
use crate::models::{AssetType, FieldStyle, RuntimeAssetRecord};

const HEADING_PT: f32 = 11.0;
const BODY_PT: f32 = 10.5;
const INSTRUCTION_PT: f32 = 9.5;
const GAP_MM: f32 = 4.0;
const SINGLE_LINE_BOX_MM: f32 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLayout {
    Narrative,
    Structured,
    Canvas,
}

/// Which body each asset type gets. Types missing here fall back to
/// narrative with a warning.
pub const DISPATCH: &[(AssetType, BodyLayout)] = &[
    (AssetType::Editorial, BodyLayout::Narrative),
    (AssetType::Framework, BodyLayout::Narrative),
    (AssetType::Playbook, BodyLayout::Narrative),
    (AssetType::Guide, BodyLayout::Narrative),
    (AssetType::Worksheet, BodyLayout::Structured),
    (AssetType::Assessment, BodyLayout::Structured),
    (AssetType::Tool, BodyLayout::Structured),
    (AssetType::Tracker, BodyLayout::Structured),
    (AssetType::Journal, BodyLayout::Structured),
    (AssetType::Canvas, BodyLayout::Canvas),
];

pub fn layout_for(asset_type: AssetType) -> Option<BodyLayout> {
    DISPATCH
        .iter()
        .find(|(t, _)| *t == asset_type)
        .map(|(_, layout)| *layout)
}

pub const CANVAS_SECTIONS: [&str; 6] = [
    "Purpose",
    "Audience",
    "Value",
    "Constraints",
    "Resources",
    "Next Steps",
];

/// Instructions and the two open prompts for a structured type.
fn structured_copy(asset_type: AssetType) -> (&'static str, [&'static str; 2]) {
    match asset_type {
        AssetType::Assessment => (
            "Answer each prompt honestly. Score yourself before you look for fixes.",
            ["Where do you stand today?", "Where is the largest gap?"],
        ),
        AssetType::Tool => (
            "Fill in the inputs, then write down the one output you will act on.",
            ["Inputs", "Outputs"],
        ),
        AssetType::Tracker => (
            "Record an entry each time. Review the pattern at the end of the week.",
            ["What did you track?", "What pattern do you notice?"],
        ),
        AssetType::Journal => (
            "Write freely. Keep each entry short and specific.",
            ["What happened?", "What did you learn?"],
        ),
        _ => (
            "Work through each section in order. Short answers are fine.",
            ["What situation are you working on?", "What will you change first?"],
        ),
    }
}

/// Draw the body for `layout`. Returns every field placed, live or not.
pub fn draw(
    canvas: &Canvas,
    layout: BodyLayout,
    area: Rect,
    record: &RuntimeAssetRecord,
    accent: Tint,
    warnings: &mut Vec<String>,
) -> Vec<FieldSpec> {
    match layout {
        BodyLayout::Narrative => {
            narrative(canvas, area, record, warnings);
            Vec::new()
        }
        BodyLayout::Structured => structured(canvas, area, record, accent, warnings),
        BodyLayout::Canvas => canvas_grid(canvas, area, accent),
    }
}

/// Wrapped paragraph block; returns the height used.
fn paragraph(
    canvas: &Canvas,
    area: Rect,
    body: &str,
    size_pt: f32,
    tint: Tint,
    what: &str,
    warnings: &mut Vec<String>,
) -> f32 {
    let lh = text::line_height_mm(size_pt);
    let max_lines = (area.h / lh).floor().max(0.0) as usize;
    let (lines, truncated) = text::wrap_limited(body, size_pt, Face::Regular, area.w, max_lines);
    if truncated {
        warnings.push(format!("{what} truncated to {max_lines} lines"));
    }
    let mut y = area.top() - lh * 0.8;
    for line in &lines {
        canvas.text(line, size_pt, area.x, y, Face::Regular, tint);
        y -= lh;
    }
    lines.len() as f32 * lh
}

fn narrative(canvas: &Canvas, area: Rect, record: &RuntimeAssetRecord, warnings: &mut Vec<String>) {
    let heading_lh = text::line_height_mm(HEADING_PT);
    canvas.text("Summary", HEADING_PT, area.x, area.top() - heading_lh * 0.8, Face::Bold, Tint::INK);
    let (_, rest) = area.split_top(heading_lh + 2.0);

    let mut meta = Vec::new();
    if !record.category.is_empty() {
        meta.push(format!("Category: {}", record.category));
    }
    if !record.tags.is_empty() {
        meta.push(format!("Tags: {}", record.tags.join(", ")));
    }
    let meta_lh = text::line_height_mm(INSTRUCTION_PT);
    let reserved = if meta.is_empty() { 0.0 } else { meta.len() as f32 * meta_lh + GAP_MM };
    let (meta_area, summary_area) = rest.split_bottom(reserved);

    let summary = if record.description.trim().is_empty() {
        "No summary has been written for this document yet."
    } else {
        record.description.as_str()
    };
    paragraph(canvas, summary_area, summary, BODY_PT, Tint::INK, "summary", warnings);

    let mut y = meta_area.top() - GAP_MM - meta_lh * 0.8;
    for line in &meta {
        let line = text::ellipsize(&text::sanitize(line), INSTRUCTION_PT, Face::Regular, area.w);
        canvas.text(&line, INSTRUCTION_PT, area.x, y, Face::Regular, Tint::MUTED);
        y -= meta_lh;
    }
}

fn structured(
    canvas: &Canvas,
    area: Rect,
    record: &RuntimeAssetRecord,
    accent: Tint,
    warnings: &mut Vec<String>,
) -> Vec<FieldSpec> {
    let (instructions, prompts) = structured_copy(record.asset_type);

    let instruction_lh = text::line_height_mm(INSTRUCTION_PT);
    let (instruction_area, rest) = area.split_top(instruction_lh * 2.0 + GAP_MM);
    paragraph(
        canvas,
        instruction_area,
        instructions,
        INSTRUCTION_PT,
        Tint::MUTED,
        "instructions",
        warnings,
    );

    // Name and date share the first row.
    let (row, rest) = rest.split_top(fields::LABEL_BAND_MM + SINGLE_LINE_BOX_MM);
    let name_w = row.w * 0.62;
    let (_, name_box) = fields::label_and_box(Rect::new(row.x, row.y, name_w, row.h));
    let (_, date_box) = fields::label_and_box(Rect::new(
        row.x + name_w + GAP_MM,
        row.y,
        row.w - name_w - GAP_MM,
        row.h,
    ));
    let (_, rest) = rest.split_top(GAP_MM);

    // Two prompts and the action box split what is left; the action box
    // keeps a strip at the bottom for its checkbox.
    let checkbox_strip = CHECKBOX_MM + GAP_MM;
    let slot_h = (rest.h - checkbox_strip - 2.0 * GAP_MM) / 3.0;
    if slot_h < fields::LABEL_BAND_MM + SINGLE_LINE_BOX_MM {
        warnings.push(format!(
            "body area of '{}' is too small for response boxes",
            record.id
        ));
    }
    let slot_h = slot_h.max(fields::LABEL_BAND_MM + 1.0);
    let mut slots = Vec::with_capacity(3);
    let mut top = rest.top();
    for _ in 0..3 {
        slots.push(Rect::new(rest.x, top - slot_h, rest.w, slot_h));
        top -= slot_h + GAP_MM;
    }
    let checkbox = Rect::new(
        rest.x,
        slots[2].y - 1.0 - CHECKBOX_MM,
        CHECKBOX_MM,
        CHECKBOX_MM,
    );

    let placed = vec![
        FieldSpec::new("name", "Name", FieldStyle::Text, name_box).with_max_len(80),
        FieldSpec::new("date", "Date", FieldStyle::Text, date_box).with_max_len(32),
        FieldSpec::new("prompt_1", prompts[0], FieldStyle::Multiline, fields::label_and_box(slots[0]).1),
        FieldSpec::new("prompt_2", prompts[1], FieldStyle::Multiline, fields::label_and_box(slots[1]).1),
        FieldSpec::new("action", "Next action", FieldStyle::Multiline, fields::label_and_box(slots[2]).1),
        FieldSpec::new("done", "Done", FieldStyle::Checkbox, checkbox),
    ];
    for field in &placed {
        fields::draw_field(canvas, field, accent);
    }
    placed
}

fn canvas_grid(canvas: &Canvas, area: Rect, accent: Tint) -> Vec<FieldSpec> {
    let placed: Vec<FieldSpec> = grid(area, 3, 2, GAP_MM)
        .into_iter()
        .zip(CANVAS_SECTIONS)
        .enumerate()
        .map(|(i, (cell, label))| {
            let (_, input) = fields::label_and_box(cell);
            FieldSpec::new(&format!("section_{}", i + 1), label, FieldStyle::Multiline, input)
        })
        .collect();
    for field in &placed {
        fields::draw_field(canvas, field, accent);
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_covers_every_type_but_other() {
        for t in AssetType::all() {
            match t {
                AssetType::Other => assert_eq!(layout_for(*t), None),
                _ => assert!(layout_for(*t).is_some(), "{t} has no body"),
            }
        }
        assert_eq!(layout_for(AssetType::Canvas), Some(BodyLayout::Canvas));
        assert_eq!(layout_for(AssetType::Journal), Some(BodyLayout::Structured));
        assert_eq!(layout_for(AssetType::Playbook), Some(BodyLayout::Narrative));
    }

    #[test]
    fn structured_prompts_differ_by_type() {
        assert_ne!(
            structured_copy(AssetType::Worksheet).1,
            structured_copy(AssetType::Journal).1
        );
    }
}
