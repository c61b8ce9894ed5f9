//! Page geometry in millimetres, origin bottom-left (PDF convention).

use serde::Serialize;

use crate::models::PaperFormat;

/// Margins can never eat more than this share of a page dimension per side.
const MAX_MARGIN_SHARE: f32 = 0.2;

pub const DEFAULT_MARGIN_MM: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    pub fn top(&self) -> f32 {
        self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn inset(&self, by: f32) -> Self {
        Self::new(self.x + by, self.y + by, self.w - 2.0 * by, self.h - 2.0 * by)
    }

    /// Strip `height` off the top, returning (strip, remainder).
    pub fn split_top(&self, height: f32) -> (Self, Self) {
        let height = height.clamp(0.0, self.h);
        (
            Self::new(self.x, self.top() - height, self.w, height),
            Self::new(self.x, self.y, self.w, self.h - height),
        )
    }

    /// Strip `height` off the bottom, returning (strip, remainder).
    pub fn split_bottom(&self, height: f32) -> (Self, Self) {
        let height = height.clamp(0.0, self.h);
        (
            Self::new(self.x, self.y, self.w, height),
            Self::new(self.x, self.y + height, self.w, self.h - height),
        )
    }

    /// Interiors intersect. Shared edges don't count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 0.01;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.top() <= self.top() + EPS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(DEFAULT_MARGIN_MM)
    }
}

/// Page size plus the margin-bounded content area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
    pub content: Rect,
}

fn clamp_margin(side: &str, value: f32, limit: f32, warnings: &mut Vec<String>) -> f32 {
    if !value.is_finite() || value < 0.0 {
        warnings.push(format!("{side} margin {value}mm is invalid, using 0mm"));
        0.0
    } else if value > limit {
        warnings.push(format!("{side} margin {value:.1}mm clamped to {limit:.1}mm"));
        limit
    } else {
        value
    }
}

impl PageLayout {
    /// Oversize or negative margins are clamped with a warning, never rejected.
    pub fn new(paper: PaperFormat, margins: Margins, warnings: &mut Vec<String>) -> Self {
        let (width, height) = paper.dimensions_mm();
        let max_h = width * MAX_MARGIN_SHARE;
        let max_v = height * MAX_MARGIN_SHARE;
        let margins = Margins {
            top: clamp_margin("top", margins.top, max_v, warnings),
            right: clamp_margin("right", margins.right, max_h, warnings),
            bottom: clamp_margin("bottom", margins.bottom, max_v, warnings),
            left: clamp_margin("left", margins.left, max_h, warnings),
        };
        let content = Rect::new(
            margins.left,
            margins.bottom,
            width - margins.left - margins.right,
            height - margins.top - margins.bottom,
        );
        Self {
            width,
            height,
            margins,
            content,
        }
    }

    pub fn page(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// `cols` × `rows` cells filling `area`, separated by `gap`, row-major from the top.
pub fn grid(area: Rect, cols: usize, rows: usize, gap: f32) -> Vec<Rect> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let cell_w = (area.w - gap * (cols - 1) as f32) / cols as f32;
    let cell_h = (area.h - gap * (rows - 1) as f32) / rows as f32;
    let mut cells = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        let y = area.top() - (row + 1) as f32 * cell_h - row as f32 * gap;
        for col in 0..cols {
            let x = area.x + col as f32 * (cell_w + gap);
            cells.push(Rect::new(x, y, cell_w, cell_h));
        }
    }
    cells
}
