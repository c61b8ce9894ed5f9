//! Text measurement and wrapping against the built-in Helvetica metrics.

const PT_TO_MM: f32 = 25.4 / 72.0;

/// Advance width used for anything outside printable ASCII.
const FALLBACK_WIDTH: u16 = 556;

/// Helvetica AFM widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold AFM widths for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

fn glyph_width(c: char, face: Face) -> u16 {
    let table = match face {
        Face::Regular => &HELVETICA,
        Face::Bold => &HELVETICA_BOLD,
    };
    match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in millimetres.
pub fn text_width_mm(text: &str, size_pt: f32, face: Face) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(c, face) as u32).sum();
    units as f32 / 1000.0 * size_pt * PT_TO_MM
}

/// Baseline-to-baseline distance for a font size, in millimetres.
pub fn line_height_mm(size_pt: f32) -> f32 {
    size_pt * 1.35 * PT_TO_MM
}

/// Map typographic punctuation onto what the built-in fonts can draw.
/// Anything else outside Latin-1 becomes `?`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201F}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            '\u{2026}' => '.',
            '\u{00A0}' | '\t' | '\n' | '\r' => ' ',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

/// Break a word wider than `max_mm` into pieces that fit.
fn hard_break(word: &str, size_pt: f32, face: Face, max_mm: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        let mut candidate = current.clone();
        candidate.push(c);
        if !current.is_empty() && text_width_mm(&candidate, size_pt, face) > max_mm {
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedy word wrap on measured glyph widths.
pub fn wrap(text: &str, size_pt: f32, face: Face, max_mm: f32) -> Vec<String> {
    let text = sanitize(text);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width_mm(&candidate, size_pt, face) <= max_mm {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width_mm(word, size_pt, face) <= max_mm {
            current = word.to_string();
        } else {
            let mut pieces = hard_break(word, size_pt, face, max_mm);
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `text` cut back until `text...` fits `max_mm`.
fn with_ellipsis(text: &str, size_pt: f32, face: Face, max_mm: f32) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    loop {
        let candidate = format!("{}...", chars.iter().collect::<String>().trim_end());
        if chars.is_empty() || text_width_mm(&candidate, size_pt, face) <= max_mm {
            return candidate;
        }
        chars.pop();
    }
}

/// Shorten `text` with a trailing ellipsis when it does not fit `max_mm`.
pub fn ellipsize(text: &str, size_pt: f32, face: Face, max_mm: f32) -> String {
    if text_width_mm(text, size_pt, face) <= max_mm {
        text.to_string()
    } else {
        with_ellipsis(text, size_pt, face, max_mm)
    }
}

/// Wrapped lines limited to `max_lines`. The flag is true when text was cut.
pub fn wrap_limited(
    text: &str,
    size_pt: f32,
    face: Face,
    max_mm: f32,
    max_lines: usize,
) -> (Vec<String>, bool) {
    let mut lines = wrap(text, size_pt, face, max_mm);
    if lines.len() <= max_lines {
        return (lines, false);
    }
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        *last = with_ellipsis(last, size_pt, face, max_mm);
    }
    (lines, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_metrics() {
        // 'i' is narrow, 'W' is wide.
        assert!(text_width_mm("iiii", 10.0, Face::Regular) < text_width_mm("WWWW", 10.0, Face::Regular));
        assert!(text_width_mm("Title", 12.0, Face::Bold) > text_width_mm("Title", 12.0, Face::Regular));
        // 1000 units at 72pt is exactly one inch.
        let m = text_width_mm("\u{00E9}", 72.0, Face::Regular);
        assert!((m - 0.556 * 25.4).abs() < 0.01);
    }

    #[test]
    fn wrap_respects_width() {
        let text = "The quick brown fox jumps over the lazy dog and keeps running across the field";
        let lines = wrap(text, 11.0, Face::Regular, 50.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, 11.0, Face::Regular) <= 50.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn long_word_is_hard_broken() {
        let lines = wrap(&"x".repeat(200), 10.0, Face::Regular, 30.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width_mm(l, 10.0, Face::Regular) <= 30.0));
        assert_eq!(lines.concat().len(), 200);
    }

    #[test]
    fn limited_wrap_truncates_with_ellipsis() {
        let text = "word ".repeat(100);
        let (lines, truncated) = wrap_limited(&text, 10.0, Face::Regular, 40.0, 2);
        assert!(truncated);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("..."));

        let (lines, truncated) = wrap_limited("short", 10.0, Face::Regular, 40.0, 2);
        assert!(!truncated);
        assert_eq!(lines, vec!["short"]);
    }

    #[test]
    fn sanitize_maps_typography() {
        assert_eq!(sanitize("It\u{2019}s \u{201C}done\u{201D} \u{2014} ok"), "It's \"done\" - ok");
        assert_eq!(sanitize("caf\u{00E9} \u{4E2D}"), "caf\u{00E9} ?");
    }
}
