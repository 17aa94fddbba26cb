//! Advance widths for the two standard PDF fonts the renderer uses.
//!
//! Widths are in 1/1000 em, taken from the Adobe core-14 AFM files and indexed by
//! `char as usize - 32` for printable ASCII. Anything else falls back to a small
//! table of WinAnsi punctuation, then to the average glyph width.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Helvetica => "F1",
            Self::HelveticaBold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }
}

const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width of one glyph in 1/1000 em.
pub fn char_width(font: Font, ch: char) -> u16 {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        let table = match font {
            Font::Helvetica => &HELVETICA,
            Font::HelveticaBold => &HELVETICA_BOLD,
        };
        return table[(code - 32) as usize];
    }
    let bold = font == Font::HelveticaBold;
    match ch {
        '\u{2022}' => 350,
        '\u{2013}' => 556,
        '\u{2014}' | '\u{2026}' => 1000,
        '\u{2018}' | '\u{2019}' => {
            if bold {
                278
            } else {
                222
            }
        }
        '\u{201C}' | '\u{201D}' => {
            if bold {
                500
            } else {
                333
            }
        }
        '\u{00A9}' | '\u{00AE}' => 737,
        '\u{00B0}' => 400,
        '\u{00D7}' => 584,
        '\u{00A0}' => 278,
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points.
pub fn text_width(font: Font, size: f32, text: &str) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(char_width(font, ch))).sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap. Explicit newlines are kept as hard breaks and blank lines
/// survive as empty strings; a word wider than `max_width` is split by glyph.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate =
                if current.is_empty() { word.to_string() } else { format!("{current} {word}") };
            if text_width(font, size, &candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(font, size, word) <= max_width {
                current = word.to_string();
            } else {
                for ch in word.chars() {
                    let mut next = current.clone();
                    next.push(ch);
                    if !current.is_empty() && text_width(font, size, &next) > max_width {
                        lines.push(std::mem::take(&mut current));
                        current.push(ch);
                    } else {
                        current = next;
                    }
                }
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::{char_width, text_width, wrap, Font};

    #[test]
    fn ascii_widths_match_the_afm_tables() {
        assert_eq!(char_width(Font::Helvetica, ' '), 278);
        assert_eq!(char_width(Font::Helvetica, 'W'), 944);
        assert_eq!(char_width(Font::Helvetica, 'i'), 222);
        assert_eq!(char_width(Font::HelveticaBold, 'i'), 278);
        assert_eq!(char_width(Font::HelveticaBold, '~'), 584);
        assert_eq!(char_width(Font::Helvetica, '\u{2022}'), 350);
        assert_eq!(char_width(Font::Helvetica, '\u{4e2d}'), 556);
    }

    #[test]
    fn width_scales_with_point_size() {
        let at_ten = text_width(Font::Helvetica, 10.0, "Total");
        let at_twenty = text_width(Font::Helvetica, 20.0, "Total");
        assert!((at_twenty - 2.0 * at_ten).abs() < 0.001);
    }

    #[test]
    fn wrap_breaks_on_words_and_keeps_blank_lines() {
        let lines = wrap("alpha beta gamma\n\ndelta", Font::Helvetica, 10.0, 60.0);
        assert_eq!(lines, vec!["alpha beta", "gamma", "", "delta"]);
        for line in &lines {
            assert!(text_width(Font::Helvetica, 10.0, line) <= 60.0);
        }
    }

    #[test]
    fn overlong_words_are_split_by_glyph() {
        let lines = wrap("WWWWWWWWWW", Font::Helvetica, 10.0, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "WWWWWWWWWW");
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap("", Font::Helvetica, 10.0, 100.0), vec![String::new()]);
    }
}
