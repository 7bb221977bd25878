//! Text measurement and encoding for the built-in Helvetica faces.

use super::constants::{
    FALLBACK_WIDTH, FONT_BOLD, FONT_ITALIC, FONT_REGULAR, HELVETICA_BOLD_WIDTHS,
    HELVETICA_WIDTHS,
};
use crate::models::colors::Color;

/// One of the three standard faces registered on every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PdfFont {
    Regular,
    Bold,
    Italic,
}

impl PdfFont {
    pub(crate) const ALL: [PdfFont; 3] = [PdfFont::Regular, PdfFont::Bold, PdfFont::Italic];

    pub(crate) fn resource_name(&self) -> &'static str {
        match self {
            PdfFont::Regular => FONT_REGULAR,
            PdfFont::Bold => FONT_BOLD,
            PdfFont::Italic => FONT_ITALIC,
        }
    }

    pub(crate) fn base_font(&self) -> &'static str {
        match self {
            PdfFont::Regular => "Helvetica",
            PdfFont::Bold => "Helvetica-Bold",
            PdfFont::Italic => "Helvetica-Oblique",
        }
    }

    /// Advance width of `ch` in 1/1000 em.
    fn char_width(&self, ch: char) -> u16 {
        let table = match self {
            PdfFont::Bold => &HELVETICA_BOLD_WIDTHS,
            PdfFont::Regular | PdfFont::Italic => &HELVETICA_WIDTHS,
        };
        match ch {
            ' '..='~' => table[ch as usize - 32],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' => 1000,
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201C}' | '\u{201D}' => 333,
            '\u{2026}' => 1000,
            _ => FALLBACK_WIDTH,
        }
    }
}

/// Font, size and color of a run of text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TextStyle {
    pub font: PdfFont,
    pub size: f64,
    pub color: Color,
}

impl TextStyle {
    pub(crate) fn new(font: PdfFont, size: f64, color: Color) -> Self {
        TextStyle { font, size, color }
    }
}

/// Width of `text` set in `font` at `size` points.
pub(crate) fn text_width(text: &str, font: PdfFont, size: f64) -> f64 {
    text.chars().map(|c| font.char_width(c) as f64).sum::<f64>() * size / 1000.0
}

/// Encodes text for a simple font with `WinAnsiEncoding`. Characters the encoding cannot
/// represent become `?`.
pub(crate) fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            c if (' '..='~').contains(&c) || ('\u{A0}'..='\u{FF}').contains(&c) => c as u8,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap to `max_width`. Words longer than a line are split by character.
pub(crate) fn wrap_text(text: &str, font: PdfFont, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let space = text_width(" ", font, size);
    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0;
        for word in paragraph.split_whitespace() {
            let word_width = text_width(word, font, size);
            if !line.is_empty() && width + space + word_width <= max_width {
                line.push(' ');
                line.push_str(word);
                width += space + word_width;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if word_width <= max_width {
                line.push_str(word);
                width = word_width;
                continue;
            }
            // Hard break inside an overlong word
            width = 0.0;
            for ch in word.chars() {
                let w = font.char_width(ch) as f64 * size / 1000.0;
                if !line.is_empty() && width + w > max_width {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push(ch);
                width += w;
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Shortens `text` with an ellipsis until it fits `max_width`.
pub(crate) fn fit_line(text: &str, font: PdfFont, size: f64, max_width: f64) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }
    let budget = max_width - text_width("\u{2026}", font, size);
    let mut fitted = String::new();
    let mut width = 0.0;
    for ch in text.chars() {
        let w = font.char_width(ch) as f64 * size / 1000.0;
        if width + w > budget {
            break;
        }
        fitted.push(ch);
        width += w;
    }
    let mut fitted = fitted.trim_end().to_string();
    fitted.push('\u{2026}');
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_follow_the_metrics_table() {
        assert!((text_width("W", PdfFont::Regular, 10.0) - 9.44).abs() < 1e-9);
        assert!(text_width("Title", PdfFont::Bold, 10.0) > text_width("Title", PdfFont::Regular, 10.0));
    }

    #[test]
    fn win_ansi_maps_typographic_punctuation() {
        assert_eq!(to_win_ansi("\u{2022} a\u{2014}é"), vec![0x95, b' ', b'a', 0x97, 0xE9]);
        assert_eq!(to_win_ansi("\u{4E2D}"), vec![b'?']);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("alpha beta gamma delta", PdfFont::Regular, 10.0, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, PdfFont::Regular, 10.0) <= 60.0);
        }
        assert_eq!(lines.join(" "), "alpha beta gamma delta");
    }

    #[test]
    fn overlong_words_are_split() {
        let lines = wrap_text(&"x".repeat(40), PdfFont::Regular, 10.0, 50.0);
        assert!(lines.len() >= 4);
        assert_eq!(lines.concat().len(), 40);
    }

    #[test]
    fn fit_line_adds_ellipsis() {
        let fitted = fit_line("Quarterly revenue by region", PdfFont::Regular, 10.0, 50.0);
        assert!(fitted.ends_with('\u{2026}'));
        assert!(text_width(&fitted, PdfFont::Regular, 10.0) <= 50.0);
        assert_eq!(fit_line("Q1", PdfFont::Regular, 10.0, 50.0), "Q1");
    }
}
