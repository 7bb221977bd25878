use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque RGB color. Serialized as a `#RRGGBB` string, which is the form every
/// caller-facing surface (templates, overrides, series colors) uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    /// Neutral slate used for axis text and gridline labels.
    pub const AXIS_TEXT: Color = Color::rgb(0x47, 0x55, 0x69);
    /// Light gridline color.
    pub const GRIDLINE: Color = Color::rgb(0xE2, 0xE8, 0xF0);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    /// Parses `#RRGGBB`, `RRGGBB`, `#RGB` or `RGB`. Returns `None` for anything else.
    pub fn from_hex(input: &str) -> Option<Color> {
        let hex = input.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&expanded[range], 16).ok();
        Some(Color {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }

    /// Formats as an uppercase CSS hex string, e.g. `#10B981`.
    pub fn to_css_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Formats as the bare `RRGGBB` form used by DrawingML `srgbClr` values.
    pub fn to_ooxml(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Formats as a CSS `rgba()` value with the given alpha.
    pub fn to_css_rgba(&self, alpha: f64) -> String {
        format!(
            "rgba({}, {}, {}, {})",
            self.red,
            self.green,
            self.blue,
            alpha.clamp(0.0, 1.0)
        )
    }

    /// Returns the color as PDF device-RGB components in `0.0..=1.0`.
    pub fn to_unit_rgb(&self) -> (f32, f32, f32) {
        (
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
        )
    }

    /// Relative luminance (WCAG definition), from 0.0 (black) to 1.0 (white).
    pub fn luminance(&self) -> f64 {
        fn linear(channel: u8) -> f64 {
            let c = channel as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.red) + 0.7152 * linear(self.green) + 0.0722 * linear(self.blue)
    }

    /// True for colors light enough that white text on top of them is hard to read.
    pub fn is_light(&self) -> bool {
        self.luminance() > 0.6
    }

    /// Picks white or near-black, whichever reads better on top of this color.
    /// Used for labels drawn inside chart bars.
    pub fn contrasting_text(&self) -> Color {
        if self.luminance() > 0.45 {
            Color::rgb(0x11, 0x18, 0x27)
        } else {
            Color::WHITE
        }
    }

    /// Blends this color toward white. `amount` of 0.0 keeps the color, 1.0 yields white.
    /// Backends without alpha support (the PDF canvas) use this for tinted fills.
    pub fn tint(&self, amount: f64) -> Color {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |c: u8| (c as f64 + (255.0 - c as f64) * amount).round() as u8;
        Color::rgb(mix(self.red), mix(self.green), mix(self.blue))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_hex())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s).ok_or_else(|| format!("invalid color '{}'", s))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_css_hex()
    }
}
