//! Constants for the vector-PDF backend: resource names and the built-in font metrics.

pub const PDF_VERSION: &str = "1.7";

// Resource names shared by every page
pub const FONT_REGULAR: &str = "F1";
pub const FONT_BOLD: &str = "F2";
pub const FONT_ITALIC: &str = "F3";
/// Graphics state with the caption band's fill alpha.
pub const BAND_STATE: &str = "GS1";

/// Baseline offset below the top of the em box, as a fraction of the font size.
pub const ASCENT: f64 = 0.8;

/// Bézier handle length for a quarter circle of radius 1.
pub const QUARTER_ARC_KAPPA: f64 = 0.552_284_75;

/// Advance widths of Helvetica for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
pub const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths of Helvetica-Bold for ASCII 32..=126, in 1/1000 em.
#[rustfmt::skip]
pub const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the table.
pub const FALLBACK_WIDTH: u16 = 556;
