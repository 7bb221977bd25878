//! Constants for the markup backend.

use crate::engine::layout::{SLIDE_HEIGHT, SLIDE_WIDTH};

/// CSS pixels per design point (96 px per inch over 72 pt per inch).
pub const PX_PER_PT: f64 = 4.0 / 3.0;
pub const SLIDE_WIDTH_PX: f64 = SLIDE_WIDTH * PX_PER_PT; // 1280
pub const SLIDE_HEIGHT_PX: f64 = SLIDE_HEIGHT * PX_PER_PT; // 720

/// Appended to every font family so text still renders when a web font fails to load.
pub const FONT_FALLBACK: &str = r#""Helvetica Neue", Helvetica, Arial, sans-serif"#;

pub const HTML_DOCTYPE: &str = "<!DOCTYPE html>";
