//! Drawing primitives over a page content stream.
//!
//! Callers work in slide design space (points, y growing downward); the canvas flips y
//! into PDF user space as it emits operators.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use super::constants::{ASCENT, QUARTER_ARC_KAPPA};
use super::text::{text_width, to_win_ansi, wrap_text, TextStyle};
use crate::converters::utils::LINE_SPACING;
use crate::engine::layout::{Rect, SLIDE_HEIGHT};
use crate::models::colors::Color;

/// Horizontal alignment of a text line inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Center,
    Right,
}

/// Vertical placement of a text block inside its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VAlign {
    Top,
    Middle,
    Bottom,
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: Color) -> Vec<Object> {
    let (r, g, b) = color.to_unit_rgb();
    vec![r.into(), g.into(), b.into()]
}

/// The operations of one page.
pub(crate) struct Canvas {
    operations: Vec<Operation>,
    page_height: f64,
}

impl Canvas {
    pub(crate) fn new() -> Self {
        Canvas {
            operations: Vec::new(),
            page_height: SLIDE_HEIGHT,
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn flip(&self, y: f64) -> f64 {
        self.page_height - y
    }

    pub(crate) fn into_content(self) -> Content {
        Content {
            operations: self.operations,
        }
    }

    // --- Graphics state ---

    pub(crate) fn save(&mut self) {
        self.op("q", vec![]);
    }

    pub(crate) fn restore(&mut self) {
        self.op("Q", vec![]);
    }

    /// Applies a named `ExtGState` resource.
    pub(crate) fn graphics_state(&mut self, name: &str) {
        self.op("gs", vec![Object::Name(name.as_bytes().to_vec())]);
    }

    /// Restricts painting to `rect` until the next `restore`.
    pub(crate) fn clip_rect(&mut self, rect: &Rect) {
        self.push_rect(rect);
        self.op("W", vec![]);
        self.op("n", vec![]);
    }

    fn set_fill(&mut self, color: Color) {
        self.op("rg", color_operands(color));
    }

    fn set_stroke(&mut self, color: Color, width: f64) {
        self.op("RG", color_operands(color));
        self.op("w", vec![real(width)]);
    }

    // --- Shapes ---

    fn push_rect(&mut self, rect: &Rect) {
        let y = self.flip(rect.bottom());
        self.op(
            "re",
            vec![real(rect.x), real(y), real(rect.width), real(rect.height)],
        );
    }

    pub(crate) fn fill_rect(&mut self, rect: &Rect, color: Color) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        self.set_fill(color);
        self.push_rect(rect);
        self.op("f", vec![]);
    }

    pub(crate) fn stroke_rect(&mut self, rect: &Rect, color: Color, width: f64) {
        self.set_stroke(color, width);
        self.push_rect(rect);
        self.op("S", vec![]);
    }

    /// Filled rectangle with an outline.
    pub(crate) fn fill_stroke_rect(&mut self, rect: &Rect, fill: Color, stroke: Color, width: f64) {
        self.set_fill(fill);
        self.set_stroke(stroke, width);
        self.push_rect(rect);
        self.op("B", vec![]);
    }

    pub(crate) fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Color, width: f64) {
        self.polyline(&[from, to], color, width);
    }

    pub(crate) fn polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        let Some(((x0, y0), rest)) = points.split_first() else {
            return;
        };
        self.set_stroke(color, width);
        self.move_to(*x0, *y0);
        for &(x, y) in rest {
            self.line_to(x, y);
        }
        self.op("S", vec![]);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let y = self.flip(y);
        self.op("m", vec![real(x), real(y)]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let y = self.flip(y);
        self.op("l", vec![real(x), real(y)]);
    }

    fn curve_to(&mut self, c1: (f64, f64), c2: (f64, f64), end: (f64, f64)) {
        let operands = vec![
            real(c1.0),
            real(self.flip(c1.1)),
            real(c2.0),
            real(self.flip(c2.1)),
            real(end.0),
            real(self.flip(end.1)),
        ];
        self.op("c", operands);
    }

    /// Appends circular arc segments from `start` to `end` (radians, y-down space) to the
    /// current path, one cubic Bézier per quarter turn or less.
    fn arc(&mut self, center: (f64, f64), radius: f64, start: f64, end: f64) {
        let sweep = end - start;
        let segments = (sweep.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
        let step = sweep / segments as f64;
        // Handle length for a segment of `step` radians.
        let k = 4.0 / 3.0 * (step / 4.0).tan();
        let point = |a: f64| (center.0 + radius * a.cos(), center.1 + radius * a.sin());
        for i in 0..segments {
            let a0 = start + step * i as f64;
            let a1 = a0 + step;
            let (x0, y0) = point(a0);
            let (x1, y1) = point(a1);
            let c1 = (x0 - k * radius * a0.sin(), y0 + k * radius * a0.cos());
            let c2 = (x1 + k * radius * a1.sin(), y1 - k * radius * a1.cos());
            self.curve_to(c1, c2, (x1, y1));
        }
    }

    /// Fills a pie wedge between two angles. A full turn draws a disc.
    pub(crate) fn fill_wedge(
        &mut self,
        center: (f64, f64),
        radius: f64,
        start: f64,
        end: f64,
        fill: Color,
        outline: Option<(Color, f64)>,
    ) {
        if radius <= 0.0 || end <= start {
            return;
        }
        self.set_fill(fill);
        let full = end - start >= std::f64::consts::TAU - 1e-9;
        let first = (center.0 + radius * start.cos(), center.1 + radius * start.sin());
        if full {
            self.move_to(first.0, first.1);
        } else {
            self.move_to(center.0, center.1);
            self.line_to(first.0, first.1);
        }
        self.arc(center, radius, start, end);
        self.op("h", vec![]);
        match outline {
            Some((color, width)) => {
                self.set_stroke(color, width);
                self.op("B", vec![]);
            }
            None => self.op("f", vec![]),
        }
    }

    pub(crate) fn fill_circle(&mut self, center: (f64, f64), radius: f64, fill: Color) {
        self.fill_wedge(center, radius, 0.0, std::f64::consts::TAU, fill, None);
    }

    /// Approximate circle with four Bézier quadrants, for small markers.
    pub(crate) fn fill_marker(&mut self, center: (f64, f64), radius: f64, fill: Color, outline: Color) {
        let (cx, cy) = center;
        let k = radius * QUARTER_ARC_KAPPA;
        self.set_fill(fill);
        self.set_stroke(outline, 1.0);
        self.move_to(cx + radius, cy);
        self.curve_to((cx + radius, cy + k), (cx + k, cy + radius), (cx, cy + radius));
        self.curve_to((cx - k, cy + radius), (cx - radius, cy + k), (cx - radius, cy));
        self.curve_to((cx - radius, cy - k), (cx - k, cy - radius), (cx, cy - radius));
        self.curve_to((cx + k, cy - radius), (cx + radius, cy - k), (cx + radius, cy));
        self.op("h", vec![]);
        self.op("B", vec![]);
    }

    // --- Images ---

    /// Paints image XObject `name` stretched over `rect`.
    pub(crate) fn image(&mut self, name: &str, rect: &Rect) {
        let y = self.flip(rect.bottom());
        self.save();
        self.op(
            "cm",
            vec![
                real(rect.width),
                0.into(),
                0.into(),
                real(rect.height),
                real(rect.x),
                real(y),
            ],
        );
        self.op("Do", vec![Object::Name(name.as_bytes().to_vec())]);
        self.restore();
    }

    // --- Text ---

    /// Draws one line whose em box starts at `top`, left-aligned at `x`.
    pub(crate) fn text_line(&mut self, x: f64, top: f64, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let baseline = self.flip(top + style.size * ASCENT);
        self.set_fill(style.color);
        self.op("BT", vec![]);
        self.op(
            "Tf",
            vec![
                Object::Name(style.font.resource_name().as_bytes().to_vec()),
                real(style.size),
            ],
        );
        self.op("Td", vec![real(x), real(baseline)]);
        self.op(
            "Tj",
            vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    /// Draws a line horizontally aligned inside `[x, x + width]`.
    pub(crate) fn aligned_line(
        &mut self,
        x: f64,
        width: f64,
        top: f64,
        text: &str,
        style: &TextStyle,
        align: Align,
    ) {
        let measured = text_width(text, style.font, style.size);
        let left = match align {
            Align::Left => x,
            Align::Center => x + (width - measured) / 2.0,
            Align::Right => x + width - measured,
        };
        self.text_line(left, top, text, style);
    }

    /// Draws text rotated a quarter turn counter-clockwise, centered on `(x, y)`.
    pub(crate) fn vertical_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) {
        if text.is_empty() {
            return;
        }
        let half = text_width(text, style.font, style.size) / 2.0;
        let origin_x = x + style.size * 0.35;
        let origin_y = self.flip(y + half);
        self.set_fill(style.color);
        self.op("BT", vec![]);
        self.op(
            "Tf",
            vec![
                Object::Name(style.font.resource_name().as_bytes().to_vec()),
                real(style.size),
            ],
        );
        self.op(
            "Tm",
            vec![
                0.into(),
                1.into(),
                Object::Integer(-1),
                0.into(),
                real(origin_x),
                real(origin_y),
            ],
        );
        self.op(
            "Tj",
            vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    /// Wraps `text` into `rect` and draws the lines that fit.
    ///
    /// # Returns
    ///
    /// The number of lines drawn.
    pub(crate) fn text_block(
        &mut self,
        rect: &Rect,
        text: &str,
        style: &TextStyle,
        align: Align,
        valign: VAlign,
    ) -> usize {
        let line_height = style.size * LINE_SPACING;
        let mut lines = wrap_text(text, style.font, style.size, rect.width);
        let capacity = ((rect.height / line_height).floor() as usize).max(1);
        lines.truncate(capacity);

        let block = lines.len() as f64 * line_height;
        let top = match valign {
            VAlign::Top => rect.y,
            VAlign::Middle => rect.y + (rect.height - block) / 2.0,
            VAlign::Bottom => rect.bottom() - block,
        };
        let leading = (line_height - style.size) / 2.0;
        for (i, line) in lines.iter().enumerate() {
            let line_top = top + i as f64 * line_height + leading;
            self.aligned_line(rect.x, rect.width, line_top, line, style, align);
        }
        lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::pdf::text::PdfFont;

    fn operators(canvas: Canvas) -> Vec<String> {
        canvas
            .into_content()
            .operations
            .into_iter()
            .map(|op| op.operator)
            .collect()
    }

    #[test]
    fn rectangles_are_flipped_into_pdf_space() {
        let mut canvas = Canvas::new();
        canvas.fill_rect(&Rect::new(10.0, 20.0, 30.0, 40.0), Color::BLACK);
        let content = canvas.into_content();
        let re = content
            .operations
            .iter()
            .find(|op| op.operator == "re")
            .unwrap();
        let y = re.operands[1].as_float().unwrap();
        assert!((y as f64 - (SLIDE_HEIGHT - 60.0)).abs() < 1e-3);
    }

    #[test]
    fn wedges_use_bezier_segments() {
        let mut canvas = Canvas::new();
        canvas.fill_wedge((100.0, 100.0), 50.0, 0.0, std::f64::consts::PI, Color::BLACK, None);
        let ops = operators(canvas);
        assert_eq!(ops.iter().filter(|op| *op == "c").count(), 2);
        assert_eq!(ops.last().map(String::as_str), Some("f"));
    }

    #[test]
    fn text_blocks_stop_at_the_frame_bottom() {
        let mut canvas = Canvas::new();
        let style = TextStyle::new(PdfFont::Regular, 10.0, Color::BLACK);
        let drawn = canvas.text_block(
            &Rect::new(0.0, 0.0, 40.0, 30.0),
            "one two three four five six seven",
            &style,
            Align::Left,
            VAlign::Top,
        );
        assert_eq!(drawn, 2);
        assert_eq!(operators(canvas).iter().filter(|op| *op == "Tj").count(), 2);
    }
}
