//! Charts drawn with path primitives from the shared geometry.

use log::debug;

use super::canvas::{Align, Canvas};
use super::text::{fit_line, text_width, PdfFont, TextStyle};
use crate::converters::utils::{label_color, value_label_top, CHART_LABEL_SIZE, LINE_SPACING};
use crate::engine::geometry::{
    chart_palette, compute_bar_layout, compute_line_layout, compute_pie_layout, legend_spec,
    palette_color, plot_area_for, AxisTick, GeometryOptions, LegendSpec,
    PlotArea, ValueLabel,
};
use crate::engine::layout::Rect;
use crate::models::chart::{Chart, ChartKind, LegendPosition};
use crate::models::colors::Color;
use crate::models::theme::Theme;

const SWATCH: f64 = 8.0;
const LINE_WIDTH: f64 = 2.25;
const MARKER_RADIUS: f64 = 3.0;

/// Draws `chart` inside `frame`: plot, axes, labels and legend.
pub(crate) fn draw_chart(
    canvas: &mut Canvas,
    chart: &Chart,
    frame: Rect,
    theme: &Theme,
    options: &GeometryOptions,
) {
    let legend = legend_spec(chart);
    let layout = plot_area_for(frame, legend.as_ref(), chart.kind);
    let palette = chart_palette(chart, &theme.chart_palette);
    debug!(
        "Drawing {:?} chart: {} categories, {} series",
        chart.kind,
        chart.categories.len(),
        chart.drawn_series().len()
    );

    match chart.kind {
        ChartKind::Bar => draw_bars(canvas, chart, layout.plot, &palette, theme, options),
        ChartKind::Line => draw_lines(canvas, chart, layout.plot, &palette, theme),
        ChartKind::Pie | ChartKind::Doughnut => {
            draw_pie(canvas, chart, layout.plot, &palette, theme, options)
        }
    }
    if !chart.kind.is_radial() {
        draw_axis_titles(canvas, chart, &frame, &layout.plot);
    }
    if let (Some(spec), Some(rect)) = (legend.as_ref(), layout.legend) {
        draw_legend(canvas, spec, &rect, &palette);
    }
}

fn axis_style() -> TextStyle {
    TextStyle::new(PdfFont::Regular, CHART_LABEL_SIZE, Color::AXIS_TEXT)
}

fn draw_value_axis(canvas: &mut Canvas, plot: &PlotArea, ticks: &[AxisTick]) {
    let style = axis_style();
    for tick in ticks {
        canvas.line((plot.x, tick.y), (plot.right(), tick.y), Color::GRIDLINE, 0.75);
        let top = tick.y - style.size / 2.0;
        canvas.aligned_line(plot.x - 60.0, 54.0, top, &tick.label, &style, Align::Right);
    }
}

fn draw_category_labels(canvas: &mut Canvas, chart: &Chart, plot: &PlotArea, centers: &[f64], room: f64) {
    let style = axis_style();
    for (label, &center) in chart.categories.iter().zip(centers) {
        let text = fit_line(label, style.font, style.size, room);
        canvas.aligned_line(center - room / 2.0, room, plot.bottom() + 6.0, &text, &style, Align::Center);
    }
}

fn draw_value_labels(canvas: &mut Canvas, labels: &[ValueLabel], palette: &[Color], theme: &Theme) {
    for label in labels {
        let font = if label.series.is_none() {
            PdfFont::Bold
        } else {
            PdfFont::Regular
        };
        let style = TextStyle::new(font, CHART_LABEL_SIZE, label_color(label, palette, theme));
        let top = value_label_top(label, style.size);
        let width = text_width(&label.text, style.font, style.size);
        canvas.text_line(label.x - width / 2.0, top, &label.text, &style);
    }
}

fn draw_bars(
    canvas: &mut Canvas,
    chart: &Chart,
    plot: PlotArea,
    palette: &[Color],
    theme: &Theme,
    options: &GeometryOptions,
) {
    let layout = compute_bar_layout(chart, plot, options);
    draw_value_axis(canvas, &plot, &layout.ticks);

    for bar in &layout.bars {
        canvas.fill_rect(&bar.rect, palette_color(palette, bar.series));
    }
    canvas.line(
        (plot.x, plot.bottom()),
        (plot.right(), plot.bottom()),
        theme.border,
        1.0,
    );

    let centers: Vec<f64> = (0..chart.categories.len())
        .map(|c| layout.category_center(c))
        .collect();
    draw_category_labels(canvas, chart, &plot, &centers, layout.band_width);
    draw_value_labels(canvas, &layout.labels, palette, theme);
}

fn draw_lines(canvas: &mut Canvas, chart: &Chart, plot: PlotArea, palette: &[Color], theme: &Theme) {
    let layout = compute_line_layout(chart, plot);
    draw_value_axis(canvas, &plot, &layout.ticks);

    for (s, points) in layout.series.iter().enumerate() {
        let color = palette_color(palette, s);
        let path: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
        canvas.polyline(&path, color, LINE_WIDTH);
        for point in &path {
            canvas.fill_marker(*point, MARKER_RADIUS, color, theme.background);
        }
    }

    let count = chart.categories.len();
    let centers: Vec<f64> = (0..count).map(|c| layout.category_x(c, count)).collect();
    let room = plot.width / count.max(1) as f64;
    draw_category_labels(canvas, chart, &plot, &centers, room);
    draw_value_labels(canvas, &layout.labels, palette, theme);
}

fn draw_pie(
    canvas: &mut Canvas,
    chart: &Chart,
    plot: PlotArea,
    palette: &[Color],
    theme: &Theme,
    options: &GeometryOptions,
) {
    let layout = compute_pie_layout(chart, plot, options);
    let center = (layout.center_x, layout.center_y);
    for slice in &layout.slices {
        if slice.fraction <= 0.0 {
            continue;
        }
        canvas.fill_wedge(
            center,
            layout.outer_radius,
            slice.start_angle,
            slice.end_angle,
            palette_color(palette, slice.index),
            Some((theme.background, 1.5)),
        );
    }
    if layout.inner_radius > 0.0 {
        canvas.fill_circle(center, layout.inner_radius, theme.background);
    }
    draw_value_labels(canvas, &layout.labels, palette, theme);
}

fn draw_axis_titles(canvas: &mut Canvas, chart: &Chart, frame: &Rect, plot: &PlotArea) {
    let style = TextStyle::new(PdfFont::Bold, CHART_LABEL_SIZE, Color::AXIS_TEXT);
    if let Some(label) = chart.x_label.as_deref().filter(|l| !l.is_empty()) {
        canvas.aligned_line(plot.x, plot.width, plot.bottom() + 22.0, label, &style, Align::Center);
    }
    if let Some(label) = chart.y_label.as_deref().filter(|l| !l.is_empty()) {
        canvas.vertical_text(frame.x + 2.0, plot.y + plot.height / 2.0, label, &style);
    }
}

/// Swatch-and-label legend: one row for top and bottom legends, a column otherwise.
fn draw_legend(canvas: &mut Canvas, spec: &LegendSpec, rect: &Rect, palette: &[Color]) {
    let style = TextStyle::new(PdfFont::Regular, CHART_LABEL_SIZE, Color::AXIS_TEXT);
    let row_height = style.size * LINE_SPACING + 4.0;
    let horizontal = matches!(spec.position, LegendPosition::TopRight | LegendPosition::Bottom);

    let mut x = rect.x;
    let mut y = if horizontal {
        rect.y + (rect.height - row_height) / 2.0
    } else {
        rect.y
    };
    for entry in &spec.entries {
        let label_room = if horizontal {
            rect.right() - x - SWATCH - 4.0
        } else {
            rect.width - SWATCH - 4.0
        };
        if label_room <= 0.0 || y + row_height > rect.bottom() + 1e-9 {
            break;
        }
        let text = fit_line(&entry.label, style.font, style.size, label_room);
        let swatch_top = y + (row_height - SWATCH) / 2.0;
        canvas.fill_rect(
            &Rect::new(x, swatch_top, SWATCH, SWATCH),
            palette_color(palette, entry.color_index),
        );
        canvas.text_line(x + SWATCH + 4.0, y + (row_height - style.size) / 2.0, &text, &style);
        if horizontal {
            x += SWATCH + 4.0 + text_width(&text, style.font, style.size) + 12.0;
        } else {
            y += row_height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::templates::resolve_theme;
    use crate::models::chart::Series;

    fn count(canvas: Canvas, operator: &str) -> usize {
        canvas
            .into_content()
            .operations
            .iter()
            .filter(|op| op.operator == operator)
            .count()
    }

    #[test]
    fn clustered_bars_fill_one_rect_per_value() {
        let theme = resolve_theme("modern", None, None);
        let mut chart = Chart::single_series(
            ChartKind::Bar,
            vec!["Q1".into(), "Q2".into(), "Q3".into()],
            "2025",
            vec![10.0, 20.0, 30.0],
        );
        chart.show_legend = Some(false);
        let mut canvas = Canvas::new();
        draw_chart(
            &mut canvas,
            &chart,
            Rect::new(0.0, 0.0, 400.0, 300.0),
            &theme,
            &GeometryOptions::default(),
        );
        // Three bars; every gridline and the baseline are strokes, not fills.
        assert_eq!(count(canvas, "f"), 3);
    }

    #[test]
    fn doughnut_punches_a_background_hole() {
        let theme = resolve_theme("modern", None, None);
        let mut chart = Chart::single_series(
            ChartKind::Doughnut,
            vec!["A".into(), "B".into()],
            "Share",
            vec![1.0, 3.0],
        );
        chart.show_legend = Some(false);
        let mut canvas = Canvas::new();
        draw_chart(
            &mut canvas,
            &chart,
            Rect::new(0.0, 0.0, 300.0, 300.0),
            &theme,
            &GeometryOptions::default(),
        );
        let ops = canvas.into_content().operations;
        // Two outlined wedges, then the filled hole.
        assert_eq!(ops.iter().filter(|op| op.operator == "B").count(), 2);
        assert_eq!(ops.iter().filter(|op| op.operator == "f").count(), 1);
    }

    #[test]
    fn line_series_get_markers_and_legend() {
        let theme = resolve_theme("modern", None, None);
        let mut chart = Chart::single_series(
            ChartKind::Line,
            vec!["Jan".into(), "Feb".into()],
            "North",
            vec![3.0, 5.0],
        );
        chart.series.push(Series::new("South", vec![2.0, 4.0]));
        let mut canvas = Canvas::new();
        draw_chart(
            &mut canvas,
            &chart,
            Rect::new(0.0, 0.0, 400.0, 300.0),
            &theme,
            &GeometryOptions::default(),
        );
        let ops = canvas.into_content().operations;
        // Four markers plus two legend swatches.
        assert_eq!(ops.iter().filter(|op| op.operator == "B").count(), 4);
        assert_eq!(ops.iter().filter(|op| op.operator == "f").count(), 2);
    }
}
