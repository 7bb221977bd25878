//! Chart Geometry Engine.
//!
//! Pure numbers only: bar rectangles, stacked segments, pie wedges, line points, axis
//! ticks, legend entries and label placement. The three backends translate these results
//! into their own primitives and never re-derive proportions on their own.
//!
//! Coordinates are in whatever unit the caller's plot rectangle uses, with y growing
//! downward. The PDF backend flips them when drawing.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::engine::format::{format_share, format_value};
use crate::engine::layout::Rect;
use crate::models::chart::{Chart, ChartKind, LabelStyle, LegendPosition};
use crate::models::colors::Color;

/// The plotting rectangle (inside axes and legend) of a chart.
pub type PlotArea = Rect;

/// Tunable thresholds of the geometry heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeometryOptions {
    /// A chart with more than this many category x series cells is dense.
    pub dense_cell_limit: usize,
    /// A chart with at least this many series is dense.
    pub dense_series_limit: usize,
    /// Bars taller than this fraction of the plot height get their label inside.
    pub inside_label_threshold: f64,
    /// Inner radius of a doughnut as a fraction of the outer radius.
    pub doughnut_hole_ratio: f64,
    /// Fraction of each category band left empty around the bar group.
    pub category_gap_ratio: f64,
    /// Gap between adjacent bars of one group, as a fraction of the category band.
    pub bar_gap_ratio: f64,
    /// Radial position of pie labels between the inner (0.0) and outer (1.0) radius.
    pub pie_label_radius: f64,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        GeometryOptions {
            dense_cell_limit: 16,
            dense_series_limit: 4,
            inside_label_threshold: 0.18,
            doughnut_hole_ratio: 0.56,
            category_gap_ratio: 0.2,
            bar_gap_ratio: 0.04,
            pie_label_radius: 0.6,
        }
    }
}

/// Where a value label sits relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelPlacement {
    /// Just below the top edge of the bar, drawn in a contrasting color.
    Inside,
    /// Just above the top edge of the bar.
    Above,
    /// Centered on the anchor (stacked segments, pie wedges).
    Center,
}

/// A value label anchored at `(x, y)`: the top-center of a bar, or the center of a
/// stacked segment or wedge label position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub placement: LabelPlacement,
    pub category: usize,
    /// Series the label belongs to; `None` for stacked column totals.
    pub series: Option<usize>,
    /// Palette index of the fill the label sits on, when it sits on one.
    pub on_fill: Option<usize>,
}

/// One drawn bar or stacked segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRect {
    pub category: usize,
    pub series: usize,
    pub value: f64,
    pub rect: Rect,
}

/// A y-axis reference tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub value: f64,
    /// Position along the axis, 0.0 at the baseline and 1.0 at the maximum.
    pub fraction: f64,
    pub y: f64,
    pub label: String,
}

/// Bar chart geometry, clustered or stacked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarLayout {
    pub plot: PlotArea,
    pub max: f64,
    pub stacked: bool,
    pub dense: bool,
    /// Width of one category band.
    pub band_width: f64,
    /// Width of the bar group inside a band.
    pub group_width: f64,
    pub bar_width: f64,
    /// Gap between adjacent bars of one group.
    pub bar_gap: f64,
    pub bars: Vec<BarRect>,
    pub labels: Vec<ValueLabel>,
    pub ticks: Vec<AxisTick>,
}

impl BarLayout {
    /// Center x of category `index`.
    pub fn category_center(&self, index: usize) -> f64 {
        self.plot.x + (index as f64 + 0.5) * self.band_width
    }

    /// Tallest bar (or column) as a fraction of the plot height.
    pub fn tallest_fraction(&self) -> f64 {
        if self.plot.height <= 0.0 {
            return 0.0;
        }
        let top = self
            .bars
            .iter()
            .map(|b| b.rect.y)
            .fold(self.plot.bottom(), f64::min);
        (self.plot.bottom() - top) / self.plot.height
    }

    /// DrawingML `c:gapWidth`: space between groups as a percentage of one bar width.
    pub fn ooxml_gap_width(&self) -> u32 {
        if self.bar_width <= 0.0 {
            return 150;
        }
        let percent = (self.band_width - self.group_width) / self.bar_width * 100.0;
        percent.round().clamp(0.0, 500.0) as u32
    }

    /// DrawingML `c:overlap`: negative values open a gap between bars of one group.
    pub fn ooxml_overlap(&self) -> i32 {
        if self.stacked {
            return 100;
        }
        if self.bar_width <= 0.0 {
            return 0;
        }
        let percent = -self.bar_gap / self.bar_width * 100.0;
        percent.round().clamp(-100.0, 100.0) as i32
    }
}

/// One pie or doughnut wedge. Angles are in radians, clockwise from 12 o'clock at
/// `-PI/2`, in the y-down coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub index: usize,
    pub value: f64,
    pub fraction: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl PieSlice {
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    pub fn mid_angle(&self) -> f64 {
        (self.start_angle + self.end_angle) / 2.0
    }
}

/// Pie or doughnut geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieLayout {
    pub center_x: f64,
    pub center_y: f64,
    pub outer_radius: f64,
    /// Zero for pies; the punched hole radius for doughnuts.
    pub inner_radius: f64,
    pub total: f64,
    pub slices: Vec<PieSlice>,
    pub labels: Vec<ValueLabel>,
}

impl PieLayout {
    /// Point on the circle of `radius` at `angle`.
    pub fn point(&self, radius: f64, angle: f64) -> (f64, f64) {
        (
            self.center_x + radius * angle.cos(),
            self.center_y + radius * angle.sin(),
        )
    }
}

/// A marker on a line series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

/// Line chart geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineLayout {
    pub plot: PlotArea,
    pub max: f64,
    /// Points per drawn series, in series order.
    pub series: Vec<Vec<LinePoint>>,
    /// Y positions of the horizontal gridlines, baseline first.
    pub gridlines: Vec<f64>,
    pub labels: Vec<ValueLabel>,
    pub ticks: Vec<AxisTick>,
}

impl LineLayout {
    pub fn category_x(&self, index: usize, count: usize) -> f64 {
        line_x(&self.plot, index, count)
    }
}

/// One legend row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    /// Index into the chart palette.
    pub color_index: usize,
}

/// Legend visibility, position and entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendSpec {
    pub position: LegendPosition,
    pub entries: Vec<LegendEntry>,
}

/// Plot and legend rectangles carved out of a chart frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartFrame {
    pub frame: Rect,
    pub plot: PlotArea,
    pub legend: Option<Rect>,
}

impl ChartFrame {
    /// Plot rectangle as fractions of the frame, for DrawingML `c:manualLayout`.
    pub fn plot_fractions(&self) -> (f64, f64, f64, f64) {
        let f = &self.frame;
        if f.width <= 0.0 || f.height <= 0.0 {
            return (0.0, 0.0, 1.0, 1.0);
        }
        (
            (self.plot.x - f.x) / f.width,
            (self.plot.y - f.y) / f.height,
            self.plot.width / f.width,
            self.plot.height / f.height,
        )
    }
}

/// A slide is dense when it has too many cells or too many series for labels above bars.
pub fn is_dense(chart: &Chart, options: &GeometryOptions) -> bool {
    let series = chart.drawn_series().len();
    chart.categories.len() * series > options.dense_cell_limit
        || series >= options.dense_series_limit
}

/// Scale maximum: the largest value (or stacked column sum) and never below zero.
pub fn chart_max(chart: &Chart) -> f64 {
    let series = chart.drawn_series();
    if chart.is_stacked_bar() {
        (0..chart.categories.len())
            .map(|c| series.iter().map(|s| s.value_at(c).max(0.0)).sum::<f64>())
            .fold(0.0, f64::max)
    } else {
        series
            .iter()
            .flat_map(|s| (0..chart.categories.len()).map(move |c| s.value_at(c)))
            .fold(0.0, f64::max)
    }
}

fn scaled_height(value: f64, max: f64, height: f64) -> f64 {
    if max <= 0.0 {
        0.0
    } else {
        value.max(0.0) / max * height
    }
}

/// Y-axis ticks at 0, 25, 50, 75 and 100 percent of `max`.
pub fn axis_ticks(max: f64, plot: &PlotArea, chart: &Chart) -> Vec<AxisTick> {
    [0.0, 0.25, 0.5, 0.75, 1.0]
        .into_iter()
        .map(|fraction| {
            let value = max * fraction;
            AxisTick {
                value,
                fraction,
                y: plot.bottom() - fraction * plot.height,
                label: format_value(value, chart.y_format),
            }
        })
        .collect()
}

/// Clustered or stacked bar geometry inside `plot`.
///
/// Each category gets an equal band. The band minus the category gap holds either one
/// slot per series separated by fixed gaps (clustered), or a single column (stacked).
/// Heights are `value / max * plot.height`, and zero when `max <= 0`.
pub fn compute_bar_layout(chart: &Chart, plot: PlotArea, options: &GeometryOptions) -> BarLayout {
    let series = chart.drawn_series();
    let categories = chart.categories.len();
    let stacked = chart.is_stacked_bar();
    let dense = is_dense(chart, options);
    let max = chart_max(chart);

    let slots = if stacked { 1 } else { series.len().max(1) };
    let band_width = if categories > 0 {
        plot.width / categories as f64
    } else {
        0.0
    };
    let group_width = band_width * (1.0 - options.category_gap_ratio.clamp(0.0, 0.9));
    let bar_gap = if slots > 1 {
        band_width * options.bar_gap_ratio.max(0.0)
    } else {
        0.0
    };
    let bar_width = ((group_width - bar_gap * (slots - 1) as f64) / slots as f64).max(0.0);
    let threshold = options.inside_label_threshold * plot.height;

    let mut bars = Vec::with_capacity(categories * series.len());
    let mut labels = Vec::new();

    for c in 0..categories {
        let group_x = plot.x + c as f64 * band_width + (band_width - group_width) / 2.0;

        if stacked {
            let total: f64 = series.iter().map(|s| s.value_at(c).max(0.0)).sum();
            let mut top = plot.bottom();
            for (s, item) in series.iter().enumerate() {
                let value = item.value_at(c);
                let height = scaled_height(value, max, plot.height);
                top -= height;
                let rect = Rect::new(group_x, top, bar_width, height);
                if height > threshold && height > 0.0 {
                    let text = if chart.show_stack_percent {
                        format_share(value.max(0.0), total)
                    } else {
                        format_value(value, chart.y_format)
                    };
                    labels.push(ValueLabel {
                        text,
                        x: group_x + bar_width / 2.0,
                        y: top + height / 2.0,
                        placement: LabelPlacement::Center,
                        category: c,
                        series: Some(s),
                        on_fill: Some(s),
                    });
                }
                bars.push(BarRect {
                    category: c,
                    series: s,
                    value,
                    rect,
                });
            }
            labels.push(ValueLabel {
                text: format_value(total, chart.y_format),
                x: group_x + bar_width / 2.0,
                y: top,
                placement: LabelPlacement::Above,
                category: c,
                series: None,
                on_fill: None,
            });
        } else {
            for (s, item) in series.iter().enumerate() {
                let value = item.value_at(c);
                let height = scaled_height(value, max, plot.height);
                let x = group_x + s as f64 * (bar_width + bar_gap);
                let rect = Rect::new(x, plot.bottom() - height, bar_width, height);
                let inside = match chart.label_style {
                    LabelStyle::Inside => true,
                    LabelStyle::Above => false,
                    LabelStyle::Auto => dense || height > threshold,
                };
                labels.push(ValueLabel {
                    text: format_value(value, chart.y_format),
                    x: x + bar_width / 2.0,
                    y: rect.y,
                    placement: if inside {
                        LabelPlacement::Inside
                    } else {
                        LabelPlacement::Above
                    },
                    category: c,
                    series: Some(s),
                    on_fill: inside.then_some(s),
                });
                bars.push(BarRect {
                    category: c,
                    series: s,
                    value,
                    rect,
                });
            }
        }
    }

    BarLayout {
        plot,
        max,
        stacked,
        dense,
        band_width,
        group_width,
        bar_width,
        bar_gap,
        bars,
        labels,
        ticks: axis_ticks(max, &plot, chart),
    }
}

fn line_x(plot: &PlotArea, index: usize, count: usize) -> f64 {
    let steps = count.saturating_sub(1).max(1) as f64;
    plot.x + index as f64 * plot.width / steps
}

/// Line geometry: one polyline per series across evenly spaced x positions, a label
/// above every point and gridlines at four equal intervals.
pub fn compute_line_layout(chart: &Chart, plot: PlotArea) -> LineLayout {
    let count = chart.categories.len();
    let max = chart_max(chart);

    let series: Vec<Vec<LinePoint>> = chart
        .drawn_series()
        .iter()
        .map(|item| {
            (0..count)
                .map(|c| {
                    let value = item.value_at(c);
                    LinePoint {
                        x: line_x(&plot, c, count),
                        y: plot.bottom() - scaled_height(value, max, plot.height),
                        value,
                    }
                })
                .collect()
        })
        .collect();

    let labels = series
        .iter()
        .enumerate()
        .flat_map(|(s, points)| {
            points.iter().enumerate().map(move |(c, p)| ValueLabel {
                text: format_value(p.value, chart.y_format),
                x: p.x,
                y: p.y,
                placement: LabelPlacement::Above,
                category: c,
                series: Some(s),
                on_fill: None,
            })
        })
        .collect();

    let gridlines = [0.0, 0.25, 0.5, 0.75, 1.0]
        .iter()
        .map(|f| plot.bottom() - f * plot.height)
        .collect();

    LineLayout {
        plot,
        max,
        series,
        gridlines,
        labels,
        ticks: axis_ticks(max, &plot, chart),
    }
}

/// Pie or doughnut geometry from the first series.
///
/// Slice sweep is `value / total * 2PI`, starting at 12 o'clock and running clockwise.
/// Negative values count as zero. Percentage labels sit at each slice's mid-angle, at
/// `pie_label_radius` of the way from the inner to the outer radius.
pub fn compute_pie_layout(chart: &Chart, plot: PlotArea, options: &GeometryOptions) -> PieLayout {
    let values: Vec<f64> = match chart.drawn_series().first() {
        Some(series) => (0..chart.categories.len())
            .map(|c| series.value_at(c).max(0.0))
            .collect(),
        None => Vec::new(),
    };
    let total: f64 = values.iter().sum();

    let outer_radius = (plot.width.min(plot.height) / 2.0).max(0.0);
    let inner_radius = if chart.kind == ChartKind::Doughnut {
        outer_radius * options.doughnut_hole_ratio.clamp(0.0, 0.95)
    } else {
        0.0
    };

    let mut layout = PieLayout {
        center_x: plot.x + plot.width / 2.0,
        center_y: plot.y + plot.height / 2.0,
        outer_radius,
        inner_radius,
        total,
        slices: Vec::with_capacity(values.len()),
        labels: Vec::new(),
    };
    if total <= 0.0 {
        return layout;
    }

    let label_radius =
        inner_radius + (outer_radius - inner_radius) * options.pie_label_radius.clamp(0.0, 1.0);
    let mut angle = -FRAC_PI_2;
    for (index, value) in values.into_iter().enumerate() {
        let fraction = value / total;
        let slice = PieSlice {
            index,
            value,
            fraction,
            start_angle: angle,
            end_angle: angle + fraction * 2.0 * PI,
        };
        angle = slice.end_angle;
        if fraction > 0.0 {
            let (x, y) = layout.point(label_radius, slice.mid_angle());
            layout.labels.push(ValueLabel {
                text: format_share(value, total),
                x,
                y,
                placement: LabelPlacement::Center,
                category: index,
                series: Some(0),
                on_fill: Some(index),
            });
        }
        layout.slices.push(slice);
    }
    layout
}

/// Legend for a chart, or `None` when hidden.
///
/// Visibility follows `showLegend` when set, otherwise only charts drawing more than one
/// series get a legend. Pie and doughnut entries are the categories.
pub fn legend_spec(chart: &Chart) -> Option<LegendSpec> {
    let series = chart.drawn_series();
    let visible = chart.show_legend.unwrap_or(series.len() > 1);
    if !visible {
        return None;
    }
    let entries = if chart.kind.is_radial() {
        chart
            .categories
            .iter()
            .enumerate()
            .map(|(i, label)| LegendEntry {
                label: label.clone(),
                color_index: i,
            })
            .collect()
    } else {
        series
            .iter()
            .enumerate()
            .map(|(i, s)| LegendEntry {
                label: s.name.clone(),
                color_index: i,
            })
            .collect()
    };
    Some(LegendSpec {
        position: chart.legend_position.unwrap_or_default(),
        entries,
    })
}

/// Splits a chart frame into plot and legend rectangles with proportional margins, so
/// backends with different units get the same relative layout.
pub fn plot_area_for(frame: Rect, legend: Option<&LegendSpec>, kind: ChartKind) -> ChartFrame {
    let (mut left, mut top, mut right, mut bottom) = if kind.is_radial() {
        (0.04, 0.04, 0.04, 0.04)
    } else {
        // Room for tick labels on the left and category labels underneath.
        (0.12, 0.08, 0.03, 0.14)
    };

    let legend_rect = legend.map(|spec| match spec.position {
        LegendPosition::TopRight => {
            top += 0.10;
            Rect::new(
                frame.x + frame.width * 0.45,
                frame.y,
                frame.width * 0.55,
                frame.height * 0.10,
            )
        }
        LegendPosition::Bottom => {
            bottom += 0.10;
            Rect::new(
                frame.x,
                frame.bottom() - frame.height * 0.10,
                frame.width,
                frame.height * 0.10,
            )
        }
        LegendPosition::Right => {
            right += 0.22;
            Rect::new(
                frame.right() - frame.width * 0.22,
                frame.y + frame.height * 0.1,
                frame.width * 0.22,
                frame.height * 0.8,
            )
        }
        LegendPosition::Left => {
            left += 0.22;
            Rect::new(
                frame.x,
                frame.y + frame.height * 0.1,
                frame.width * 0.22,
                frame.height * 0.8,
            )
        }
    });

    let plot = Rect::new(
        frame.x + frame.width * left,
        frame.y + frame.height * top,
        frame.width * (1.0 - left - right),
        frame.height * (1.0 - top - bottom),
    );
    ChartFrame {
        frame,
        plot,
        legend: legend_rect,
    }
}

/// The series palette of a chart: `seriesColors` when given (bad entries fall back to the
/// theme palette at the same index), otherwise the theme palette.
pub fn chart_palette(chart: &Chart, theme_palette: &[Color]) -> Vec<Color> {
    let fallback = |i: usize| {
        theme_palette
            .get(i % theme_palette.len().max(1))
            .copied()
            .unwrap_or(Color::BLACK)
    };
    match chart.series_colors.as_deref() {
        Some(colors) if !colors.is_empty() => colors
            .iter()
            .enumerate()
            .map(|(i, raw)| Color::from_hex(raw).unwrap_or_else(|| fallback(i)))
            .collect(),
        _ if theme_palette.is_empty() => vec![Color::BLACK],
        _ => theme_palette.to_vec(),
    }
}

/// Color for series (or slice) `index`, cycling through the palette.
pub fn palette_color(palette: &[Color], index: usize) -> Color {
    if palette.is_empty() {
        return Color::BLACK;
    }
    palette[index % palette.len()]
}
