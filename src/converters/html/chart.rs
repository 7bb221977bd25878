//! Charts as markup: bars as positioned blocks, lines and wedges as inline SVG.
//!
//! Every coordinate comes from the shared geometry computed in design points over the
//! chart frame; bars are placed with percentages of the plot box and SVG uses the frame
//! size as its `viewBox`, so proportions match the other backends exactly.

use std::f64::consts::PI;
use std::fmt::Write;

use super::error::Result;
use super::utils::{percent, percent_box, px};
use crate::converters::utils::{
    escape_xml, fmt_num, label_color, value_label_top, CHART_LABEL_SIZE,
};
use crate::engine::geometry::{
    chart_palette, compute_bar_layout, compute_line_layout, compute_pie_layout, legend_spec,
    palette_color, plot_area_for, AxisTick, GeometryOptions, LegendSpec, PieLayout, PlotArea,
    ValueLabel,
};
use crate::engine::layout::Rect;
use crate::models::chart::{Chart, ChartKind, LegendPosition};
use crate::models::colors::Color;
use crate::models::theme::Theme;

/// Writes the contents of a chart frame (the caller opens and closes the frame element).
pub(crate) fn write_chart(
    html: &mut String,
    chart: &Chart,
    frame: &Rect,
    theme: &Theme,
    options: &GeometryOptions,
) -> Result<()> {
    let legend = legend_spec(chart);
    let layout = plot_area_for(*frame, legend.as_ref(), chart.kind);
    let palette = chart_palette(chart, &theme.chart_palette);

    match chart.kind {
        ChartKind::Bar => write_bars(html, chart, frame, layout.plot, &palette, theme, options)?,
        ChartKind::Line => write_lines(html, chart, frame, layout.plot, &palette, theme)?,
        ChartKind::Pie | ChartKind::Doughnut => {
            write_pie(html, chart, frame, layout.plot, &palette, theme, options)?
        }
    }
    if !chart.kind.is_radial() {
        write_axis_titles(html, chart, frame, &layout.plot)?;
    }
    if let (Some(spec), Some(rect)) = (legend.as_ref(), layout.legend) {
        write_legend(html, spec, &rect, frame, &palette)?;
    }
    Ok(())
}

fn write_bars(
    html: &mut String,
    chart: &Chart,
    frame: &Rect,
    plot: PlotArea,
    palette: &[Color],
    theme: &Theme,
    options: &GeometryOptions,
) -> Result<()> {
    let layout = compute_bar_layout(chart, plot, options);
    write!(html, r#"<div class="plot" style="{}">"#, percent_box(&plot, frame))?;

    // 1. Gridlines and tick labels
    for tick in &layout.ticks {
        let top = percent(tick.y - plot.y, plot.height);
        write!(html, r#"<div class="gridline" style="top:{}%"></div>"#, top)?;
        write!(
            html,
            r#"<span class="tick" style="right:calc(100% + {});top:{}%">{}</span>"#,
            px(6.0),
            top,
            escape_xml(&tick.label)
        )?;
    }

    // 2. Bars and segments
    for bar in &layout.bars {
        if bar.rect.height <= 0.0 {
            continue;
        }
        write!(
            html,
            r#"<div class="bar" style="{};background:{}"></div>"#,
            percent_box(&bar.rect, &plot),
            palette_color(palette, bar.series).to_css_hex()
        )?;
    }
    html.push_str(r#"<div class="baseline"></div>"#);

    // 3. Category and value labels
    for (c, label) in chart.categories.iter().enumerate() {
        let left = layout.category_center(c) - layout.band_width / 2.0;
        write!(
            html,
            r#"<span class="category" style="left:{}%;width:{}%;top:calc(100% + {})">{}</span>"#,
            percent(left - plot.x, plot.width),
            percent(layout.band_width, plot.width),
            px(6.0),
            escape_xml(label)
        )?;
    }
    write_value_labels(html, &layout.labels, &plot, palette, theme)?;
    html.push_str("</div>");
    Ok(())
}

fn write_value_labels(
    html: &mut String,
    labels: &[ValueLabel],
    plot: &PlotArea,
    palette: &[Color],
    theme: &Theme,
) -> Result<()> {
    for label in labels {
        let class = if label.series.is_none() {
            "value-label total"
        } else {
            "value-label"
        };
        write!(
            html,
            r#"<span class="{}" style="left:{}%;top:{}%;color:{}">{}</span>"#,
            class,
            percent(label.x - plot.x, plot.width),
            percent(value_label_top(label, CHART_LABEL_SIZE) - plot.y, plot.height),
            label_color(label, palette, theme).to_css_hex(),
            escape_xml(&label.text)
        )?;
    }
    Ok(())
}

fn open_svg(html: &mut String, frame: &Rect) -> Result<()> {
    write!(
        html,
        r#"<svg class="chart-svg" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}">"#,
        fmt_num(frame.width),
        fmt_num(frame.height)
    )?;
    // Geometry is in slide coordinates; shift it to the frame origin.
    write!(
        html,
        r#"<g transform="translate({} {})">"#,
        fmt_num(-frame.x),
        fmt_num(-frame.y)
    )?;
    Ok(())
}

fn close_svg(html: &mut String) {
    html.push_str("</g></svg>");
}

/// SVG text whose line box starts at `top`, matching the PDF baseline placement.
fn svg_text(
    html: &mut String,
    x: f64,
    top: f64,
    anchor: &str,
    color: Color,
    bold: bool,
    text: &str,
) -> Result<()> {
    write!(
        html,
        r#"<text x="{}" y="{}" text-anchor="{}" fill="{}"{}>{}</text>"#,
        fmt_num(x),
        fmt_num(top + CHART_LABEL_SIZE * 0.8),
        anchor,
        color.to_css_hex(),
        if bold { r#" font-weight="bold""# } else { "" },
        escape_xml(text)
    )?;
    Ok(())
}

fn write_svg_axis(html: &mut String, plot: &PlotArea, ticks: &[AxisTick]) -> Result<()> {
    for tick in ticks {
        write!(
            html,
            r#"<line x1="{0}" y1="{2}" x2="{1}" y2="{2}" stroke="{3}" stroke-width="0.75"/>"#,
            fmt_num(plot.x),
            fmt_num(plot.right()),
            fmt_num(tick.y),
            Color::GRIDLINE.to_css_hex()
        )?;
        svg_text(
            html,
            plot.x - 6.0,
            tick.y - CHART_LABEL_SIZE / 2.0,
            "end",
            Color::AXIS_TEXT,
            false,
            &tick.label,
        )?;
    }
    Ok(())
}

fn write_svg_labels(
    html: &mut String,
    labels: &[ValueLabel],
    palette: &[Color],
    theme: &Theme,
) -> Result<()> {
    for label in labels {
        svg_text(
            html,
            label.x,
            value_label_top(label, CHART_LABEL_SIZE),
            "middle",
            label_color(label, palette, theme),
            label.series.is_none(),
            &label.text,
        )?;
    }
    Ok(())
}

fn write_lines(
    html: &mut String,
    chart: &Chart,
    frame: &Rect,
    plot: PlotArea,
    palette: &[Color],
    theme: &Theme,
) -> Result<()> {
    let layout = compute_line_layout(chart, plot);
    open_svg(html, frame)?;
    write_svg_axis(html, &plot, &layout.ticks)?;

    for (s, points) in layout.series.iter().enumerate() {
        let color = palette_color(palette, s).to_css_hex();
        let path: Vec<String> = points
            .iter()
            .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
            .collect();
        write!(
            html,
            r#"<polyline fill="none" stroke="{}" stroke-width="2.25" stroke-linejoin="round" points="{}"/>"#,
            color,
            path.join(" ")
        )?;
        for p in points {
            write!(
                html,
                r#"<circle cx="{}" cy="{}" r="3" fill="{}" stroke="{}" stroke-width="1"/>"#,
                fmt_num(p.x),
                fmt_num(p.y),
                color,
                theme.background.to_css_hex()
            )?;
        }
    }

    let count = chart.categories.len();
    for (c, label) in chart.categories.iter().enumerate() {
        svg_text(
            html,
            layout.category_x(c, count),
            plot.bottom() + 6.0,
            "middle",
            Color::AXIS_TEXT,
            false,
            label,
        )?;
    }
    write_svg_labels(html, &layout.labels, palette, theme)?;
    close_svg(html);
    Ok(())
}

/// SVG path of one wedge, clockwise from `start` to `end` in y-down space.
fn wedge_path(layout: &PieLayout, start: f64, end: f64) -> String {
    let r = layout.outer_radius;
    let (x0, y0) = layout.point(r, start);
    let (x1, y1) = layout.point(r, end);
    format!(
        "M{} {} L{} {} A{} {} 0 {} 1 {} {} Z",
        fmt_num(layout.center_x),
        fmt_num(layout.center_y),
        fmt_num(x0),
        fmt_num(y0),
        fmt_num(r),
        fmt_num(r),
        u8::from(end - start > PI),
        fmt_num(x1),
        fmt_num(y1)
    )
}

fn write_pie(
    html: &mut String,
    chart: &Chart,
    frame: &Rect,
    plot: PlotArea,
    palette: &[Color],
    theme: &Theme,
    options: &GeometryOptions,
) -> Result<()> {
    let layout = compute_pie_layout(chart, plot, options);
    let background = theme.background.to_css_hex();
    open_svg(html, frame)?;
    for slice in &layout.slices {
        if slice.fraction <= 0.0 {
            continue;
        }
        let color = palette_color(palette, slice.index).to_css_hex();
        if slice.fraction >= 1.0 - 1e-9 {
            write!(
                html,
                r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
                fmt_num(layout.center_x),
                fmt_num(layout.center_y),
                fmt_num(layout.outer_radius),
                color
            )?;
        } else {
            write!(
                html,
                r#"<path d="{}" fill="{}" stroke="{}" stroke-width="1.5"/>"#,
                wedge_path(&layout, slice.start_angle, slice.end_angle),
                color,
                background
            )?;
        }
    }
    if layout.inner_radius > 0.0 {
        write!(
            html,
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            fmt_num(layout.center_x),
            fmt_num(layout.center_y),
            fmt_num(layout.inner_radius),
            background
        )?;
    }
    write_svg_labels(html, &layout.labels, palette, theme)?;
    close_svg(html);
    Ok(())
}

fn write_axis_titles(html: &mut String, chart: &Chart, frame: &Rect, plot: &PlotArea) -> Result<()> {
    if let Some(label) = chart.x_label.as_deref().filter(|l| !l.is_empty()) {
        write!(
            html,
            r#"<span class="axis-title" style="left:{}%;width:{}%;top:{}%;text-align:center">{}</span>"#,
            percent(plot.x - frame.x, frame.width),
            percent(plot.width, frame.width),
            percent(plot.bottom() + 22.0 - frame.y, frame.height),
            escape_xml(label)
        )?;
    }
    if let Some(label) = chart.y_label.as_deref().filter(|l| !l.is_empty()) {
        write!(
            html,
            r#"<span class="axis-title" style="left:{};top:{}%;transform:translate(-50%,-50%) rotate(-90deg)">{}</span>"#,
            px(2.0 + CHART_LABEL_SIZE * 0.65),
            percent(plot.y + plot.height / 2.0 - frame.y, frame.height),
            escape_xml(label)
        )?;
    }
    Ok(())
}

fn write_legend(
    html: &mut String,
    spec: &LegendSpec,
    rect: &Rect,
    frame: &Rect,
    palette: &[Color],
) -> Result<()> {
    let column = matches!(spec.position, LegendPosition::Left | LegendPosition::Right);
    write!(
        html,
        r#"<div class="legend{}" style="{};align-items:{}">"#,
        if column { " column" } else { "" },
        percent_box(rect, frame),
        if column { "flex-start" } else { "center" }
    )?;
    for entry in &spec.entries {
        write!(
            html,
            r#"<span class="entry"><span class="swatch" style="background:{}"></span>{}</span>"#,
            palette_color(palette, entry.color_index).to_css_hex(),
            escape_xml(&entry.label)
        )?;
    }
    html.push_str("</div>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::templates::resolve_theme;
    use crate::models::chart::Series;

    fn render(chart: &Chart, frame: Rect) -> String {
        let theme = resolve_theme("modern", None, None);
        let mut html = String::new();
        write_chart(&mut html, chart, &frame, &theme, &GeometryOptions::default()).unwrap();
        html
    }

    #[test]
    fn bar_heights_are_geometry_percentages() {
        let mut chart = Chart::single_series(
            ChartKind::Bar,
            vec!["A".into(), "B".into()],
            "Sales",
            vec![50.0, 100.0],
        );
        chart.show_legend = Some(false);
        let frame = Rect::new(0.0, 0.0, 400.0, 300.0);
        let html = render(&chart, frame);

        let plot = plot_area_for(frame, None, ChartKind::Bar).plot;
        let layout = compute_bar_layout(&chart, plot, &GeometryOptions::default());
        for bar in &layout.bars {
            assert!(html.contains(&percent_box(&bar.rect, &plot)));
        }
        assert!(html.contains(r#"height:100%;background:"#));
        assert!(html.contains(r#"height:50%;background:"#));
    }

    #[test]
    fn pie_wedges_are_svg_paths_with_arc_flags() {
        let mut chart = Chart::single_series(
            ChartKind::Pie,
            vec!["Big".into(), "Small".into()],
            "Share",
            vec![3.0, 1.0],
        );
        chart.show_legend = Some(true);
        let html = render(&chart, Rect::new(0.0, 0.0, 300.0, 300.0));
        assert_eq!(html.matches("<path ").count(), 2);
        // The 75% wedge needs the large-arc flag, the 25% wedge does not.
        assert!(html.contains(" 0 1 1 "));
        assert!(html.contains(" 0 0 1 "));
        assert!(html.contains(">75%</text>"));
        assert!(html.contains(r#"<span class="entry">"#));
    }

    #[test]
    fn line_charts_draw_one_polyline_per_series() {
        let mut chart = Chart::single_series(
            ChartKind::Line,
            vec!["Jan".into(), "Feb".into(), "Mar".into()],
            "North",
            vec![1.0, 2.0, 3.0],
        );
        chart.series.push(Series::new("South", vec![3.0, 2.0, 1.0]));
        let html = render(&chart, Rect::new(100.0, 50.0, 400.0, 300.0));
        assert_eq!(html.matches("<polyline ").count(), 2);
        assert_eq!(html.matches("<circle ").count(), 6);
        assert!(html.contains(r#"<g transform="translate(-100 -50)">"#));
    }
}
