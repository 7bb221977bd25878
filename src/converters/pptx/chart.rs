//! Native DrawingML chart parts.
//!
//! PowerPoint draws these charts itself, so the part pins everything the geometry engine
//! decided: the axis maximum, the plot rectangle inside the frame, gap width and overlap
//! from the slot partition, and every value label's exact text and position class.

use std::fmt::Write;

use super::constants::{DEFAULT_FONT, FONT_SIZE_SCALE, NS_A, NS_C, NS_R, XML_DECLARATION};
use super::error::{PptxError, Result};
use super::utils::{solid_fill, write_run, RunStyle};
use crate::converters::utils::{escape_xml, label_color, CHART_LABEL_SIZE};
use crate::engine::geometry::{
    chart_palette, compute_bar_layout, compute_line_layout, compute_pie_layout, legend_spec,
    palette_color, plot_area_for, ChartFrame, GeometryOptions, LabelPlacement, LegendSpec,
    ValueLabel,
};
use crate::engine::layout::Rect;
use crate::models::chart::{Chart, ChartKind, LegendPosition, ValueFormat};
use crate::models::colors::Color;
use crate::models::theme::Theme;

const CATEGORY_AXIS_ID: u32 = 50_010;
const VALUE_AXIS_ID: u32 = 50_020;
const LINE_WIDTH_EMU: i64 = 28_575;
const MARKER_SIZE: u32 = 6;

/// A text box drawn over the chart for labels DrawingML cannot express (stacked totals).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OverlayLabel {
    pub rect: Rect,
    pub text: String,
}

/// A chart part and the overlays that belong with it on the slide.
#[derive(Debug, Clone)]
pub(crate) struct NativeChart {
    pub xml: String,
    pub overlays: Vec<OverlayLabel>,
}

/// Per-point label decision inside a series' `c:dLbls`.
enum PointLabel<'a> {
    Show {
        label: &'a ValueLabel,
        position: Option<&'static str>,
    },
    Hide,
}

struct ChartWriter<'a> {
    chart: &'a Chart,
    theme: &'a Theme,
    palette: Vec<Color>,
    font: &'a str,
    xml: String,
}

/// Builds a `c:chartSpace` part for `chart` drawn in `frame` (design points).
///
/// # Returns
///
/// The part XML and any overlay labels, or [`PptxError::UnsupportedChart`] when the chart
/// has nothing to plot.
pub(crate) fn build_chart(
    chart: &Chart,
    frame: Rect,
    theme: &Theme,
    options: &GeometryOptions,
) -> Result<NativeChart> {
    if chart.categories.is_empty() {
        return Err(PptxError::UnsupportedChart(format!(
            "{} chart has no categories",
            chart.kind
        )));
    }
    if chart.drawn_series().is_empty() {
        return Err(PptxError::UnsupportedChart(format!(
            "{} chart has no series",
            chart.kind
        )));
    }

    let legend = legend_spec(chart);
    let chart_frame = plot_area_for(frame, legend.as_ref(), chart.kind);
    let mut writer = ChartWriter {
        chart,
        theme,
        palette: chart_palette(chart, &theme.chart_palette),
        font: theme.body_font_or(DEFAULT_FONT),
        xml: String::new(),
    };

    writer.open(&chart_frame)?;
    let overlays = match chart.kind {
        ChartKind::Bar => writer.bar_chart(&chart_frame, options)?,
        ChartKind::Line => {
            writer.line_chart(&chart_frame)?;
            Vec::new()
        }
        ChartKind::Pie | ChartKind::Doughnut => {
            writer.pie_chart(&chart_frame, options)?;
            Vec::new()
        }
    };
    writer.close(&chart_frame, legend.as_ref())?;

    Ok(NativeChart {
        xml: writer.xml,
        overlays,
    })
}

/// Axis number format for a value format.
fn number_format_code(format: ValueFormat) -> &'static str {
    match format {
        ValueFormat::Auto | ValueFormat::Number => "#,##0.###",
        ValueFormat::Currency => "\"$\"#,##0",
        ValueFormat::Percent => "0%",
    }
}

fn legend_position_code(position: LegendPosition) -> &'static str {
    match position {
        LegendPosition::TopRight => "tr",
        LegendPosition::Bottom => "b",
        LegendPosition::Right => "r",
        LegendPosition::Left => "l",
    }
}

/// Fractions of `inner` relative to `outer`, for `c:manualLayout`.
fn fractions(inner: &Rect, outer: &Rect) -> (f64, f64, f64, f64) {
    if outer.width <= 0.0 || outer.height <= 0.0 {
        return (0.0, 0.0, 1.0, 1.0);
    }
    (
        (inner.x - outer.x) / outer.width,
        (inner.y - outer.y) / outer.height,
        inner.width / outer.width,
        inner.height / outer.height,
    )
}

impl ChartWriter<'_> {
    fn open(&mut self, frame: &ChartFrame) -> Result<()> {
        writeln!(self.xml, "{}", XML_DECLARATION)?;
        write!(
            self.xml,
            r#"<c:chartSpace xmlns:c="{}" xmlns:a="{}" xmlns:r="{}">"#,
            NS_C, NS_A, NS_R
        )?;
        self.xml.push_str(
            r#"<c:date1904 val="0"/><c:roundedCorners val="0"/><c:chart><c:autoTitleDeleted val="1"/><c:plotArea>"#,
        );
        let (x, y, w, h) = frame.plot_fractions();
        write!(
            self.xml,
            concat!(
                r#"<c:layout><c:manualLayout><c:layoutTarget val="inner"/><c:xMode val="edge"/><c:yMode val="edge"/>"#,
                r#"<c:x val="{}"/><c:y val="{}"/><c:w val="{}"/><c:h val="{}"/></c:manualLayout></c:layout>"#
            ),
            x, y, w, h
        )?;
        Ok(())
    }

    fn close(&mut self, frame: &ChartFrame, legend: Option<&LegendSpec>) -> Result<()> {
        self.xml.push_str("</c:plotArea>");
        if let (Some(spec), Some(rect)) = (legend, frame.legend.as_ref()) {
            let (x, y, w, h) = fractions(rect, &frame.frame);
            write!(
                self.xml,
                concat!(
                    r#"<c:legend><c:legendPos val="{}"/><c:layout><c:manualLayout><c:xMode val="edge"/><c:yMode val="edge"/>"#,
                    r#"<c:x val="{}"/><c:y val="{}"/><c:w val="{}"/><c:h val="{}"/></c:manualLayout></c:layout>"#,
                    r#"<c:overlay val="0"/>"#
                ),
                legend_position_code(spec.position),
                x,
                y,
                w,
                h
            )?;
            self.text_properties(Color::AXIS_TEXT)?;
            self.xml.push_str("</c:legend>");
        }
        self.xml.push_str(
            r#"<c:plotVisOnly val="1"/><c:dispBlanksAs val="gap"/></c:chart><c:spPr><a:noFill/><a:ln><a:noFill/></a:ln></c:spPr>"#,
        );
        self.text_properties(Color::AXIS_TEXT)?;
        self.xml.push_str("</c:chartSpace>");
        Ok(())
    }

    /// `c:txPr` with the chart label size in `color`.
    fn text_properties(&mut self, color: Color) -> Result<()> {
        write!(
            self.xml,
            concat!(
                r#"<c:txPr><a:bodyPr/><a:lstStyle/><a:p><a:pPr><a:defRPr sz="{}">{}<a:latin typeface="{}"/></a:defRPr></a:pPr>"#,
                r#"<a:endParaRPr lang="en-US"/></a:p></c:txPr>"#
            ),
            (CHART_LABEL_SIZE * FONT_SIZE_SCALE).round() as i64,
            solid_fill(color),
            escape_xml(self.font)
        )?;
        Ok(())
    }

    fn series_header(&mut self, index: usize, name: &str) -> Result<()> {
        write!(
            self.xml,
            r#"<c:ser><c:idx val="{0}"/><c:order val="{0}"/><c:tx><c:v>{1}</c:v></c:tx>"#,
            index,
            escape_xml(name)
        )?;
        Ok(())
    }

    fn categories_and_values(&mut self, values: impl Iterator<Item = f64>) -> Result<()> {
        let count = self.chart.categories.len();
        write!(
            self.xml,
            r#"<c:cat><c:strLit><c:ptCount val="{}"/>"#,
            count
        )?;
        for (i, category) in self.chart.categories.iter().enumerate() {
            write!(
                self.xml,
                r#"<c:pt idx="{}"><c:v>{}</c:v></c:pt>"#,
                i,
                escape_xml(category)
            )?;
        }
        write!(
            self.xml,
            r#"</c:strLit></c:cat><c:val><c:numLit><c:formatCode>General</c:formatCode><c:ptCount val="{}"/>"#,
            count
        )?;
        for (i, value) in values.enumerate() {
            write!(self.xml, r#"<c:pt idx="{}"><c:v>{}</c:v></c:pt>"#, i, value)?;
        }
        self.xml.push_str("</c:numLit></c:val>");
        Ok(())
    }

    /// `c:dLbls` carrying the geometry's label text point by point.
    fn data_labels(&mut self, points: &[(usize, PointLabel)]) -> Result<()> {
        self.xml.push_str("<c:dLbls>");
        for (index, point) in points {
            match point {
                PointLabel::Hide => {
                    write!(
                        self.xml,
                        r#"<c:dLbl><c:idx val="{}"/><c:delete val="1"/></c:dLbl>"#,
                        index
                    )?;
                }
                PointLabel::Show { label, position } => {
                    let color = label_color(label, &self.palette, self.theme);
                    let style = RunStyle::new(CHART_LABEL_SIZE, color, self.font).bold();
                    write!(
                        self.xml,
                        r#"<c:dLbl><c:idx val="{}"/><c:tx><c:rich><a:bodyPr/><a:lstStyle/><a:p>"#,
                        index
                    )?;
                    write_run(&mut self.xml, &label.text, &style)?;
                    self.xml.push_str("</a:p></c:rich></c:tx>");
                    if let Some(position) = position {
                        write!(self.xml, r#"<c:dLblPos val="{}"/>"#, position)?;
                    }
                    self.xml.push_str(concat!(
                        r#"<c:showLegendKey val="0"/><c:showVal val="1"/><c:showCatName val="0"/>"#,
                        r#"<c:showSerName val="0"/><c:showPercent val="0"/><c:showBubbleSize val="0"/></c:dLbl>"#
                    ));
                }
            }
        }
        self.xml.push_str(concat!(
            r#"<c:showLegendKey val="0"/><c:showVal val="0"/><c:showCatName val="0"/>"#,
            r#"<c:showSerName val="0"/><c:showPercent val="0"/><c:showBubbleSize val="0"/></c:dLbls>"#
        ));
        Ok(())
    }

    fn axis_title(&mut self, text: Option<&str>, vertical: bool) -> Result<()> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(());
        };
        let body = if vertical {
            r#"<a:bodyPr rot="-5400000" vert="horz"/>"#
        } else {
            "<a:bodyPr/>"
        };
        let style = RunStyle::new(CHART_LABEL_SIZE, Color::AXIS_TEXT, self.font);
        write!(
            self.xml,
            r#"<c:title><c:tx><c:rich>{}<a:lstStyle/><a:p>"#,
            body
        )?;
        write_run(&mut self.xml, text, &style)?;
        self.xml
            .push_str(r#"</a:p></c:rich></c:tx><c:overlay val="0"/></c:title>"#);
        Ok(())
    }

    /// Category and value axes. The value axis is pinned to `0..=max` in quarter steps,
    /// matching the tick values every backend draws.
    fn axes(&mut self, max: f64, cross_between: &str) -> Result<()> {
        write!(
            self.xml,
            concat!(
                r#"<c:catAx><c:axId val="{}"/><c:scaling><c:orientation val="minMax"/></c:scaling>"#,
                r#"<c:delete val="0"/><c:axPos val="b"/>"#
            ),
            CATEGORY_AXIS_ID
        )?;
        self.axis_title(self.chart.x_label.as_deref(), false)?;
        write!(
            self.xml,
            concat!(
                r#"<c:numFmt formatCode="General" sourceLinked="0"/><c:majorTickMark val="none"/>"#,
                r#"<c:minorTickMark val="none"/><c:tickLblPos val="nextTo"/>"#,
                r#"<c:spPr><a:ln w="9525">{}</a:ln></c:spPr>"#
            ),
            solid_fill(Color::GRIDLINE)
        )?;
        self.text_properties(Color::AXIS_TEXT)?;
        write!(
            self.xml,
            concat!(
                r#"<c:crossAx val="{}"/><c:crosses val="autoZero"/><c:auto val="1"/><c:lblAlgn val="ctr"/>"#,
                r#"<c:lblOffset val="100"/><c:noMultiLvlLbl val="0"/></c:catAx>"#
            ),
            VALUE_AXIS_ID
        )?;

        write!(
            self.xml,
            r#"<c:valAx><c:axId val="{}"/><c:scaling><c:orientation val="minMax"/>"#,
            VALUE_AXIS_ID
        )?;
        if max > 0.0 {
            write!(self.xml, r#"<c:max val="{}"/>"#, max)?;
        }
        write!(
            self.xml,
            concat!(
                r#"<c:min val="0"/></c:scaling><c:delete val="0"/><c:axPos val="l"/>"#,
                r#"<c:majorGridlines><c:spPr><a:ln w="9525">{}</a:ln></c:spPr></c:majorGridlines>"#
            ),
            solid_fill(Color::GRIDLINE)
        )?;
        self.axis_title(self.chart.y_label.as_deref(), true)?;
        write!(
            self.xml,
            concat!(
                r#"<c:numFmt formatCode="{}" sourceLinked="0"/><c:majorTickMark val="none"/>"#,
                r#"<c:minorTickMark val="none"/><c:tickLblPos val="nextTo"/><c:spPr><a:ln><a:noFill/></a:ln></c:spPr>"#
            ),
            escape_xml(number_format_code(self.chart.y_format))
        )?;
        self.text_properties(Color::AXIS_TEXT)?;
        write!(
            self.xml,
            r#"<c:crossAx val="{}"/><c:crosses val="autoZero"/><c:crossBetween val="{}"/>"#,
            CATEGORY_AXIS_ID,
            cross_between
        )?;
        if max > 0.0 {
            write!(self.xml, r#"<c:majorUnit val="{}"/>"#, max / 4.0)?;
        }
        self.xml.push_str("</c:valAx>");
        Ok(())
    }

    fn bar_chart(
        &mut self,
        frame: &ChartFrame,
        options: &GeometryOptions,
    ) -> Result<Vec<OverlayLabel>> {
        let layout = compute_bar_layout(self.chart, frame.plot, options);
        write!(
            self.xml,
            r#"<c:barChart><c:barDir val="col"/><c:grouping val="{}"/><c:varyColors val="0"/>"#,
            if layout.stacked { "stacked" } else { "clustered" }
        )?;

        let categories = self.chart.categories.len();
        for (s, series) in self.chart.drawn_series().iter().enumerate() {
            self.series_header(s, &series.name)?;
            write!(
                self.xml,
                r#"<c:spPr>{}</c:spPr><c:invertIfNegative val="0"/>"#,
                solid_fill(palette_color(&self.palette, s))
            )?;
            let points: Vec<(usize, PointLabel)> = (0..categories)
                .map(|c| {
                    let label = layout
                        .labels
                        .iter()
                        .find(|l| l.category == c && l.series == Some(s));
                    let point = match label {
                        Some(label) => PointLabel::Show {
                            label,
                            position: Some(match label.placement {
                                LabelPlacement::Inside => "inEnd",
                                LabelPlacement::Above => "outEnd",
                                LabelPlacement::Center => "ctr",
                            }),
                        },
                        None => PointLabel::Hide,
                    };
                    (c, point)
                })
                .collect();
            self.data_labels(&points)?;
            self.categories_and_values((0..categories).map(|c| series.value_at(c)))?;
            self.xml.push_str("</c:ser>");
        }

        write!(
            self.xml,
            r#"<c:gapWidth val="{}"/><c:overlap val="{}"/><c:axId val="{}"/><c:axId val="{}"/></c:barChart>"#,
            layout.ooxml_gap_width(),
            layout.ooxml_overlap(),
            CATEGORY_AXIS_ID,
            VALUE_AXIS_ID
        )?;
        self.axes(layout.max, "between")?;

        // Stacked column totals have no DrawingML equivalent; draw them over the chart.
        let height = CHART_LABEL_SIZE * 1.6;
        Ok(layout
            .labels
            .iter()
            .filter(|l| l.series.is_none())
            .map(|l| OverlayLabel {
                rect: Rect::new(
                    l.x - layout.band_width / 2.0,
                    l.y - height - 2.0,
                    layout.band_width,
                    height,
                ),
                text: l.text.clone(),
            })
            .collect())
    }

    fn line_chart(&mut self, frame: &ChartFrame) -> Result<()> {
        let layout = compute_line_layout(self.chart, frame.plot);
        self.xml
            .push_str(r#"<c:lineChart><c:grouping val="standard"/><c:varyColors val="0"/>"#);

        let categories = self.chart.categories.len();
        for (s, series) in self.chart.drawn_series().iter().enumerate() {
            let color = palette_color(&self.palette, s);
            self.series_header(s, &series.name)?;
            write!(
                self.xml,
                concat!(
                    r#"<c:spPr><a:ln w="{0}" cap="rnd">{1}<a:round/></a:ln></c:spPr>"#,
                    r#"<c:marker><c:symbol val="circle"/><c:size val="{2}"/><c:spPr>{1}<a:ln>{1}</a:ln></c:spPr></c:marker>"#
                ),
                LINE_WIDTH_EMU,
                solid_fill(color),
                MARKER_SIZE
            )?;
            let points: Vec<(usize, PointLabel)> = (0..categories)
                .map(|c| {
                    let point = layout
                        .labels
                        .iter()
                        .find(|l| l.category == c && l.series == Some(s))
                        .map(|label| PointLabel::Show {
                            label,
                            position: Some("t"),
                        })
                        .unwrap_or(PointLabel::Hide);
                    (c, point)
                })
                .collect();
            self.data_labels(&points)?;
            self.categories_and_values((0..categories).map(|c| series.value_at(c)))?;
            self.xml.push_str(r#"<c:smooth val="0"/></c:ser>"#);
        }

        write!(
            self.xml,
            r#"<c:marker val="1"/><c:axId val="{}"/><c:axId val="{}"/></c:lineChart>"#,
            CATEGORY_AXIS_ID, VALUE_AXIS_ID
        )?;
        self.axes(layout.max, "midCat")
    }

    fn pie_chart(&mut self, frame: &ChartFrame, options: &GeometryOptions) -> Result<()> {
        let layout = compute_pie_layout(self.chart, frame.plot, options);
        let doughnut = self.chart.kind == ChartKind::Doughnut;
        self.xml.push_str(if doughnut {
            r#"<c:doughnutChart><c:varyColors val="1"/>"#
        } else {
            r#"<c:pieChart><c:varyColors val="1"/>"#
        });

        let Some(series) = self.chart.drawn_series().first() else {
            return Err(PptxError::UnsupportedChart("pie chart has no series".to_string()));
        };
        self.series_header(0, &series.name)?;
        let categories = self.chart.categories.len();
        for c in 0..categories {
            write!(
                self.xml,
                r#"<c:dPt><c:idx val="{}"/><c:bubble3D val="0"/><c:spPr>{}<a:ln w="19050">{}</a:ln></c:spPr></c:dPt>"#,
                c,
                solid_fill(palette_color(&self.palette, c)),
                solid_fill(self.theme.background)
            )?;
        }
        // Doughnut labels take no position; pie labels sit centered in the wedge.
        let position = if doughnut { None } else { Some("ctr") };
        let points: Vec<(usize, PointLabel)> = (0..categories)
            .map(|c| {
                let point = layout
                    .labels
                    .iter()
                    .find(|l| l.category == c)
                    .map(|label| PointLabel::Show { label, position })
                    .unwrap_or(PointLabel::Hide);
                (c, point)
            })
            .collect();
        self.data_labels(&points)?;
        self.categories_and_values((0..categories).map(|c| series.value_at(c).max(0.0)))?;
        self.xml.push_str("</c:ser>");

        if doughnut {
            let hole = (options.doughnut_hole_ratio * 100.0).round().clamp(10.0, 90.0);
            write!(
                self.xml,
                r#"<c:firstSliceAng val="0"/><c:holeSize val="{}"/></c:doughnutChart>"#,
                hole
            )?;
        } else {
            self.xml
                .push_str(r#"<c:firstSliceAng val="0"/></c:pieChart>"#);
        }
        Ok(())
    }
}
