use serde::{Deserialize, Serialize};
use std::fmt;

/// The four supported chart families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Doughnut,
}

impl ChartKind {
    /// Pie and doughnut charts only ever read the first series.
    pub fn is_radial(&self) -> bool {
        matches!(self, ChartKind::Pie | ChartKind::Doughnut)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
        };
        f.write_str(name)
    }
}

/// Where the legend sits relative to the plot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPosition {
    #[default]
    TopRight,
    Bottom,
    Right,
    Left,
}

/// How axis ticks and value labels are formatted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    #[default]
    Auto,
    Number,
    Currency,
    Percent,
}

/// Placement of bar value labels. `Auto` defers to the density heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    #[default]
    Auto,
    Inside,
    Above,
}

/// One named data series; `values[i]` belongs to `categories[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: String,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Series {
            name: name.into(),
            values,
        }
    }

    /// Value for a category index. Missing or non-finite values read as 0.
    pub fn value_at(&self, index: usize) -> f64 {
        self.values
            .get(index)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// Structured chart data attached to a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ChartKind,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub stacked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_legend: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_position: Option<LegendPosition>,
    #[serde(default)]
    pub y_format: ValueFormat,
    #[serde(default)]
    pub label_style: LabelStyle,
    /// Stacked bars only: label segments with their share of the column.
    #[serde(default)]
    pub show_stack_percent: bool,
}

impl Chart {
    /// A bar chart with a single series and default presentation options.
    pub fn single_series(
        kind: ChartKind,
        categories: Vec<String>,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        Chart {
            kind,
            categories,
            series: vec![Series::new(name, values)],
            stacked: false,
            show_legend: None,
            x_label: None,
            y_label: None,
            series_colors: None,
            legend_position: None,
            y_format: ValueFormat::Auto,
            label_style: LabelStyle::Auto,
            show_stack_percent: false,
        }
    }

    /// Series that actually take part in drawing: the first one for radial charts,
    /// all of them otherwise.
    pub fn drawn_series(&self) -> &[Series] {
        if self.kind.is_radial() {
            &self.series[..self.series.len().min(1)]
        } else {
            &self.series
        }
    }

    /// Stacking only applies to bar charts.
    pub fn is_stacked_bar(&self) -> bool {
        self.kind == ChartKind::Bar && self.stacked
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() || self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_editor_payload() {
        let json = r#"{
            "type": "bar",
            "categories": ["Q1", "Q2"],
            "series": [{ "name": "Revenue", "values": [10, 20] }],
            "stacked": true,
            "legendPosition": "top-right",
            "yFormat": "currency",
            "labelStyle": "inside",
            "showStackPercent": true
        }"#;
        let chart: Chart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert!(chart.is_stacked_bar());
        assert_eq!(chart.legend_position, Some(LegendPosition::TopRight));
        assert_eq!(chart.y_format, ValueFormat::Currency);
        assert_eq!(chart.label_style, LabelStyle::Inside);
        assert!(chart.show_stack_percent);
    }

    #[test]
    fn missing_values_read_as_zero() {
        let series = Series::new("A", vec![1.0, f64::NAN]);
        assert_eq!(series.value_at(0), 1.0);
        assert_eq!(series.value_at(1), 0.0);
        assert_eq!(series.value_at(7), 0.0);
    }

    #[test]
    fn radial_charts_draw_first_series_only() {
        let mut chart = Chart::single_series(
            ChartKind::Pie,
            vec!["a".into(), "b".into()],
            "first",
            vec![1.0, 2.0],
        );
        chart.series.push(Series::new("second", vec![3.0, 4.0]));
        assert_eq!(chart.drawn_series().len(), 1);
        chart.kind = ChartKind::Line;
        assert_eq!(chart.drawn_series().len(), 2);
    }
}
