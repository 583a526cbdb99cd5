#![cfg(feature = "web")]
use plotters::prelude::*;

use crate::chart::{PlotSpec, Projection};

/// Configuration options for chart rendering
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            x_label: "Row".to_string(),
            y_label: "Value".to_string(),
            width: 800,
            height: 450,
        }
    }
}

/// Renders a projection as an SVG line chart
///
/// Each selected column becomes one line against its row index; missing
/// cells break the line. Anything other than [`Projection::Plot`] yields an
/// empty, untitled frame.
///
/// # Arguments
/// * `projection` - Output of [`crate::chart::project`]
/// * `options` - Size and axis labels
///
/// # Returns
/// * The SVG document, or the drawing error
///
/// # Examples
/// ```
/// use dashboard::chart::Projection;
/// use dashboard::graph::{render_svg, GraphOptions};
///
/// let svg = render_svg(&Projection::Empty, &GraphOptions::default()).unwrap();
/// assert!(svg.contains("<svg"));
/// ```
pub fn render_svg(
    projection: &Projection,
    options: &GraphOptions,
) -> Result<String, Box<dyn std::error::Error>> {
    let empty = PlotSpec {
        title: String::new(),
        selected_columns: Vec::new(),
        series: Vec::new(),
    };
    let spec = match projection {
        Projection::Plot(spec) => spec,
        Projection::Empty | Projection::NoNumericData => &empty,
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE)?;

        let (x_range, y_range) = axis_ranges(spec);

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc(&options.x_label)
            .y_desc(&options.y_label)
            .draw()?;

        for (index, series) in spec.series.iter().enumerate() {
            let (r, g, b) = Palette99::COLORS[index % Palette99::COLORS.len()];
            let color = RGBColor(r, g, b);
            let segments = segments(&series.values);

            for (n, segment) in segments.into_iter().enumerate() {
                let drawn = chart.draw_series(LineSeries::new(segment, color.stroke_width(2)))?;
                if n == 0 {
                    drawn.label(series.column.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                }
            }
        }

        if !spec.series.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        root.present()?;
    }

    Ok(svg)
}

/// X spans the row indices, Y the present values, never collapsing to zero width
fn axis_ranges(spec: &PlotSpec) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let rows = spec.series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let x_max = (rows.saturating_sub(1) as f64).max(1.0);

    let (min_y, max_y) = spec
        .series
        .iter()
        .flat_map(|s| s.values.iter().flatten())
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .unwrap_or((0.0, 1.0));

    let (min_y, max_y) = if min_y == max_y {
        (min_y - 1.0, max_y + 1.0)
    } else {
        (min_y, max_y)
    };

    (0.0..x_max, min_y..max_y)
}

/// Splits a column into runs of consecutive present values
fn segments(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) if v.is_finite() => current.push((i as f64, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
