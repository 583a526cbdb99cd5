use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Data and selection needed to draw a time-series chart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub title: String,
    /// Plotted columns, in table order
    pub selected_columns: Vec<String>,
    /// One series per selected column; `None` where the cell is missing
    pub series: Vec<Series>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub column: String,
    pub values: Vec<Option<f64>>,
}

/// Result of projecting a table onto a column selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    Plot(PlotSpec),
    /// Nothing selected or no table: draw an empty chart
    Empty,
    /// The table has no numeric column to plot
    NoNumericData,
}

/// Column selection driving the chart
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    /// No user choice yet: the first numeric column
    #[default]
    Default,
    Columns(Vec<String>),
}

impl Selection {
    pub fn columns(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Selection::Columns(columns.into_iter().map(Into::into).collect())
    }
}

/// Names of the numeric (plottable) columns, in table order
pub fn plottable_columns(table: &Table) -> Vec<String> {
    table.numeric_columns().map(|c| c.name.clone()).collect()
}

/// Project a table onto a column selection
///
/// An explicit empty selection, or no table at all, always gives
/// [`Projection::Empty`]. A table without numeric columns gives
/// [`Projection::NoNumericData`]. Selected names that are not numeric
/// columns of the table are ignored.
///
/// # Examples
/// ```
/// use dashboard::chart::{project, Projection, Selection};
/// use dashboard::decoder::decode;
///
/// let table = decode("data.csv", b"a,b\n1,2\n3,4\n").unwrap();
/// match project(Some(&table), &Selection::Default) {
///     Projection::Plot(spec) => assert_eq!(spec.title, "Time Series Plot of a"),
///     other => panic!("unexpected projection {:?}", other),
/// }
/// ```
pub fn project(table: Option<&Table>, selection: &Selection) -> Projection {
    if let Selection::Columns(columns) = selection {
        if columns.is_empty() {
            return Projection::Empty;
        }
    }

    let Some(table) = table else {
        return Projection::Empty;
    };

    let numeric = plottable_columns(table);
    if numeric.is_empty() {
        return Projection::NoNumericData;
    }

    let selected: Vec<String> = match selection {
        Selection::Default => numeric.into_iter().take(1).collect(),
        Selection::Columns(columns) => numeric
            .into_iter()
            .filter(|name| columns.contains(name))
            .collect(),
    };

    if selected.is_empty() {
        return Projection::Empty;
    }

    let series = selected
        .iter()
        .filter_map(|name| table.column(name))
        .map(|column| Series {
            column: column.name.clone(),
            values: column.cells.iter().map(|c| c.as_number()).collect(),
        })
        .collect();

    let title = match selected.as_slice() {
        [only] => format!("Time Series Plot of {}", only),
        _ => "Time Series Plot of Selected Columns".to_string(),
    };

    Projection::Plot(PlotSpec {
        title,
        selected_columns: selected,
        series,
    })
}
