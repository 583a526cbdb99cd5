use log::debug;
use serde::{Deserialize, Serialize};

use crate::chart::{self, Projection, Selection};
use crate::metrics::{self, MetricCard};
use crate::table::Table;

/// Rows per page of the raw table view
pub const DEFAULT_PAGE_SIZE: usize = 15;

pub const UPLOAD_PROMPT: &str = "Upload a file to begin analysis";
pub const SETTINGS_PLACEHOLDER: &str = "Settings page - Coming soon";
pub const NO_NUMERIC_WARNING: &str = "No numeric columns found in the dataset for visualization.";

/// Navigable pages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Trends,
    Table,
    Settings,
    /// `/` and every unknown path
    Default,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "/trends" => Route::Trends,
            "/table" => Route::Table,
            "/settings" => Route::Settings,
            "" => Route::Default,
            other => {
                debug!("Unknown path {:?}, using the default view", other);
                Route::Default
            }
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Trends => "/trends",
            Route::Table => "/table",
            Route::Settings => "/settings",
            Route::Default => "/",
        }
    }
}

/// One page of the raw table grid
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TablePage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Zero-based index of this page
    pub page: usize,
    pub page_count: usize,
    pub total_rows: usize,
}

impl TablePage {
    /// Cut one page out of a table; out-of-range pages clamp to the last one.
    pub fn of(table: &Table, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_rows = table.row_count();
        let page_count = total_rows.div_ceil(page_size).max(1);
        let page = page.min(page_count - 1);

        let start = page * page_size;
        let end = (start + page_size).min(total_rows);
        let rows = (start..end)
            .filter_map(|i| table.row(i))
            .map(|cells| cells.into_iter().map(|c| c.display()).collect())
            .collect();

        TablePage {
            columns: table.column_names(),
            rows,
            page,
            page_count,
            total_rows,
        }
    }
}

/// Chart section with the column picker options
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartsView {
    /// Options for the column picker
    pub numeric_columns: Vec<String>,
    pub projection: Projection,
}

impl ChartsView {
    pub fn of(table: &Table, selection: &Selection) -> Self {
        ChartsView {
            numeric_columns: chart::plottable_columns(table),
            projection: chart::project(Some(table), selection),
        }
    }
}

/// Render tree handed to the presentation layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    /// Nothing uploaded yet
    Placeholder { message: String },
    Trends { cards: Vec<MetricCard> },
    Table(TablePage),
    Settings { message: String },
    /// Charts followed by trends
    Default {
        charts: ChartsView,
        cards: Vec<MetricCard>,
    },
}

/// Per-request inputs besides the path and the table
#[derive(Clone, Debug, PartialEq)]
pub struct RouteOptions {
    pub selection: Selection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        RouteOptions {
            selection: Selection::Default,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Choose and build the view for a path
///
/// An absent table wins over every path and yields the upload prompt.
///
/// # Examples
/// ```
/// use dashboard::router::{route, RouteOptions, View};
///
/// let view = route("/trends", None, &RouteOptions::default());
/// assert!(matches!(view, View::Placeholder { .. }));
/// ```
pub fn route(path: &str, table: Option<&Table>, options: &RouteOptions) -> View {
    let Some(table) = table else {
        return View::Placeholder {
            message: UPLOAD_PROMPT.to_string(),
        };
    };

    match Route::from_path(path) {
        Route::Trends => View::Trends {
            cards: metrics::summarize(table),
        },
        Route::Table => View::Table(TablePage::of(table, options.page, options.page_size)),
        Route::Settings => View::Settings {
            message: SETTINGS_PLACEHOLDER.to_string(),
        },
        Route::Default => View::Default {
            charts: ChartsView::of(table, &options.selection),
            cards: metrics::summarize(table),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    fn table_with_rows(n: usize) -> Table {
        let mut csv = String::from("i,name\n");
        for i in 0..n {
            csv.push_str(&format!("{},row{}\n", i, i));
        }
        decode("t.csv", csv.as_bytes()).unwrap()
    }

    #[test]
    fn paths_map_to_routes() {
        assert_eq!(Route::from_path("/trends"), Route::Trends);
        assert_eq!(Route::from_path("/table/"), Route::Table);
        assert_eq!(Route::from_path("/settings"), Route::Settings);
        assert_eq!(Route::from_path("/"), Route::Default);
        assert_eq!(Route::from_path(""), Route::Default);
        assert_eq!(Route::from_path("/unknown-path"), Route::Default);
    }

    #[test]
    fn missing_table_beats_every_path() {
        let options = RouteOptions::default();
        for path in ["/", "/trends", "/table", "/settings", "/elsewhere"] {
            assert_eq!(
                route(path, None, &options),
                View::Placeholder {
                    message: UPLOAD_PROMPT.to_string()
                }
            );
        }
    }

    #[test]
    fn table_view_pages_fifteen_rows() {
        let table = table_with_rows(32);
        let options = RouteOptions::default();
        let View::Table(page) = route("/table", Some(&table), &options) else {
            panic!("expected table view");
        };
        assert_eq!(page.rows.len(), 15);
        assert_eq!(page.page_count, 3);
        assert_eq!(page.total_rows, 32);
        assert_eq!(page.columns, vec!["i", "name"]);
        assert_eq!(page.rows[0], vec!["0", "row0"]);
    }

    #[test]
    fn last_page_is_partial_and_clamped() {
        let table = table_with_rows(32);
        let page = TablePage::of(&table, 99, DEFAULT_PAGE_SIZE);
        assert_eq!(page.page, 2);
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.rows[1], vec!["31", "row31"]);
    }

    #[test]
    fn empty_table_has_one_empty_page() {
        let table = table_with_rows(0);
        let page = TablePage::of(&table, 0, DEFAULT_PAGE_SIZE);
        assert_eq!(page.page_count, 1);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn settings_is_a_placeholder() {
        let table = table_with_rows(1);
        assert_eq!(
            route("/settings", Some(&table), &RouteOptions::default()),
            View::Settings {
                message: SETTINGS_PLACEHOLDER.to_string()
            }
        );
    }

    #[test]
    fn unknown_path_renders_the_default_view() {
        let table = table_with_rows(3);
        let options = RouteOptions::default();
        let default = route("/", Some(&table), &options);
        assert!(matches!(default, View::Default { .. }));
        assert_eq!(route("/unknown-path", Some(&table), &options), default);
    }

    #[test]
    fn default_view_warns_without_numeric_columns() {
        let table = decode("t.csv", b"name\nann\n").unwrap();
        let View::Default { charts, cards } = route("/", Some(&table), &RouteOptions::default())
        else {
            panic!("expected default view");
        };
        assert_eq!(charts.projection, Projection::NoNumericData);
        assert!(charts.numeric_columns.is_empty());
        assert_eq!(cards.len(), 1);
    }
}
