#![cfg(feature = "web")]
use handlebars::Handlebars;
use serde_json::{Value, json};
use thiserror::Error;

use crate::chart::Projection;
use crate::decoder::DecodeErrorKind;
use crate::router::{ChartsView, NO_NUMERIC_WARNING, Route, TablePage, View};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("{0}")]
    Render(#[from] handlebars::RenderError),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

const TEMPLATES: &[(&str, &str)] = &[
    ("layout", include_str!("./templates/layout.hbs")),
    ("placeholder", include_str!("./templates/placeholder.hbs")),
    ("settings", include_str!("./templates/settings.hbs")),
    ("trends", include_str!("./templates/trends.hbs")),
    ("table", include_str!("./templates/table.hbs")),
    ("charts", include_str!("./templates/charts.hbs")),
    ("default", include_str!("./templates/default.hbs")),
];

const NAV_LINKS: &[(&str, &str, Route)] = &[
    ("📈 Trends", "/trends", Route::Trends),
    ("⚙️ Settings", "/settings", Route::Settings),
    ("📋 Data Table", "/table", Route::Table),
];

/// Turns view trees into HTML pages
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        for (name, source) in TEMPLATES {
            registry.register_template_string(name, *source)?;
        }
        Ok(Renderer { registry })
    }

    /// Render a full page: sidebar, upload form and the view body
    pub fn page(
        &self,
        route: Route,
        view: &View,
        failure: Option<DecodeErrorKind>,
    ) -> Result<String, RenderError> {
        let content = self.content(view)?;

        let links: Vec<Value> = NAV_LINKS
            .iter()
            .map(|(label, href, target)| {
                json!({ "label": label, "href": href, "active": *target == route })
            })
            .collect();

        // Only worth reporting while the upload prompt is showing
        let notice = match (view, failure) {
            (View::Placeholder { .. }, Some(kind)) => Some(failure_notice(kind)),
            _ => None,
        };

        let page = self.registry.render(
            "layout",
            &json!({ "links": links, "notice": notice, "content": content }),
        )?;
        Ok(page)
    }

    /// Render only the view body
    pub fn content(&self, view: &View) -> Result<String, RenderError> {
        let html = match view {
            View::Placeholder { message } => {
                self.registry.render("placeholder", &json!({ "message": message }))?
            }
            View::Settings { message } => {
                self.registry.render("settings", &json!({ "message": message }))?
            }
            View::Trends { cards } => self.registry.render("trends", &json!({ "cards": cards }))?,
            View::Table(page) => self.registry.render("table", &table_context(page))?,
            View::Default { charts, cards } => self.registry.render(
                "default",
                &json!({ "charts": charts_context(charts), "trends": { "cards": cards } }),
            )?,
        };
        Ok(html)
    }
}

fn failure_notice(kind: DecodeErrorKind) -> &'static str {
    match kind {
        DecodeErrorKind::UnsupportedFormat => {
            "Unsupported file format. Please upload a CSV, TSV, or Excel file."
        }
        DecodeErrorKind::Malformed => "The uploaded file could not be read.",
    }
}

fn table_context(page: &TablePage) -> Value {
    json!({
        "columns": page.columns,
        "rows": page.rows,
        "page_number": page.page + 1,
        "page_count": page.page_count,
        "total_rows": page.total_rows,
        "has_prev": page.page > 0,
        "prev": page.page.saturating_sub(1),
        "has_next": page.page + 1 < page.page_count,
        "next": page.page + 1,
    })
}

fn charts_context(charts: &ChartsView) -> Value {
    let (selected, title): (&[String], &str) = match &charts.projection {
        Projection::Plot(spec) => (spec.selected_columns.as_slice(), spec.title.as_str()),
        _ => (&[] as &[String], ""),
    };

    let options: Vec<Value> = charts
        .numeric_columns
        .iter()
        .map(|name| json!({ "name": name, "selected": selected.contains(name) }))
        .collect();

    json!({
        "no_numeric": charts.projection == Projection::NoNumericData,
        "warning": NO_NUMERIC_WARNING,
        "options": options,
        "title": title,
    })
}
