/*!
# Upload Dashboard

A browser-based dashboard for tabular files, built in Rust.

## Overview

A user uploads a CSV, TSV or Excel file. The application decodes it into a
table, keeps it in a per-session cache and renders three views of it: charts,
summary metrics and the raw table, chosen by the URL path.

## Architecture

### Pipeline
- **decoder**: uploaded bytes (or a browser data URL) to a [`Table`], or a typed [`DecodeError`]
- **store**: session-keyed cache holding at most one table per session
- **metrics**: "Total Records" plus Avg/Max cards for the first two numeric columns
- **chart**: numeric column selection projected into a [`PlotSpec`]
- **router**: path plus current table to one of four views
- **dispatcher**: typed events (upload, navigation, selection) applied to the store,
  recomputing only the affected view

### Web Layer (`web` feature)
- **graph**: SVG line charts with plotters
- **render**: HTML pages from handlebars templates
- **app**: axum routes, session cookie, upload endpoints

## REST API Endpoints

- `GET /`, `/trends`, `/table?page=N`, `/settings` - HTML pages
- `POST /upload` - multipart upload, field `file`
- `POST /api/upload` - JSON `{filename, contents}` with a base64 data URL
- `POST /api/selection` - JSON `{columns}`, returns the new chart projection
- `GET /api/view?path=/trends` - the view tree as JSON
- `GET /chart.svg` - chart for the session's selection
- `POST /session/end` - drop the session and its table
*/

pub mod chart;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod metrics;
pub mod router;
pub mod store;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod graph;
#[cfg(feature = "web")]
pub mod render;

pub use chart::{PlotSpec, Projection, Selection};
pub use decoder::{DecodeError, DecodeErrorKind, UploadPayload, decode};
pub use dispatcher::{Dispatcher, Event, Update};
pub use metrics::{MetricCard, summarize};
pub use router::{Route, View, route};
pub use store::TableStore;
pub use table::{CellValue, Column, ColumnKind, Table};
