use log::{info, warn};
use serde::Serialize;

use crate::chart::{self, Projection, Selection};
use crate::config::Config;
use crate::decoder::{self, DecodeError, DecodeErrorKind, UploadPayload};
use crate::router::{self, Route, RouteOptions, View};
use crate::store::TableStore;

/// A user interaction, as delivered by the UI layer
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    UploadCompleted(UploadPayload),
    NavigationChanged(String),
    SelectionChanged(Vec<String>),
}

/// What has to be redrawn after an event
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "update", content = "body", rename_all = "snake_case")]
pub enum Update {
    Page(View),
    /// Only the chart changed
    Chart(Projection),
}

/// Applies events to the store and recomputes the affected view
#[derive(Debug)]
pub struct Dispatcher {
    store: TableStore,
    page_size: usize,
    retain_on_failed_upload: bool,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        Dispatcher {
            store: TableStore::new(config.session_ttl),
            page_size: config.page_size,
            retain_on_failed_upload: config.retain_on_failed_upload,
        }
    }

    pub fn store(&self) -> &TableStore {
        &self.store
    }

    pub fn dispatch(&self, session: &str, event: Event) -> Update {
        match event {
            Event::UploadCompleted(payload) => {
                // The failure is kept in the session slot for the page to report
                self.upload(session, &payload).ok();
                Update::Page(self.page(session, 0))
            }
            Event::NavigationChanged(path) => Update::Page(self.navigate(session, &path, 0)),
            Event::SelectionChanged(columns) => {
                let selection = Selection::Columns(columns);
                self.store.set_selection(session, selection.clone());
                let table = self.store.current(session);
                Update::Chart(chart::project(table.as_deref(), &selection))
            }
        }
    }

    /// Decode an upload into the session's slot, returning the outcome
    pub fn upload(&self, session: &str, payload: &UploadPayload) -> Result<(), DecodeError> {
        match decoder::decode_payload(payload) {
            Ok(table) => {
                info!(
                    "Session {} uploaded {:?}: {} rows, {} columns",
                    session,
                    payload.filename,
                    table.row_count(),
                    table.column_count()
                );
                self.store.replace(session, table);
                self.store.set_selection(session, Selection::Default);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Session {} upload {:?} rejected: {}",
                    session, payload.filename, e
                );
                self.reject(session, e.clone());
                Err(e)
            }
        }
    }

    /// Record a failed upload, dropping the table unless configured to keep it
    pub fn reject(&self, session: &str, error: DecodeError) {
        if !self.retain_on_failed_upload {
            self.store.clear(session);
        }
        self.store.set_last_error(session, Some(error));
    }

    /// Remember the canonical path for `path` and build its view
    pub fn navigate(&self, session: &str, path: &str, page: usize) -> View {
        let route = Route::from_path(path);
        self.store.set_path(session, route.path());
        self.view(session, route.path(), page)
    }

    /// View for the session's current path
    pub fn page(&self, session: &str, page: usize) -> View {
        let path = self
            .store
            .slot(session)
            .map(|slot| slot.path)
            .unwrap_or_else(|| "/".to_string());
        self.view(session, &path, page)
    }

    /// View for an explicit path, without remembering it
    pub fn view(&self, session: &str, path: &str, page: usize) -> View {
        let slot = self.store.slot(session);
        let selection = slot
            .as_ref()
            .map(|s| s.selection.clone())
            .unwrap_or_default();
        let table = slot.and_then(|s| s.table);

        let options = RouteOptions {
            selection,
            page,
            page_size: self.page_size,
        };
        router::route(path, table.as_deref(), &options)
    }

    /// Chart for the session's current selection
    pub fn chart(&self, session: &str) -> Projection {
        let slot = self.store.slot(session);
        let selection = slot
            .as_ref()
            .map(|s| s.selection.clone())
            .unwrap_or_default();
        chart::project(slot.and_then(|s| s.table).as_deref(), &selection)
    }

    /// Kind of the last failed upload, if the latest upload failed
    pub fn last_error(&self, session: &str) -> Option<DecodeErrorKind> {
        self.store
            .slot(session)
            .and_then(|slot| slot.last_error)
            .map(|e| e.kind())
    }
}
