#![cfg(feature = "web")]
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::chart::{self, Projection, Selection};
use crate::config::Config;
use crate::decoder::{DecodeErrorKind, UploadPayload};
use crate::dispatcher::{Dispatcher, Event, Update};
use crate::graph::{self, GraphOptions};
use crate::render::{RenderError, Renderer};
use crate::router::{self, Route, RouteOptions, View};
use crate::store::SessionId;

const SESSION_COOKIE: &str = "session";

pub struct AppState {
    dispatcher: Dispatcher,
    renderer: Renderer,
    graph_options: GraphOptions,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, RenderError> {
        Ok(AppState {
            dispatcher: Dispatcher::new(config),
            renderer: Renderer::new()?,
            graph_options: GraphOptions::default(),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: usize,
}

#[derive(Deserialize)]
struct ViewQuery {
    path: Option<String>,
    #[serde(default)]
    page: usize,
}

#[derive(Deserialize)]
struct ChartQuery {
    /// Comma-separated column names; the session's selection when absent
    columns: Option<String>,
}

#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    /// `data:<mime>;base64,<payload>`
    contents: String,
}

#[derive(Deserialize)]
struct SelectionRequest {
    columns: Vec<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    status: String,
    error: Option<DecodeErrorKind>,
    view: View,
}

/// Build the application router around shared state
pub fn router(state: Arc<AppState>, config: &Config) -> Router {
    Router::new()
        .route("/", get(serve_page))
        .route("/trends", get(serve_page))
        .route("/table", get(serve_page))
        .route("/settings", get(serve_page))
        .route("/upload", post(upload_form))
        .route("/session/end", post(end_session))
        .route("/chart.svg", get(serve_chart))
        .route("/api/view", get(get_view))
        .route("/api/upload", post(upload_json))
        .route("/api/selection", post(update_selection))
        .fallback(serve_unknown)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(&config)?);
    let app = router(state, &config);

    // Start server
    let listener = TcpListener::bind(config.addr).await?;
    info!("Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// The caller's live session, if its cookie names one
fn existing_session(state: &AppState, jar: &CookieJar) -> Option<SessionId> {
    let cookie = jar.get(SESSION_COOKIE)?;
    if state.dispatcher.store().touch(cookie.value()) {
        Some(cookie.value().to_string())
    } else {
        None
    }
}

/// Resolve the caller's session, opening a fresh one when the cookie is missing or stale
fn session(state: &AppState, jar: CookieJar) -> (CookieJar, SessionId) {
    if let Some(id) = existing_session(state, &jar) {
        return (jar, id);
    }

    let store = state.dispatcher.store();
    store.purge_expired();
    let id = store.open_session();
    let mut cookie = Cookie::new(SESSION_COOKIE, id.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    (jar.add(cookie), id)
}

fn render_failure(e: RenderError) -> Response {
    error!("Failed to render page: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
}

async fn serve_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Response {
    let (jar, session) = session(&state, jar);
    let view = state.dispatcher.navigate(&session, uri.path(), query.page);
    render_page(&state, jar, Route::from_path(uri.path()), Some(&session), &view)
}

/// Paths outside the route table render without opening a session
async fn serve_unknown(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Response {
    let route = Route::from_path(uri.path());
    let session = existing_session(&state, &jar);
    let view = match &session {
        Some(session) => state.dispatcher.navigate(session, route.path(), query.page),
        None => router::route(route.path(), None, &RouteOptions::default()),
    };
    render_page(&state, jar, route, session.as_deref(), &view)
}

fn render_page(
    state: &AppState,
    jar: CookieJar,
    route: Route,
    session: Option<&str>,
    view: &View,
) -> Response {
    let failure = session.and_then(|s| state.dispatcher.last_error(s));
    match state.renderer.page(route, view, failure) {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(e) => render_failure(e),
    }
}

async fn get_view(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ViewQuery>,
) -> Json<View> {
    let dispatcher = &state.dispatcher;
    let view = match (existing_session(&state, &jar), query.path) {
        (Some(session), Some(path)) => dispatcher.view(&session, &path, query.page),
        (Some(session), None) => dispatcher.page(&session, query.page),
        (None, path) => router::route(
            path.as_deref().unwrap_or("/"),
            None,
            &RouteOptions::default(),
        ),
    };
    Json(view)
}

async fn upload_form(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (jar, session) = session(&state, jar);

    let mut payload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => payload = Some(UploadPayload::new(filename, bytes.to_vec())),
                    Err(e) => {
                        warn!("Failed to read upload: {}", e);
                        return (jar, (StatusCode::BAD_REQUEST, "Failed to read upload"))
                            .into_response();
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart request: {}", e);
                return (jar, (StatusCode::BAD_REQUEST, "Malformed upload request")).into_response();
            }
        }
    }

    let Some(payload) = payload else {
        return (jar, (StatusCode::BAD_REQUEST, "No file data received")).into_response();
    };

    state
        .dispatcher
        .dispatch(&session, Event::UploadCompleted(payload));

    let route = state
        .dispatcher
        .store()
        .slot(&session)
        .map(|slot| Route::from_path(&slot.path))
        .unwrap_or(Route::Default);
    (jar, Redirect::to(route.path())).into_response()
}

async fn upload_json(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<UploadRequest>,
) -> impl IntoResponse {
    let (jar, session) = session(&state, jar);
    let dispatcher = &state.dispatcher;

    let view = match UploadPayload::from_data_url(request.filename.clone(), &request.contents) {
        Ok(payload) => match dispatcher.dispatch(&session, Event::UploadCompleted(payload)) {
            Update::Page(view) => view,
            Update::Chart(_) => dispatcher.page(&session, 0),
        },
        Err(e) => {
            // A broken transport encoding is handled like an undecodable file
            warn!("Upload {:?} rejected: {}", request.filename, e);
            dispatcher.reject(&session, e);
            dispatcher.page(&session, 0)
        }
    };

    let error = dispatcher.last_error(&session);
    let status = if error.is_some() { "error" } else { "ok" };
    (
        jar,
        Json(UploadResponse {
            status: status.to_string(),
            error,
            view,
        }),
    )
}

async fn update_selection(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<SelectionRequest>,
) -> Json<Update> {
    let update = match existing_session(&state, &jar) {
        Some(session) => state
            .dispatcher
            .dispatch(&session, Event::SelectionChanged(request.columns)),
        None => Update::Chart(chart::project(None, &Selection::Columns(request.columns))),
    };
    Json(update)
}

async fn serve_chart(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<ChartQuery>,
) -> Response {
    let dispatcher = &state.dispatcher;
    let session = existing_session(&state, &jar);

    let projection = match (query.columns, &session) {
        (Some(columns), _) => {
            let selection = Selection::columns(columns.split(',').filter(|c| !c.is_empty()));
            let table = session.as_deref().and_then(|s| dispatcher.store().current(s));
            chart::project(table.as_deref(), &selection)
        }
        (None, Some(session)) => dispatcher.chart(session),
        (None, None) => Projection::Empty,
    };

    match graph::render_svg(&projection, &state.graph_options) {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => render_failure(RenderError::Chart(e.to_string())),
    }
}

async fn end_session(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.dispatcher.store().end_session(cookie.value());
    }
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), Redirect::to("/"))
}
