use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use server_api::{parse_form_date, render, Flash, FormState, Selection, View};
use shared::{
    domain::SubmissionRecord,
    error::{ApiError, ErrorCode},
    protocol::{CascadeOptions, CascadeQuery, LoginRequest, SessionSummary, SubmitRequest},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod html;
mod sessions;
mod startup;

use app_state::AppState;
use config::{load_settings, StartupError};
use sessions::{session_cookie, SessionHandle, SessionStore};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Query of `GET /`: the pending form input carried between renders.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FormQuery {
    organization: String,
    allocation: String,
    sequence: String,
    value: String,
    date: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings().inspect_err(|error| error!(%error, "invalid configuration"))?;
    let api = startup::build_context(&settings)
        .await
        .inspect_err(|error| error!(%error, "startup failed"))?;

    let state = AppState {
        api,
        sessions: SessionStore::new(),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings
        .bind_addr
        .parse()
        .map_err(|_| StartupError::BindAddr(settings.bind_addr.clone()))?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/submit", post(submit))
        .route("/api/options", get(api_options))
        .route("/api/session", get(api_session))
        .route("/api/records", post(api_submit))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Persistence => StatusCode::BAD_GATEWAY,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    (status_for(err.code), Json(err))
}

/// Attaches the session cookie when the handle was minted by this request.
fn with_session(handle: SessionHandle, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if handle.fresh {
        if let Some(cookie) = session_cookie(handle.id) {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}

fn page(state: &AppState, session: &server_api::Session, form: &FormState) -> Html<String> {
    let view: View = render(&state.api.reference, session, form, today());
    Html(html::render_page(&view))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<FormQuery>,
) -> Response {
    let handle = state.sessions.identify(&headers);
    let session = state.sessions.get(handle.id).await;
    let form = FormState {
        selection: Selection::from_inputs(&q.organization, &q.allocation, &q.sequence),
        value: q.value,
        date: parse_form_date(&q.date, today()).ok(),
        ..FormState::default()
    };
    with_session(handle, page(&state, &session, &form))
}

async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<LoginRequest>,
) -> Response {
    let handle = state.sessions.identify(&headers);
    let mut session = state.sessions.get(handle.id).await;

    match server_api::login(&state.api, &mut session, &req) {
        Ok(()) => {
            let handle = state.sessions.promote(handle.id, session).await;
            with_session(handle, Redirect::to("/"))
        }
        Err(err) => {
            let form = FormState {
                login_name: req.name,
                login_unit: req.unit,
                flash: Some(Flash::from_error(&err)),
                ..FormState::default()
            };
            with_session(handle, (status_for(err.code), page(&state, &session, &form)))
        }
    }
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let handle = state.sessions.identify(&headers);
    let mut session = state.sessions.get(handle.id).await;
    server_api::logout(&mut session);
    state.sessions.remove(handle.id).await;
    with_session(handle, Redirect::to("/"))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(req): Form<SubmitRequest>,
) -> Response {
    let handle = state.sessions.identify(&headers);
    let session = state.sessions.get(handle.id).await;
    let today = today();
    let result = server_api::submit(&state.api, &session, &req, today).await;

    let (status, flash) = match &result {
        Ok(receipt) => (StatusCode::OK, Flash::success(receipt.message.clone())),
        Err(err) => (status_for(err.code), Flash::from_error(err)),
    };
    let form = FormState {
        selection: Selection::from_inputs(&req.organization, &req.allocation, &req.sequence),
        value: req.value,
        date: parse_form_date(&req.date, today).ok(),
        flash: Some(flash),
        ..FormState::default()
    };
    with_session(handle, (status, page(&state, &session, &form)))
}

async fn api_options(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CascadeQuery>,
) -> Json<CascadeOptions> {
    Json(server_api::options(&state.api, &q))
}

async fn api_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let handle = state.sessions.identify(&headers);
    let session = state.sessions.get(handle.id).await;
    let summary: SessionSummary = server_api::session_summary(&session);
    with_session(handle, Json(summary))
}

async fn api_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmissionRecord>, (StatusCode, Json<ApiError>)> {
    let handle = state.sessions.identify(&headers);
    let session = state.sessions.get(handle.id).await;
    let receipt = server_api::submit(&state.api, &session, &req, today())
        .await
        .map_err(json_error)?;
    Ok(Json(receipt.record))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
