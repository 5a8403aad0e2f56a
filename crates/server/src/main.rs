use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post, put},
    Form, Json, Router,
};
use classifier_integration::HttpPoClassifier;
use serde::Deserialize;
use server_api::{
    close_session, create_session, download_latest, examples, list_history, populate_example,
    session_view, submit_classification, update_form, ApiContext,
};
use shared::{
    domain::{HistoryEntry, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{
        session_page_route, session_route, ClassifyOutcome, CreateSessionResponse,
        ExamplesResponse, SessionView, UpdateFormRequest,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod page;

use app_state::AppState;
use config::load_settings;

const MAX_BODY_BYTES: usize = 64 * 1024;
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
struct PageForm {
    #[serde(default)]
    description: String,
    #[serde(default)]
    supplier: String,
    /// Present (as "on") only when the checkbox is ticked.
    #[serde(default)]
    debug_raw: Option<String>,
    #[serde(default)]
    action: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let classifier = HttpPoClassifier::new(&settings.classifier_config()?)?;
    info!(endpoint = %classifier.endpoint(), "classifier configured");

    let api = ApiContext::new(Arc::new(classifier), settings.cache_capacity);
    spawn_session_sweeper(api.clone(), settings.session_ttl());

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_session_sweeper(api: ApiContext, ttl: Duration) {
    let period = ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let expired = api.sessions.sweep_expired(ttl).await;
            if expired > 0 {
                info!(expired, "expired idle sessions");
            }
        }
    });
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/examples", get(http_examples))
        .route("/sessions", post(http_create_session))
        .route(
            "/sessions/:session_id",
            get(http_session_view).delete(http_close_session),
        )
        .route("/sessions/:session_id/form", put(http_update_form))
        .route(
            "/sessions/:session_id/examples/:index",
            post(http_populate_example),
        )
        .route("/sessions/:session_id/classify", post(http_classify))
        .route("/sessions/:session_id/history", get(http_history))
        .route("/sessions/:session_id/download", get(http_download))
        .route(
            "/sessions/:session_id/page",
            get(http_page).post(http_page_action),
        )
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Redirect {
    let session_id = create_session(&state.api).await;
    Redirect::to(&session_page_route(session_id))
}

async fn http_examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: examples(),
    })
}

async fn http_create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, HeaderMap, Json<CreateSessionResponse>) {
    let session_id = create_session(&state.api).await;
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&session_route(session_id)) {
        headers.insert(header::LOCATION, location);
    }
    (
        StatusCode::CREATED,
        headers,
        Json(CreateSessionResponse { session_id }),
    )
}

async fn http_session_view(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_session_id(&session_id)?;
    let view = session_view(&state.api, session_id)
        .await
        .map_err(api_error)?;
    Ok(Json(view))
}

async fn http_close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    let session_id = parse_session_id(&session_id)?;
    close_session(&state.api, session_id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_update_form(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<UpdateFormRequest>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_session_id(&session_id)?;
    let view = update_form(&state.api, session_id, req)
        .await
        .map_err(api_error)?;
    Ok(Json(view))
}

async fn http_populate_example(
    State(state): State<Arc<AppState>>,
    Path((session_id, index)): Path<(String, usize)>,
) -> ApiResult<Json<SessionView>> {
    let session_id = parse_session_id(&session_id)?;
    let view = populate_example(&state.api, session_id, index)
        .await
        .map_err(api_error)?;
    Ok(Json(view))
}

async fn http_classify(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ClassifyOutcome>> {
    let session_id = parse_session_id(&session_id)?;
    let outcome = submit_classification(&state.api, session_id)
        .await
        .map_err(api_error)?;
    Ok(Json(outcome))
}

async fn http_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let session_id = parse_session_id(&session_id)?;
    let history = list_history(&state.api, session_id)
        .await
        .map_err(api_error)?;
    Ok(Json(history))
}

async fn http_download(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiError>)> {
    let session_id = parse_session_id(&session_id)?;
    let download = download_latest(&state.api, session_id)
        .await
        .map_err(api_error)?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(download.content_type),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", download.filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((StatusCode::OK, headers, download.body))
}

async fn http_page(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Html<String>> {
    let session_id = parse_session_id(&session_id)?;
    let view = session_view(&state.api, session_id)
        .await
        .map_err(api_error)?;
    Ok(Html(page::render_page(&view)))
}

/// Applies the submitted form fields, then the pressed button, and re-renders.
/// Classification failures are already recorded on the session and shown on
/// the page, so they do not change the status code.
async fn http_page_action(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Form(form): Form<PageForm>,
) -> ApiResult<Html<String>> {
    let session_id = parse_session_id(&session_id)?;
    update_form(
        &state.api,
        session_id,
        UpdateFormRequest {
            description: Some(form.description),
            supplier: Some(form.supplier),
            debug_raw: Some(form.debug_raw.is_some()),
        },
    )
    .await
    .map_err(api_error)?;

    if form.action == "classify" {
        if let Err(err) = submit_classification(&state.api, session_id).await {
            if err.code == ErrorCode::NotFound {
                return Err(api_error(err));
            }
        }
    } else if let Some(index) = form.action.strip_prefix("example-") {
        let index = index.parse::<usize>().map_err(|_| {
            api_error(ApiError::new(ErrorCode::Validation, "unknown form action"))
        })?;
        populate_example(&state.api, session_id, index)
            .await
            .map_err(api_error)?;
    } else if !form.action.is_empty() {
        warn!(%session_id, action = %form.action, "ignoring unknown form action");
    }

    let view = session_view(&state.api, session_id)
        .await
        .map_err(api_error)?;
    Ok(Html(page::render_page(&view)))
}

fn parse_session_id(raw: &str) -> Result<SessionId, (StatusCode, Json<ApiError>)> {
    raw.parse()
        .map_err(|_| api_error(ApiError::new(ErrorCode::NotFound, "session not found")))
}

fn api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::MalformedResponse => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::ClassifierUnavailable => StatusCode::BAD_GATEWAY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
