//! HTTP API: todo CRUD plus the summarize endpoint.

use crate::pipeline::{PipelineError, ReferenceZone, SummaryPipeline};
use crate::storage::{Storage, StorageError};
use crate::task::{NewTask, SortOrder, StatusFilter, Task, TaskPatch};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared application state. `Tz` is the zone summaries are computed in.
pub struct AppState<Tz: ReferenceZone = Local> {
    pub storage: Arc<Storage>,
    pub pipeline: Arc<SummaryPipeline<Tz>>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Todo not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
}

impl ErrorBody {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
            summary: None,
        }
    }

    fn internal(message: &str, error: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            error: Some(error.to_string()),
            summary: None,
        }
    }
}

const SUMMARY_FAILED: &str = "Failed to generate summary or send to Slack";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound | ApiError::Storage(StorageError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, ErrorBody::message("Todo not found"))
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, ErrorBody::message(message)),
            ApiError::Storage(err) => {
                error!(error = %err, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::message(err.to_string()))
            }
            ApiError::Pipeline(PipelineError::NoPendingTasks) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::message(PipelineError::NoPendingTasks.to_string()),
            ),
            ApiError::Pipeline(PipelineError::Delivery { summary, source }) => {
                error!(error = %source, "summary generated but not delivered");
                let mut body = ErrorBody::internal(SUMMARY_FAILED, source);
                body.summary = Some(summary);
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            ApiError::Pipeline(err) => {
                error!(error = %err, "summary generation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::internal(SUMMARY_FAILED, err))
            }
        };
        (status, Json(body)).into_response()
    }
}

pub fn create_router<Tz: ReferenceZone>(
    state: Arc<AppState<Tz>>,
    cors_allowed_origins: &[String],
) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/todos", get(list_todos::<Tz>).post(create_todo::<Tz>))
        .route(
            "/todos/{id}",
            get(get_todo::<Tz>)
                .put(update_todo::<Tz>)
                .delete(delete_todo::<Tz>),
        )
        .route("/summarize", post(summarize::<Tz>))
        .layer(build_cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "server listening");
    axum::serve(listener, router).await
}

fn build_cors_layer(cors_allowed_origins: &[String]) -> CorsLayer {
    let mut parsed = Vec::new();
    for origin in cors_allowed_origins {
        match HeaderValue::from_str(origin) {
            Ok(value) => parsed.push(value),
            Err(err) => warn!("ignoring invalid CORS origin '{origin}': {err}"),
        }
    }

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .allow_credentials(true)
        .allow_origin(parsed)
}

// --- Handlers ---

async fn health() -> &'static str {
    "Todo Summary Assistant API is running"
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    status: StatusFilter,
    #[serde(default)]
    sort: SortOrder,
}

async fn list_todos<Tz: ReferenceZone>(
    State(state): State<Arc<AppState<Tz>>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let Query(query) = query?;
    let tasks = state.storage.list(query.status, query.sort)?;
    info!(count = tasks.len(), "listed todos");
    Ok(Json(tasks))
}

async fn get_todo<Tz: ReferenceZone>(
    State(state): State<Arc<AppState<Tz>>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    state.storage.get(&id)?.map(Json).ok_or(ApiError::NotFound)
}

async fn create_todo<Tz: ReferenceZone>(
    State(state): State<Arc<AppState<Tz>>>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(new) = payload?;
    require_title(&new.title)?;
    let task = state.storage.create(new)?;
    info!(id = %task.id, "todo created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_todo<Tz: ReferenceZone>(
    State(state): State<Arc<AppState<Tz>>>,
    Path(id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let Json(patch) = payload?;
    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    let task = state.storage.update(&id, patch)?;
    info!(id = %task.id, "todo updated");
    Ok(Json(task))
}

#[derive(Serialize)]
struct DeleteResponse {
    message: &'static str,
}

async fn delete_todo<Tz: ReferenceZone>(
    State(state): State<Arc<AppState<Tz>>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.storage.delete(&id)? {
        return Err(ApiError::NotFound);
    }
    info!(%id, "todo deleted");
    Ok(Json(DeleteResponse {
        message: "Todo deleted successfully",
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeRequest {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummarizeResponse {
    success: bool,
    message: &'static str,
    summary: String,
    used_fallback: bool,
}

async fn summarize<Tz: ReferenceZone>(
    State(state): State<Arc<AppState<Tz>>>,
    body: Bytes,
) -> Result<Json<SummarizeResponse>, ApiError> {
    // The body is optional; an empty one means "all users".
    let request: SummarizeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SummarizeRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let user_id = request.user_id.as_deref().filter(|id| !id.is_empty());

    let outcome = state.pipeline.run(user_id).await?;
    Ok(Json(SummarizeResponse {
        success: true,
        message: "Summary generated and sent to Slack successfully",
        summary: outcome.summary,
        used_fallback: outcome.used_fallback,
    }))
}

fn require_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }
    Ok(())
}
