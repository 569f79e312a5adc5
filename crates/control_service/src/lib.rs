use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use continue_watching::ContinueWatching;
use datastore::{ResumeCacheStore, StoreError};
use domain::{ContentItem, PlaybackEvent, PlaybackRecord, ResumeAction, format_time};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handler state: the store and the selector reading through it
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ResumeCacheStore>,
    selector: ContinueWatching,
}

impl AppState {
    pub fn new(store: Arc<dyn ResumeCacheStore>) -> Self {
        let selector = ContinueWatching::new(store.clone());
        Self { store, selector }
    }
}

/// Request body sent by the player when playback pauses or stops
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackEventRequest {
    pub content: ContentItem,
    pub event: PlaybackEvent,
}

/// Response for successful writes
#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub success: bool,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Play button state for a single video
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub id: String,
    #[serde(flatten)]
    pub action: ResumeAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_label: Option<String>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    let body = ErrorResponse {
        success: false,
        error: error.into(),
    };
    (status, Json(body)).into_response()
}

fn store_error_response(err: StoreError) -> Response {
    tracing::error!("Resume cache request failed: {}", err);
    let status = match err {
        StoreError::InvalidRecord { .. } => StatusCode::BAD_REQUEST,
        StoreError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Handler for pause/stop events from the player
async fn record_playback_event(
    State(state): State<AppState>,
    Json(request): Json<PlaybackEventRequest>,
) -> Response {
    let PlaybackEventRequest { content, event } = request;

    if content.id() != event.id {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Event for '{}' does not match content '{}'",
                event.id,
                content.id()
            ),
        );
    }

    if content.is_live_video() || event.is_live {
        tracing::debug!(id = %event.id, "Ignoring pause of live video");
        let response = CreateResponse {
            success: true,
            message: format!("Live video '{}' is not cached", event.id),
        };
        return (StatusCode::ACCEPTED, Json(response)).into_response();
    }

    let record = PlaybackRecord::from_pause(&content, &event);
    if let Err(err) = state.store.upsert(vec![record]).await {
        return store_error_response(err);
    }

    let response = CreateResponse {
        success: true,
        message: format!("Playback of '{}' cached successfully", event.id),
    };
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn list_records(State(state): State<AppState>) -> Response {
    match state.store.get_all().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.get(&id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("No cached playback for '{id}'")),
        Err(err) => store_error_response(err),
    }
}

async fn clear_records(State(state): State<AppState>) -> Response {
    match state.store.clear().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn list_continue_watching(State(state): State<AppState>) -> Response {
    match state.selector.select_most_recent().await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn resume_state(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let record = match state.store.get(&id).await {
        Ok(record) => record,
        Err(err) => return store_error_response(err),
    };

    let action = ResumeAction::for_record(record.as_ref());
    let play_data = record.as_ref().and_then(PlaybackRecord::cached_play_data);
    let response = ResumeResponse {
        id,
        action,
        progress: record.as_ref().and_then(PlaybackRecord::progress_fraction),
        resume_label: match action {
            ResumeAction::Resume { from } => Some(format_time(from)),
            _ => None,
        },
        length_label: play_data
            .filter(|_| action != ResumeAction::Play)
            .map(|data| format_time(data.length)),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Create the router for the resume cache API
pub fn create_router(store: Arc<dyn ResumeCacheStore>) -> Router {
    Router::new()
        .route("/playback_events", post(record_playback_event))
        .route("/records", get(list_records).delete(clear_records))
        .route("/records/{id}", get(get_record))
        .route("/records/{id}/resume", get(resume_state))
        .route("/continue_watching", get(list_continue_watching))
        .with_state(AppState::new(store))
}
