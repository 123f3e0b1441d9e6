//! HTTP API endpoints for room setup and read-only views.
//!
//! Game actions go over the websocket; these cover creating and joining
//! rooms and fetching state without a socket.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GameError;
use crate::protocol::RoomView;
use crate::scoring::{Scoreboard, Standings};
use crate::state::{AppState, CreateRoom};
use crate::types::Player;
use crate::ws;

/// Maps domain errors onto HTTP status codes
#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GameError::NotFound(_) => StatusCode::NOT_FOUND,
            GameError::Unauthorized(_) => StatusCode::FORBIDDEN,
            GameError::PhaseMismatch(_) | GameError::RoomFull { .. } => StatusCode::CONFLICT,
            GameError::InvalidConfiguration(_)
            | GameError::InvalidGuess(_)
            | GameError::AmbiguousInference(_) => StatusCode::BAD_REQUEST,
            GameError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = ErrorBody {
            code: self.0.code(),
            msg: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScoreboardResponse {
    pub scoreboard: Scoreboard,
    pub standings: Standings,
}

/// All HTTP and websocket routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{code}", get(get_room))
        .route("/api/rooms/{code}/players", post(join_room))
        .route("/api/rooms/{code}/scoreboard", get(get_scoreboard))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// GET /api/health
async fn health() -> &'static str {
    "ok"
}

/// Create a room; the response is the admin's view.
///
/// POST /api/rooms
async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoom>,
) -> ApiResult<(StatusCode, Json<RoomView>)> {
    let room = state.create_room(req).await?;
    let view = state.room_view(&room.code, Some(room.admin.as_str())).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/rooms/{code}/players
async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<JoinRequest>,
) -> ApiResult<Json<Player>> {
    Ok(Json(state.join_room(&code, &req.name).await?))
}

/// Redacted for `?name=`, spectator view without it.
///
/// GET /api/rooms/{code}
async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<RoomView>> {
    Ok(Json(state.room_view(&code, query.name.as_deref()).await?))
}

/// GET /api/rooms/{code}/scoreboard
async fn get_scoreboard(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<ScoreboardResponse>> {
    let scoreboard = state.scoreboard(&code).await?;
    let standings = scoreboard.standings();
    Ok(Json(ScoreboardResponse {
        scoreboard,
        standings,
    }))
}
