use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::lifecycle::Snapshot;
use crate::server::AppState;
use crate::server::dto::CreateAdminRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{AdminOutcome, MigrationResult};

pub fn setup_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/state", get(get_state))
        .route("/check", post(check))
        .route("/initialize", post(initialize))
        .route("/repair", post(repair))
        .route("/admin", post(create_admin))
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Snapshot>> {
    Json(ApiResponse::success(state.controller.snapshot()))
}

async fn check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Snapshot>>, ApiError> {
    let snapshot = state.controller.check().await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

async fn initialize(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MigrationResult>>, ApiError> {
    let result = state.controller.initialize().await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn repair(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<MigrationResult>>, ApiError> {
    let result = state.controller.repair().await?;
    Ok(Json(ApiResponse::success(result)))
}

async fn create_admin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAdminRequest>,
) -> impl IntoResponse {
    let result = state.controller.create_admin(&req.into());

    let status = match result.outcome {
        AdminOutcome::Created => StatusCode::CREATED,
        AdminOutcome::AlreadyExists => StatusCode::CONFLICT,
        AdminOutcome::Invalid => StatusCode::BAD_REQUEST,
        AdminOutcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = if result.success {
        ApiResponse::success(result)
    } else {
        let message = result.message.clone();
        ApiResponse::rejected(result, message)
    };
    (status, Json(body))
}
