use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::bucket::validate_bucket_name;
use crate::server::AppState;
use crate::server::dto::{BucketStatusParams, EnsureBucketRequest};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::BucketStatus;

pub fn storage_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/buckets", post(ensure_bucket))
        .route("/buckets/{name}", get(bucket_status))
}

async fn bucket_status(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<BucketStatusParams>,
) -> Result<Json<ApiResponse<BucketStatus>>, ApiError> {
    let status = if params.refresh {
        state.controller.refresh_bucket_status(&name)?
    } else {
        state.controller.bucket_status(&name)?
    };
    Ok(Json(ApiResponse::success(status)))
}

async fn ensure_bucket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnsureBucketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let spec = req.into_spec(&state.settings.bucket);
    validate_bucket_name(&spec.name)?;

    let outcome = state.controller.ensure_bucket(&spec);
    let status = if outcome.success && !outcome.already_existed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(ApiResponse::success(outcome))))
}
