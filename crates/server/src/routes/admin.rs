use axum::{extract::State, Json};
use common::types::OpResult;
use tracing::info;

use crate::errors::ApiError;
use crate::startup::AppState;

/// Push every non-empty local snapshot to the remote bins.
pub async fn migrate(State(state): State<AppState>) -> Result<Json<OpResult>, ApiError> {
    let ok = state.collections.storage().migrate_from_local_cache().await;
    info!(event = "migrate", ok, "local cache migration finished");
    if ok {
        Ok(Json(OpResult { ok }))
    } else {
        Err(ApiError::operation_failed())
    }
}
