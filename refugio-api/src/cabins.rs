use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use refugio_core::Cabin;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: Option<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/cabins/available", get(list_available))
        .route("/v1/cabins/{id}", get(get_cabin))
}

/// GET /v1/cabins/available?check_in=..&check_out=..&guests=..
/// Bookable cabins with capacity and no blocking reservation in the range.
async fn list_available(
    State(state): State<AppState>,
    Query(query): Query<AvailableQuery>,
) -> Result<Json<Vec<Cabin>>, AppError> {
    if query.check_in >= query.check_out {
        return Err(AppError::ValidationError(
            "check_in must be before check_out".to_string(),
        ));
    }

    let cabins = state
        .cabins
        .list_available(query.check_in, query.check_out, query.guests)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(cabins))
}

/// GET /v1/cabins/{id}
async fn get_cabin(
    State(state): State<AppState>,
    Path(cabin_id): Path<Uuid>,
) -> Result<Json<Cabin>, AppError> {
    let cabin = state
        .cabins
        .get(cabin_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("cabin not found: {}", cabin_id)))?;

    Ok(Json(cabin))
}
