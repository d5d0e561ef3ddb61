use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use refugio_core::{Booker, NewHold, PaymentMethod, Reservation};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateHoldRequest {
    pub cabin_id: Uuid,
    pub booker: Booker,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateHoldResponse {
    pub hold_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub hold_id: Uuid,
    pub payment_id: Option<String>,
    /// Used on the manual path (no payment id); defaults to cash.
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Deserialize)]
pub struct WalkInRequest {
    pub cabin_id: Uuid,
    pub booker: Booker,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub status: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/holds", post(create_hold))
        .route("/v1/holds/{id}", delete(delete_hold))
        .route("/v1/holds/{id}/payment-status", get(get_payment_status))
        .route("/v1/reservations/confirm", post(confirm_reservation))
        .route("/v1/reservations/walk-in", post(create_walk_in))
        .route("/v1/cabins/{id}/reservations", get(list_for_cabin))
        .route("/v1/users/{id}/reservations", get(list_for_user))
}

/// POST /v1/holds
/// Soft-lock a date range while the customer completes payment.
async fn create_hold(
    State(state): State<AppState>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<Json<CreateHoldResponse>, AppError> {
    let hold = state
        .hold_service
        .create_hold(NewHold {
            cabin_id: req.cabin_id,
            booker: req.booker,
            start_date: req.start_date,
            end_date: req.end_date,
            total_price: req.total_price,
            coupon_code: req.coupon_code,
        })
        .await
        .map_err(AppError::from_booking)?;

    Ok(Json(CreateHoldResponse {
        hold_id: hold.id,
        expires_at: hold.expires_at,
    }))
}

/// DELETE /v1/holds/{id}
/// Explicit cancellation; succeeds even if the hold is already gone.
async fn delete_hold(
    State(state): State<AppState>,
    Path(hold_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .hold_service
        .delete_hold(hold_id)
        .await
        .map_err(AppError::from_booking)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/reservations/confirm
/// Finalize a hold. Returns 201 with the reservation whether the payment
/// was approved or rejected; only structural failures are errors.
async fn confirm_reservation(
    State(state): State<AppState>,
    Json(req): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state
        .confirmer
        .confirm(req.hold_id, req.payment_id.as_deref(), req.payment_method)
        .await
        .map_err(AppError::from_booking)?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// POST /v1/reservations/walk-in
/// Direct booking for walk-in and manual payments; no hold involved.
async fn create_walk_in(
    State(state): State<AppState>,
    Json(req): Json<WalkInRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state
        .confirmer
        .create_walk_in(
            req.cabin_id,
            req.start_date,
            req.end_date,
            req.booker,
            req.payment_method,
        )
        .await
        .map_err(AppError::from_booking)?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /v1/holds/{id}/payment-status
/// Polling companion for clients without reliable webhooks.
async fn get_payment_status(
    State(state): State<AppState>,
    Path(hold_id): Path<Uuid>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    // 1. A reservation referencing the hold settles the question.
    let existing = state
        .reservations
        .find_by_hold_id(hold_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if let Some(reservation) = existing {
        let status = if reservation.status == refugio_core::ReservationStatus::Confirmed {
            "approved"
        } else {
            "rejected"
        };
        return Ok(Json(PaymentStatusResponse { status }));
    }

    // 2. Hold still present: payment outcome not known yet.
    let hold = state
        .holds
        .get(hold_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if hold.is_some() {
        return Ok(Json(PaymentStatusResponse { status: "pending" }));
    }

    // 3. Hold gone and no reservation: abandoned or expired.
    Ok(Json(PaymentStatusResponse { status: "rejected" }))
}

/// GET /v1/cabins/{id}/reservations
async fn list_for_cabin(
    State(state): State<AppState>,
    Path(cabin_id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let reservations = state
        .reservations
        .list_for_cabin(cabin_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(reservations))
}

/// GET /v1/users/{id}/reservations
async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let reservations = state
        .reservations
        .list_for_user(user_id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(reservations))
}
