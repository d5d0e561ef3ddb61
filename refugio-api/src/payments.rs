use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use refugio_core::payment::PreferenceRequest;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    pub preference_id: String,
    pub init_point: String,
}

/// Query parameters the gateway appends when sending the browser back.
#[derive(Debug, Deserialize)]
pub struct PaymentReturnParams {
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/preference", post(create_preference))
        .route("/v1/payments/success", get(payment_success))
        .route("/v1/payments/failure", get(payment_failure))
        .route("/v1/payments/pending", get(payment_pending))
}

/// POST /v1/payments/preference
/// Create the checkout link for a hold. The external reference must be the
/// hold id so webhooks and return URLs can correlate back to it.
async fn create_preference(
    State(state): State<AppState>,
    Json(req): Json<PreferenceRequest>,
) -> Result<Json<PreferenceResponse>, AppError> {
    if req.items.is_empty() {
        return Err(AppError::ValidationError(
            "preference needs at least one item".to_string(),
        ));
    }
    if req.payer.email.is_empty() {
        return Err(AppError::ValidationError("payer email is required".to_string()));
    }
    if Uuid::parse_str(&req.external_reference).is_err() {
        return Err(AppError::ValidationError(
            "external_reference must be a hold id".to_string(),
        ));
    }

    let preference = state
        .gateway
        .create_preference(&req)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(PreferenceResponse {
        preference_id: preference.id,
        init_point: preference.init_point,
    }))
}

/// GET /v1/payments/success
/// The gateway lands approved payers here; forward them to the frontend
/// with the correlation ids so it can poll or confirm.
async fn payment_success(
    State(state): State<AppState>,
    Query(params): Query<PaymentReturnParams>,
) -> Redirect {
    let url = format!(
        "{}/reserva-exitosa?payment_id={}&hold_id={}",
        state.frontend_base_url,
        params.payment_id.unwrap_or_default(),
        params.external_reference.unwrap_or_default()
    );
    Redirect::temporary(&url)
}

/// GET /v1/payments/failure
async fn payment_failure(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&format!("{}/reserva-fallida", state.frontend_base_url))
}

/// GET /v1/payments/pending
async fn payment_pending(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&format!("{}/reserva-pendiente", state.frontend_base_url))
}
