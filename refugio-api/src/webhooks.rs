use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use refugio_core::BookingError;

use crate::state::AppState;

/// Query-string form of the provider notification.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookParams {
    pub id: Option<String>,
    pub topic: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

/// JSON-body form of the provider notification.
#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    type_: Option<String>,
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    // The provider sends numeric or string ids depending on the event
    id: Option<serde_json::Value>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

/// Pull `(payment_id, topic)` out of whichever form the provider used.
/// Query parameters win over the body when both are present.
fn extract_event(params: &WebhookParams, body: &[u8]) -> Option<(String, String)> {
    let envelope: Option<WebhookEnvelope> = serde_json::from_slice(body).ok();

    let payment_id = params.id.clone().or_else(|| {
        envelope
            .as_ref()
            .and_then(|e| e.data.as_ref())
            .and_then(|d| d.id.as_ref())
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    })?;

    let topic = params
        .topic
        .clone()
        .or_else(|| params.type_.clone())
        .or_else(|| envelope.and_then(|e| e.type_))?;

    Some((payment_id, topic))
}

/// POST /v1/webhooks/payments
/// Asynchronous payment notifications. The unauthenticated body is never
/// trusted for status; the payment is always re-fetched from the gateway,
/// and the hold id comes from its external reference. Duplicate and
/// out-of-order deliveries are absorbed by the confirmer's idempotency
/// guard.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
    body: Bytes,
) -> StatusCode {
    let (payment_id, topic) = match extract_event(&params, &body) {
        Some(event) => event,
        None => {
            tracing::warn!("Webhook without payment id or topic, ignoring");
            return StatusCode::BAD_REQUEST;
        }
    };

    if topic != "payment" {
        tracing::debug!("Ignoring webhook topic {}", topic);
        return StatusCode::BAD_REQUEST;
    }

    // 1. Authoritative status lookup.
    let payment = match state.gateway.get_payment(&payment_id).await {
        Ok(payment) => payment,
        Err(e) => {
            tracing::error!("Webhook payment lookup for {} failed: {}", payment_id, e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    // 2. Correlate back to the hold via the external reference.
    let hold_id = match payment
        .external_reference
        .as_deref()
        .and_then(|r| Uuid::parse_str(r).ok())
    {
        Some(id) => id,
        None => {
            tracing::warn!(
                "Payment {} carries no usable external reference",
                payment_id
            );
            return StatusCode::BAD_REQUEST;
        }
    };

    // 3. Delegate; the confirmer re-verifies the payment itself.
    match state.confirmer.confirm(hold_id, Some(&payment.id), None).await {
        Ok(reservation) => {
            tracing::info!(
                "Webhook for payment {} resolved to reservation {} ({:?})",
                payment_id,
                reservation.id,
                reservation.status
            );
            StatusCode::OK
        }
        Err(BookingError::HoldNotFound(_)) => StatusCode::NOT_FOUND,
        Err(e) => {
            tracing::error!("Webhook confirmation for {} failed: {}", payment_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_form_is_parsed() {
        let params = WebhookParams {
            id: Some("123".to_string()),
            topic: Some("payment".to_string()),
            type_: None,
        };
        let event = extract_event(&params, b"").unwrap();
        assert_eq!(event, ("123".to_string(), "payment".to_string()));
    }

    #[test]
    fn body_form_is_parsed() {
        let params = WebhookParams::default();
        let body = br#"{"type": "payment", "data": {"id": 456}}"#;
        let event = extract_event(&params, body).unwrap();
        assert_eq!(event, ("456".to_string(), "payment".to_string()));
    }

    #[test]
    fn query_wins_over_body() {
        let params = WebhookParams {
            id: Some("123".to_string()),
            topic: Some("payment".to_string()),
            type_: None,
        };
        let body = br#"{"type": "merchant_order", "data": {"id": "999"}}"#;
        let event = extract_event(&params, body).unwrap();
        assert_eq!(event.0, "123");
        assert_eq!(event.1, "payment");
    }

    #[test]
    fn missing_id_is_rejected() {
        let params = WebhookParams {
            id: None,
            topic: Some("payment".to_string()),
            type_: None,
        };
        assert!(extract_event(&params, b"{}").is_none());
    }
}
