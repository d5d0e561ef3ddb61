use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use refugio_core::payment::{
    CheckoutPreference, GatewayPayment, PaymentGateway, PaymentStatus, PreferenceRequest,
};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoConfig {
    pub base_url: String,
    pub access_token: String,
    /// Bounded timeout for every gateway call; on expiry the confirmation
    /// flow treats the payment as non-approved.
    pub timeout_seconds: u64,
}

/// Mercado Pago checkout adapter: preference creation and payment lookup.
/// The client and its token are constructed once and injected where needed
/// so tests can substitute a fake behind the same trait.
pub struct MercadoPagoGateway {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: Option<String>,
    sandbox_init_point: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
}

impl MercadoPagoGateway {
    pub fn new(config: &MercadoPagoConfig) -> Result<Self, GatewayError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = format!("Bearer {}", config.access_token);
        let mut auth = reqwest::header::HeaderValue::from_str(&bearer)
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn parse_status(raw: &str) -> PaymentStatus {
        serde_json::from_value(serde_json::Value::String(raw.to_string()))
            .unwrap_or(PaymentStatus::Unknown)
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<CheckoutPreference, Box<dyn std::error::Error + Send + Sync>> {
        // Same preference shape the checkout expects: immediate approval
        // only (binary mode), ATM excluded, up to 12 installments.
        let body = json!({
            "items": request.items.iter().map(|i| json!({
                "title": i.title,
                "quantity": i.quantity,
                "unit_price": i.unit_price,
            })).collect::<Vec<_>>(),
            "payer": {
                "name": request.payer.name,
                "email": request.payer.email,
            },
            "back_urls": {
                "success": request.back_urls.success,
                "failure": request.back_urls.failure,
                "pending": request.back_urls.pending,
            },
            "auto_return": "approved",
            "binary_mode": true,
            "external_reference": request.external_reference,
            "payment_methods": {
                "excluded_payment_types": [{"id": "atm"}],
                "installments": 12,
            },
        });

        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::from)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Box::new(GatewayError::Status { status, body }));
        }

        let preference: PreferenceResponse = response.json().await.map_err(GatewayError::from)?;
        let init_point = preference
            .init_point
            .or(preference.sandbox_init_point)
            .unwrap_or_default();

        tracing::info!(
            "Created checkout preference {} for reference {}",
            preference.id,
            request.external_reference
        );

        Ok(CheckoutPreference {
            id: preference.id,
            init_point,
        })
    }

    async fn get_payment(
        &self,
        payment_id: &str,
    ) -> Result<GatewayPayment, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .send()
            .await
            .map_err(GatewayError::from)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Box::new(GatewayError::Status { status, body }));
        }

        // Keep the full payload: it is stored opaque on the reservation.
        let raw: serde_json::Value = response.json().await.map_err(GatewayError::from)?;
        let payment: PaymentResponse = serde_json::from_value(raw.clone())?;

        Ok(GatewayPayment {
            id: payment
                .id
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| payment.id.to_string()),
            status: Self::parse_status(&payment.status),
            external_reference: payment.external_reference,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_statuses_map_onto_the_enum() {
        assert_eq!(
            MercadoPagoGateway::parse_status("approved"),
            PaymentStatus::Approved
        );
        assert_eq!(
            MercadoPagoGateway::parse_status("in_process"),
            PaymentStatus::InProcess
        );
        assert_eq!(
            MercadoPagoGateway::parse_status("charged_back"),
            PaymentStatus::Unknown
        );
    }
}
