use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    pub fn is_approved(&self) -> bool {
        *self == Self::Approved
    }
}

/// Authoritative view of a payment as reported by the provider. Parsed no
/// further than the confirmation flow needs; everything else stays in `raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: PaymentStatus,
    /// Correlation key set at preference creation: the hold id.
    pub external_reference: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceItem {
    pub title: String,
    pub quantity: u32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencePayer {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: PreferencePayer,
    pub back_urls: BackUrls,
    pub external_reference: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutPreference {
    pub id: String,
    /// Checkout link the client is redirected to.
    pub init_point: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout preference with the provider.
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<CheckoutPreference, Box<dyn std::error::Error + Send + Sync>>;

    /// Resolve a payment identifier to its current status.
    async fn get_payment(
        &self,
        payment_id: &str,
    ) -> Result<GatewayPayment, Box<dyn std::error::Error + Send + Sync>>;
}
