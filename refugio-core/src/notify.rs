use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Content of the confirmation ticket email.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetails {
    pub reservation_id: Uuid,
    pub cabin_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    pub guest_name: String,
}

#[async_trait]
pub trait TicketMailer: Send + Sync {
    async fn send_ticket(
        &self,
        to: &str,
        details: &TicketDetails,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
