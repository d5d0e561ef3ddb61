use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use refugio_core::notify::{TicketDetails, TicketMailer};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("mail request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail API returned {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// Sends confirmation tickets through a transactional mail HTTP API. Callers
/// treat a send failure as a logged, swallowed side effect; nothing here
/// retries.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    from_address: String,
}

impl HttpMailer {
    pub fn new(config: &MailerConfig) -> Result<Self, NotifyError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = format!("Bearer {}", config.api_key);
        let mut auth = reqwest::header::HeaderValue::from_str(&bearer)
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            from_address: config.from_address.clone(),
        })
    }

    fn render_ticket(details: &TicketDetails) -> String {
        let nights = (details.end_date - details.start_date).num_days();
        format!(
            "Hola {},\n\n\
             Tu reserva en {} está confirmada.\n\n\
             Entrada: {}\n\
             Salida:  {}\n\
             Noches:  {}\n\
             Total:   {}\n\n\
             Código de reserva: {}\n\n\
             ¡Te esperamos!",
            details.guest_name,
            details.cabin_name,
            details.start_date,
            details.end_date,
            nights,
            details.total_price,
            details.reservation_id
        )
    }
}

#[async_trait]
impl TicketMailer for HttpMailer {
    async fn send_ticket(
        &self,
        to: &str,
        details: &TicketDetails,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let request = MailRequest {
            from: &self.from_address,
            to,
            subject: "Reserva confirmada",
            text: Self::render_ticket(details),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(NotifyError::from)?;

        if !response.status().is_success() {
            return Err(Box::new(NotifyError::Status(response.status().as_u16())));
        }

        tracing::info!(
            "Ticket for reservation {} sent to {}",
            details.reservation_id,
            to
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn ticket_body_lists_the_stay() {
        let details = TicketDetails {
            reservation_id: Uuid::nil(),
            cabin_name: "Los Alerces".to_string(),
            start_date: "2024-01-10".parse().unwrap(),
            end_date: "2024-01-15".parse().unwrap(),
            total_price: 500,
            guest_name: "Ana".to_string(),
        };
        let body = HttpMailer::render_ticket(&details);
        assert!(body.contains("Los Alerces"));
        assert!(body.contains("Noches:  5"));
        assert!(body.contains("Total:   500"));
    }
}
