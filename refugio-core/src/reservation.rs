use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pii::Masked;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Rejected,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    /// Whether a reservation in this state blocks its date range.
    /// Rejected and cancelled stays never block.
    pub fn blocks_availability(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Gateway,
    Transfer,
    Cash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Option<String>,
}

/// Who is booking: an account holder or an anonymous guest.
/// Maps to the nullable user-id / guest-info column pair in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Booker {
    RegisteredUser { user_id: Uuid },
    Guest { contact: GuestContact },
}

impl Booker {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Booker::RegisteredUser { user_id } => Some(*user_id),
            Booker::Guest { .. } => None,
        }
    }

    pub fn guest_contact(&self) -> Option<&GuestContact> {
        match self {
            Booker::Guest { contact } => Some(contact),
            Booker::RegisteredUser { .. } => None,
        }
    }

    /// Contact address for ticket delivery, when one is known.
    pub fn contact_email(&self) -> Option<&str> {
        self.guest_contact().map(|c| c.email.0.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub cabin_id: Uuid,
    pub booker: Booker,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    pub status: ReservationStatus,
    pub payment_method: Option<PaymentMethod>,
    /// External payment identifier; unique across reservations when present.
    pub payment_id: Option<String>,
    /// Raw provider payload, stored opaque.
    pub payment_details: Option<serde_json::Value>,
    /// The hold this reservation was confirmed from, when it came through
    /// the hold flow. Drives the payment-status polling contract.
    pub hold_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_states() {
        assert!(ReservationStatus::Pending.blocks_availability());
        assert!(ReservationStatus::Confirmed.blocks_availability());
        assert!(ReservationStatus::Completed.blocks_availability());
        assert!(!ReservationStatus::Rejected.blocks_availability());
        assert!(!ReservationStatus::Cancelled.blocks_availability());
    }

    #[test]
    fn booker_round_trips_through_json() {
        let guest = Booker::Guest {
            contact: GuestContact {
                name: "Ana Pérez".to_string(),
                email: Masked::new("ana@example.com".to_string()),
                phone: Some("+54 11 5555-0000".to_string()),
            },
        };
        let json = serde_json::to_value(&guest).unwrap();
        assert_eq!(json["kind"], "guest");
        let back: Booker = serde_json::from_value(json).unwrap();
        assert_eq!(back.contact_email(), Some("ana@example.com"));
        assert!(back.user_id().is_none());
    }
}
