use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reservation::Booker;

/// A time-boxed soft reservation blocking a date range while the customer
/// completes payment. Only a candidate conflict source while
/// `expires_at > now`; the store removes expired rows some time after expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationHold {
    pub id: Uuid,
    pub cabin_id: Uuid,
    pub booker: Booker,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    /// Coupon referenced at hold creation; consumed only on confirmation.
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ReservationHold {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Input for hold creation, before an id and expiry are assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct NewHold {
    pub cabin_id: Uuid,
    pub booker: Booker,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_price: i64,
    pub coupon_code: Option<String>,
}
