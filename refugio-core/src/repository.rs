use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::cabin::Cabin;
use crate::hold::ReservationHold;
use crate::reservation::Reservation;

/// Repository trait for durable reservations. The reservation collection is
/// the source of truth for conflict detection; the cabin's denormalized list
/// is a convenience view only.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn create(
        &self,
        reservation: &Reservation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_hold_id(
        &self,
        hold_id: Uuid,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>>;

    /// Reservations for the cabin in a blocking state whose range strictly
    /// overlaps `[start, end)`.
    async fn find_conflicting(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_for_cabin(
        &self,
        cabin_id: Uuid,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for ephemeral holds.
#[async_trait]
pub trait HoldRepository: Send + Sync {
    async fn insert(
        &self,
        hold: &ReservationHold,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Lookup by id. Deliberately does not filter on expiry: a payment that
    /// lands moments after nominal expiry still confirms if the row survives.
    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationHold>, Box<dyn std::error::Error + Send + Sync>>;

    /// Idempotent: deleting an absent hold succeeds.
    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Live holds (`expires_at > now`) for the cabin whose range strictly
    /// overlaps `[start, end)`.
    async fn find_conflicting_live(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationHold>, Box<dyn std::error::Error + Send + Sync>>;

    /// Remove holds whose expiry has passed; returns the count removed.
    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
pub trait CabinRepository: Send + Sync {
    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Cabin>, Box<dyn std::error::Error + Send + Sync>>;

    /// Append to the cabin's denormalized reservation list.
    async fn append_reservation(
        &self,
        cabin_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Bookable cabins with capacity for `guests` and no blocking
    /// reservation overlapping `[check_in, check_out)`.
    async fn list_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: Option<i32>,
    ) -> Result<Vec<Cabin>, Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Bump a coupon's usage counter. Unknown or exhausted codes are a no-op.
    async fn increment_usage(
        &self,
        code: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Short-lived mutual exclusion around the check-then-act window at hold
/// creation. Implementations may fail to acquire (contention) or fail
/// outright (backend down); callers decide how to degrade.
#[async_trait]
pub trait CabinLock: Send + Sync {
    /// Try to take the lock; false means another booking attempt holds it.
    async fn acquire(
        &self,
        cabin_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    async fn release(
        &self,
        cabin_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
