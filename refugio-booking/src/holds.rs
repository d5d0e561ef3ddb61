use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use refugio_core::repository::{CabinLock, CabinRepository, HoldRepository};
use refugio_core::{BookingError, NewHold, ReservationHold};

use crate::availability::AvailabilityChecker;
use crate::pricing;

/// Creates and cancels temporary holds. Hold creation serializes the
/// check-then-act window through a per-cabin lock; if the lock backend is
/// down we proceed unlocked rather than refuse bookings, accepting the
/// baseline double-hold race as the degraded mode.
pub struct HoldService {
    holds: Arc<dyn HoldRepository>,
    cabins: Arc<dyn CabinRepository>,
    availability: Arc<AvailabilityChecker>,
    lock: Arc<dyn CabinLock>,
    hold_ttl: Duration,
}

impl HoldService {
    pub fn new(
        holds: Arc<dyn HoldRepository>,
        cabins: Arc<dyn CabinRepository>,
        availability: Arc<AvailabilityChecker>,
        lock: Arc<dyn CabinLock>,
        hold_ttl: Duration,
    ) -> Self {
        Self {
            holds,
            cabins,
            availability,
            lock,
            hold_ttl,
        }
    }

    pub async fn create_hold(&self, req: NewHold) -> Result<ReservationHold, BookingError> {
        // 1. Validate the request before touching the lock.
        if req.start_date >= req.end_date {
            return Err(BookingError::InvalidDates(format!(
                "{} must be before {}",
                req.start_date, req.end_date
            )));
        }

        let cabin = self
            .cabins
            .get(req.cabin_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::CabinNotFound(req.cabin_id))?;

        if !cabin.status.is_bookable() {
            return Err(BookingError::Unavailable);
        }

        if pricing::nights(req.start_date, req.end_date) < cabin.min_nights as i64 {
            return Err(BookingError::InvalidDates(format!(
                "minimum stay for this cabin is {} nights",
                cabin.min_nights
            )));
        }

        // 2. Serialize the availability check and insert per cabin.
        let cabin_id = req.cabin_id;
        let locked = match self.lock.acquire(cabin_id).await {
            Ok(true) => true,
            Ok(false) => return Err(BookingError::LockContention),
            Err(e) => {
                tracing::warn!("Cabin lock unavailable, proceeding unlocked: {}", e);
                false
            }
        };

        let result = self.check_and_insert(req).await;

        if locked {
            if let Err(e) = self.lock.release(cabin_id).await {
                tracing::warn!("Failed to release lock for cabin {}: {}", cabin_id, e);
            }
        }

        result
    }

    async fn check_and_insert(&self, req: NewHold) -> Result<ReservationHold, BookingError> {
        let check = self
            .availability
            .check(req.cabin_id, req.start_date, req.end_date)
            .await?;
        if !check.available {
            return Err(BookingError::Unavailable);
        }

        let now = Utc::now();
        let hold = ReservationHold {
            id: Uuid::new_v4(),
            cabin_id: req.cabin_id,
            booker: req.booker,
            start_date: req.start_date,
            end_date: req.end_date,
            total_price: req.total_price,
            coupon_code: req.coupon_code,
            created_at: now,
            expires_at: now + self.hold_ttl,
        };
        self.holds
            .insert(&hold)
            .await
            .map_err(BookingError::storage)?;

        tracing::info!(
            "Hold {} created for cabin {} ({} to {}), expires {}",
            hold.id,
            hold.cabin_id,
            hold.start_date,
            hold.end_date,
            hold.expires_at
        );

        Ok(hold)
    }

    /// Explicit cancellation. Idempotent: cancelling a hold that already
    /// expired or was promoted succeeds.
    pub async fn delete_hold(&self, hold_id: Uuid) -> Result<(), BookingError> {
        self.holds
            .delete(hold_id)
            .await
            .map_err(BookingError::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use refugio_core::pii::Masked;
    use refugio_core::{Booker, Cabin, CabinStatus, GuestContact};
    use refugio_store::memory::MemoryStore;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn guest(name: &str) -> Booker {
        Booker::Guest {
            contact: GuestContact {
                name: name.to_string(),
                email: Masked::new(format!("{}@example.com", name)),
                phone: None,
            },
        }
    }

    fn service(store: &Arc<MemoryStore>) -> HoldService {
        let availability = Arc::new(AvailabilityChecker::new(store.clone(), store.clone()));
        HoldService::new(
            store.clone(),
            store.clone(),
            availability,
            store.clone(),
            Duration::minutes(15),
        )
    }

    fn seed_cabin(store: &Arc<MemoryStore>) -> Uuid {
        let cabin = Cabin {
            id: Uuid::new_v4(),
            name: "El Bosque".to_string(),
            nightly_rate: 100,
            max_guests: 4,
            min_nights: 1,
            status: CabinStatus::Available,
        };
        let id = cabin.id;
        store.put_cabin(cabin);
        id
    }

    fn new_hold(cabin_id: Uuid, start: &str, end: &str) -> NewHold {
        NewHold {
            cabin_id,
            booker: guest("maria"),
            start_date: d(start),
            end_date: d(end),
            total_price: 500,
            coupon_code: None,
        }
    }

    #[tokio::test]
    async fn creates_a_hold_with_ttl() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);

        let hold = service(&store)
            .create_hold(new_hold(cabin_id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();

        assert_eq!(hold.cabin_id, cabin_id);
        assert_eq!(hold.expires_at - hold.created_at, Duration::minutes(15));
        assert!(store.get_hold_sync(hold.id).is_some());
    }

    #[tokio::test]
    async fn overlapping_hold_is_rejected_as_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);
        let svc = service(&store);

        svc.create_hold(new_hold(cabin_id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();

        // Inside the still-active range of the first hold
        let err = svc
            .create_hold(new_hold(cabin_id, "2024-01-12", "2024-01-14"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Unavailable));
    }

    #[tokio::test]
    async fn back_to_back_holds_are_allowed() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);
        let svc = service(&store);

        svc.create_hold(new_hold(cabin_id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();
        svc.create_hold(new_hold(cabin_id, "2024-01-15", "2024-01-18"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_hold_does_not_block() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);
        let svc = service(&store);

        let hold = svc
            .create_hold(new_hold(cabin_id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();
        // Simulate a hold past expiry that the store has not yet removed
        store.expire_hold(hold.id);

        svc.create_hold(new_hold(cabin_id, "2024-01-12", "2024-01-14"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inverted_dates_are_a_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);

        let err = service(&store)
            .create_hold(new_hold(cabin_id, "2024-01-15", "2024-01-10"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidDates(_)));
    }

    #[tokio::test]
    async fn delete_hold_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);
        let svc = service(&store);

        let hold = svc
            .create_hold(new_hold(cabin_id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap();
        svc.delete_hold(hold.id).await.unwrap();
        // Second delete of the same id still succeeds
        svc.delete_hold(hold.id).await.unwrap();
    }

    #[tokio::test]
    async fn lock_contention_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let cabin_id = seed_cabin(&store);
        store.hold_cabin_lock(cabin_id);

        let err = service(&store)
            .create_hold(new_hold(cabin_id, "2024-01-10", "2024-01-15"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::LockContention));
    }
}
