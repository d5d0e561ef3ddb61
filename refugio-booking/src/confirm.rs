use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use refugio_core::payment::PaymentGateway;
use refugio_core::repository::{CabinRepository, HoldRepository, ReservationRepository};
use refugio_core::{
    Booker, BookingError, PaymentMethod, Reservation, ReservationStatus,
};

use crate::availability::AvailabilityChecker;
use crate::pricing;
use crate::side_effects::SideEffects;

/// Finalizes holds into durable, payment-resolved reservations.
///
/// The primary write (hold to reservation) is the critical path and either
/// succeeds or fails as a whole from the caller's point of view. Everything
/// after it (the cabin's denormalized list, hold cleanup, coupon and email
/// side effects) is best-effort and only logged on failure.
pub struct ReservationConfirmer {
    reservations: Arc<dyn ReservationRepository>,
    holds: Arc<dyn HoldRepository>,
    cabins: Arc<dyn CabinRepository>,
    availability: Arc<AvailabilityChecker>,
    gateway: Arc<dyn PaymentGateway>,
    side_effects: SideEffects,
}

impl ReservationConfirmer {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        holds: Arc<dyn HoldRepository>,
        cabins: Arc<dyn CabinRepository>,
        availability: Arc<AvailabilityChecker>,
        gateway: Arc<dyn PaymentGateway>,
        side_effects: SideEffects,
    ) -> Self {
        Self {
            reservations,
            holds,
            cabins,
            availability,
            gateway,
            side_effects,
        }
    }

    /// Convert a hold into a durable reservation.
    ///
    /// With a payment id the gateway is asked for the authoritative status;
    /// approved confirms, anything else (including a gateway failure or
    /// timeout) records the reservation as rejected rather than dropping it.
    /// Without a payment id this is the manual path and confirms directly.
    ///
    /// Safe under at-least-once webhook delivery: a payment id that already
    /// names a reservation returns it without creating a second one.
    pub async fn confirm(
        &self,
        hold_id: Uuid,
        payment_id: Option<&str>,
        manual_method: Option<PaymentMethod>,
    ) -> Result<Reservation, BookingError> {
        // 1. Idempotency guard. First writer wins; later webhook retries and
        // client polls observe the existing reservation.
        if let Some(pid) = payment_id {
            if let Some(existing) = self
                .reservations
                .find_by_payment_id(pid)
                .await
                .map_err(BookingError::storage)?
            {
                tracing::info!(
                    "Payment {} already confirmed as reservation {}, returning it",
                    pid,
                    existing.id
                );
                return Ok(existing);
            }
        }

        // 2. The hold may have expired or been promoted by a concurrent
        // caller; either way this outcome is normal and non-retryable.
        let hold = self
            .holds
            .get(hold_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::HoldNotFound(hold_id))?;

        // 3. / 4. Resolve the target state.
        let (status, method, details) = match payment_id {
            Some(pid) => match self.gateway.get_payment(pid).await {
                Ok(payment) if payment.status.is_approved() => (
                    ReservationStatus::Confirmed,
                    PaymentMethod::Gateway,
                    Some(payment.raw),
                ),
                Ok(payment) => {
                    tracing::warn!(
                        "Payment {} not approved (status {:?}), recording rejection",
                        pid,
                        payment.status
                    );
                    (
                        ReservationStatus::Rejected,
                        PaymentMethod::Gateway,
                        Some(payment.raw),
                    )
                }
                Err(e) => {
                    tracing::warn!(
                        "Payment lookup for {} failed, recording rejection: {}",
                        pid,
                        e
                    );
                    (ReservationStatus::Rejected, PaymentMethod::Gateway, None)
                }
            },
            None => (
                ReservationStatus::Confirmed,
                manual_method.unwrap_or(PaymentMethod::Cash),
                None,
            ),
        };

        // 5. The critical write: all hold fields plus resolved payment state.
        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            cabin_id: hold.cabin_id,
            booker: hold.booker.clone(),
            start_date: hold.start_date,
            end_date: hold.end_date,
            total_price: hold.total_price,
            status,
            payment_method: Some(method),
            payment_id: payment_id.map(str::to_string),
            payment_details: details,
            hold_id: Some(hold.id),
            created_at: now,
            updated_at: now,
        };
        self.reservations
            .create(&reservation)
            .await
            .map_err(BookingError::storage)?;

        tracing::info!(
            "Reservation {} created from hold {} with status {:?}",
            reservation.id,
            hold.id,
            reservation.status
        );

        self.finish(&reservation, hold.coupon_code.as_deref()).await;

        Ok(reservation)
    }

    /// Direct path for walk-in and manual bookings: no hold exists, the
    /// price is computed server-side from the cabin's nightly rate, and the
    /// date range is still checked against both conflict sources.
    pub async fn create_walk_in(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        booker: Booker,
        method: PaymentMethod,
    ) -> Result<Reservation, BookingError> {
        let cabin = self
            .cabins
            .get(cabin_id)
            .await
            .map_err(BookingError::storage)?
            .ok_or(BookingError::CabinNotFound(cabin_id))?;

        let total_price = pricing::quote_stay(&cabin, start, end)?;

        // No hold protects this range, so the check happens here.
        let check = self.availability.check(cabin_id, start, end).await?;
        if !check.available {
            return Err(BookingError::Unavailable);
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            cabin_id,
            booker,
            start_date: start,
            end_date: end,
            total_price,
            status: ReservationStatus::Confirmed,
            payment_method: Some(method),
            payment_id: None,
            payment_details: None,
            hold_id: None,
            created_at: now,
            updated_at: now,
        };
        self.reservations
            .create(&reservation)
            .await
            .map_err(BookingError::storage)?;

        tracing::info!(
            "Walk-in reservation {} created for cabin {} ({} nights)",
            reservation.id,
            cabin_id,
            pricing::nights(start, end)
        );

        self.finish(&reservation, None).await;

        Ok(reservation)
    }

    /// Best-effort tail of both paths: cabin list append, hold cleanup,
    /// post-commit side effects.
    async fn finish(&self, reservation: &Reservation, coupon_code: Option<&str>) {
        // The cabin list is a denormalized convenience view, not the source
        // of truth for conflicts; an append failure must not fail the
        // confirmation.
        if let Err(e) = self
            .cabins
            .append_reservation(reservation.cabin_id, reservation.id)
            .await
        {
            tracing::warn!(
                "Failed to append reservation {} to cabin {}: {}",
                reservation.id,
                reservation.cabin_id,
                e
            );
        }

        // A lingering hold is harmless, the expiry filter ignores it.
        if let Some(hold_id) = reservation.hold_id {
            if let Err(e) = self.holds.delete(hold_id).await {
                tracing::warn!("Failed to delete hold {}: {}", hold_id, e);
            }
        }

        self.side_effects
            .after_confirmation(reservation, coupon_code)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use refugio_core::pii::Masked;
    use refugio_core::{Cabin, CabinStatus, GuestContact, PaymentStatus, ReservationHold};
    use refugio_payments::MockGateway;
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

    struct Fixture {
        store: Arc<MemoryStore>,
        gateway: Arc<MockGateway>,
        confirmer: ReservationConfirmer,
        cabin_id: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::new());

        let cabin = Cabin {
            id: Uuid::new_v4(),
            name: "La Escondida".to_string(),
            nightly_rate: 100,
            max_guests: 4,
            min_nights: 1,
            status: CabinStatus::Available,
        };
        let cabin_id = cabin.id;
        store.put_cabin(cabin);

        let availability = Arc::new(AvailabilityChecker::new(store.clone(), store.clone()));
        let side_effects = SideEffects::new(store.clone(), store.clone(), store.clone());
        let confirmer = ReservationConfirmer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            availability,
            gateway.clone(),
            side_effects,
        );

        Fixture {
            store,
            gateway,
            confirmer,
            cabin_id,
        }
    }

    fn seed_hold(fx: &Fixture, coupon: Option<&str>) -> Uuid {
        let now = Utc::now();
        let hold = ReservationHold {
            id: Uuid::new_v4(),
            cabin_id: fx.cabin_id,
            booker: guest("maria"),
            start_date: d("2024-01-10"),
            end_date: d("2024-01-15"),
            total_price: 500,
            coupon_code: coupon.map(str::to_string),
            created_at: now,
            expires_at: now + Duration::minutes(15),
        };
        let id = hold.id;
        fx.store.put_hold(hold);
        id
    }

    #[tokio::test]
    async fn approved_payment_confirms_and_cleans_up() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, None);
        fx.gateway
            .script_payment("PAY1", PaymentStatus::Approved, Some(&hold_id.to_string()));

        let reservation = fx
            .confirmer
            .confirm(hold_id, Some("PAY1"), None)
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.payment_id.as_deref(), Some("PAY1"));
        assert_eq!(reservation.total_price, 500);
        assert!(reservation.payment_details.is_some());

        // Hold removed, cabin list appended, ticket sent
        assert!(fx.store.get_hold_sync(hold_id).is_none());
        assert_eq!(
            fx.store.cabin_reservation_ids(fx.cabin_id),
            vec![reservation.id]
        );
        assert_eq!(fx.store.sent_tickets().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_payment_id_returns_the_original() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, None);
        fx.gateway
            .script_payment("PAY1", PaymentStatus::Approved, Some(&hold_id.to_string()));

        let first = fx
            .confirmer
            .confirm(hold_id, Some("PAY1"), None)
            .await
            .unwrap();
        // Duplicate webhook delivery after the hold is already gone
        let second = fx
            .confirmer
            .confirm(hold_id, Some("PAY1"), None)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(fx.store.reservation_count(), 1);
    }

    #[tokio::test]
    async fn rejected_payment_still_creates_a_record() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, None);
        fx.gateway
            .script_payment("PAY2", PaymentStatus::Rejected, Some(&hold_id.to_string()));

        let reservation = fx
            .confirmer
            .confirm(hold_id, Some("PAY2"), None)
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Rejected);
        assert!(reservation.payment_details.is_some());
        // No ticket for a rejected payment
        assert!(fx.store.sent_tickets().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_downgrades_to_rejected() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, None);
        fx.gateway.fail_lookups();

        let reservation = fx
            .confirmer
            .confirm(hold_id, Some("PAY3"), None)
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Rejected);
        assert!(reservation.payment_details.is_none());
    }

    #[tokio::test]
    async fn missing_hold_is_a_normal_not_found() {
        let fx = fixture();

        let err = fx
            .confirmer
            .confirm(Uuid::new_v4(), Some("PAY4"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::HoldNotFound(_)));
        assert_eq!(fx.store.reservation_count(), 0);
    }

    #[tokio::test]
    async fn manual_path_confirms_without_gateway_call() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, None);

        let reservation = fx
            .confirmer
            .confirm(hold_id, None, Some(PaymentMethod::Transfer))
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.payment_method, Some(PaymentMethod::Transfer));
        assert!(reservation.payment_id.is_none());
        assert_eq!(fx.gateway.lookups(), 0);
    }

    #[tokio::test]
    async fn coupon_is_consumed_once_and_only_on_confirmation() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, Some("VERANO10"));
        fx.gateway
            .script_payment("PAY5", PaymentStatus::Approved, Some(&hold_id.to_string()));

        fx.confirmer
            .confirm(hold_id, Some("PAY5"), None)
            .await
            .unwrap();
        // Duplicate delivery takes the idempotency path, no second increment
        fx.confirmer
            .confirm(hold_id, Some("PAY5"), None)
            .await
            .unwrap();

        assert_eq!(fx.store.coupon_uses("VERANO10"), 1);
    }

    #[tokio::test]
    async fn rejected_payment_does_not_consume_the_coupon() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, Some("VERANO10"));
        fx.gateway
            .script_payment("PAY6", PaymentStatus::Rejected, Some(&hold_id.to_string()));

        fx.confirmer
            .confirm(hold_id, Some("PAY6"), None)
            .await
            .unwrap();

        assert_eq!(fx.store.coupon_uses("VERANO10"), 0);
    }

    #[tokio::test]
    async fn walk_in_prices_nights_times_rate() {
        let fx = fixture();

        let reservation = fx
            .confirmer
            .create_walk_in(
                fx.cabin_id,
                d("2024-02-01"),
                d("2024-02-04"),
                guest("jorge"),
                PaymentMethod::Cash,
            )
            .await
            .unwrap();

        assert_eq!(reservation.total_price, 300);
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(reservation.payment_id.is_none());
        assert_eq!(fx.store.sent_tickets().len(), 1);
    }

    #[tokio::test]
    async fn walk_in_rejects_conflicting_dates() {
        let fx = fixture();
        let hold_id = seed_hold(&fx, None);
        fx.gateway
            .script_payment("PAY7", PaymentStatus::Approved, Some(&hold_id.to_string()));
        fx.confirmer
            .confirm(hold_id, Some("PAY7"), None)
            .await
            .unwrap();

        let err = fx
            .confirmer
            .create_walk_in(
                fx.cabin_id,
                d("2024-01-12"),
                d("2024-01-14"),
                guest("jorge"),
                PaymentMethod::Cash,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Unavailable));
    }

    #[tokio::test]
    async fn walk_in_rejects_non_positive_nights() {
        let fx = fixture();

        let err = fx
            .confirmer
            .create_walk_in(
                fx.cabin_id,
                d("2024-02-04"),
                d("2024-02-04"),
                guest("jorge"),
                PaymentMethod::Cash,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::InvalidDates(_)));
    }
}
