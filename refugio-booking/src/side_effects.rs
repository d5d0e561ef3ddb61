use std::sync::Arc;

use refugio_core::notify::{TicketDetails, TicketMailer};
use refugio_core::repository::{CabinRepository, CouponRepository};
use refugio_core::{Reservation, ReservationStatus};

/// Post-commit tasks fired after the reservation write succeeds: coupon
/// usage accounting and the confirmation ticket email. Each task runs in
/// its own failure boundary; a failure is logged and swallowed, never
/// surfaced to the caller.
pub struct SideEffects {
    coupons: Arc<dyn CouponRepository>,
    mailer: Arc<dyn TicketMailer>,
    cabins: Arc<dyn CabinRepository>,
}

impl SideEffects {
    pub fn new(
        coupons: Arc<dyn CouponRepository>,
        mailer: Arc<dyn TicketMailer>,
        cabins: Arc<dyn CabinRepository>,
    ) -> Self {
        Self {
            coupons,
            mailer,
            cabins,
        }
    }

    /// Runs after a reservation row exists. Rejected reservations get no
    /// side effects: in particular, a failed payment does not consume a
    /// coupon use.
    pub async fn after_confirmation(&self, reservation: &Reservation, coupon_code: Option<&str>) {
        if reservation.status != ReservationStatus::Confirmed {
            return;
        }

        if let Some(code) = coupon_code {
            if let Err(e) = self.coupons.increment_usage(code).await {
                tracing::warn!("Coupon {} usage increment failed: {}", code, e);
            }
        }

        self.send_ticket(reservation).await;
    }

    async fn send_ticket(&self, reservation: &Reservation) {
        let contact = match reservation.booker.guest_contact() {
            Some(contact) => contact,
            None => {
                // Registered-user tickets go out through the account mail
                // flow, which is not part of this service.
                tracing::debug!(
                    "No guest contact on reservation {}, skipping ticket email",
                    reservation.id
                );
                return;
            }
        };

        let cabin_name = match self.cabins.get(reservation.cabin_id).await {
            Ok(Some(cabin)) => cabin.name,
            Ok(None) | Err(_) => reservation.cabin_id.to_string(),
        };

        let details = TicketDetails {
            reservation_id: reservation.id,
            cabin_name,
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            total_price: reservation.total_price,
            guest_name: contact.name.clone(),
        };

        if let Err(e) = self.mailer.send_ticket(&contact.email.0, &details).await {
            tracing::warn!(
                "Ticket email for reservation {} failed: {}",
                reservation.id,
                e
            );
        }
    }
}
