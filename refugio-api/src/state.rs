use std::sync::Arc;

use refugio_booking::{AvailabilityChecker, HoldService, ReservationConfirmer};
use refugio_core::payment::PaymentGateway;
use refugio_core::repository::{CabinRepository, HoldRepository, ReservationRepository};

#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<dyn ReservationRepository>,
    pub holds: Arc<dyn HoldRepository>,
    pub cabins: Arc<dyn CabinRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub availability: Arc<AvailabilityChecker>,
    pub hold_service: Arc<HoldService>,
    pub confirmer: Arc<ReservationConfirmer>,
    /// Base URL the post-payment browser redirects point at.
    pub frontend_base_url: String,
}
