pub mod availability;
pub mod confirm;
pub mod holds;
pub mod pricing;
pub mod side_effects;

pub use availability::{ranges_overlap, Availability, AvailabilityChecker};
pub use confirm::ReservationConfirmer;
pub use holds::HoldService;
pub use side_effects::SideEffects;
