pub mod cabin;
pub mod error;
pub mod hold;
pub mod notify;
pub mod payment;
pub mod pii;
pub mod repository;
pub mod reservation;

pub use cabin::{Cabin, CabinStatus};
pub use error::BookingError;
pub use hold::{NewHold, ReservationHold};
pub use payment::{GatewayPayment, PaymentGateway, PaymentStatus};
pub use reservation::{Booker, GuestContact, PaymentMethod, Reservation, ReservationStatus};
