use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use refugio_core::repository::{HoldRepository, ReservationRepository};
use refugio_core::BookingError;

/// Outcome of an availability check.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Availability {
    pub available: bool,
}

/// Two half-open stay ranges `[a_start, a_end)` and `[b_start, b_end)`
/// conflict iff each starts before the other ends. Back-to-back stays share
/// a boundary date and do NOT conflict.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Decides whether a cabin's date range is free of conflicts. Queries both
/// collections: durable reservations in a blocking state, and holds that are
/// still live. The reservation collection is the source of truth; the
/// cabin's own reservation list is never consulted here.
pub struct AvailabilityChecker {
    reservations: Arc<dyn ReservationRepository>,
    holds: Arc<dyn HoldRepository>,
}

impl AvailabilityChecker {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        holds: Arc<dyn HoldRepository>,
    ) -> Self {
        Self {
            reservations,
            holds,
        }
    }

    pub async fn check(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Availability, BookingError> {
        if start >= end {
            return Err(BookingError::InvalidDates(format!(
                "{} must be before {}",
                start, end
            )));
        }

        let blocking = self
            .reservations
            .find_conflicting(cabin_id, start, end)
            .await
            .map_err(BookingError::storage)?;
        if !blocking.is_empty() {
            return Ok(Availability { available: false });
        }

        let live_holds = self
            .holds
            .find_conflicting_live(cabin_id, start, end, Utc::now())
            .await
            .map_err(BookingError::storage)?;

        Ok(Availability {
            available: live_holds.is_empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn strict_overlap() {
        // Full containment
        assert!(ranges_overlap(
            d("2024-01-10"),
            d("2024-01-15"),
            d("2024-01-12"),
            d("2024-01-14")
        ));
        // Partial overlap on the left edge
        assert!(ranges_overlap(
            d("2024-01-08"),
            d("2024-01-12"),
            d("2024-01-10"),
            d("2024-01-15")
        ));
        // Identical ranges
        assert!(ranges_overlap(
            d("2024-01-10"),
            d("2024-01-15"),
            d("2024-01-10"),
            d("2024-01-15")
        ));
        // Disjoint
        assert!(!ranges_overlap(
            d("2024-01-01"),
            d("2024-01-05"),
            d("2024-01-10"),
            d("2024-01-15")
        ));
    }

    #[test]
    fn back_to_back_stays_do_not_conflict() {
        // A checks out the day B checks in
        assert!(!ranges_overlap(
            d("2024-01-10"),
            d("2024-01-15"),
            d("2024-01-15"),
            d("2024-01-20")
        ));
        assert!(!ranges_overlap(
            d("2024-01-15"),
            d("2024-01-20"),
            d("2024-01-10"),
            d("2024-01-15")
        ));
    }
}
