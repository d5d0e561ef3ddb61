use chrono::NaiveDate;

use refugio_core::{BookingError, Cabin};

/// Number of nights in the half-open stay `[start, end)`.
pub fn nights(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Price a stay at the cabin's nightly rate. Rejects non-positive night
/// counts and stays under the cabin's minimum.
pub fn quote_stay(cabin: &Cabin, start: NaiveDate, end: NaiveDate) -> Result<i64, BookingError> {
    let night_count = nights(start, end);
    if night_count <= 0 {
        return Err(BookingError::InvalidDates(format!(
            "{} to {} spans no nights",
            start, end
        )));
    }
    if night_count < cabin.min_nights as i64 {
        return Err(BookingError::InvalidDates(format!(
            "minimum stay for this cabin is {} nights",
            cabin.min_nights
        )));
    }
    Ok(night_count * cabin.nightly_rate)
}
