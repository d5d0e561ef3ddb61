use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CabinStatus {
    Available,
    Maintenance,
    Unavailable,
}

impl CabinStatus {
    pub fn is_bookable(&self) -> bool {
        matches!(self, Self::Available)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cabin {
    pub id: Uuid,
    pub name: String,
    /// Price per night in minor currency units.
    pub nightly_rate: i64,
    pub max_guests: i32,
    pub min_nights: i32,
    pub status: CabinStatus,
}
