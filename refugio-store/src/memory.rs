//! In-memory implementations of the storage and side-effect traits, used by
//! engine tests and local experiments. Overlap and expiry semantics mirror
//! the SQL in the Postgres repositories.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use refugio_core::notify::{TicketDetails, TicketMailer};
use refugio_core::repository::{
    CabinLock, CabinRepository, CouponRepository, HoldRepository, ReservationRepository,
};
use refugio_core::{Cabin, Reservation, ReservationHold};

#[derive(Default)]
pub struct MemoryStore {
    reservations: Mutex<Vec<Reservation>>,
    holds: Mutex<HashMap<Uuid, ReservationHold>>,
    cabins: Mutex<HashMap<Uuid, Cabin>>,
    cabin_lists: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    coupon_counts: Mutex<HashMap<String, u32>>,
    held_locks: Mutex<HashSet<Uuid>>,
    tickets: Mutex<Vec<(String, TicketDetails)>>,
}

fn overlaps(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start < b_end && a_end > b_start
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_cabin(&self, cabin: Cabin) {
        self.cabins.lock().unwrap().insert(cabin.id, cabin);
    }

    pub fn put_hold(&self, hold: ReservationHold) {
        self.holds.lock().unwrap().insert(hold.id, hold);
    }

    pub fn get_hold_sync(&self, id: Uuid) -> Option<ReservationHold> {
        self.holds.lock().unwrap().get(&id).cloned()
    }

    /// Push a hold's expiry into the past without removing it, simulating
    /// the window before the store's sweep runs.
    pub fn expire_hold(&self, id: Uuid) {
        if let Some(hold) = self.holds.lock().unwrap().get_mut(&id) {
            hold.expires_at = Utc::now() - Duration::hours(1);
        }
    }

    /// Simulate another booking attempt holding the cabin's lock.
    pub fn hold_cabin_lock(&self, cabin_id: Uuid) {
        self.held_locks.lock().unwrap().insert(cabin_id);
    }

    pub fn cabin_reservation_ids(&self, cabin_id: Uuid) -> Vec<Uuid> {
        self.cabin_lists
            .lock()
            .unwrap()
            .get(&cabin_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.lock().unwrap().len()
    }

    pub fn coupon_uses(&self, code: &str) -> u32 {
        self.coupon_counts
            .lock()
            .unwrap()
            .get(code)
            .copied()
            .unwrap_or(0)
    }

    pub fn sent_tickets(&self) -> Vec<(String, TicketDetails)> {
        self.tickets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReservationRepository for MemoryStore {
    async fn create(
        &self,
        reservation: &Reservation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.reservations.lock().unwrap().push(reservation.clone());
        Ok(())
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn find_by_hold_id(
        &self,
        hold_id: Uuid,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.hold_id == Some(hold_id))
            .cloned())
    }

    async fn find_conflicting(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.cabin_id == cabin_id
                    && r.status.blocks_availability()
                    && overlaps(r.start_date, r.end_date, start, end)
            })
            .cloned()
            .collect())
    }

    async fn list_for_cabin(
        &self,
        cabin_id: Uuid,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.cabin_id == cabin_id)
            .cloned()
            .collect())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .reservations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.booker.user_id() == Some(user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HoldRepository for MemoryStore {
    async fn insert(
        &self,
        hold: &ReservationHold,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.holds.lock().unwrap().insert(hold.id, hold.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationHold>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.holds.lock().unwrap().get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.holds.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn find_conflicting_live(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationHold>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .holds
            .lock()
            .unwrap()
            .values()
            .filter(|h| {
                h.cabin_id == cabin_id
                    && h.expires_at > now
                    && overlaps(h.start_date, h.end_date, start, end)
            })
            .cloned()
            .collect())
    }

    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let mut holds = self.holds.lock().unwrap();
        let before = holds.len();
        holds.retain(|_, h| h.expires_at > now);
        Ok((before - holds.len()) as u64)
    }
}

#[async_trait]
impl CabinRepository for MemoryStore {
    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Cabin>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.cabins.lock().unwrap().get(&id).cloned())
    }

    async fn append_reservation(
        &self,
        cabin_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.cabin_lists
            .lock()
            .unwrap()
            .entry(cabin_id)
            .or_default()
            .push(reservation_id);
        Ok(())
    }

    async fn list_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: Option<i32>,
    ) -> Result<Vec<Cabin>, Box<dyn std::error::Error + Send + Sync>> {
        let reservations = self.reservations.lock().unwrap();
        let mut cabins: Vec<Cabin> = self
            .cabins
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.status.is_bookable())
            .filter(|c| guests.map_or(true, |g| c.max_guests >= g))
            .filter(|c| {
                !reservations.iter().any(|r| {
                    r.cabin_id == c.id
                        && r.status.blocks_availability()
                        && overlaps(r.start_date, r.end_date, check_in, check_out)
                })
            })
            .cloned()
            .collect();
        cabins.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cabins)
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    /// Test recorder: counts every increment, known code or not.
    async fn increment_usage(
        &self,
        code: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        *self
            .coupon_counts
            .lock()
            .unwrap()
            .entry(code.to_string())
            .or_insert(0) += 1;
        Ok(())
    }
}

#[async_trait]
impl CabinLock for MemoryStore {
    async fn acquire(
        &self,
        cabin_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.held_locks.lock().unwrap().insert(cabin_id))
    }

    async fn release(
        &self,
        cabin_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.held_locks.lock().unwrap().remove(&cabin_id);
        Ok(())
    }
}

#[async_trait]
impl TicketMailer for MemoryStore {
    async fn send_ticket(
        &self,
        to: &str,
        details: &TicketDetails,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tickets
            .lock()
            .unwrap()
            .push((to.to_string(), details.clone()));
        Ok(())
    }
}
