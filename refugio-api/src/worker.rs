use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use refugio_core::repository::HoldRepository;

/// Store-side half of the hold TTL: periodically deletes rows whose expiry
/// has passed. The `expires_at > now` filter on availability queries is the
/// load-bearing half; this loop only keeps the table small, so correctness
/// never depends on its timing.
pub async fn start_hold_expiry_worker(holds: Arc<dyn HoldRepository>, sweep_interval: Duration) {
    info!(
        "Hold expiry sweeper started ({}s interval)",
        sweep_interval.as_secs()
    );

    let mut tick = interval(sweep_interval);
    loop {
        tick.tick().await;
        match holds.purge_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(count) => info!("Swept {} expired holds", count),
            Err(e) => error!("Hold sweep failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use refugio_core::pii::Masked;
    use refugio_core::repository::HoldRepository;
    use refugio_core::{Booker, GuestContact, ReservationHold};
    use refugio_store::memory::MemoryStore;
    use uuid::Uuid;

    fn hold_expiring_at(offset_minutes: i64) -> ReservationHold {
        let now = Utc::now();
        ReservationHold {
            id: Uuid::new_v4(),
            cabin_id: Uuid::new_v4(),
            booker: Booker::Guest {
                contact: GuestContact {
                    name: "Luz".to_string(),
                    email: Masked::new("luz@example.com".to_string()),
                    phone: None,
                },
            },
            start_date: "2024-05-01".parse().unwrap(),
            end_date: "2024-05-05".parse().unwrap(),
            total_price: 400,
            coupon_code: None,
            created_at: now,
            expires_at: now + ChronoDuration::minutes(offset_minutes),
        }
    }

    #[tokio::test]
    async fn purge_removes_only_expired_holds() {
        let store = MemoryStore::new();
        let dead = hold_expiring_at(-5);
        let live = hold_expiring_at(10);
        store.put_hold(dead.clone());
        store.put_hold(live.clone());

        let removed = store.purge_expired(Utc::now()).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get_hold_sync(dead.id).is_none());
        assert!(store.get_hold_sync(live.id).is_some());
    }
}
