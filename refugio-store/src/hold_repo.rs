use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use refugio_core::repository::HoldRepository;
use refugio_core::ReservationHold;

use crate::reservation_repo::{booker_from_columns, booker_to_columns};

pub struct PgHoldRepository {
    pool: PgPool,
}

impl PgHoldRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, cabin_id, user_id, guest_info, start_date, end_date, total_price, \
                       coupon_code, created_at, expires_at";

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: Uuid,
    cabin_id: Uuid,
    user_id: Option<Uuid>,
    guest_info: Option<serde_json::Value>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_price: i64,
    coupon_code: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl HoldRow {
    fn into_domain(self) -> Result<ReservationHold, Box<dyn std::error::Error + Send + Sync>> {
        Ok(ReservationHold {
            id: self.id,
            cabin_id: self.cabin_id,
            booker: booker_from_columns(self.user_id, self.guest_info)?,
            start_date: self.start_date,
            end_date: self.end_date,
            total_price: self.total_price,
            coupon_code: self.coupon_code,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}

#[async_trait]
impl HoldRepository for PgHoldRepository {
    async fn insert(
        &self,
        hold: &ReservationHold,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (user_id, guest_info) = booker_to_columns(&hold.booker)?;

        sqlx::query(
            "INSERT INTO reservation_holds \
             (id, cabin_id, user_id, guest_info, start_date, end_date, total_price, \
              coupon_code, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(hold.id)
        .bind(hold.cabin_id)
        .bind(user_id)
        .bind(guest_info)
        .bind(hold.start_date)
        .bind(hold.end_date)
        .bind(hold.total_price)
        .bind(hold.coupon_code.as_deref())
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<ReservationHold>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM reservation_holds WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(HoldRow::into_domain).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Zero rows affected is fine: the sweeper or a concurrent confirm
        // may have removed it first.
        sqlx::query("DELETE FROM reservation_holds WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_conflicting_live(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReservationHold>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, HoldRow>(&format!(
            "SELECT {} FROM reservation_holds \
             WHERE cabin_id = $1 AND expires_at > $4 \
               AND start_date < $3 AND end_date > $2",
            COLUMNS
        ))
        .bind(cabin_id)
        .bind(start)
        .bind(end)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HoldRow::into_domain).collect()
    }

    async fn purge_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query("DELETE FROM reservation_holds WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
