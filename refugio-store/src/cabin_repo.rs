use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use refugio_core::repository::CabinRepository;
use refugio_core::{Cabin, CabinStatus};

pub struct PgCabinRepository {
    pool: PgPool,
}

impl PgCabinRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, name, nightly_rate, max_guests, min_nights, status";

#[derive(sqlx::FromRow)]
struct CabinRow {
    id: Uuid,
    name: String,
    nightly_rate: i64,
    max_guests: i32,
    min_nights: i32,
    status: String,
}

impl CabinRow {
    fn into_domain(self) -> Result<Cabin, Box<dyn std::error::Error + Send + Sync>> {
        let status = match self.status.as_str() {
            "available" => CabinStatus::Available,
            "maintenance" => CabinStatus::Maintenance,
            "unavailable" => CabinStatus::Unavailable,
            other => return Err(format!("unknown cabin status: {}", other).into()),
        };
        Ok(Cabin {
            id: self.id,
            name: self.name,
            nightly_rate: self.nightly_rate,
            max_guests: self.max_guests,
            min_nights: self.min_nights,
            status,
        })
    }
}

#[async_trait]
impl CabinRepository for PgCabinRepository {
    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Cabin>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, CabinRow>(&format!(
            "SELECT {} FROM cabins WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CabinRow::into_domain).transpose()
    }

    async fn append_reservation(
        &self,
        cabin_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Append-only convenience list; ON CONFLICT keeps retries harmless.
        sqlx::query(
            "INSERT INTO cabin_reservations (cabin_id, reservation_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(cabin_id)
        .bind(reservation_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_available(
        &self,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: Option<i32>,
    ) -> Result<Vec<Cabin>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, CabinRow>(&format!(
            "SELECT {} FROM cabins c \
             WHERE c.status = 'available' \
               AND ($3::INT4 IS NULL OR c.max_guests >= $3) \
               AND NOT EXISTS ( \
                   SELECT 1 FROM reservations r \
                   WHERE r.cabin_id = c.id \
                     AND r.status IN ('pending', 'confirmed', 'completed') \
                     AND r.start_date < $2 AND r.end_date > $1 \
               ) \
             ORDER BY c.name",
            COLUMNS
        ))
        .bind(check_in)
        .bind(check_out)
        .bind(guests)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CabinRow::into_domain).collect()
    }
}
