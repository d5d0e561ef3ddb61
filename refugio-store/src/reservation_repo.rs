use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use refugio_core::repository::ReservationRepository;
use refugio_core::{Booker, PaymentMethod, Reservation, ReservationStatus};

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = "id, cabin_id, user_id, guest_info, start_date, end_date, total_price, \
                       status, payment_method, payment_id, payment_details, hold_id, \
                       created_at, updated_at";

/// States that block a date range; must stay in sync with
/// `ReservationStatus::blocks_availability`.
const BLOCKING_STATES: &str = "('pending', 'confirmed', 'completed')";

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    cabin_id: Uuid,
    user_id: Option<Uuid>,
    guest_info: Option<serde_json::Value>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_price: i64,
    status: String,
    payment_method: Option<String>,
    payment_id: Option<String>,
    payment_details: Option<serde_json::Value>,
    hold_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_to_str(status: ReservationStatus) -> &'static str {
    match status {
        ReservationStatus::Pending => "pending",
        ReservationStatus::Confirmed => "confirmed",
        ReservationStatus::Rejected => "rejected",
        ReservationStatus::Completed => "completed",
        ReservationStatus::Cancelled => "cancelled",
    }
}

fn status_from_str(s: &str) -> Result<ReservationStatus, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "pending" => Ok(ReservationStatus::Pending),
        "confirmed" => Ok(ReservationStatus::Confirmed),
        "rejected" => Ok(ReservationStatus::Rejected),
        "completed" => Ok(ReservationStatus::Completed),
        "cancelled" => Ok(ReservationStatus::Cancelled),
        other => Err(format!("unknown reservation status: {}", other).into()),
    }
}

fn method_to_str(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Gateway => "gateway",
        PaymentMethod::Transfer => "transfer",
        PaymentMethod::Cash => "cash",
    }
}

fn method_from_str(s: &str) -> Result<PaymentMethod, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "gateway" => Ok(PaymentMethod::Gateway),
        "transfer" => Ok(PaymentMethod::Transfer),
        "cash" => Ok(PaymentMethod::Cash),
        other => Err(format!("unknown payment method: {}", other).into()),
    }
}

pub(crate) fn booker_from_columns(
    user_id: Option<Uuid>,
    guest_info: Option<serde_json::Value>,
) -> Result<Booker, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(user_id) = user_id {
        return Ok(Booker::RegisteredUser { user_id });
    }
    match guest_info {
        Some(value) => Ok(Booker::Guest {
            contact: serde_json::from_value(value)?,
        }),
        None => Err("row has neither user_id nor guest_info".into()),
    }
}

pub(crate) fn booker_to_columns(
    booker: &Booker,
) -> Result<(Option<Uuid>, Option<serde_json::Value>), Box<dyn std::error::Error + Send + Sync>> {
    match booker {
        Booker::RegisteredUser { user_id } => Ok((Some(*user_id), None)),
        Booker::Guest { contact } => Ok((None, Some(serde_json::to_value(contact)?))),
    }
}

impl ReservationRow {
    fn into_domain(self) -> Result<Reservation, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Reservation {
            id: self.id,
            cabin_id: self.cabin_id,
            booker: booker_from_columns(self.user_id, self.guest_info)?,
            start_date: self.start_date,
            end_date: self.end_date,
            total_price: self.total_price,
            status: status_from_str(&self.status)?,
            payment_method: self
                .payment_method
                .as_deref()
                .map(method_from_str)
                .transpose()?,
            payment_id: self.payment_id,
            payment_details: self.payment_details,
            hold_id: self.hold_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create(
        &self,
        reservation: &Reservation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (user_id, guest_info) = booker_to_columns(&reservation.booker)?;

        sqlx::query(
            "INSERT INTO reservations \
             (id, cabin_id, user_id, guest_info, start_date, end_date, total_price, \
              status, payment_method, payment_id, payment_details, hold_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(reservation.id)
        .bind(reservation.cabin_id)
        .bind(user_id)
        .bind(guest_info)
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.total_price)
        .bind(status_to_str(reservation.status))
        .bind(reservation.payment_method.map(method_to_str))
        .bind(reservation.payment_id.as_deref())
        .bind(reservation.payment_details.as_ref())
        .bind(reservation.hold_id)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE payment_id = $1",
            COLUMNS
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReservationRow::into_domain).transpose()
    }

    async fn find_by_hold_id(
        &self,
        hold_id: Uuid,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE hold_id = $1",
            COLUMNS
        ))
        .bind(hold_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReservationRow::into_domain).transpose()
    }

    async fn find_conflicting(
        &self,
        cabin_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        // Strict half-open overlap: a range blocks iff it starts before the
        // requested end and ends after the requested start.
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations \
             WHERE cabin_id = $1 AND status IN {} \
               AND start_date < $3 AND end_date > $2",
            COLUMNS, BLOCKING_STATES
        ))
        .bind(cabin_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ReservationRow::into_domain)
            .collect()
    }

    async fn list_for_cabin(
        &self,
        cabin_id: Uuid,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE cabin_id = $1 ORDER BY start_date",
            COLUMNS
        ))
        .bind(cabin_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ReservationRow::into_domain)
            .collect()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE user_id = $1 ORDER BY start_date DESC",
            COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(ReservationRow::into_domain)
            .collect()
    }
}
