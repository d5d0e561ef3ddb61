use async_trait::async_trait;
use sqlx::PgPool;

use refugio_core::repository::CouponRepository;

pub struct PgCouponRepository {
    pool: PgPool,
}

impl PgCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponRepository for PgCouponRepository {
    async fn increment_usage(
        &self,
        code: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Codes are stored upper-case; unknown, inactive or exhausted codes
        // simply match no row.
        let result = sqlx::query(
            "UPDATE coupons SET used_count = used_count + 1 \
             WHERE code = $1 AND active \
               AND (max_uses IS NULL OR used_count < max_uses)",
        )
        .bind(code.to_uppercase())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!("Coupon {} not incremented (unknown or exhausted)", code);
        }
        Ok(())
    }
}
