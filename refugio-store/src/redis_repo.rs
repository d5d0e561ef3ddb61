use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use refugio_core::repository::CabinLock;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
    lock_ttl_seconds: u64,
}

impl RedisClient {
    pub async fn new(connection_string: &str, lock_ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            lock_ttl_seconds,
        })
    }

    fn lock_key(cabin_id: Uuid) -> String {
        format!("cabin_lock:{}", cabin_id)
    }
}

#[async_trait]
impl CabinLock for RedisClient {
    /// SET NX EX: the lock is taken only if no other booking attempt holds
    /// it, and expires on its own if a release is ever lost.
    async fn acquire(
        &self,
        cabin_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Option<String> = redis::cmd("SET")
            .arg(Self::lock_key(cabin_id))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.lock_ttl_seconds)
            .query_async(&mut conn)
            .await?;

        Ok(result.is_some())
    }

    async fn release(
        &self,
        cabin_id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(Self::lock_key(cabin_id)).await?;
        Ok(())
    }
}
