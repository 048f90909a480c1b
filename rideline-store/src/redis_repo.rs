use redis::{AsyncCommands, RedisResult};

/// Thin Redis wrapper. Everything here is advisory: the profile cache backs
/// autofill reads, Postgres stays authoritative, and callers treat every
/// error as a cache miss.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn get_cached_profile(&self, owner_id: &str) -> RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("profile:{}", owner_id);
        conn.get(key).await
    }

    /// Only called after the Postgres write has been confirmed; writes go
    /// server-first so the cache never holds fields the store rejected.
    pub async fn set_cached_profile(
        &self,
        owner_id: &str,
        fields_json: &str,
        ttl_seconds: u64,
    ) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("profile:{}", owner_id);
        conn.set_ex::<_, _, ()>(key, fields_json, ttl_seconds).await
    }

    pub async fn del_cached_profile(&self, owner_id: &str) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("profile:{}", owner_id);
        conn.del::<_, ()>(key).await
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
