//! Redis tier store
//!
//! Production backend over a Redis-compatible server. One store per tier,
//! each pointed at its own database or instance. The multiplexed async
//! connection is cheaply cloned per call, so concurrent callers never share
//! a locked handle.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use tracing::debug;

use super::TierStore;
use crate::error::{Error, Result};

/// Redis-backed tier store
#[derive(Debug)]
pub struct RedisStore {
    connection: redis::aio::MultiplexedConnection,
    url: String,
}

impl RedisStore {
    /// Connect to a Redis-compatible server.
    ///
    /// The connect attempt is bounded by `connect_timeout`; an invalid URL
    /// is a configuration error, an unreachable server a backend error.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Configuration(format!("invalid backend URL {}: {}", url, e)))?;

        let connection = tokio::time::timeout(
            connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| Error::Backend(format!("connect to {} timed out", url)))??;

        debug!(url, "connected to backend store");
        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }

    /// Backend URL this store talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn conn(&self) -> redis::aio::MultiplexedConnection {
        self.connection.clone()
    }
}

#[async_trait]
impl TierStore for RedisStore {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn();
        let data: Option<Vec<u8>> = conn.get(key).await?;
        Ok(data.map(Bytes::from))
    }

    async fn store(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.conn();
        // PX keeps sub-second TTLs exact
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value.as_ref())
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn add_tag_member(&self, set_key: &str, member: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn();
        let _: () = conn.sadd(set_key, member).await?;
        let _: () = redis::cmd("PEXPIRE")
            .arg(set_key)
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn scan_set(
        &self,
        set_key: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>)> {
        let mut conn = self.conn();
        let (next_cursor, members): (u64, Vec<String>) = redis::cmd("SSCAN")
            .arg(set_key)
            .arg(cursor)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;
        Ok((next_cursor, members))
    }

    async fn remove_set(&self, set_key: &str) -> Result<bool> {
        let mut conn = self.conn();
        let removed: i64 = conn.del(set_key).await?;
        Ok(removed > 0)
    }

    async fn flush(&self) -> Result<()> {
        let mut conn = self.conn();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn key_count(&self) -> Result<u64> {
        let mut conn = self.conn();
        let count: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
        Ok(count)
    }

    async fn memory_used_bytes(&self) -> Result<u64> {
        let mut conn = self.conn();
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await?;
        Ok(parse_used_memory(&info).unwrap_or(0))
    }
}

/// Pull `used_memory:<bytes>` out of an INFO memory response.
fn parse_used_memory(info: &str) -> Option<u64> {
    info.lines()
        .find_map(|line| line.strip_prefix("used_memory:"))
        .and_then(|v| v.trim().parse().ok())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_used_memory() {
        let info = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\n";
        assert_eq!(parse_used_memory(info), Some(1_048_576));
    }

    #[test]
    fn test_parse_used_memory_missing() {
        assert_eq!(parse_used_memory("# Memory\r\nmaxmemory:0\r\n"), None);
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let err = RedisStore::connect("not-a-url", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
