//! Redis-backed [`KvStore`].
//!
//! Uses a [`ConnectionManager`], which reconnects on its own; each call
//! clones the manager handle. Every command runs under a deadline and a
//! timeout surfaces as [`StorageError::Timeout`] without retry.

use std::future::Future;
use std::time::Duration;

use ::redis::aio::ConnectionManager;
use ::redis::{RedisError, RedisResult, Script};
use async_trait::async_trait;
use lightkeeper_types::StorageError;

use super::{KvStore, KvWrite};

/// Default per-command deadline.
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// INCR that sets the expiry only when the counter is created, in one
/// server-side step so a crash between the two cannot leave a counter
/// without a TTL.
const INCR_WITH_TTL: &str = r#"
local current = redis.call('INCR', KEYS[1])
if current == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return current
"#;

pub struct RedisKvStore {
    conn: ConnectionManager,
    incr_script: Script,
    op_timeout: Duration,
}

impl RedisKvStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = ::redis::Client::open(url).map_err(map_err)?;
        let conn = tokio::time::timeout(DEFAULT_OP_TIMEOUT, ConnectionManager::new(client))
            .await
            .map_err(|_| StorageError::Timeout {
                operation: "connect".into(),
            })?
            .map_err(map_err)?;
        tracing::info!("connected to redis");
        Ok(Self {
            conn,
            incr_script: Script::new(INCR_WITH_TTL),
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Override the per-command deadline.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    async fn run<T, F>(&self, operation: &str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(map_err),
            Err(_) => Err(StorageError::Timeout {
                operation: operation.to_owned(),
            }),
        }
    }
}

fn map_err(err: RedisError) -> StorageError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        StorageError::Unavailable(err.to_string())
    } else {
        StorageError::Backend(err.to_string())
    }
}

/// Whole seconds for EX arguments. Redis rejects 0.
fn ex_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.conn.clone();
        let cmd = ::redis::cmd("GET").arg(key).to_owned();
        self.run("get", async move { cmd.query_async(&mut conn).await })
            .await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(ex_secs(ttl));
        }
        self.run("set", async move { cmd.query_async(&mut conn).await })
            .await
    }

    async fn set_nx(&self, key: &str, value: String, ttl: Duration) -> Result<bool, StorageError> {
        let mut conn = self.conn.clone();
        let cmd = ::redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ex_secs(ttl))
            .to_owned();
        // SET NX replies OK on write and nil when the key already exists.
        let reply: Option<String> = self
            .run("set_nx", async move { cmd.query_async(&mut conn).await })
            .await?;
        Ok(reply.is_some())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, StorageError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.incr_script.key(key);
        invocation.arg(ex_secs(ttl));
        self.run("incr_with_ttl", async move {
            invocation.invoke_async(&mut conn).await
        })
        .await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StorageError> {
        let mut conn = self.conn.clone();
        let cmd = ::redis::cmd("PTTL").arg(key).to_owned();
        // -2: no such key, -1: no expiry.
        let millis: i64 = self
            .run("ttl", async move { cmd.query_async(&mut conn).await })
            .await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    async fn del(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let cmd = ::redis::cmd("DEL").arg(key).to_owned();
        let _: i64 = self
            .run("del", async move { cmd.query_async(&mut conn).await })
            .await?;
        Ok(())
    }

    async fn apply_batch(&self, writes: Vec<KvWrite>) -> Result<(), StorageError> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut pipe = ::redis::pipe();
        pipe.atomic();
        for write in writes {
            match write {
                KvWrite::Set { key, value, ttl } => {
                    let cmd = pipe.cmd("SET").arg(key).arg(value);
                    if let Some(ttl) = ttl {
                        cmd.arg("EX").arg(ex_secs(ttl));
                    }
                    cmd.ignore();
                }
                KvWrite::Delete { key } => {
                    pipe.cmd("DEL").arg(key).ignore();
                }
            }
        }
        let mut conn = self.conn.clone();
        self.run("apply_batch", async move { pipe.query_async(&mut conn).await })
            .await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        let cmd = ::redis::cmd("PING");
        let _: String = self
            .run("ping", async move { cmd.query_async(&mut conn).await })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ex_secs_never_zero() {
        assert_eq!(ex_secs(Duration::from_millis(10)), 1);
        assert_eq!(ex_secs(Duration::from_secs(300)), 300);
    }

    #[test]
    fn io_errors_map_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = map_err(RedisError::from(io));
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn connect_rejects_bad_url() {
        let result = RedisKvStore::connect("not-a-url").await;
        assert!(result.is_err());
    }
}
