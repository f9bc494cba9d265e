//! Redis implementation of [`PageCache`] on a deadpool connection
//! pool. One fixed key with SET EX; concurrent writers race
//! harmlessly, last writer wins.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};

use domains::{AppError, PageCache, Result};

pub struct RedisPageCache {
    pool: Pool,
}

impl RedisPageCache {
    pub fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = Config::from_url(url).create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::Internal(format!("redis pool: {e}")))
    }
}

fn internal(err: deadpool_redis::redis::RedisError) -> AppError {
    AppError::Internal(format!("redis: {err}"))
}

#[async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.conn().await?;
        let body: Option<Vec<u8>> = conn.get(key).await.map_err(internal)?;
        Ok(body.map(Bytes::from))
    }

    async fn set(&self, key: &str, body: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        // SET key value EX ttl; sub-second TTLs round up to one second
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, body.as_ref(), secs)
            .await
            .map_err(internal)?;
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await.map_err(internal)?;
        Ok(())
    }
}
