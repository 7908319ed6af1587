//! Bounded connection pool with per-connection operation limits
//!
//! Wraps a [`PgPool`] and counts the operations each server connection has
//! served, keyed by its backend PID. A connection that reaches
//! `max_operations` is detached and closed on release so the pool opens a
//! fresh one in its place.

use crate::config::DatabaseConfig;
use crate::error::{IngestError, Result};
use crate::store::schema;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, Postgres};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub struct StoragePool {
    pool: PgPool,
    max_operations: u32,
    timescale: bool,
    usage: Mutex<HashMap<i32, u32>>,
    schema_ready: OnceCell<()>,
}

impl StoragePool {
    /// Open the pool, establishing `min_connections` up front
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs));

        if let Some(max_lifetime) = config.max_lifetime_secs {
            options = options.max_lifetime(Duration::from_secs(max_lifetime));
        }

        let pool = options.connect(&config.url).await?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            max_operations = config.max_operations,
            "Storage connection pool created"
        );

        Ok(Self::from_pool(pool, config.max_operations, config.timescale))
    }

    pub fn from_pool(pool: PgPool, max_operations: u32, timescale: bool) -> Self {
        Self {
            pool,
            max_operations: max_operations.max(1),
            timescale,
            usage: Mutex::new(HashMap::new()),
            schema_ready: OnceCell::new(),
        }
    }

    /// Create tables and indexes. Runs at most once per pool.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                let mut conn = self.acquire().await?;
                schema::initialize(&mut conn, self.timescale).await?;
                Ok::<(), IngestError>(())
            })
            .await?;
        Ok(())
    }

    /// Check out a connection, waiting at most the acquisition timeout
    pub async fn acquire(&self) -> Result<PooledConnection<'_>> {
        let mut conn = self.pool.acquire().await?;
        let backend_pid: i32 = sqlx::query_scalar("SELECT pg_backend_pid()")
            .fetch_one(&mut *conn)
            .await?;

        Ok(PooledConnection {
            conn: Some(conn),
            backend_pid,
            operations: 0,
            pool: self,
        })
    }

    /// Operations recorded so far against a backend connection
    pub fn operations_served(&self, backend_pid: i32) -> u32 {
        self.usage
            .lock()
            .map(|usage| usage.get(&backend_pid).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn max_operations(&self) -> u32 {
        self.max_operations
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection. Pending acquisitions fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
        if let Ok(mut usage) = self.usage.lock() {
            usage.clear();
        }
        info!("Storage connection pool closed");
    }

    /// Add `operations` to a connection's tally; true once it must be retired
    fn record_usage(&self, backend_pid: i32, operations: u32) -> bool {
        let Ok(mut usage) = self.usage.lock() else {
            return false;
        };
        let served = usage.entry(backend_pid).or_insert(0);
        *served += operations;
        if *served >= self.max_operations {
            usage.remove(&backend_pid);
            return true;
        }
        false
    }
}

/// A checked-out connection that reports its usage back on drop
pub struct PooledConnection<'p> {
    conn: Option<PoolConnection<Postgres>>,
    backend_pid: i32,
    operations: u32,
    pool: &'p StoragePool,
}

impl PooledConnection<'_> {
    /// Count statements executed on this connection
    pub fn record_operations(&mut self, count: u32) {
        self.operations += count;
    }

    pub fn backend_pid(&self) -> i32 {
        self.backend_pid
    }
}

impl Deref for PooledConnection<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        // Only taken in drop
        match &self.conn {
            Some(conn) => &**conn,
            None => unreachable!("connection accessed after release"),
        }
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => &mut **conn,
            None => unreachable!("connection accessed after release"),
        }
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if !self.pool.record_usage(self.backend_pid, self.operations) {
            return;
        }

        debug!(
            backend_pid = self.backend_pid,
            max_operations = self.pool.max_operations,
            "Retiring connection after reaching its operation limit"
        );
        let raw = conn.detach();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = raw.close().await {
                        warn!(error = %e, "Failed to close retired connection");
                    }
                });
            },
            Err(_) => drop(raw),
        }
    }
}
