//! PostgreSQL store.
//!
//! Single-row reads and writes run directly on the pool. Every mutation
//! plan runs inside one transaction; node rows are written with
//! `WHERE row_version = $n` so a concurrent writer makes the whole plan
//! roll back with `ErrorKind::Conflict`.

mod audit;
mod jobs;
mod mutations;
mod nodes;
mod rows;
mod versions;

use sqlx::{PgPool, Postgres, Transaction};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;

pub use audit::PgAuditLog;
pub use jobs::PgJobStore;

/// [`crate::store::Store`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(db_err("Failed to begin transaction"))
    }
}

/// Map a sqlx error, keeping unique violations as `Conflict`.
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        let mut err = AppError::from(e);
        err.message = format!("{context}: {}", err.message);
        err
    }
}

/// Commit a transaction.
pub(crate) async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit().await.map_err(db_err("Failed to commit transaction"))
}
