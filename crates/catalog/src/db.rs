//! The SQLite file behind the catalog.
//!
//! The catalog is derived data: the files below the configured roots are the
//! source of truth, and a deleted database is rebuilt by the next full sync.
//! It is tuned for what a sync pass does to it, which is many small
//! single-row upserts from several workers at once, interleaved with scoped
//! path-ordered listings.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Enough for the default sync worker count plus a reader or two.
const MAX_CONNECTIONS: u32 = 6;
/// Workers wait on each other's write locks rather than failing with
/// `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the catalog at `path` and bring its schema
    /// up to date.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::options().filename(path.as_ref()).create_if_missing(true);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// A throwaway catalog, for tests across the workspace.
    pub async fn connect_in_memory() -> Result<Self> {
        // Each connection to `:memory:` would be a separate, empty catalog.
        Self::open(Self::options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .after_connect(|conn, meta| Box::pin(async move { Self::tune(conn, meta).await }))
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    fn options() -> SqliteConnectOptions {
        // WAL lets listings run while a pass is still writing. A lost tail of
        // upserts after a power cut is re-extracted by the next sync, so
        // NORMAL durability is plenty.
        SqliteConnectOptions::new()
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
            .auto_vacuum(SqliteAutoVacuum::Incremental)
    }

    /// Per-connection settings that `SqliteConnectOptions` doesn't cover.
    async fn tune(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument(name = "migrating catalog schema", skip_all)]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Hand back space freed by removed entries, refresh planner statistics
    /// and close the pool.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA incremental_vacuum").execute(&self.pool).await;
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
