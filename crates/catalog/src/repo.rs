//! Repository for catalog entries.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::filter::{EntryFilter, scope_patterns};
use crate::models::EntryRow;
use crate::{Entry, identity};
use exn::{OptionExt, ResultExt};
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use std::path::Path;
use tracing::instrument;

type Query<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;
type QueryAs<'q, T> = sqlx::query::QueryAs<'q, Sqlite, T, SqliteArguments<'q>>;

/// Repository for reading and writing catalog entries.
///
/// Every write is either a single statement or a single transaction, so
/// concurrent writers never observe half an operation. Keeping the catalog
/// consistent with the filesystem is the caller's job; anything that drifts
/// is reconciled by the next sync.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}
impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn sqlx_hates_paths(path: impl AsRef<Path>) -> Result<String> {
        Ok(path.as_ref().to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
    }

    fn bind_scope<'q>(query: Query<'q>, scope: Option<(String, String)>) -> Query<'q> {
        let (exact, prefix) = scope.unzip();
        query.bind(exact).bind(prefix)
    }

    fn bind_filter<'q, T>(query: QueryAs<'q, T>, filter: &EntryFilter) -> Result<QueryAs<'q, T>> {
        let (exact, prefix) = Self::filter_scope(filter)?.unzip();
        Ok(query
            .bind(exact)
            .bind(prefix)
            .bind(filter.favorites_only)
            .bind(filter.kind.map(|k| k.as_str())))
    }

    fn filter_scope(filter: &EntryFilter) -> Result<Option<(String, String)>> {
        filter
            .scope
            .as_deref()
            .map(|scope| scope_patterns(scope).ok_or_raise(|| ErrorKind::InvalidData("path")))
            .transpose()
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Insert an entry, or fully replace the one with the same identity.
    pub async fn upsert(&self, entry: &Entry) -> Result<()> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        Self::upsert_with(&mut *conn, entry).await
    }

    async fn upsert_with(conn: &mut SqliteConnection, entry: &Entry) -> Result<()> {
        let row = EntryRow::try_from(entry)?;
        sqlx::query(include_str!("../queries/upsert_entry.sql"))
            .bind(row.identity)
            .bind(row.path)
            .bind(row.mtime)
            .bind(row.kind)
            .bind(row.has_workflow)
            .bind(row.favorite)
            .bind(row.width)
            .bind(row.height)
            .bind(row.duration)
            .bind(row.indexed_at)
            .execute(conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Delete an entry. Returns whether there was one to delete.
    pub async fn remove(&self, identity: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_entry.sql"))
            .bind(identity.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every entry at or below `prefix`. Returns the number deleted.
    #[instrument(skip_all, fields(prefix = %prefix.as_ref().display()))]
    pub async fn remove_under(&self, prefix: impl AsRef<Path>) -> Result<u64> {
        let scope = scope_patterns(prefix.as_ref()).ok_or_raise(|| ErrorKind::InvalidData("path"))?;
        let result = Self::bind_scope(sqlx::query(include_str!("../queries/delete_under.sql")), Some(scope))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected())
    }

    /// Move an entry to the identity of `new_path`, keeping everything else
    /// (favorite flag included).
    ///
    /// The file itself must already have been renamed. Returns `None` if there
    /// was no entry for `old_path`.
    #[instrument(skip_all, fields(from = %old_path.as_ref().display(), to = %new_path.as_ref().display()))]
    pub async fn rename_identity(&self, old_path: impl AsRef<Path>, new_path: impl AsRef<Path>) -> Result<Option<Entry>> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry.sql"))
            .bind(identity(old_path.as_ref()))
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let entry = Entry::try_from(row)?;
        let old_identity = entry.identity.clone();
        let moved = entry.moved_to(new_path.as_ref());
        sqlx::query(include_str!("../queries/delete_entry.sql"))
            .bind(&old_identity)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Self::upsert_with(&mut *tx, &moved).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(Some(moved))
    }

    /// Re-key every entry at or below `old_prefix` to live below `new_prefix`
    /// instead, in one transaction. Returns the number of entries moved.
    #[instrument(skip_all, fields(from = %old_prefix.as_ref().display(), to = %new_prefix.as_ref().display()))]
    pub async fn rename_prefix(&self, old_prefix: impl AsRef<Path>, new_prefix: impl AsRef<Path>) -> Result<u64> {
        let (old_prefix, new_prefix) = (old_prefix.as_ref(), new_prefix.as_ref());
        let filter = EntryFilter::under(old_prefix);
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let rows: Vec<EntryRow> = Self::bind_filter(sqlx::query_as(include_str!("../queries/list_entries.sql")), &filter)?
            .fetch_all(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut moved = 0;
        for row in rows {
            let entry = Entry::try_from(row)?;
            // Listing by scope guarantees the prefix.
            let relative = entry.path.strip_prefix(old_prefix).or_raise(|| ErrorKind::InvalidData("path"))?;
            let target = match relative.as_os_str().is_empty() {
                true => new_prefix.to_path_buf(),
                false => new_prefix.join(relative),
            };
            sqlx::query(include_str!("../queries/delete_entry.sql"))
                .bind(&entry.identity)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            Self::upsert_with(&mut *tx, &entry.moved_to(target)).await?;
            moved += 1;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(moved)
    }

    /// Returns whether there was an entry to update.
    pub async fn set_favorite(&self, identity: impl AsRef<str>, favorite: bool) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/set_favorite.sql"))
            .bind(identity.as_ref())
            .bind(favorite)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Read
    // =========================================================================

    pub async fn get(&self, identity: impl AsRef<str>) -> Result<Option<Entry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry.sql"))
            .bind(identity.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Entry::try_from).transpose()
    }

    pub async fn get_by_path(&self, path: impl AsRef<Path>) -> Result<Option<Entry>> {
        let row: Option<EntryRow> = sqlx::query_as(include_str!("../queries/get_entry_by_path.sql"))
            .bind(Self::sqlx_hates_paths(path)?)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Entry::try_from).transpose()
    }

    /// Entries matching `filter`, ordered by path.
    pub async fn list(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let rows: Vec<EntryRow> = Self::bind_filter(sqlx::query_as(include_str!("../queries/list_entries.sql")), filter)?
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    pub async fn count(&self, filter: &EntryFilter) -> Result<u64> {
        let (count,): (i64,) = Self::bind_filter(sqlx::query_as(include_str!("../queries/count_entries.sql")), filter)?
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }
}
