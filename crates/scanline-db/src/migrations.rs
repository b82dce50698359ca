//! Embedded catalog schema.
//!
//! Files live in the workspace `migrations/sqlite/` as `NNN_name.sql` and are
//! compiled in. Applied files are checksummed by sqlx, so changes go into a
//! new file rather than an edit of an old one.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies any migrations the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let known = MIGRATOR.migrations.len();
    MIGRATOR.run(pool).await?;
    info!(migrations = known, "Catalog schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts, for `--status` style diagnostics.
///
/// Only valid after [`run_migrations`] has created the bookkeeping table.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;
    Ok((MIGRATOR.migrations.len(), applied.max(0) as usize))
}
