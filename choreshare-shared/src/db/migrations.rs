/// Schema migrations
///
/// The ChoreShare schema (`users`, `groups`, `memberships`, `roles`,
/// `role_assignments`, `chores`, `chore_assignments`) is embedded from
/// `choreshare-shared/migrations/` as reversible `.up.sql`/`.down.sql`
/// pairs.
///
/// # Example
///
/// ```no_run
/// use choreshare_shared::db::migrations::{run_migrations, schema_status};
/// use choreshare_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     assert!(schema_status(&pool).await?.is_current());
///     Ok(())
/// }
/// ```

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::{PgPool, Postgres};
use tracing::{debug, error, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applied schema versions compared with the embedded ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// Successfully applied migration versions, ascending
    pub applied: Vec<i64>,

    /// Newest version embedded in this build
    pub embedded_latest: Option<i64>,
}

impl SchemaStatus {
    /// Newest applied version
    pub fn latest_applied(&self) -> Option<i64> {
        self.applied.last().copied()
    }

    /// True when the database is at the newest embedded version
    pub fn is_current(&self) -> bool {
        self.latest_applied() == self.embedded_latest
    }
}

/// Newest migration version embedded in this build
pub fn embedded_latest() -> Option<i64> {
    MIGRATOR
        .iter()
        .filter(|m| m.migration_type.is_up_migration())
        .map(|m| m.version)
        .max()
}

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails; that migration is rolled back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(target_version = ?embedded_latest(), "Applying schema migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Schema migration failed");
        e
    })?;

    info!("Schema is up to date");
    Ok(())
}

/// Reverts every applied migration, leaving an empty schema
///
/// Used by tests that need a clean database.
pub async fn revert_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Reverting schema migrations");
    MIGRATOR.undo(pool, 0).await
}

/// Reads applied versions from `_sqlx_migrations`
///
/// A database that has never been migrated reports no applied versions.
pub async fn schema_status(pool: &PgPool) -> Result<SchemaStatus, sqlx::Error> {
    let tracked: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let applied = if tracked {
        sqlx::query_scalar::<_, i64>(
            "SELECT version FROM _sqlx_migrations WHERE success ORDER BY version",
        )
        .fetch_all(pool)
        .await?
    } else {
        Vec::new()
    };

    let status = SchemaStatus {
        applied,
        embedded_latest: embedded_latest(),
    };
    debug!(
        applied = status.applied.len(),
        current = status.is_current(),
        "Schema status"
    );
    Ok(status)
}

/// Creates the database named in `database_url` unless it already exists
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        return Ok(());
    }
    info!("Creating database");
    Postgres::create_database(database_url).await
}
