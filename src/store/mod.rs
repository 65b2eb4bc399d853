//! SQLite persistence for subscribers, their preferences and the analytics log.
//!
//! Every function takes the pool explicitly; multi-step flows are sequences of
//! independent statements; conditional updates keep the subscriber lifecycle
//! moving forward only.

pub mod analytics;
pub mod preferences;
pub mod subscribers;

use sqlx::migrate::MigrateError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::config::DatabaseSettings;

// SQLITE_CONSTRAINT_UNIQUE extended result code
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

pub fn get_connection_db_pool(config: &DatabaseSettings) -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}

/// Creates the schema if it does not exist yet. Safe to run on every start.
#[tracing::instrument(name = "Running database migrations", skip(db_pool))]
pub async fn migrate(db_pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(db_pool).await
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_UNIQUE)
                || db_err.message().contains("UNIQUE constraint failed")
        }
        _ => false,
    }
}
