//! Database module for Dynamo Sentinel
//!
//! Manages the SQLite connection pool with WAL mode and provides the
//! analysis-history operations. History writes are best effort: the poller
//! logs failures and keeps going, so nothing here sits on an alert path.

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tracing::info;

/// Type alias for the SQLite connection pool
pub type DbPool = Pool<Sqlite>;

/// Schema applied by [`run_migrations`], embedded at compile time
const SCHEMA: &str = include_str!("../database/schema.sql");

/// Initialize the database connection pool
pub async fn init_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    // Ensure data directory exists
    if let Some(parent) = config.path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Database(sqlx::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to create database directory: {}", e),
                )))
            })?;
            info!("Created database directory: {:?}", parent);
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", config.path.display());

    let connect_options = SqliteConnectOptions::from_str(&db_url)
        .map_err(AppError::Database)?
        // Enable WAL mode for concurrent reads
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_with(connect_options)
        .await?;

    info!(
        "Database pool initialized: {:?} (max {} connections)",
        config.path, config.max_connections
    );

    Ok(pool)
}

/// Apply the embedded schema.
///
/// SQLite does not accept multiple statements in one query, so the schema is
/// split on semicolons and executed statement by statement. Every statement
/// uses IF NOT EXISTS, which makes re-runs a no-op.
pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    for chunk in SCHEMA.split(';') {
        let statement: String = chunk
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema applied successfully");
    Ok(())
}

/// Insert a completed analysis into the history store
pub async fn record_analysis(
    pool: &DbPool,
    signature: &str,
    address: &str,
    network: &str,
    risk_score: f64,
    alerted: bool,
    result_json: &str,
) -> AppResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO analysis_history (
            signature, address, network, risk_score, alerted, result_json
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(signature)
    .bind(address)
    .bind(network)
    .bind(risk_score)
    .bind(if alerted { 1 } else { 0 })
    .bind(result_json)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Total rows in the history store
pub async fn history_count(pool: &DbPool) -> AppResult<i64> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analysis_history")
        .fetch_one(pool)
        .await?;

    Ok(count.0)
}
