use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::info;

use geoingest_core::config::PostgresConfig;

pub const FEATURES_TABLE: &str = "geo_features";

const CREATE_POSTGIS: &str = "CREATE EXTENSION IF NOT EXISTS postgis";

const CREATE_FEATURES_TABLE: &str = "\
CREATE TABLE IF NOT EXISTS geo_features (
  id BIGSERIAL PRIMARY KEY,
  source_bucket TEXT NOT NULL,
  source_key TEXT NOT NULL,
  feature_index INTEGER NOT NULL,
  properties JSONB,
  geom geometry(Geometry, 4326) NOT NULL,
  ingested_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

const CREATE_SOURCE_INDEX: &str = "\
CREATE INDEX IF NOT EXISTS geo_features_source_idx \
ON geo_features (source_bucket, source_key)";

/// Open the worker's database handle.
///
/// The pool holds a single connection: messages are processed one at a time,
/// and a dropped connection is re-established on the next acquire.
pub async fn connect(config: &PostgresConfig) -> Result<PgPool, sqlx::Error> {
    let ssl_mode: PgSslMode = config.ssl_mode.parse()?;
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.username)
        .password(&config.password)
        .ssl_mode(ssl_mode);

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    info!(host = %config.host, port = config.port, "Connected to Postgres");
    Ok(pool)
}

/// Create the PostGIS extension and the feature table if missing.
///
/// Idempotent; must succeed before any message is consumed.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(CREATE_POSTGIS).execute(&mut *tx).await?;
    sqlx::query(CREATE_FEATURES_TABLE).execute(&mut *tx).await?;
    sqlx::query(CREATE_SOURCE_INDEX).execute(&mut *tx).await?;
    tx.commit().await?;

    info!(table = FEATURES_TABLE, "PostGIS extension and feature table are ready");
    Ok(())
}
