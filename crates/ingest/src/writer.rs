//! Transactional persistence of one object's features.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use geoingest_core::FeatureRecord;

/// Spatial reference all stored geometry is assigned (WGS 84).
pub const SRID: i32 = 4326;

const INSERT_FEATURE: &str = "\
INSERT INTO geo_features (source_bucket, source_key, feature_index, properties, geom) \
VALUES ($1, $2, $3, $4::jsonb, ST_SetSRID(ST_GeomFromGeoJSON($5), $6))";

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("insert of feature #{index} failed: {source}")]
    Insert {
        index: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("feature #{index} could not be serialized: {source}")]
    Serialize {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature #{index} exceeds the feature_index range")]
    IndexOverflow { index: usize },
}

/// Persists all features of one object as a single all-or-nothing unit.
#[async_trait]
pub trait FeatureWriter: Send + Sync {
    /// Insert `features` in order, `feature_index` = position in the slice.
    ///
    /// Either every row is committed or none is. Returns the rows written.
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        features: &[FeatureRecord],
    ) -> Result<usize, WriteError>;
}

/// PostGIS-backed [`FeatureWriter`].
#[derive(Clone)]
pub struct PgFeatureWriter {
    pool: PgPool,
}

impl PgFeatureWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeatureWriter for PgFeatureWriter {
    async fn write(
        &self,
        bucket: &str,
        key: &str,
        features: &[FeatureRecord],
    ) -> Result<usize, WriteError> {
        // Dropping `tx` on any early return rolls the whole object back.
        let mut tx = self.pool.begin().await?;

        for (index, feature) in features.iter().enumerate() {
            let feature_index =
                i32::try_from(index).map_err(|_| WriteError::IndexOverflow { index })?;
            let properties = serde_json::to_string(&feature.properties)
                .map_err(|source| WriteError::Serialize { index, source })?;
            let geometry = serde_json::to_string(&feature.geometry)
                .map_err(|source| WriteError::Serialize { index, source })?;

            sqlx::query(INSERT_FEATURE)
                .bind(bucket)
                .bind(key)
                .bind(feature_index)
                .bind(properties)
                .bind(geometry)
                .bind(SRID)
                .execute(&mut *tx)
                .await
                .map_err(|source| WriteError::Insert { index, source })?;
        }

        tx.commit().await?;
        debug!(bucket, key, rows = features.len(), "Committed feature rows");
        Ok(features.len())
    }
}
