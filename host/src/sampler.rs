//! ==============================================================================
//! sampler.rs - spatial sampler over the postgis address point table
//! ==============================================================================
//!
//! purpose:
//!     fetches up to `limit` random points from the backing table using
//!     TABLESAMPLE SYSTEM and reprojects their geometry to wgs84 lon/lat.
//!
//!     TABLESAMPLE SYSTEM picks whole disk blocks, so:
//!     - row order is whatever the sampled blocks hold (not deterministic)
//!     - a small table or small percentage can return fewer than `limit` rows
//!     both are normal results, not errors.
//!
//! relationships:
//!     - used by: api.rs (through the PointSampler trait)
//!     - configured by: config.rs (SamplingConfig, DatabaseConfig)
//!     - produces: domain::GeoPoint
//!
//! ==============================================================================

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::{DatabaseConfig, SamplingConfig};
use crate::domain::GeoPoint;

// ==============================================================================
// errors
// ==============================================================================

/// why the data source could not produce a sample
///
/// every variant is reported to clients as "data source unavailable"; the
/// kind only matters for logs.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("connection failed: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
    #[error("geometry transform failed: {0}")]
    Transform(#[source] sqlx::Error),
    #[error("query exceeded {0:?}")]
    Timeout(Duration),
}

impl SamplerError {
    pub fn kind(&self) -> &'static str {
        match self {
            SamplerError::Connection(_) => "connection",
            SamplerError::Query(_) => "query",
            SamplerError::Transform(_) => "transform",
            SamplerError::Timeout(_) => "timeout",
        }
    }
}

impl From<sqlx::Error> for SamplerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => SamplerError::Connection(err),
            // ST_X / ST_Y yield NULL for empty or non-point geometry
            sqlx::Error::ColumnDecode { .. } => SamplerError::Transform(err),
            sqlx::Error::Database(db) if is_transform_message(db.message()) => {
                SamplerError::Transform(err)
            }
            _ => SamplerError::Query(err),
        }
    }
}

fn is_transform_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("transform") || message.contains("srid") || message.contains("geometry")
}

/// a configured identifier that cannot be safely quoted
#[derive(Debug, Error, PartialEq)]
#[error("invalid sql identifier {0:?}: expected letters, digits and underscores")]
pub struct IdentifierError(pub String);

// ==============================================================================
// sampler trait
// ==============================================================================

#[async_trait]
pub trait PointSampler: Send + Sync {
    /// return at most `limit` points; fewer is not an error
    async fn sample(&self, limit: u32) -> Result<Vec<GeoPoint>, SamplerError>;
}

// ==============================================================================
// postgis implementation
// ==============================================================================

pub struct PgSampler {
    pool: PgPool,
    query: String,
    sample_percent: f32,
    query_timeout: Duration,
}

impl PgSampler {
    pub fn new(
        pool: PgPool,
        sampling: &SamplingConfig,
        query_timeout: Duration,
    ) -> Result<Self, IdentifierError> {
        Ok(Self {
            pool,
            query: build_sample_query(sampling)?,
            sample_percent: sampling.sample_percent,
            query_timeout,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl PointSampler for PgSampler {
    async fn sample(&self, limit: u32) -> Result<Vec<GeoPoint>, SamplerError> {
        let fetch = sqlx::query_as::<_, GeoPoint>(&self.query)
            .bind(self.sample_percent)
            .bind(i64::from(limit))
            .fetch_all(&self.pool);

        let points = tokio::time::timeout(self.query_timeout, fetch)
            .await
            .map_err(|_| SamplerError::Timeout(self.query_timeout))??;

        tracing::debug!(requested = limit, returned = points.len(), "sampled points");
        Ok(points)
    }
}

/// build the long-lived pool; no connection is opened until the first query
pub fn connect_lazy(database: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .connect_lazy(&database.url)
}

/// quote a plain identifier, rejecting anything that is not [A-Za-z0-9_]+
pub fn quote_ident(ident: &str) -> Result<String, IdentifierError> {
    let valid = !ident.is_empty()
        && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(IdentifierError(ident.to_string()));
    }
    Ok(format!("\"{ident}\""))
}

pub fn build_sample_query(sampling: &SamplingConfig) -> Result<String, IdentifierError> {
    let schema = quote_ident(&sampling.schema)?;
    let table = quote_ident(&sampling.table)?;
    let id = quote_ident(&sampling.id_column)?;
    let geom = quote_ident(&sampling.geometry_column)?;

    Ok(format!(
        "SELECT {id}::text AS sensor_id, \
         ST_X(ST_Transform({geom}, 4326)) AS longitude, \
         ST_Y(ST_Transform({geom}, 4326)) AS latitude \
         FROM {schema}.{table} TABLESAMPLE SYSTEM ($1) \
         LIMIT $2"
    ))
}
