use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection, Row};
use std::time::Duration;
use tracing::debug;

use crate::config::PostgresConfig;
use crate::error::SearchError;
use crate::store::{vector_literal, StoreRow, VectorStore};
use crate::window::MassWindow;

/// pgvector-backed [`VectorStore`].
///
/// Opens one connection per query and closes it afterwards; there is no pool.
#[derive(Clone)]
pub struct PgVectorStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
    sql: String,
}

impl std::fmt::Debug for PgVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgVectorStore")
            .field("host", &self.options.get_host())
            .field("database", &self.options.get_database())
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl PgVectorStore {
    pub fn new(config: PostgresConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);
        Ok(Self {
            options,
            connect_timeout: config.connect_timeout(),
            sql: nearest_sql(&config.table),
        })
    }

    async fn connect(&self) -> Result<PgConnection, SearchError> {
        tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| {
                SearchError::unavailable(format!(
                    "connection timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| SearchError::unavailable(format!("connection failed: {e}")))
    }
}

/// The table name is validated as an identifier before it gets here. Both
/// numeric outputs are cast to `float8` so `real` or `numeric` columns still
/// decode as `f64`.
fn nearest_sql(table: &str) -> String {
    format!(
        "SELECT smiles, monoisotopic_mass::float8 AS monoisotopic_mass, \
         (mol_embedding <=> $3::text::vector)::float8 AS cosine_distance \
         FROM {table} \
         WHERE monoisotopic_mass BETWEEN $1 AND $2 \
         ORDER BY mol_embedding <=> $3::text::vector ASC \
         LIMIT $4"
    )
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn nearest(
        &self,
        window: MassWindow,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<StoreRow>, SearchError> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(&self.sql)
            .bind(window.lower)
            .bind(window.upper)
            .bind(vector_literal(embedding))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&mut conn)
            .await;
        if let Err(err) = conn.close().await {
            debug!(error = %err, "closing search connection failed");
        }

        rows?
            .into_iter()
            .map(|row| {
                Ok(StoreRow {
                    smiles: row.try_get("smiles")?,
                    monoisotopic_mass: row.try_get("monoisotopic_mass")?,
                    cosine_distance: row.try_get("cosine_distance")?,
                })
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
