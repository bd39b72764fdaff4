use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SearchError;
use crate::memory::InMemoryVectorStore;
use crate::store::VectorStore;

/// Connection settings for the pgvector-backed store.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    /// Table holding `smiles`, `monoisotopic_mass` and `mol_embedding`.
    pub table: String,
    pub connect_timeout_secs: f64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "postgres_service".into(),
            port: 5432,
            database: "molecular_search_db".into(),
            user: "csmp_user".into(),
            password: String::new(),
            table: "molecular_search".into(),
            connect_timeout_secs: 5.0,
        }
    }
}

impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("table", &self.table)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl PostgresConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.connect_timeout_secs).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if !is_identifier(&self.table) {
            return Err(SearchError::InvalidConfig(format!(
                "table name '{}' must be a non-empty identifier",
                self.table
            )));
        }
        if self.host.trim().is_empty() {
            return Err(SearchError::InvalidConfig("host must not be empty".into()));
        }
        if !(self.connect_timeout_secs > 0.0
            && Duration::try_from_secs_f64(self.connect_timeout_secs).is_ok())
        {
            return Err(SearchError::InvalidConfig(
                "connect_timeout_secs must be a positive, representable number of seconds".into(),
            ));
        }
        Ok(())
    }
}

/// ASCII letters, digits and underscores, optionally schema-qualified, not starting with a digit.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').count() <= 2
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Which [`VectorStore`] to build.
///
/// # Example
/// ```
/// use search::StoreConfig;
///
/// let offline = StoreConfig::in_memory();
/// let store = offline.build().unwrap();
/// assert_eq!(store.name(), "in-memory");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// PostgreSQL with the pgvector extension.
    Postgres(PostgresConfig),
    /// In-process store, optionally seeded from a JSON file of molecule records.
    InMemory {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Postgres(PostgresConfig::default())
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::InMemory { path: None }
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        match self {
            Self::Postgres(cfg) => cfg.validate(),
            Self::InMemory { .. } => Ok(()),
        }
    }

    /// Build the configured store. No connection is opened here; PostgreSQL
    /// connections are made per query.
    pub fn build(&self) -> Result<Arc<dyn VectorStore>, SearchError> {
        self.validate()?;
        match self {
            Self::InMemory { path: None } => Ok(Arc::new(InMemoryVectorStore::new())),
            Self::InMemory { path: Some(path) } => {
                Ok(Arc::new(InMemoryVectorStore::from_json_file(path)?))
            }
            #[cfg(feature = "postgres")]
            Self::Postgres(cfg) => Ok(Arc::new(crate::postgres::PgVectorStore::new(cfg.clone())?)),
            #[cfg(not(feature = "postgres"))]
            Self::Postgres(_) => Err(SearchError::InvalidConfig(
                "postgres support is not compiled in (enable the `postgres` feature)".into(),
            )),
        }
    }
}

/// Query defaults plus the store to run them against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub store: StoreConfig,
    /// Mass tolerance in parts per million.
    pub ppm_tolerance: f64,
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            ppm_tolerance: 1000.0,
            top_k: 10,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.ppm_tolerance.is_finite() && self.ppm_tolerance > 0.0) {
            return Err(SearchError::InvalidConfig(
                "ppm_tolerance must be a positive number".into(),
            ));
        }
        if self.top_k == 0 {
            return Err(SearchError::InvalidConfig("top_k must be > 0".into()));
        }
        self.store.validate()
    }
}
