//! YAML configuration for the annotation pipeline.
//!
//! One file describes the encoder, the candidate search and the orchestrator.
//! Every section is optional and falls back to its defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! encoder:
//!   url: "http://triton_service:8000"
//!   model_name: "spectrum_encoder"
//!   model_version: ""
//!   max_peaks: 1024
//!   chunk_size: 32
//!   infer_timeout_secs: 30
//!
//! search:
//!   ppm_tolerance: 1000
//!   top_k: 10
//!   store:
//!     kind: postgres
//!     host: "postgres_service"
//!     port: 5432
//!     database: "molecular_search_db"
//!     user: "csmp_user"
//!     table: "molecular_search"
//!     connect_timeout_secs: 5
//!
//! annotation:
//!   search_concurrency: 4
//! ```
//!
//! Deployment environment variables (`POSTGRES_HOST`, `TRITON_MODEL_NAME`, ...)
//! can be layered on top with [`PipelineConfig::apply_env_overrides`].

use std::fs;
use std::path::Path;
use std::str::FromStr;

use encoder::EncoderConfig;
use search::{SearchConfig, StoreConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotate::AnnotationConfig;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub annotation: AnnotationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            encoder: EncoderConfig::default(),
            search: SearchConfig::default(),
            annotation: AnnotationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.encoder
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("encoder: {e}")))?;
        self.search
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("search: {e}")))?;
        if self.annotation.search_concurrency == 0 {
            return Err(ConfigLoadError::Validation(
                "annotation: search_concurrency must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Apply overrides from the process environment, then re-validate.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigLoadError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay deployment variables read through `lookup`:
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `TRITON_HTTP_URL` | `encoder.url` |
    /// | `TRITON_MODEL_NAME` / `TRITON_MODEL_VERSION` | `encoder.model_name` / `model_version` |
    /// | `TRITON_INFER_TIMEOUT_SECONDS` | `encoder.infer_timeout_secs` |
    /// | `SPECTRUM_MAX_PEAKS` / `SPECTRUM_INFER_CHUNK_SIZE` | `encoder.max_peaks` / `chunk_size` |
    /// | `SEARCH_PPM_TOLERANCE` / `SEARCH_TOP_K` | `search.ppm_tolerance` / `top_k` |
    /// | `SEARCH_CONCURRENCY` | `annotation.search_concurrency` |
    /// | `POSTGRES_HOST`, `_PORT`, `_DB`, `_USER`, `_PASSWORD`, `_MOLECULAR_TABLE`, `_CONNECT_TIMEOUT` | `search.store` (postgres only) |
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvLookup(lookup);

        env.string("TRITON_HTTP_URL", &mut self.encoder.url);
        env.string("TRITON_MODEL_NAME", &mut self.encoder.model_name);
        env.string("TRITON_MODEL_VERSION", &mut self.encoder.model_version);
        env.parse("TRITON_INFER_TIMEOUT_SECONDS", &mut self.encoder.infer_timeout_secs)?;
        env.parse("SPECTRUM_MAX_PEAKS", &mut self.encoder.max_peaks)?;
        env.parse("SPECTRUM_INFER_CHUNK_SIZE", &mut self.encoder.chunk_size)?;

        env.parse("SEARCH_PPM_TOLERANCE", &mut self.search.ppm_tolerance)?;
        env.parse("SEARCH_TOP_K", &mut self.search.top_k)?;
        env.parse("SEARCH_CONCURRENCY", &mut self.annotation.search_concurrency)?;

        if let StoreConfig::Postgres(pg) = &mut self.search.store {
            env.string("POSTGRES_HOST", &mut pg.host);
            env.parse("POSTGRES_PORT", &mut pg.port)?;
            env.string("POSTGRES_DB", &mut pg.database);
            env.string("POSTGRES_USER", &mut pg.user);
            env.string("POSTGRES_PASSWORD", &mut pg.password);
            env.string("POSTGRES_MOLECULAR_TABLE", &mut pg.table);
            env.parse("POSTGRES_CONNECT_TIMEOUT", &mut pg.connect_timeout_secs)?;
        }

        self.validate()
    }
}

struct EnvLookup<F>(F);

impl<F: Fn(&str) -> Option<String>> EnvLookup<F> {
    fn string(&self, key: &str, target: &mut String) {
        if let Some(value) = (self.0)(key) {
            *target = value;
        }
    }

    fn parse<T: FromStr>(&self, key: &str, target: &mut T) -> Result<(), ConfigLoadError> {
        if let Some(value) = (self.0)(key) {
            *target = value.trim().parse().map_err(|_| ConfigLoadError::InvalidEnv {
                key: key.to_string(),
                value: value.clone(),
            })?;
        }
        Ok(())
    }
}
