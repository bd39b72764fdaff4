use csmp::{ConfigLoadError, PipelineConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment prefix for server settings: `CSMP_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "CSMP_SERVER";

/// HTTP listener and request handling settings.
///
/// Pipeline settings (inference service, database, search defaults) live in
/// [`PipelineConfig`] and are loaded separately by [`ServerConfig::load_pipeline`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,

    /// Whole-request deadline; uploads still annotating past it get 408
    pub timeout_secs: u64,

    /// Upload cap in MiB
    pub max_body_size_mb: usize,

    pub enable_cors: bool,

    /// Log filter directive (`info`, `server=debug,encoder=trace`, ...)
    pub log_level: String,

    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics_enabled: bool,

    /// Pipeline YAML; defaults plus environment overrides when absent
    pub pipeline_config: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8000,
            timeout_secs: 120,
            max_body_size_mb: 50,
            enable_cors: true,
            log_level: "info".to_string(),
            metrics_enabled: true,
            pipeline_config: None,
        }
    }
}

impl ServerConfig {
    /// Read `.env`, an optional `server.{toml,yaml,json}` file and
    /// `CSMP_SERVER__*` variables, later sources winning.
    pub fn load() -> anyhow::Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err.into());
            }
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Pipeline settings: the YAML file if configured, then deployment
    /// environment overrides.
    pub fn load_pipeline(&self) -> Result<PipelineConfig, ConfigLoadError> {
        let mut pipeline = match &self.pipeline_config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        pipeline.apply_process_env()?;
        Ok(pipeline)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.bind_addr, self.port).parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Upload cap in bytes.
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb.saturating_mul(1024 * 1024)
    }
}
