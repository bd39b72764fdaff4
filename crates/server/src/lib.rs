//! HTTP front end for the CSMP annotation pipeline.
//!
//! One upload in, one annotation per spectrum out:
//!
//! | Method | Path | Answer |
//! |--------|------|--------|
//! | `POST` | `/annotate-spectrum` | 202 with per-spectrum results, 400 for unusable uploads |
//! | `GET` | `/` | service name, version and accepted formats |
//! | `GET` | `/health` | liveness |
//! | `GET` | `/ready` | encoder/search initialization status |
//! | `GET` | `/metrics` | Prometheus text (when enabled) |
//!
//! The upload is a multipart form with a `file` field holding an `.mgf`,
//! `.msp` or `.json` document.
//!
//! Server settings come from [`ServerConfig::load`]; pipeline settings from
//! the YAML file it names plus the deployment variables documented on
//! [`csmp::PipelineConfig::apply_env_overrides`].

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
