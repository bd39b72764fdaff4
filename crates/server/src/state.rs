use crate::config::ServerConfig;
use csmp::AnnotationOrchestrator;
use metrics_exporter_prometheus::PrometheusHandle;
use spectra::{SpectrumParser, TextSpectrumParser};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Encoder and search handles, built once at startup
    pub orchestrator: Arc<AnnotationOrchestrator>,

    /// Upload parser
    pub parser: Arc<dyn SpectrumParser>,

    /// Prometheus recorder handle, when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state with the built-in MGF/MSP/JSON parser
    pub fn new(config: ServerConfig, orchestrator: AnnotationOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            parser: Arc::new(TextSpectrumParser),
            metrics: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn SpectrumParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
