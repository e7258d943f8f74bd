//! Shared state handed to every connection.

use std::sync::Arc;

use livetrans_core::Translator;
use livetrans_engine::SessionRegistry;
use livetrans_telemetry::MetricsRecorder;

/// Everything a connection needs to process fragments.
///
/// Cheap to clone; all members are reference-counted.
#[derive(Clone)]
pub struct RelayContext {
    pub registry: Arc<SessionRegistry>,
    pub translator: Arc<dyn Translator>,
    pub metrics: Arc<MetricsRecorder>,
}

impl RelayContext {
    pub fn new(
        registry: Arc<SessionRegistry>,
        translator: Arc<dyn Translator>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            registry,
            translator,
            metrics,
        }
    }

    /// Publish the current session count to the `sessions_active` gauge.
    pub fn refresh_active_gauge(&self) {
        self.metrics
            .gauge_set("sessions_active", &[], self.registry.len() as f64);
    }
}
