//! ## rollbar-wp-telemetry::metrics
//! **Prometheus counters for the initialization engine**

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: prometheus::Registry,
    pub backend_inits: IntCounter,
    pub misconfigurations: IntCounter,
    pub client_snippets: IntCounter,
    pub notices: IntCounterVec,
    pub test_runs: IntCounterVec,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    /// # Panics
    /// If a metric definition is malformed or registered twice; both are
    /// programming errors in this constructor.
    pub fn new() -> Self {
        let registry = Registry::new();
        let backend_inits = IntCounter::new(
            "rollbar_wp_backend_init_total",
            "Server-side backend initialization attempts",
        )
        .unwrap();
        let misconfigurations = IntCounter::new(
            "rollbar_wp_misconfigured_total",
            "Backend initializations rejected as misconfigured",
        )
        .unwrap();
        let client_snippets = IntCounter::new(
            "rollbar_wp_client_snippets_total",
            "Client bootstrap snippets emitted",
        )
        .unwrap();
        let notices = IntCounterVec::new(
            Opts::new("rollbar_wp_notices_total", "Admin notices registered"),
            &["notice"],
        )
        .unwrap();
        let test_runs = IntCounterVec::new(
            Opts::new("rollbar_wp_test_runs_total", "Test endpoint invocations"),
            &["outcome"],
        )
        .unwrap();

        registry.register(Box::new(backend_inits.clone())).unwrap();
        registry
            .register(Box::new(misconfigurations.clone()))
            .unwrap();
        registry.register(Box::new(client_snippets.clone())).unwrap();
        registry.register(Box::new(notices.clone())).unwrap();
        registry.register(Box::new(test_runs.clone())).unwrap();

        Self {
            registry,
            backend_inits,
            misconfigurations,
            client_snippets,
            notices,
            test_runs,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn inc_notice(&self, notice: &str) {
        self.notices.with_label_values(&[notice]).inc();
    }

    pub fn inc_test_run(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.test_runs.with_label_values(&[outcome]).inc();
    }
}
