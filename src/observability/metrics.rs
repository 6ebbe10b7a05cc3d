use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub deliveries_created_total: IntCounter,
    pub status_transitions_total: IntCounterVec,
    pub acceptance_conflicts_total: IntCounter,
    pub rejected_operations_total: IntCounterVec,
    pub operation_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let deliveries_created_total =
            IntCounter::new("deliveries_created_total", "Total deliveries created")
                .expect("valid deliveries_created_total metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Successful status transitions by target status",
            ),
            &["status"],
        )
        .expect("valid status_transitions_total metric");

        let acceptance_conflicts_total = IntCounter::new(
            "acceptance_conflicts_total",
            "Accept attempts that found the delivery unavailable",
        )
        .expect("valid acceptance_conflicts_total metric");

        let rejected_operations_total = IntCounterVec::new(
            Opts::new(
                "rejected_operations_total",
                "Lifecycle operations rejected by a guard, by reason",
            ),
            &["reason"],
        )
        .expect("valid rejected_operations_total metric");

        let operation_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "operation_latency_seconds",
                "Latency of lifecycle operations in seconds",
            ),
            &["operation", "outcome"],
        )
        .expect("valid operation_latency_seconds metric");

        registry
            .register(Box::new(deliveries_created_total.clone()))
            .expect("register deliveries_created_total");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(acceptance_conflicts_total.clone()))
            .expect("register acceptance_conflicts_total");
        registry
            .register(Box::new(rejected_operations_total.clone()))
            .expect("register rejected_operations_total");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("register operation_latency_seconds");

        Self {
            registry,
            deliveries_created_total,
            status_transitions_total,
            acceptance_conflicts_total,
            rejected_operations_total,
            operation_latency_seconds,
        }
    }

    pub fn observe(&self, operation: &str, ok: bool, elapsed_secs: f64) {
        let outcome = if ok { "success" } else { "error" };
        self.operation_latency_seconds
            .with_label_values(&[operation, outcome])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
