use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for quote editing, catalog admin and draft persistence
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Editor metrics
    pub quote_operations_total: CounterVec,
    pub dependency_violations_total: CounterVec,
    pub reorders_total: CounterVec,
    pub pricing_duration_seconds: Histogram,

    // Persistence metrics
    pub draft_writes_total: CounterVec,

    // Admin metrics
    pub catalog_operations_total: CounterVec,
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

impl Metrics {
    /// Create a new metrics instance with all required metrics registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        info!("Initializing Prometheus metrics");

        let quote_operations_total = CounterVec::new(
            Opts::new(
                "quote_operations_total",
                "Total number of quote editor operations",
            ),
            &["operation", "status"],
        )?;

        let dependency_violations_total = CounterVec::new(
            Opts::new(
                "dependency_violations_total",
                "Total number of edits rejected by dependency rules",
            ),
            &["kind"],
        )?;

        let reorders_total = CounterVec::new(
            Opts::new("reorders_total", "Total number of drag and drop reorders"),
            &["scope", "status"],
        )?;

        let pricing_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "pricing_duration_seconds",
                "Time spent recomputing quote totals",
            )
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        )?;

        let draft_writes_total = CounterVec::new(
            Opts::new("draft_writes_total", "Total number of draft autosave writes"),
            &["status"],
        )?;

        let catalog_operations_total = CounterVec::new(
            Opts::new(
                "catalog_operations_total",
                "Total number of catalog admin operations",
            ),
            &["operation", "status"],
        )?;

        registry.register(Box::new(quote_operations_total.clone()))?;
        registry.register(Box::new(dependency_violations_total.clone()))?;
        registry.register(Box::new(reorders_total.clone()))?;
        registry.register(Box::new(pricing_duration_seconds.clone()))?;
        registry.register(Box::new(draft_writes_total.clone()))?;
        registry.register(Box::new(catalog_operations_total.clone()))?;

        info!("Prometheus metrics initialized successfully");

        Ok(Metrics {
            registry,
            quote_operations_total,
            dependency_violations_total,
            reorders_total,
            pricing_duration_seconds,
            draft_writes_total,
            catalog_operations_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    pub fn record_quote_operation(&self, operation: &str, success: bool) {
        self.quote_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }

    /// Record an edit rejected by a dependency rule (`kind` as in `DependencyViolation::kind`)
    pub fn record_dependency_violation(&self, kind: &str) {
        self.dependency_violations_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_reorder(&self, cross_day: bool, success: bool) {
        let scope = if cross_day { "cross_day" } else { "same_day" };
        self.reorders_total
            .with_label_values(&[scope, status_label(success)])
            .inc();
    }

    pub fn record_pricing(&self, duration_seconds: f64) {
        self.pricing_duration_seconds.observe(duration_seconds);
    }

    pub fn record_draft_write(&self, success: bool) {
        self.draft_writes_total
            .with_label_values(&[status_label(success)])
            .inc();
    }

    pub fn record_catalog_operation(&self, operation: &str, success: bool) {
        self.catalog_operations_total
            .with_label_values(&[operation, status_label(success)])
            .inc();
    }
}
