pub mod metrics;
pub mod tracing;

pub use metrics::{Metrics, MetricsError};
pub use tracing::{init_observability, shutdown_observability, ObservabilityError};
